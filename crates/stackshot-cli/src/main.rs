mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{RemoteArgs, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_REMOTE_ERROR};
use stackshot_core::WaitConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "stackshot",
    version,
    about = "Reconcile declarative stack documents against a remote orchestration service"
)]
struct Cli {
    /// Orchestration gateway URL (overrides ~/.config/stackshot/remote.json).
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Bearer token sent to the gateway.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Maximum number of status polls before giving up.
    #[arg(long, default_value_t = stackshot_core::wait::DEFAULT_MAX_ATTEMPTS, global = true)]
    max_attempts: u32,

    /// Seconds to wait between status polls.
    #[arg(
        long,
        default_value_t = stackshot_core::wait::DEFAULT_POLL_INTERVAL.as_secs(),
        global = true
    )]
    poll_interval: u64,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update the stack described by a document and wait for it to settle.
    Sync {
        /// Path to the stack document (YAML, or TOML with a .toml extension).
        document: PathBuf,
        /// Submit the change without waiting for the stack to finish.
        #[arg(long, default_value_t = false)]
        no_wait: bool,
    },
    /// Load and validate a stack document without contacting the service.
    Validate {
        /// Path to the stack document.
        document: PathBuf,
    },
    /// Show the live status of the stack a document describes.
    Status {
        /// Path to the stack document.
        document: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STACKSHOT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let remote = RemoteArgs {
        url: cli.remote,
        token: cli.token,
    };
    let wait = WaitConfig {
        interval: Duration::from_secs(cli.poll_interval),
        max_attempts: cli.max_attempts,
    };
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Sync { document, no_wait } => {
            commands::sync::run(&document, &remote, wait, no_wait, json_output)
        }
        Commands::Validate { document } => commands::validate::run(&document, json_output),
        Commands::Status { document } => commands::status::run(&document, &remote, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("remote error:") {
                EXIT_REMOTE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
