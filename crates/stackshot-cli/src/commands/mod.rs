pub mod completions;
pub mod status;
pub mod sync;
pub mod validate;

use indicatif::{ProgressBar, ProgressStyle};
use stackshot_core::{terminal_outcome, ConsumerError, EventConsumer, TerminalOutcome};
use stackshot_remote::{HttpBackend, RemoteConfig, StackEvent, StackStatus};
use stackshot_schema::StackConfig;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_REMOTE_ERROR: u8 = 3;

/// Endpoint overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct RemoteArgs {
    pub url: Option<String>,
    pub token: Option<String>,
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &StackStatus) -> String {
    use console::Style;
    let text = status.as_str();
    match terminal_outcome(status) {
        Some(TerminalOutcome::Success) => Style::new().green().apply_to(text).to_string(),
        Some(TerminalOutcome::Failure) => Style::new().red().bold().apply_to(text).to_string(),
        None if text.ends_with("_IN_PROGRESS") => {
            Style::new().yellow().apply_to(text).to_string()
        }
        None => text.to_owned(),
    }
}

/// Load and validate a stack document. Errors carry the `config error:` prefix.
pub fn load_document(path: &Path) -> Result<StackConfig, String> {
    stackshot_schema::load_stack_file(path)
        .map_err(|e| format!("config error: {}: {e}", path.display()))
}

pub fn make_remote_backend(remote: &RemoteArgs) -> Result<HttpBackend, String> {
    let mut config = if let Some(url) = remote.url.as_deref() {
        RemoteConfig::new(url)
    } else {
        RemoteConfig::load_default()
            .map_err(|e| format!("remote error: no --remote and no config: {e}"))?
    };
    if let Some(token) = remote.token.as_deref() {
        config = config.with_token(token);
    }
    Ok(HttpBackend::new(config))
}

/// One line per event: `timestamp logical(type) status reason`.
pub fn format_event(event: &StackEvent) -> String {
    let line = format!(
        "{} {}({}) {} {}",
        event.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        event.logical_resource_id,
        event.resource_type,
        event.resource_status,
        event.resource_status_reason.as_deref().unwrap_or_default(),
    );
    line.trim_end().to_owned()
}

/// Prints stack events to stdout as text lines or JSON lines.
pub struct EventPrinter {
    json: bool,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl EventConsumer for EventPrinter {
    fn consume(&mut self, event: &StackEvent) -> Result<(), ConsumerError> {
        let mut out = std::io::stdout().lock();
        if self.json {
            writeln!(out, "{}", serde_json::to_string(event)?)?;
        } else {
            let status = StackStatus::from(event.resource_status.as_str());
            let line = format_event(event).replacen(
                &event.resource_status,
                &colorize_status(&status),
                1,
            );
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(reason: Option<&str>) -> StackEvent {
        serde_json::from_value(serde_json::json!({
            "event_id": "evt-1",
            "stack_id": "arn:stack/web/1",
            "stack_name": "web",
            "timestamp": "2024-03-01T12:00:05Z",
            "logical_resource_id": "LogsBucket",
            "resource_type": "AWS::S3::Bucket",
            "resource_status": "CREATE_FAILED",
            "resource_status_reason": reason,
        }))
        .unwrap()
    }

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn format_event_with_reason() {
        assert_eq!(
            format_event(&event(Some("Bucket already exists"))),
            "2024-03-01T12:00:05Z LogsBucket(AWS::S3::Bucket) CREATE_FAILED Bucket already exists"
        );
    }

    #[test]
    fn format_event_without_reason_has_no_trailing_space() {
        assert_eq!(
            format_event(&event(None)),
            "2024-03-01T12:00:05Z LogsBucket(AWS::S3::Bucket) CREATE_FAILED"
        );
    }

    #[test]
    fn colorize_status_keeps_text() {
        for s in ["CREATE_COMPLETE", "ROLLBACK_COMPLETE", "UPDATE_IN_PROGRESS"] {
            assert!(colorize_status(&StackStatus::from(s)).contains(s));
        }
    }

    #[test]
    fn colorize_status_unknown_is_plain() {
        assert_eq!(colorize_status(&StackStatus::from("HIBERNATING")), "HIBERNATING");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_CONFIG_ERROR);
        assert_ne!(EXIT_CONFIG_ERROR, EXIT_REMOTE_ERROR);
    }

    #[test]
    fn make_remote_backend_with_url_and_token() {
        let backend = make_remote_backend(&RemoteArgs {
            url: Some("http://localhost:8080/".to_owned()),
            token: Some("t0k".to_owned()),
        })
        .unwrap();
        assert_eq!(backend.config().url, "http://localhost:8080");
        assert_eq!(backend.config().auth_token.as_deref(), Some("t0k"));
    }

    #[test]
    fn load_document_prefixes_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.starts_with("config error:"), "{err}");
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        assert!(pb.is_finished());
    }
}
