use super::{
    colorize_status, json_pretty, load_document, make_remote_backend, RemoteArgs, EXIT_SUCCESS,
};
use stackshot_core::{Engine, StackPresence};
use std::path::Path;

pub fn run(document: &Path, remote: &RemoteArgs, json: bool) -> Result<u8, String> {
    let config = load_document(document)?;
    let backend = make_remote_backend(remote)?;
    let engine = Engine::load(&backend, &config).map_err(|e| e.to_string())?;

    match engine.presence() {
        StackPresence::Present(snapshot) => {
            if json {
                println!("{}", json_pretty(snapshot)?);
            } else {
                println!("stack:   {}", snapshot.stack_name);
                println!("id:      {}", snapshot.stack_id);
                println!("status:  {}", colorize_status(&snapshot.stack_status));
                if let Some(reason) = &snapshot.stack_status_reason {
                    println!("reason:  {reason}");
                }
                if let Some(updated) = snapshot.last_updated_time.or(snapshot.creation_time) {
                    println!("updated: {}", updated.format("%Y-%m-%dT%H:%M:%SZ"));
                }
                for output in &snapshot.outputs {
                    println!("output:  {} = {}", output.output_key, output.output_value);
                }
            }
        }
        StackPresence::Absent | StackPresence::Unknown => {
            if json {
                let payload = serde_json::json!({
                    "stack": config.name,
                    "exists": false,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("stack {} does not exist", config.name);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
