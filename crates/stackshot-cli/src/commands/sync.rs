use super::{
    colorize_status, load_document, make_remote_backend, spin_fail, spin_ok, spinner,
    EventPrinter, RemoteArgs, EXIT_SUCCESS,
};
use stackshot_core::{Engine, SyncOutcome, WaitConfig};
use std::path::Path;

pub fn run(
    document: &Path,
    remote: &RemoteArgs,
    wait: WaitConfig,
    no_wait: bool,
    json: bool,
) -> Result<u8, String> {
    let config = load_document(document)?;
    let backend = make_remote_backend(remote)?;
    let mut engine = Engine::load(&backend, &config)
        .map_err(|e| e.to_string())?
        .with_wait_config(wait);

    let pb = (!json).then(|| spinner(&format!("submitting stack {}…", config.name)));
    let outcome = engine.synchronize().map_err(|e| {
        if let Some(pb) = &pb {
            spin_fail(pb, "submission failed");
        }
        e.to_string()
    })?;
    if let Some(pb) = &pb {
        let msg = match outcome {
            SyncOutcome::Created => "create submitted",
            SyncOutcome::Updated => "update submitted",
            SyncOutcome::NoChanges => "nothing to submit",
        };
        spin_ok(pb, msg);
    }

    if outcome == SyncOutcome::NoChanges {
        if json {
            let payload = serde_json::json!({
                "stack": config.name,
                "outcome": outcome,
            });
            println!("{}", json_line(&payload)?);
        } else {
            println!("no updates to be applied");
        }
        return Ok(EXIT_SUCCESS);
    }

    if no_wait {
        if json {
            let payload = serde_json::json!({
                "stack": config.name,
                "stack_id": engine.stack_id(),
                "outcome": outcome,
            });
            println!("{}", json_line(&payload)?);
        } else {
            println!("submitted stack {}; not waiting for completion", config.name);
        }
        return Ok(EXIT_SUCCESS);
    }

    let mut printer = EventPrinter::new(json);
    let observation = engine
        .observe_until_terminal(&mut printer)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "stack": config.name,
            "stack_id": engine.stack_id(),
            "outcome": outcome,
            "observation": observation,
        });
        println!("{}", json_line(&payload)?);
    } else {
        println!(
            "stack {} reached {} after {} poll(s)",
            config.name,
            colorize_status(&observation.status),
            observation.attempts
        );
    }
    Ok(EXIT_SUCCESS)
}

/// Events go out as JSON lines, so the summary is a single line too.
fn json_line(value: &serde_json::Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {e}"))
}
