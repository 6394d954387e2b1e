use super::{json_pretty, load_document, EXIT_SUCCESS};
use stackshot_schema::TemplateSource;
use std::path::Path;

pub fn run(document: &Path, json: bool) -> Result<u8, String> {
    let config = load_document(document)?;

    let template = match &config.template {
        TemplateSource::Url(url) => url.clone(),
        TemplateSource::Body(body) => format!("inline body ({} bytes)", body.len()),
    };

    if json {
        let payload = serde_json::json!({
            "valid": true,
            "name": config.name,
            "template": template,
            "parameters": config.parameters.keys().collect::<Vec<_>>(),
            "tags": config.tags,
            "capabilities": config.capabilities,
            "enable_termination_protection": config.enable_termination_protection,
            "disable_rollback": config.disable_rollback,
            "on_failure": config.on_failure,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("stack document is valid");
        println!("  name:         {}", config.name);
        println!("  template:     {template}");
        println!("  parameters:   {}", config.parameters.len());
        println!("  tags:         {}", config.tags.len());
        if !config.capabilities.is_empty() {
            println!("  capabilities: {}", config.capabilities.join(", "));
        }
        if let Some(policy) = config.on_failure {
            println!("  on failure:   {policy}");
        }
        if config.disable_rollback {
            println!("  rollback:     disabled");
        }
        if config.enable_termination_protection {
            println!("  termination protection: enabled");
        }
    }
    Ok(EXIT_SUCCESS)
}
