//! Mutation requests built from a `StackConfig`.
//!
//! Empty collections are omitted, never sent empty; the service treats the two
//! differently.

use stackshot_remote::{CreateStackRequest, Parameter, Tag, UpdateStackRequest};
use stackshot_schema::{ConfigError, StackConfig, TemplateSource};
use std::collections::BTreeMap;

fn template_fields(template: &TemplateSource) -> (Option<String>, Option<String>) {
    match template {
        TemplateSource::Body(body) => (Some(body.clone()), None),
        TemplateSource::Url(url) => (None, Some(url.clone())),
    }
}

fn parameters(map: &BTreeMap<String, String>) -> Option<Vec<Parameter>> {
    (!map.is_empty()).then(|| {
        map.iter()
            .map(|(k, v)| Parameter {
                parameter_key: k.clone(),
                parameter_value: v.clone(),
            })
            .collect()
    })
}

fn tags(map: &BTreeMap<String, String>) -> Option<Vec<Tag>> {
    (!map.is_empty()).then(|| {
        map.iter()
            .map(|(k, v)| Tag {
                key: k.clone(),
                value: v.clone(),
            })
            .collect()
    })
}

fn capabilities(list: &[String]) -> Option<Vec<String>> {
    (!list.is_empty()).then(|| list.to_vec())
}

/// Build the create mutation. Fails if both failure settings are set.
pub fn create_request(config: &StackConfig) -> Result<CreateStackRequest, ConfigError> {
    if config.disable_rollback && config.on_failure.is_some() {
        return Err(ConfigError::ConflictingFailurePolicy);
    }
    let (template_body, template_url) = template_fields(&config.template);
    Ok(CreateStackRequest {
        stack_name: config.name.clone(),
        template_body,
        template_url,
        enable_termination_protection: config.enable_termination_protection,
        on_failure: config.on_failure,
        disable_rollback: config.disable_rollback.then_some(true),
        parameters: parameters(&config.parameters),
        tags: tags(&config.tags),
        capabilities: capabilities(&config.capabilities),
    })
}

/// Build the update mutation. Create-only settings are never carried.
pub fn update_request(config: &StackConfig) -> UpdateStackRequest {
    let (template_body, template_url) = template_fields(&config.template);
    UpdateStackRequest {
        stack_name: config.name.clone(),
        template_body,
        template_url,
        parameters: parameters(&config.parameters),
        tags: tags(&config.tags),
        capabilities: capabilities(&config.capabilities),
    }
}
