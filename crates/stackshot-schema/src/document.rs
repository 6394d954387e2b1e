use crate::config::{validate_stack_name, OnFailure, StackConfig, TemplateSource};
use crate::ConfigError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const TEMPLATE_FIELDS: &str = "template_url/template_body/template_path";

/// A stack document as written on disk, before validation.
///
/// Keys use the service's PascalCase spelling (`TemplateURL`, `DisableRollback`);
/// snake_case spellings are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackDocument {
    #[serde(default, rename = "Name", alias = "name")]
    pub name: Option<String>,
    #[serde(default, rename = "TemplateURL", alias = "template_url")]
    pub template_url: Option<String>,
    #[serde(default, rename = "TemplateBody", alias = "template_body")]
    pub template_body: Option<serde_yaml::Value>,
    #[serde(default, rename = "TemplatePath", alias = "template_path")]
    pub template_path: Option<PathBuf>,
    #[serde(
        default,
        rename = "Parameters",
        alias = "parameters",
        deserialize_with = "scalar_map"
    )]
    pub parameters: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "Tags",
        alias = "tags",
        deserialize_with = "scalar_map"
    )]
    pub tags: BTreeMap<String, String>,
    #[serde(default, rename = "Capabilities", alias = "capabilities")]
    pub capabilities: Vec<String>,
    #[serde(default, rename = "DisableRollback", alias = "disable_rollback")]
    pub disable_rollback: bool,
    #[serde(
        default,
        rename = "EnableTerminationProtection",
        alias = "enable_termination_protection"
    )]
    pub enable_termination_protection: bool,
    #[serde(default, rename = "OnFailure", alias = "on_failure")]
    pub on_failure: Option<String>,
}

/// Scalar document values; parameter and tag values are sent to the service as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s,
        }
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Scalar>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.into_string()))
        .collect())
}

impl StackDocument {
    /// Validate the document and resolve its template into a [`StackConfig`].
    ///
    /// `base_dir` anchors a relative `TemplatePath`.
    pub fn into_config(self, base_dir: &Path) -> Result<StackConfig, ConfigError> {
        let name = self.name.filter(|n| !n.is_empty());
        let template_url = self.template_url.filter(|u| !u.is_empty());
        let template_body = self.template_body.filter(|b| !b.is_null());
        let template_path = self.template_path.filter(|p| !p.as_os_str().is_empty());

        let has_template =
            template_url.is_some() || template_body.is_some() || template_path.is_some();

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if !has_template {
            missing.push(TEMPLATE_FIELDS);
        }
        let Some(name) = name else {
            return Err(ConfigError::MissingFields(missing));
        };

        let on_failure = self
            .on_failure
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<OnFailure>())
            .transpose()?;
        if self.disable_rollback && on_failure.is_some() {
            return Err(ConfigError::ConflictingFailurePolicy);
        }
        validate_stack_name(&name)?;

        let template = match (template_url, template_body, template_path) {
            (Some(url), None, None) => TemplateSource::Url(url),
            (None, Some(body), None) => TemplateSource::Body(render_body(body)?),
            (None, None, Some(path)) => {
                let body = fs::read_to_string(base_dir.join(&path))
                    .map_err(|source| ConfigError::TemplateRead { path, source })?;
                TemplateSource::Body(body)
            }
            (None, None, None) => return Err(ConfigError::MissingFields(missing)),
            _ => return Err(ConfigError::AmbiguousTemplate),
        };

        Ok(StackConfig {
            name,
            template,
            parameters: self.parameters,
            tags: self.tags,
            capabilities: self.capabilities,
            enable_termination_protection: self.enable_termination_protection,
            disable_rollback: self.disable_rollback,
            on_failure,
        })
    }
}

fn render_body(body: serde_yaml::Value) -> Result<String, ConfigError> {
    match body {
        serde_yaml::Value::String(s) => Ok(s),
        structured => Ok(serde_yaml::to_string(&structured)?),
    }
}

pub fn parse_stack_yaml(input: &str, base_dir: &Path) -> Result<StackConfig, ConfigError> {
    let doc: StackDocument = serde_yaml::from_str(input)?;
    doc.into_config(base_dir)
}

pub fn parse_stack_toml(input: &str, base_dir: &Path) -> Result<StackConfig, ConfigError> {
    let doc: StackDocument = toml::from_str(input)?;
    doc.into_config(base_dir)
}

/// Load a stack document, choosing TOML for `.toml` files and YAML otherwise.
pub fn load_stack_file(path: impl AsRef<Path>) -> Result<StackConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        parse_stack_toml(&content, base_dir)
    } else {
        parse_stack_yaml(&content, base_dir)
    }
}
