use crate::RemoteError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Endpoint of the orchestration gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl RemoteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// Load config from `~/.config/stackshot/remote.json`.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid remote config: {e}")))?;
        config.url = config.url.trim_end_matches('/').to_owned();
        Ok(config)
    }
}

pub fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/stackshot/remote.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_url_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(
            &path,
            r#"{"url": "https://gateway.example.com/v1", "auth_token": "secret123"}"#,
        )
        .unwrap();

        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(
            loaded,
            RemoteConfig::new("https://gateway.example.com/v1").with_token("secret123")
        );
    }

    #[test]
    fn config_strips_trailing_slash() {
        let config = RemoteConfig::new("https://example.com/");
        assert_eq!(config.url, "https://example.com");
    }

    #[test]
    fn load_strips_trailing_slash_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, r#"{"url": "http://127.0.0.1:9000/"}"#).unwrap();
        let loaded = RemoteConfig::load(&path).unwrap();
        assert_eq!(loaded.url, "http://127.0.0.1:9000");
        assert!(loaded.auth_token.is_none());
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RemoteConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn load_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, "not json").unwrap();
        let err = RemoteConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("invalid remote config"));
    }
}
