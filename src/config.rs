//! Preview configuration
//!
//! `PreviewConfig` is passed explicitly to whichever component needs it; the
//! core never reads ambient global settings. Loading and storing the blob
//! lives in [`crate::settings`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Configuration for the preview core
///
/// The defaults mirror the hosted link service:
/// - frames are served over `https` from `makereal.tldraw.link`
/// - a capture waits at most 2000ms for the frame to answer
///
/// # Examples
///
/// ```
/// let cfg = livepreview::PreviewConfig::default();
/// assert_eq!(cfg.capture_timeout_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// URL scheme of the link host, without `://`
    pub protocol: String,
    /// Host (and optional port) serving uploaded previews
    pub link_host: String,
    /// Explicit upload endpoint; derived from the link host when absent
    pub upload_endpoint: Option<String>,
    /// Upper bound on a single capture round trip in milliseconds
    pub capture_timeout_ms: u64,
    /// HTTP timeout for a single upload in milliseconds
    pub upload_timeout_ms: u64,
    /// Origin passed along with capture requests (`*` means unrestricted)
    pub target_origin: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            link_host: "makereal.tldraw.link".to_string(),
            upload_endpoint: None,
            capture_timeout_ms: 2000,
            upload_timeout_ms: 30000,
            target_origin: "*".to_string(),
        }
    }
}

impl PreviewConfig {
    /// Read a JSON config file. Missing keys fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PreviewConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.protocol.is_empty() || self.protocol.contains("://") {
            return Err(Error::ConfigError(format!(
                "protocol must be a bare scheme, got {:?}",
                self.protocol
            )));
        }
        if self.link_host.is_empty() {
            return Err(Error::ConfigError("link_host must not be empty".into()));
        }
        if self.capture_timeout_ms == 0 {
            return Err(Error::ConfigError("capture_timeout_ms must be positive".into()));
        }
        self.base_url()?;
        self.upload_endpoint()?;
        Ok(())
    }

    /// `{protocol}://{link_host}/`
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}/", self.protocol, self.link_host);
        Url::parse(&raw).map_err(|e| Error::ConfigError(format!("bad link host {}: {}", raw, e)))
    }

    /// Where markup is POSTed by the HTTP uploader.
    pub fn upload_endpoint(&self) -> Result<Url> {
        match &self.upload_endpoint {
            Some(raw) => Url::parse(raw)
                .map_err(|e| Error::ConfigError(format!("bad upload endpoint {}: {}", raw, e))),
            None => self
                .base_url()?
                .join("api/upload")
                .map_err(|e| Error::ConfigError(e.to_string())),
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreviewConfig::default();
        assert_eq!(config.protocol, "https");
        assert_eq!(config.target_origin, "*");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.upload_endpoint().unwrap().as_str(),
            "https://makereal.tldraw.link/api/upload"
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PreviewConfig =
            serde_json::from_str(r#"{"link_host":"localhost:8787","protocol":"http"}"#).unwrap();
        assert_eq!(config.capture_timeout_ms, 2000);
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8787/");
    }

    #[test]
    fn rejects_scheme_with_separator() {
        let config = PreviewConfig {
            protocol: "https://".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_capture_timeout() {
        let config = PreviewConfig {
            capture_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
