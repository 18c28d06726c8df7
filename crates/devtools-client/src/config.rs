//! Client tracking configuration

use devtools_proto::{path_has_prefix, DEBUG_PREFIX};
use http::Uri;

/// Configuration for [`TrackedTransport`](crate::TrackedTransport)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Calls to this path or anything below it are never tracked
    pub debug_prefix: String,
    /// Where captured entries are posted, if forwarding is enabled
    pub ingest_url: Option<Uri>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            debug_prefix: DEBUG_PREFIX.to_string(),
            ingest_url: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Whether a call to this URI skips tracking entirely
    pub fn bypasses(&self, uri: &Uri) -> bool {
        path_has_prefix(uri.path(), &self.debug_prefix)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ingest URL '{0}': {1}")]
    InvalidIngestUrl(String, String),

    #[error("Ingest URL must be absolute: {0}")]
    RelativeIngestUrl(String),

    #[error("Debug prefix must start with '/': {0}")]
    InvalidDebugPrefix(String),
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    debug_prefix: Option<String>,
    ingest_url: Option<String>,
}

impl ClientConfigBuilder {
    pub fn debug_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.debug_prefix = Some(prefix.into());
        self
    }

    pub fn ingest_url(mut self, url: impl Into<String>) -> Self {
        self.ingest_url = Some(url.into());
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::default();

        if let Some(prefix) = self.debug_prefix {
            if !prefix.starts_with('/') {
                return Err(ConfigError::InvalidDebugPrefix(prefix));
            }
            config.debug_prefix = prefix;
        }

        if let Some(url) = self.ingest_url {
            let uri: Uri = url
                .parse()
                .map_err(|e: http::uri::InvalidUri| {
                    ConfigError::InvalidIngestUrl(url.clone(), e.to_string())
                })?;
            if uri.scheme().is_none() || uri.authority().is_none() {
                return Err(ConfigError::RelativeIngestUrl(url));
            }
            config.ingest_url = Some(uri);
        }

        Ok(config)
    }
}
