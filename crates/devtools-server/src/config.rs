//! Server-side devtools configuration

use devtools_proto::{path_has_prefix, API_PREFIX, DEBUG_PREFIX, FRAMEWORK_SKIP_PREFIXES};

/// Which inbound requests the tracking middleware records
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Only paths below this prefix are tracked
    pub api_prefix: String,
    /// Paths below any of these are never tracked, even below `api_prefix`
    pub skip_prefixes: Vec<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let mut skip_prefixes: Vec<String> = FRAMEWORK_SKIP_PREFIXES
            .iter()
            .map(|p| p.to_string())
            .collect();
        skip_prefixes.push(DEBUG_PREFIX.to_string());

        Self {
            api_prefix: API_PREFIX.to_string(),
            skip_prefixes,
        }
    }
}

impl TrackingConfig {
    pub fn should_track(&self, path: &str) -> bool {
        path_has_prefix(path, &self.api_prefix)
            && !self
                .skip_prefixes
                .iter()
                .any(|prefix| path_has_prefix(path, prefix))
    }
}

/// Top-level switch for installing devtools into a host app
#[derive(Debug, Clone)]
pub struct DevtoolsConfig {
    /// Master switch
    pub enabled: bool,
    /// Whether the host runs in development mode; nothing is installed otherwise
    pub dev: bool,
    /// Mount point of the debug endpoints
    pub debug_prefix: String,
    pub tracking: TrackingConfig,
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dev: false,
            debug_prefix: DEBUG_PREFIX.to_string(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl DevtoolsConfig {
    pub fn builder() -> DevtoolsConfigBuilder {
        DevtoolsConfigBuilder::default()
    }

    /// Devtools are only ever active in development
    pub fn is_active(&self) -> bool {
        self.enabled && self.dev
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Debug prefix must start with '/' and name a path segment: {0:?}")]
    InvalidDebugPrefix(String),

    #[error("API prefix must start with '/': {0:?}")]
    InvalidApiPrefix(String),
}

/// Builder for DevtoolsConfig
#[derive(Default)]
pub struct DevtoolsConfigBuilder {
    enabled: Option<bool>,
    dev: Option<bool>,
    debug_prefix: Option<String>,
    api_prefix: Option<String>,
    extra_skip_prefixes: Vec<String>,
}

impl DevtoolsConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = Some(dev);
        self
    }

    pub fn debug_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.debug_prefix = Some(prefix.into());
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    /// Never track paths below `prefix`
    pub fn skip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.extra_skip_prefixes.push(prefix.into());
        self
    }

    pub fn build(self) -> Result<DevtoolsConfig, ConfigError> {
        let mut config = DevtoolsConfig::default();

        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(dev) = self.dev {
            config.dev = dev;
        }

        if let Some(prefix) = self.debug_prefix {
            if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
                return Err(ConfigError::InvalidDebugPrefix(prefix));
            }
            // The mount point moved, so the skip list has to follow it
            config.tracking.skip_prefixes.retain(|p| p != DEBUG_PREFIX);
            config.tracking.skip_prefixes.push(prefix.clone());
            config.debug_prefix = prefix;
        }

        if let Some(prefix) = self.api_prefix {
            if !prefix.starts_with('/') {
                return Err(ConfigError::InvalidApiPrefix(prefix));
            }
            config.tracking.api_prefix = prefix;
        }

        config
            .tracking
            .skip_prefixes
            .extend(self.extra_skip_prefixes);

        Ok(config)
    }
}
