#![forbid(unsafe_code)]

//! Application configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [scheduler]
//! auto_checkpoint = true
//! listener_thread_prefix = "wade-listener"
//!
//! [cache]
//! snapshot_script_type = "text/wadehttp"
//!
//! [logging]
//! filter = "info"
//! json = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wade_runtime::SchedulerConfig;

use crate::error::ConfigError;
use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WadeConfig {
    pub scheduler: SchedulerConfig,
    pub cache: wade_http::CacheConfig,
    pub logging: LoggingConfig,
}

impl WadeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}
