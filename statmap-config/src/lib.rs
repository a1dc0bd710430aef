//! # statmap Configuration System
//!
//! Layered configuration for the counting subsystem and its collaborators.
//!
//! ## Hierarchy
//! 1. Built-in defaults
//! 2. `config/statmap.yaml`
//! 3. `config/<STATMAP_ENV>.yaml` (`production` when unset)
//! 4. `STATMAP_*` environment variables, `__` separating sections
//!    (e.g. `STATMAP_READER__INTERVAL_MS=500`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

mod error;
mod programs;
mod reader;
mod tables;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use programs::{
    ClassifierConfig, KprobeConfig, ProgramsConfig, TracepointConfig, UretprobeConfig,
};
pub use reader::{ReaderConfig, WorkloadConfig};
pub use tables::TablesConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/statmap.yaml";
const ENV_PREFIX: &str = "STATMAP_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct StatmapConfig {
    #[validate(nested)]
    #[serde(default)]
    pub tables: TablesConfig,

    #[validate(nested)]
    #[serde(default)]
    pub programs: ProgramsConfig,

    #[validate(nested)]
    #[serde(default)]
    pub reader: ReaderConfig,

    #[validate(nested)]
    #[serde(default)]
    pub workload: WorkloadConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl StatmapConfig {
    /// Loads the full hierarchy relative to the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(StatmapConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        } else {
            debug!("{} not found, using default configuration", BASE_FILE);
        }

        let env = std::env::var("STATMAP_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            info!(file = %env_file, "Applying environment overrides");
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Loads defaults, then `path`, then environment variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(StatmapConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    /// [`load_from_path`](Self::load_from_path) when a path is given,
    /// [`load`](Self::load) otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
