//! Registry configuration.
//!
//! Read from the `[registry]` table of a TOML file:
//!
//! ```toml
//! [registry]
//! use_api = false
//! empty_string_is_empty = true
//! local_ids = "uuid"
//! lang = "de"
//! default_lang = "en"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ModelResult;

/// How local-only inserts mint a primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalIds {
    /// Largest integer key of the collection plus one.
    #[default]
    Sequential,
    /// A time-ordered UUID string.
    Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Remote sync mode for entities that do not override it.
    pub use_api: bool,
    /// Whether `""` counts as empty for required checks.
    pub empty_string_is_empty: bool,
    pub local_ids: LocalIds,
    /// Fixed message language; `None` renders in `default_lang`.
    pub lang: Option<String>,
    pub default_lang: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            use_api: true,
            empty_string_is_empty: true,
            local_ids: LocalIds::Sequential,
            lang: None,
            default_lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    registry: RegistryConfig,
}

impl RegistryConfig {
    /// Parses a config document, failing on malformed TOML.
    pub fn from_toml_str(contents: &str) -> ModelResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.registry)
    }

    /// Loads config from `path`, falling back to defaults when the file is
    /// missing, unreadable or malformed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No registry config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded registry config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse registry config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read registry config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
