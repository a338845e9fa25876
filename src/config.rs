//! Service-level configuration.

use crate::auth::AuthConfig;
use crate::error::{Result, StoreError};
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to assemble a store with its gateway.
///
/// Loaded from JSON; every field is optional and falls back to its default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

impl ServiceConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
