//! Unit credential registry
//!
//! Credentials are loaded once at startup from a JSON file and never change
//! afterwards. The registry is shared read-only through `Arc`.
//!
//! File format:
//!
//! ```json
//! [
//!   { "unitId": "downtown", "tenantKey": "tenant-a", "secretToken": "..." }
//! ]
//! ```

use super::error::CredentialError;
use crate::config::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// API credentials for one unit
#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCredential {
    pub unit_id: String,
    pub tenant_key: String,
    pub secret_token: String,
}

// Keep the secret out of logs
impl std::fmt::Debug for UnitCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCredential")
            .field("unit_id", &self.unit_id)
            .field("tenant_key", &self.tenant_key)
            .field("secret_token", &"***")
            .finish()
    }
}

/// Immutable unit id → credential mapping
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    credentials: BTreeMap<String, UnitCredential>,
}

impl CredentialRegistry {
    /// Build a registry from in-memory entries
    ///
    /// Rejects duplicate unit ids and blank fields.
    pub fn from_entries(entries: Vec<UnitCredential>) -> Result<Self, ConfigError> {
        let mut credentials = BTreeMap::new();

        for entry in entries {
            if entry.unit_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "credential entry with empty unitId".to_string(),
                ));
            }
            if entry.tenant_key.is_empty() || entry.secret_token.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "credential for unit {} has an empty tenantKey or secretToken",
                    entry.unit_id
                )));
            }
            if credentials.contains_key(&entry.unit_id) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate credential for unit {}",
                    entry.unit_id
                )));
            }
            credentials.insert(entry.unit_id.clone(), entry);
        }

        Ok(Self { credentials })
    }

    /// Load the registry from a JSON credentials file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let entries: Vec<UnitCredential> = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        let registry = Self::from_entries(entries)?;
        log::info!("🔑 Loaded credentials for {} units from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Look up the credential for a unit
    pub fn credentials_for(&self, unit_id: &str) -> Result<&UnitCredential, CredentialError> {
        self.credentials
            .get(unit_id)
            .ok_or_else(|| CredentialError::Missing(unit_id.to_string()))
    }

    /// Registered unit ids, sorted
    pub fn unit_ids(&self) -> Vec<String> {
        self.credentials.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
