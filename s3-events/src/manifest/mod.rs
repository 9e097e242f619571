//! Deployment manifest and deployment-output collaborator models.
//!
//! The manifest is the function registry: every function lists its declared
//! events, and events of the storage-trigger kind carry the bucket binding.
//! Stack outputs are the gathered result set identity resolution searches.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::SyncError;
use crate::models::DEFAULT_BUCKET_EVENTS;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceManifest {
    pub service: String,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub stage: Option<String>,
    pub region: Option<String>,
    /// When explicitly `false`, the stack publishes no version-qualified
    /// ARNs and identity resolution falls back to a direct lookup.
    pub version_functions: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// Explicit deployed-name override. Defaults to
    /// `{service}-{stage}-{logical name}`.
    pub name: Option<String>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

/// One declared event. Kinds other than the storage trigger are owned by
/// other tooling and ignored here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSpec {
    pub existing_s3: Option<StorageEventSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEventSpec {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default)]
    pub bucket_events: Option<Vec<String>>,
    #[serde(default)]
    pub rules: Option<Vec<BTreeMap<String, String>>>,
    #[serde(default)]
    pub event_rules: Option<Vec<BTreeMap<String, String>>>,
}

impl StorageEventSpec {
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .clone()
            .or_else(|| self.bucket_events.clone())
            .unwrap_or_else(|| {
                DEFAULT_BUCKET_EVENTS.iter().map(|e| e.to_string()).collect()
            })
    }

    /// Declared filter rules flattened to (name, value) pairs, order
    /// preserved.
    pub fn filter_rules(&self) -> Vec<(String, String)> {
        self.rules
            .as_ref()
            .or(self.event_rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .flat_map(|rule| {
                        rule.iter().map(|(k, v)| (k.clone(), v.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ServiceManifest {
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Configuration(format!(
                "cannot read manifest {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SyncError::Configuration(format!(
                "malformed manifest {}: {e}",
                path.display()
            ))
        })
    }

    /// The name a logical function is deployed under.
    pub fn deployed_name(&self, logical_name: &str, stage: &str) -> String {
        match self
            .functions
            .get(logical_name)
            .and_then(|f| f.name.clone())
        {
            Some(name) => name,
            None => format!("{}-{}-{}", self.service, stage, logical_name),
        }
    }

    pub fn versioning_disabled(&self) -> bool {
        self.provider.version_functions == Some(false)
    }
}

/// One deployment-stack output pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackOutput {
    pub output_key: String,
    pub output_value: String,
}
