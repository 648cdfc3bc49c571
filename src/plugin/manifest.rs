//! Manifest store: discovers and validates provider manifests

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{LifecycleResult, ModeId, PluginError, ProviderId};

/// File names recognised as provider manifests
pub const MANIFEST_FILE_NAMES: &[&str] = &[
    "manifest.json",
    "manifest.yaml",
    "manifest.yml",
    "plugin.yaml",
    "plugin.yml",
];

/// API version assumed when a manifest does not declare one
pub const DEFAULT_REQUIRED_API_VERSION: &str = "1.0.0";

/// Update interval assumed when a manifest does not declare one
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;

/// Display duration assumed when a manifest does not declare one
pub const DEFAULT_DURATION_SECS: u64 = 15;

/// Validated, immutable provider manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Unique provider identifier
    pub id: ProviderId,

    /// Human readable name (defaults to the id)
    pub name: String,

    /// Provider release version, informational
    pub version: Option<String>,

    pub description: Option<String>,

    pub author: Option<String>,

    /// Where the implementation lives
    pub entry_point: String,

    /// Implementation class, resolved against the registered factories
    pub class_name: String,

    /// Provider API version the implementation was written against
    pub required_api_version: Version,

    /// Declared modes, in declaration order, without duplicates
    pub display_modes: Vec<ModeId>,

    pub update_interval: Duration,

    pub default_duration: Duration,

    /// Host versions this provider accepts
    pub compatible_host_versions: VersionReq,

    /// File the manifest was read from
    pub source_path: PathBuf,
}

/// Manifest as written on disk, before validation
///
/// Both snake_case and camelCase field names are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawManifest {
    pub id: Option<String>,

    pub name: Option<String>,

    pub version: Option<String>,

    pub description: Option<String>,

    pub author: Option<String>,

    #[serde(alias = "entryPoint")]
    pub entry_point: Option<String>,

    #[serde(alias = "className", alias = "class")]
    pub class_name: Option<String>,

    #[serde(alias = "requiredApiVersion")]
    pub required_api_version: Option<String>,

    #[serde(default, alias = "displayModes")]
    pub display_modes: Vec<String>,

    #[serde(alias = "updateIntervalSeconds", alias = "update_interval")]
    pub update_interval_seconds: Option<u64>,

    #[serde(alias = "defaultDurationSeconds", alias = "default_duration")]
    pub default_duration_seconds: Option<u64>,

    #[serde(alias = "compatibleHostVersions", alias = "compatible_versions")]
    pub compatible_host_versions: Option<String>,
}

fn required(value: Option<String>, field: &str, path: &Path) -> LifecycleResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PluginError::invalid_manifest(
            path,
            format!("missing required field '{field}'"),
        )),
    }
}

impl Manifest {
    /// Validate a raw manifest read from `path`
    pub fn from_raw(raw: RawManifest, path: &Path) -> LifecycleResult<Self> {
        let id = required(raw.id, "id", path)?;
        let entry_point = required(raw.entry_point, "entry_point", path)?;
        let class_name = required(raw.class_name, "class_name", path)?;

        let api = raw
            .required_api_version
            .unwrap_or_else(|| DEFAULT_REQUIRED_API_VERSION.to_string());
        let required_api_version = Version::parse(api.trim()).map_err(|e| {
            PluginError::invalid_manifest(path, format!("bad required_api_version '{api}': {e}"))
        })?;

        let range = raw
            .compatible_host_versions
            .unwrap_or_else(|| "*".to_string());
        let compatible_host_versions = VersionReq::parse(range.trim()).map_err(|e| {
            PluginError::invalid_manifest(path, format!("bad compatible_host_versions '{range}': {e}"))
        })?;

        let default_duration = raw.default_duration_seconds.unwrap_or(DEFAULT_DURATION_SECS);
        if default_duration == 0 {
            return Err(PluginError::invalid_manifest(
                path,
                "default_duration_seconds must be greater than zero",
            ));
        }

        let mut display_modes: Vec<ModeId> = Vec::new();
        for mode in raw.display_modes {
            let mode = mode.trim().to_string();
            if mode.is_empty() {
                return Err(PluginError::invalid_manifest(path, "empty display mode name"));
            }
            if display_modes.contains(&mode) {
                debug!("Dropping duplicate display mode '{}' in {:?}", mode, path);
                continue;
            }
            display_modes.push(mode);
        }
        if display_modes.is_empty() {
            display_modes.push(id.clone());
        }

        Ok(Self {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
            version: raw.version,
            description: raw.description,
            author: raw.author,
            entry_point,
            class_name,
            required_api_version,
            display_modes,
            update_interval: Duration::from_secs(
                raw.update_interval_seconds
                    .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
            ),
            default_duration: Duration::from_secs(default_duration),
            compatible_host_versions,
            source_path: path.to_path_buf(),
        })
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str, path: &Path) -> LifecycleResult<Self> {
        // YAML is a superset of JSON, so one parser covers both formats
        let raw: RawManifest = serde_yaml::from_str(content)
            .map_err(|e| PluginError::invalid_manifest(path, e.to_string()))?;
        Self::from_raw(raw, path)
    }
}

/// Outcome of scanning one or more directories
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Valid manifests in discovery order, first occurrence of each id
    pub manifests: Vec<Manifest>,

    /// Entries that were skipped
    pub rejected: Vec<PluginError>,
}

impl DiscoveryReport {
    pub fn merge(&mut self, other: DiscoveryReport) {
        for manifest in other.manifests {
            self.push(manifest);
        }
        self.rejected.extend(other.rejected);
    }

    fn push(&mut self, manifest: Manifest) {
        if let Some(existing) = self.manifests.iter().find(|m| m.id == manifest.id) {
            warn!(
                "Duplicate provider id '{}' in {:?}, keeping {:?}",
                manifest.id, manifest.source_path, existing.source_path
            );
            return;
        }
        self.manifests.push(manifest);
    }
}

/// Reads provider manifests from disk
pub struct ManifestStore;

impl ManifestStore {
    /// Whether `path` names a manifest file
    pub fn is_manifest_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| MANIFEST_FILE_NAMES.contains(&name))
            .unwrap_or(false)
    }

    /// Load and validate a single manifest file
    pub async fn load_manifest(path: &Path) -> LifecycleResult<Manifest> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::invalid_manifest(path, e.to_string()))?;
        Manifest::parse(&content, path)
    }

    /// Scan a directory recursively for manifests
    ///
    /// Malformed entries are logged and reported but never abort the scan.
    pub async fn discover(directory: &Path) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        if !directory.exists() {
            debug!("Manifest directory does not exist: {:?}", directory);
            return report;
        }

        info!("Scanning manifest directory: {:?}", directory);

        for entry in WalkDir::new(directory)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::is_manifest_file(path) {
                continue;
            }

            match Self::load_manifest(path).await {
                Ok(manifest) => {
                    info!("Found provider manifest '{}' at {:?}", manifest.id, path);
                    report.push(manifest);
                }
                Err(e) => {
                    warn!("Skipping manifest {:?}: {}", path, e);
                    report.rejected.push(e);
                }
            }
        }

        report
    }
}
