//! Capability gate: version checks performed before a provider is admitted

use semver::Version;

use super::{LifecycleResult, Manifest, PluginError};

/// Provider API version implemented by this host
pub const HOST_API_VERSION: Version = Version::new(1, 0, 0);

/// Whether code written against `required` runs on an API at `current`
///
/// Minor and patch differences are tolerated in both directions within one
/// major line.
pub fn is_compatible(required: &Version, current: &Version) -> bool {
    required.major == current.major
}

/// Version of the running host
pub fn host_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(Version::new(0, 1, 0))
}

/// Admission checks against the running host
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    api_version: Version,
    host_version: Version,
}

impl CapabilityGate {
    pub fn new(api_version: Version, host_version: Version) -> Self {
        Self {
            api_version,
            host_version,
        }
    }

    pub fn api_version(&self) -> &Version {
        &self.api_version
    }

    pub fn host_version(&self) -> &Version {
        &self.host_version
    }

    /// Check a manifest against the API version and the host version range
    pub fn check(&self, manifest: &Manifest) -> LifecycleResult<()> {
        if !is_compatible(&manifest.required_api_version, &self.api_version) {
            return Err(PluginError::VersionIncompatible {
                id: manifest.id.clone(),
                required: format!("API {}", manifest.required_api_version),
                current: format!("API {}", self.api_version),
            });
        }

        if !manifest.compatible_host_versions.matches(&self.host_version) {
            return Err(PluginError::VersionIncompatible {
                id: manifest.id.clone(),
                required: format!("host {}", manifest.compatible_host_versions),
                current: format!("host {}", self.host_version),
            });
        }

        Ok(())
    }
}

impl Default for CapabilityGate {
    fn default() -> Self {
        Self::new(HOST_API_VERSION, host_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manifest(api: &str, hosts: &str) -> Manifest {
        let yaml = format!(
            "id: scores\nentry_point: scores.so\nclass_name: Scores\nrequired_api_version: '{api}'\ncompatible_host_versions: '{hosts}'\n"
        );
        Manifest::parse(&yaml, Path::new("manifest.yaml")).unwrap()
    }

    #[test]
    fn test_major_line_policy() {
        let current = Version::new(1, 4, 2);
        assert!(is_compatible(&Version::new(1, 0, 0), &current));
        assert!(is_compatible(&Version::new(1, 9, 7), &current));
        assert!(!is_compatible(&Version::new(2, 0, 0), &current));
        assert!(!is_compatible(&Version::new(0, 4, 2), &current));
    }

    #[test]
    fn test_gate_checks_api_then_host_range() {
        let gate = CapabilityGate::new(Version::new(1, 2, 0), Version::new(0, 3, 0));

        assert!(gate.check(&manifest("1.5.0", "*")).is_ok());
        assert!(gate.check(&manifest("1.0.0", ">=0.2.0, <0.4.0")).is_ok());

        match gate.check(&manifest("2.0.0", "*")).unwrap_err() {
            PluginError::VersionIncompatible { id, required, current } => {
                assert_eq!(id, "scores");
                assert_eq!(required, "API 2.0.0");
                assert_eq!(current, "API 1.2.0");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            gate.check(&manifest("1.0.0", ">=0.4.0")),
            Err(PluginError::VersionIncompatible { .. })
        ));
    }
}
