use super::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use semver::Version;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::plugin::{MemorySurface, ModeId, ProviderBase};

/// Test provider whose behavior is driven by its configuration slice
struct Probe {
    base: ProviderBase,
    cleanups: Arc<AtomicUsize>,
    live: AtomicBool,
}

#[async_trait]
impl DisplayProvider for Probe {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn update(&self) -> Result<()> {
        if self.base.setting::<bool>("fail_update")?.unwrap_or(false) {
            return Err(anyhow!("feed unavailable"));
        }
        self.live.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn display(&self, mode: &str, _force_clear: bool) -> Result<()> {
        self.base.surface().draw_text(0, 0, mode)
    }

    fn validate_config(&self) -> Result<bool> {
        if self.base.setting::<bool>("panic_validate")?.unwrap_or(false) {
            panic!("validator crashed");
        }
        if self.base.setting::<bool>("broken_config")?.unwrap_or(false) {
            return Err(anyhow!("api_key missing"));
        }
        Ok(self.base.setting::<bool>("valid")?.unwrap_or(true))
    }

    async fn cleanup(&self) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn display_duration(&self) -> Duration {
        match self.base.setting::<u64>("fixed_duration_seconds") {
            Ok(Some(secs)) => Duration::from_secs(secs),
            _ => self.base.display_duration(),
        }
    }

    fn has_live_content(&self) -> bool {
        if matches!(self.base.setting::<bool>("panic_poll"), Ok(Some(true))) {
            panic!("state lock poisoned");
        }
        self.live.load(Ordering::SeqCst)
    }

    fn live_modes(&self) -> Vec<ModeId> {
        self.base.display_modes().iter().take(1).cloned().collect()
    }
}

struct ProbeFactory {
    cleanups: Arc<AtomicUsize>,
    constructed: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderFactory for ProbeFactory {
    fn class_name(&self) -> &str {
        "Probe"
    }

    async fn create_provider(&self, context: ProviderContext) -> Result<Box<dyn DisplayProvider>> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Probe {
            base: ProviderBase::new(context),
            cleanups: Arc::clone(&self.cleanups),
            live: AtomicBool::new(false),
        }))
    }
}

struct Fixture {
    registry: PluginRegistry,
    cleanups: Arc<AtomicUsize>,
    constructed: Arc<AtomicUsize>,
}

fn manifest(id: &str, api: &str, modes: &[&str]) -> Manifest {
    let yaml = format!(
        "id: {id}\nentry_point: probe.so\nclass_name: Probe\nrequired_api_version: '{api}'\ndisplay_modes: [{}]\n",
        modes.join(", ")
    );
    Manifest::parse(&yaml, Path::new("manifest.yaml")).unwrap()
}

fn config(yaml: &str) -> ProviderConfig {
    serde_yaml::from_str(yaml).unwrap()
}

async fn fixture(configs: &[(&str, ProviderConfig)]) -> Fixture {
    let collaborators = HostCollaborators::new(
        Arc::new(MemorySurface::new(64, 32)),
        ProviderCache::new(64, Duration::from_secs(60)),
    )
    .with_provider_configs(
        configs
            .iter()
            .map(|(id, config)| (id.to_string(), config.clone()))
            .collect(),
    );

    let gate = CapabilityGate::new(Version::new(1, 3, 0), Version::new(0, 1, 0));
    let registry = PluginRegistry::with_gate(collaborators, gate);

    let cleanups = Arc::new(AtomicUsize::new(0));
    let constructed = Arc::new(AtomicUsize::new(0));
    registry
        .register_factory(Arc::new(ProbeFactory {
            cleanups: Arc::clone(&cleanups),
            constructed: Arc::clone(&constructed),
        }))
        .await;

    Fixture {
        registry,
        cleanups,
        constructed,
    }
}

#[tokio::test]
async fn test_load_registers_generation_zero() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;

    assert_eq!(f.registry.load("clock").await.unwrap(), 0);

    let handle = f.registry.get("clock").await.unwrap();
    assert_eq!(handle.generation, 0);
    assert!(!handle.has_rendered);
    assert_eq!(f.registry.list_enabled().await.len(), 1);
}

#[tokio::test]
async fn test_load_without_manifest() {
    let f = fixture(&[]).await;

    let err = f.registry.load("ghost").await.unwrap_err();
    assert_eq!(err, PluginError::ManifestNotFound("ghost".to_string()));
    assert!(f.registry.get("ghost").await.is_none());
}

#[tokio::test]
async fn test_incompatible_major_version_is_never_instantiated() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("scores", "2.0.0", &["scores"])).await;

    let err = f.registry.load("scores").await.unwrap_err();
    assert!(matches!(err, PluginError::VersionIncompatible { .. }));
    assert!(f.registry.get("scores").await.is_none());
    assert_eq!(f.constructed.load(Ordering::SeqCst), 0);

    let status = f.registry.status().await;
    assert!(matches!(
        status[0].state,
        LifecycleState::Failed(PluginError::VersionIncompatible { .. })
    ));
}

#[tokio::test]
async fn test_manifest_update_clears_failure() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("scores", "2.0.0", &["scores"])).await;
    assert!(f.registry.load("scores").await.is_err());

    f.registry.insert_manifest(manifest("scores", "1.1.0", &["scores"])).await;
    assert_eq!(f.registry.status().await[0].state, LifecycleState::Discovered);
    assert!(f.registry.load("scores").await.is_ok());
}

#[tokio::test]
async fn test_unresolved_class_name() {
    let f = fixture(&[]).await;
    let mut orphan = manifest("orphan", "1.0.0", &["orphan"]);
    orphan.class_name = "Missing".to_string();
    f.registry.insert_manifest(orphan).await;

    let err = f.registry.load("orphan").await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::EntryPointUnresolved { ref class_name, .. } if class_name == "Missing"
    ));
}

#[tokio::test]
async fn test_rejected_config_leaves_no_instance() {
    let f = fixture(&[
        ("weather", config("valid: false")),
        ("stocks", config("broken_config: true")),
    ])
    .await;
    f.registry.insert_manifest(manifest("weather", "1.0.0", &["current"])).await;
    f.registry.insert_manifest(manifest("stocks", "1.0.0", &["ticker"])).await;

    let err = f.registry.load("weather").await.unwrap_err();
    assert!(matches!(err, PluginError::ConfigInvalid { .. }));
    assert!(f.registry.get("weather").await.is_none());

    let err = f.registry.load("stocks").await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::ConfigInvalid { ref reason, .. } if reason.contains("api_key missing")
    ));
    assert!(f.registry.get("stocks").await.is_none());

    // Both rejected instances were cleaned up
    assert_eq!(f.cleanups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_duplicate_load_is_noop() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;

    f.registry.load("clock").await.unwrap();
    f.registry.load("clock").await.unwrap();

    assert_eq!(f.constructed.load(Ordering::SeqCst), 1);
    assert_eq!(f.registry.list_enabled().await.len(), 1);
}

#[tokio::test]
async fn test_unload_is_idempotent() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;
    f.registry.load("clock").await.unwrap();

    assert!(f.registry.unload("clock").await.is_ok());
    assert!(f.registry.unload("clock").await.is_ok());
    assert!(f.registry.unload("never-loaded").await.is_ok());

    assert!(f.registry.get("clock").await.is_none());
    assert_eq!(f.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reload_bumps_generation_and_keeps_position() {
    let f = fixture(&[]).await;
    for id in ["clock", "weather", "stocks"] {
        f.registry.insert_manifest(manifest(id, "1.0.0", &[id])).await;
        f.registry.load(id).await.unwrap();
    }

    assert_eq!(f.registry.reload("weather").await.unwrap(), 1);
    assert_eq!(f.registry.reload("weather").await.unwrap(), 2);
    assert_eq!(f.registry.get("weather").await.unwrap().generation, 2);
    assert_eq!(f.cleanups.load(Ordering::SeqCst), 2);

    let ids: Vec<_> = f
        .registry
        .list_enabled()
        .await
        .into_iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(ids, vec!["clock", "weather", "stocks"]);
}

#[tokio::test]
async fn test_stale_update_results_are_discarded() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;
    f.registry.load("clock").await.unwrap();
    f.registry.reload("clock").await.unwrap();

    assert!(!f.registry.record_update("clock", 0, Ok(())).await);
    assert!(f.registry.record_update("clock", 1, Ok(())).await);

    let failure = PluginError::ProviderRuntime {
        id: "clock".to_string(),
        operation: Operation::Update,
        message: "feed unavailable".to_string(),
    };
    assert!(f.registry.record_update("clock", 1, Err(failure.clone())).await);

    let status = f.registry.status().await;
    assert_eq!(status[0].last_error, Some(failure));
    assert_eq!(status[0].consecutive_failures, 1);
    assert!(status[0].last_update.is_some());
}

#[tokio::test]
async fn test_set_enabled_and_reorder() {
    let f = fixture(&[]).await;
    for id in ["clock", "weather", "stocks"] {
        f.registry.insert_manifest(manifest(id, "1.0.0", &[id])).await;
        f.registry.load(id).await.unwrap();
    }

    f.registry.set_enabled("weather", false).await.unwrap();
    assert!(f.registry.set_enabled("ghost", false).await.is_err());

    f.registry
        .reorder(&["stocks".to_string(), "ghost".to_string()])
        .await;

    let ids: Vec<_> = f
        .registry
        .rotation_snapshot()
        .await
        .into_iter()
        .map(|v| v.provider_id)
        .collect();
    assert_eq!(ids, vec!["stocks", "clock"]);
}

#[tokio::test]
async fn test_load_all_skips_disabled_and_collects_failures() {
    let f = fixture(&[("weather", config("enabled: false"))]).await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;
    f.registry.insert_manifest(manifest("weather", "1.0.0", &["current"])).await;
    f.registry.insert_manifest(manifest("scores", "3.0.0", &["scores"])).await;

    let summary = f.registry.load_all().await;
    assert_eq!(summary.loaded, vec!["clock"]);
    assert_eq!(summary.disabled, vec!["weather"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "scores");
}

#[tokio::test]
async fn test_rotation_snapshot_reports_live_modes() {
    let f = fixture(&[
        ("nhl", config("live_priority: true\nmode_durations:\n  nhl_recent: 7")),
        ("clock", config("display_duration: 12")),
    ])
    .await;
    f.registry.insert_manifest(manifest("clock", "1.0.0", &["clock"])).await;
    f.registry
        .insert_manifest(manifest("nhl", "1.0.0", &["nhl_live", "nhl_recent"]))
        .await;
    f.registry.load_all().await;

    let views = f.registry.rotation_snapshot().await;
    assert_eq!(views[0].modes[0].duration, Duration::from_secs(12));
    assert!(views[1].live_priority);
    assert!(views[1].live_modes.is_empty());
    assert_eq!(views[1].modes[1].duration, Duration::from_secs(7));

    // Probe reports live content once updated
    let nhl = f.registry.get("nhl").await.unwrap();
    nhl.provider.update().await.unwrap();

    let views = f.registry.rotation_snapshot().await;
    assert_eq!(views[1].live_modes, vec!["nhl_live"]);
}

#[tokio::test]
async fn test_discover_scans_directories() {
    let temp_dir = TempDir::new().unwrap();
    let plugin_dir = temp_dir.path().join("weather");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("manifest.json"),
        r#"{"id": "weather", "entryPoint": "weather.so", "className": "Probe", "displayModes": ["current"]}"#,
    )
    .unwrap();
    std::fs::write(temp_dir.path().join("plugin.yaml"), "name: nameless\n").unwrap();

    let f = fixture(&[]).await;
    f.registry.add_plugin_directory(temp_dir.path().to_path_buf()).await;

    let report = f.registry.discover().await;
    assert_eq!(report.manifests.len(), 1);
    assert_eq!(report.rejected.len(), 1);

    let manifests = f.registry.manifests().await;
    assert_eq!(manifests[0].id, "weather");
    assert!(f.registry.load("weather").await.is_ok());
}

#[tokio::test]
async fn test_teardown_cleans_every_instance() {
    let f = fixture(&[]).await;
    for id in ["clock", "weather"] {
        f.registry.insert_manifest(manifest(id, "1.0.0", &[id])).await;
        f.registry.load(id).await.unwrap();
    }

    f.registry.teardown().await;
    assert_eq!(f.cleanups.load(Ordering::SeqCst), 2);
    assert!(f.registry.list_enabled().await.is_empty());
}

#[tokio::test]
async fn test_builtin_loader() {
    let f = fixture(&[]).await;
    BuiltinProviderLoader::install(&f.registry).await.unwrap();

    let ids: Vec<_> = f
        .registry
        .manifests()
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["clock", "alert"]);
}

#[tokio::test]
async fn test_rediscovery_keeps_manifest_of_loaded_provider() {
    let f = fixture(&[]).await;
    f.registry.insert_manifest(manifest("nhl", "1.0.0", &["a", "b"])).await;
    f.registry.load("nhl").await.unwrap();

    f.registry.insert_manifest(manifest("nhl", "1.0.0", &["zzz"])).await;
    let modes: Vec<_> = f
        .registry
        .manifests()
        .await
        .into_iter()
        .map(|m| m.display_modes)
        .collect();
    assert_eq!(modes, vec![vec!["a", "b"]]);

    // Once unloaded the new manifest is accepted
    f.registry.unload("nhl").await.unwrap();
    f.registry.insert_manifest(manifest("nhl", "1.0.0", &["zzz"])).await;
    assert_eq!(f.registry.manifests().await[0].display_modes, vec!["zzz"]);
}

#[tokio::test]
async fn test_overridden_display_duration_sets_slot_length() {
    let f = fixture(&[("marquee", config("fixed_duration_seconds: 3"))]).await;
    f.registry.insert_manifest(manifest("marquee", "1.0.0", &["scroll"])).await;
    f.registry.load("marquee").await.unwrap();

    let views = f.registry.rotation_snapshot().await;
    assert_eq!(views[0].modes[0].duration, Duration::from_secs(3));
}

#[tokio::test]
async fn test_panicking_live_poll_is_contained() {
    let f = fixture(&[("alert", config("live_priority: true\npanic_poll: true"))]).await;
    f.registry.insert_manifest(manifest("alert", "1.0.0", &["alert"])).await;
    f.registry.load("alert").await.unwrap();

    let views = f.registry.rotation_snapshot().await;
    assert_eq!(views.len(), 1);
    assert!(views[0].live_priority);
    assert!(views[0].live_modes.is_empty());

    let status = f.registry.status().await;
    assert!(matches!(
        status[0].last_error,
        Some(PluginError::ProviderRuntime { operation: Operation::Poll, ref message, .. })
            if message.contains("state lock poisoned")
    ));
}

#[tokio::test]
async fn test_panicking_validation_is_config_invalid() {
    let f = fixture(&[("scores", config("panic_validate: true"))]).await;
    f.registry.insert_manifest(manifest("scores", "1.0.0", &["scores"])).await;

    let err = f.registry.load("scores").await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::ConfigInvalid { ref reason, .. } if reason.contains("validator crashed")
    ));
    assert!(f.registry.get("scores").await.is_none());
    assert_eq!(f.cleanups.load(Ordering::SeqCst), 1);
}
