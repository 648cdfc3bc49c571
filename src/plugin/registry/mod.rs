//! Provider registry: the lifecycle manager
//!
//! Holds discovered manifests and the live provider instances. Every mutation
//! of the instance table (load, unload, reload, teardown) happens under one
//! async write lock, so readers never observe a half-finished reload.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::clock::ClockProviderFactory;
use super::alert::AlertProviderFactory;
use super::{
    contained, guarded, CapabilityGate, DiscoveryReport, DisplayProvider, DisplaySurface, LifecycleResult,
    Manifest, ManifestStore, Operation, PluginError, ProviderCache, ProviderConfig,
    ProviderContext, ProviderFactory, ProviderId,
};
use crate::scheduler::{ModeEntry, ProviderView};

#[cfg(test)]
mod tests;

/// Services the host hands to every provider it constructs
#[derive(Clone)]
pub struct HostCollaborators {
    /// Rendering surface shared by all providers
    pub surface: Arc<dyn DisplaySurface>,

    /// Root cache; each provider receives a scoped view
    pub cache: ProviderCache,

    /// Configuration slices keyed by provider id
    pub provider_configs: HashMap<ProviderId, ProviderConfig>,

    /// Budget for construction and cleanup calls
    pub lifecycle_timeout: Duration,
}

impl HostCollaborators {
    pub fn new(surface: Arc<dyn DisplaySurface>, cache: ProviderCache) -> Self {
        Self {
            surface,
            cache,
            provider_configs: HashMap::new(),
            lifecycle_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_provider_configs(mut self, configs: HashMap<ProviderId, ProviderConfig>) -> Self {
        self.provider_configs = configs;
        self
    }

    pub fn with_lifecycle_timeout(mut self, timeout: Duration) -> Self {
        self.lifecycle_timeout = timeout;
        self
    }

    /// Configuration slice for `id`; providers without a section get the default
    pub fn config_for(&self, id: &str) -> ProviderConfig {
        self.provider_configs.get(id).cloned().unwrap_or_default()
    }
}

/// A loaded provider
pub struct ProviderInstance {
    pub manifest: Manifest,

    pub provider: Arc<dyn DisplayProvider>,

    /// 0 on first load, incremented by every reload
    pub generation: u64,

    pub loaded_at: DateTime<Utc>,

    /// Completion time of the last successful update
    pub last_update: Option<DateTime<Utc>>,

    /// Most recent contained failure
    pub last_error: Option<PluginError>,

    pub consecutive_failures: u32,

    /// Whether `display` ever succeeded for this instance
    pub has_rendered: bool,
}

/// Snapshot of a loaded provider, safe to hold without the registry lock
#[derive(Clone)]
pub struct ProviderHandle {
    pub id: ProviderId,
    pub generation: u64,
    pub provider: Arc<dyn DisplayProvider>,
    pub update_interval: Duration,
    pub has_rendered: bool,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("update_interval", &self.update_interval)
            .field("has_rendered", &self.has_rendered)
            .finish()
    }
}

/// Lifecycle state of a provider id
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    /// Manifest known, no instance
    Discovered,

    /// Instance registered
    Loaded { generation: u64 },

    /// Last load attempt failed
    Failed(PluginError),
}

/// Per-id lifecycle report
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub id: ProviderId,
    pub name: String,
    pub state: LifecycleState,
    pub enabled: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: Option<PluginError>,
    pub consecutive_failures: u32,
}

/// Outcome of [`PluginRegistry::load_all`]
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub loaded: Vec<ProviderId>,
    pub disabled: Vec<ProviderId>,
    pub failed: Vec<(ProviderId, PluginError)>,
}

#[derive(Default)]
struct RegistryState {
    manifests: HashMap<ProviderId, Manifest>,

    /// Ids in the order their manifests were first seen
    discovery_order: Vec<ProviderId>,

    instances: HashMap<ProviderId, ProviderInstance>,

    /// Registration order of loaded ids, used for slot ordering
    order: Vec<ProviderId>,

    /// Last load failure per id
    failures: HashMap<ProviderId, PluginError>,

    /// Runtime enable/disable, overriding configuration
    enabled_overrides: HashMap<ProviderId, bool>,
}

/// Provider registry
pub struct PluginRegistry {
    state: RwLock<RegistryState>,

    /// Class name to factory
    factories: RwLock<HashMap<String, Arc<dyn ProviderFactory>>>,

    plugin_dirs: RwLock<Vec<PathBuf>>,

    collaborators: HostCollaborators,

    gate: CapabilityGate,
}

impl PluginRegistry {
    pub fn new(collaborators: HostCollaborators) -> Self {
        Self::with_gate(collaborators, CapabilityGate::default())
    }

    pub fn with_gate(collaborators: HostCollaborators, gate: CapabilityGate) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            factories: RwLock::new(HashMap::new()),
            plugin_dirs: RwLock::new(Vec::new()),
            collaborators,
            gate,
        }
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    /// Register an implementation class
    pub async fn register_factory(&self, factory: Arc<dyn ProviderFactory>) {
        let class_name = factory.class_name().to_string();
        debug!("Registering provider factory: {}", class_name);
        self.factories.write().await.insert(class_name, factory);
    }

    /// Add a directory scanned by [`Self::discover`]
    pub async fn add_plugin_directory(&self, dir: PathBuf) {
        self.plugin_dirs.write().await.push(dir);
    }

    /// Rescan every configured directory
    ///
    /// Bad manifests are reported, never fatal.
    pub async fn discover(&self) -> DiscoveryReport {
        let dirs = self.plugin_dirs.read().await.clone();

        let mut report = DiscoveryReport::default();
        for dir in &dirs {
            report.merge(ManifestStore::discover(dir).await);
        }

        let mut state = self.state.write().await;
        for manifest in &report.manifests {
            Self::insert_manifest_locked(&mut state, manifest.clone());
        }

        info!(
            "Discovery completed: {} manifests, {} rejected",
            report.manifests.len(),
            report.rejected.len()
        );
        report
    }

    /// Make a manifest known without scanning, e.g. for compiled-in providers
    pub async fn insert_manifest(&self, manifest: Manifest) {
        let mut state = self.state.write().await;
        Self::insert_manifest_locked(&mut state, manifest);
    }

    fn insert_manifest_locked(state: &mut RegistryState, manifest: Manifest) {
        let id = manifest.id.clone();

        match state.manifests.get(&id) {
            Some(existing) if *existing == manifest => return,
            Some(_) if state.instances.contains_key(&id) => {
                warn!(
                    "Manifest for provider {} changed while loaded, keeping the running one; unload and rediscover to apply",
                    id
                );
                return;
            }
            Some(_) => {
                info!("Manifest for provider {} changed", id);
                state.failures.remove(&id);
            }
            None => state.discovery_order.push(id.clone()),
        }

        state.manifests.insert(id, manifest);
    }

    /// Load a provider; a second load of a loaded id is a no-op
    ///
    /// Returns the generation of the registered instance.
    pub async fn load(&self, id: &str) -> LifecycleResult<u64> {
        let mut state = self.state.write().await;

        if let Some(instance) = state.instances.get(id) {
            debug!("Provider {} already loaded", id);
            return Ok(instance.generation);
        }

        let result = self.instantiate(&state, id, 0).await;
        Self::admit(&mut state, id, result)
    }

    /// Unload a provider; unloading an unknown or unloaded id succeeds
    pub async fn unload(&self, id: &str) -> LifecycleResult<()> {
        let mut state = self.state.write().await;

        let Some(instance) = state.instances.remove(id) else {
            debug!("Provider {} not loaded, nothing to unload", id);
            return Ok(());
        };
        state.order.retain(|loaded| loaded != id);

        self.cleanup(instance).await;
        info!("Unloaded provider {}", id);
        Ok(())
    }

    /// Replace a provider's instance with a fresh one
    ///
    /// The new generation is one past the old one. The registration position
    /// is kept. Reloading an unloaded id behaves like [`Self::load`].
    pub async fn reload(&self, id: &str) -> LifecycleResult<u64> {
        let mut state = self.state.write().await;

        let generation = match state.instances.remove(id) {
            Some(old) => {
                let next = old.generation + 1;
                self.cleanup(old).await;
                next
            }
            None => 0,
        };

        let result = self.instantiate(&state, id, generation).await;
        if result.is_err() {
            state.order.retain(|loaded| loaded != id);
        }
        Self::admit(&mut state, id, result)
    }

    async fn instantiate(
        &self,
        state: &RegistryState,
        id: &str,
        generation: u64,
    ) -> LifecycleResult<ProviderInstance> {
        let manifest = state
            .manifests
            .get(id)
            .cloned()
            .ok_or_else(|| PluginError::ManifestNotFound(id.to_string()))?;

        self.gate.check(&manifest)?;

        let factory = self
            .factories
            .read()
            .await
            .get(&manifest.class_name)
            .cloned()
            .ok_or_else(|| PluginError::EntryPointUnresolved {
                id: id.to_string(),
                entry_point: manifest.entry_point.clone(),
                class_name: manifest.class_name.clone(),
            })?;

        let context = ProviderContext {
            provider_id: manifest.id.clone(),
            display_modes: manifest.display_modes.clone(),
            default_duration: manifest.default_duration,
            config: self.collaborators.config_for(id),
            surface: Arc::clone(&self.collaborators.surface),
            cache: self.collaborators.cache.scoped(id),
        };

        let provider: Arc<dyn DisplayProvider> = guarded(
            id,
            Operation::Construct,
            self.collaborators.lifecycle_timeout,
            factory.create_provider(context),
        )
        .await?
        .into();

        let verdict = match contained(id, Operation::Validate, || provider.validate_config()) {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err("configuration check returned false".to_string()),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = verdict {
            // The rejected instance never becomes visible, but it may hold resources
            if let Err(e) = guarded(
                id,
                Operation::Cleanup,
                self.collaborators.lifecycle_timeout,
                provider.cleanup(),
            )
            .await
            {
                warn!("Cleanup of rejected provider {} failed: {}", id, e);
            }
            return Err(PluginError::ConfigInvalid {
                id: id.to_string(),
                reason,
            });
        }

        Ok(ProviderInstance {
            manifest,
            provider,
            generation,
            loaded_at: Utc::now(),
            last_update: None,
            last_error: None,
            consecutive_failures: 0,
            has_rendered: false,
        })
    }

    fn admit(
        state: &mut RegistryState,
        id: &str,
        result: LifecycleResult<ProviderInstance>,
    ) -> LifecycleResult<u64> {
        match result {
            Ok(instance) => {
                let generation = instance.generation;
                info!("Loaded provider {} (generation {})", id, generation);

                state.failures.remove(id);
                state.instances.insert(id.to_string(), instance);
                if !state.order.iter().any(|loaded| loaded == id) {
                    state.order.push(id.to_string());
                }
                Ok(generation)
            }
            Err(e) => {
                error!("Failed to load provider {}: {}", id, e);
                state.failures.insert(id.to_string(), e.clone());
                Err(e)
            }
        }
    }

    async fn cleanup(&self, instance: ProviderInstance) {
        let id = instance.manifest.id.clone();
        if let Err(e) = guarded(
            &id,
            Operation::Cleanup,
            self.collaborators.lifecycle_timeout,
            instance.provider.cleanup(),
        )
        .await
        {
            warn!("Cleanup of provider {} failed: {}", id, e);
        }
    }

    /// Load every discovered provider enabled by configuration
    ///
    /// Failures are collected per id, never abort the pass.
    pub async fn load_all(&self) -> LoadSummary {
        let ids = self.state.read().await.discovery_order.clone();
        let mut summary = LoadSummary::default();

        for id in ids {
            if !self.collaborators.config_for(&id).enabled {
                debug!("Provider {} disabled by configuration, not loading", id);
                summary.disabled.push(id);
                continue;
            }

            match self.load(&id).await {
                Ok(_) => summary.loaded.push(id),
                Err(e) => summary.failed.push((id, e)),
            }
        }

        info!(
            "Loaded {} providers ({} disabled, {} failed)",
            summary.loaded.len(),
            summary.disabled.len(),
            summary.failed.len()
        );
        summary
    }

    /// Clean up every loaded instance; used at host shutdown
    pub async fn teardown(&self) {
        let mut state = self.state.write().await;

        let order = std::mem::take(&mut state.order);
        for id in order.iter().rev() {
            if let Some(instance) = state.instances.remove(id) {
                self.cleanup(instance).await;
            }
        }

        info!("Registry torn down");
    }

    pub async fn get(&self, id: &str) -> Option<ProviderHandle> {
        let state = self.state.read().await;
        state.instances.get(id).map(|instance| Self::handle(id, instance))
    }

    /// Loaded, enabled providers in registration order
    pub async fn list_enabled(&self) -> Vec<ProviderHandle> {
        let state = self.state.read().await;

        state
            .order
            .iter()
            .filter(|id| self.is_enabled(&state, id))
            .filter_map(|id| state.instances.get(id).map(|instance| Self::handle(id, instance)))
            .collect()
    }

    fn handle(id: &str, instance: &ProviderInstance) -> ProviderHandle {
        ProviderHandle {
            id: id.to_string(),
            generation: instance.generation,
            provider: Arc::clone(&instance.provider),
            update_interval: instance.manifest.update_interval,
            has_rendered: instance.has_rendered,
        }
    }

    fn is_enabled(&self, state: &RegistryState, id: &str) -> bool {
        state
            .enabled_overrides
            .get(id)
            .copied()
            .unwrap_or_else(|| self.collaborators.config_for(id).enabled)
    }

    /// Enable or disable a provider at runtime
    ///
    /// A disabled provider stays loaded but takes no part in rotation or
    /// updates.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> LifecycleResult<()> {
        let mut state = self.state.write().await;

        if !state.manifests.contains_key(id) {
            return Err(PluginError::ManifestNotFound(id.to_string()));
        }

        info!(
            "Provider {} {}",
            id,
            if enabled { "enabled" } else { "disabled" }
        );
        state.enabled_overrides.insert(id.to_string(), enabled);
        Ok(())
    }

    /// Move the listed ids to the front of the registration order
    ///
    /// Unlisted ids keep their relative order behind them; unknown ids are
    /// ignored.
    pub async fn reorder(&self, ids: &[ProviderId]) {
        let mut state = self.state.write().await;

        let mut order: Vec<ProviderId> = Vec::with_capacity(state.order.len());
        for id in ids {
            if state.order.contains(id) && !order.contains(id) {
                order.push(id.clone());
            } else if !state.order.contains(id) {
                warn!("Ignoring unknown provider {} in reorder", id);
            }
        }
        for id in &state.order {
            if !order.contains(id) {
                order.push(id.clone());
            }
        }

        debug!("Registration order: {:?}", order);
        state.order = order;
    }

    /// Record the outcome of an update
    ///
    /// Returns false when the result belongs to a generation that is no
    /// longer registered.
    pub async fn record_update(&self, id: &str, generation: u64, outcome: LifecycleResult<()>) -> bool {
        let mut state = self.state.write().await;

        let Some(instance) = state.instances.get_mut(id) else {
            debug!("Discarding update result for unloaded provider {}", id);
            return false;
        };
        if instance.generation != generation {
            debug!(
                "Discarding stale update result for {} (generation {}, current {})",
                id, generation, instance.generation
            );
            return false;
        }

        match outcome {
            Ok(()) => {
                instance.last_update = Some(Utc::now());
                instance.last_error = None;
                instance.consecutive_failures = 0;
            }
            Err(e) => {
                warn!("Update of provider {} failed: {}", id, e);
                instance.last_error = Some(e);
                instance.consecutive_failures += 1;
            }
        }
        true
    }

    /// Record the outcome of a display call
    pub async fn record_display(&self, id: &str, generation: u64, outcome: LifecycleResult<()>) -> bool {
        let mut state = self.state.write().await;

        let Some(instance) = state.instances.get_mut(id) else {
            return false;
        };
        if instance.generation != generation {
            return false;
        }

        match outcome {
            Ok(()) => instance.has_rendered = true,
            Err(e) => {
                warn!("Display of provider {} failed: {}", id, e);
                instance.last_error = Some(e);
            }
        }
        true
    }

    /// Discovered manifests in discovery order
    pub async fn manifests(&self) -> Vec<Manifest> {
        let state = self.state.read().await;
        state
            .discovery_order
            .iter()
            .filter_map(|id| state.manifests.get(id).cloned())
            .collect()
    }

    /// Lifecycle report for every known id, in discovery order
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let state = self.state.read().await;

        state
            .discovery_order
            .iter()
            .filter_map(|id| {
                let manifest = state.manifests.get(id)?;
                let instance = state.instances.get(id);

                let lifecycle = match (instance, state.failures.get(id)) {
                    (Some(instance), _) => LifecycleState::Loaded {
                        generation: instance.generation,
                    },
                    (None, Some(failure)) => LifecycleState::Failed(failure.clone()),
                    (None, None) => LifecycleState::Discovered,
                };

                Some(ProviderStatus {
                    id: id.clone(),
                    name: manifest.name.clone(),
                    state: lifecycle,
                    enabled: self.is_enabled(&state, id),
                    last_update: instance.and_then(|i| i.last_update),
                    last_error: instance.and_then(|i| i.last_error.clone()),
                    consecutive_failures: instance.map(|i| i.consecutive_failures).unwrap_or(0),
                })
            })
            .collect()
    }

    /// Per-tick view of every loaded, enabled provider, in registration order
    ///
    /// Live content is only polled for providers with live priority. A
    /// capability query that panics is recorded against the instance and
    /// answered conservatively: not live, manifest default duration.
    pub async fn rotation_snapshot(&self) -> Vec<ProviderView> {
        let mut faults: Vec<(ProviderId, u64, PluginError)> = Vec::new();

        let views: Vec<ProviderView> = {
            let state = self.state.read().await;
            state
                .order
                .iter()
                .filter(|id| self.is_enabled(&state, id))
                .filter_map(|id| state.instances.get(id))
                .map(|instance| {
                    let mut errors = Vec::new();
                    let view = Self::poll_view(instance, &mut errors);
                    faults.extend(
                        errors
                            .into_iter()
                            .map(|e| (instance.manifest.id.clone(), instance.generation, e)),
                    );
                    view
                })
                .collect()
        };

        if !faults.is_empty() {
            let mut state = self.state.write().await;
            for (id, generation, error) in faults {
                match state.instances.get_mut(&id) {
                    Some(instance) if instance.generation == generation => {
                        warn!("Polling provider {} failed: {}", id, error);
                        instance.last_error = Some(error);
                    }
                    _ => debug!("Dropping poll failure of provider {}: instance replaced", id),
                }
            }
        }

        views
    }

    fn poll_view(instance: &ProviderInstance, errors: &mut Vec<PluginError>) -> ProviderView {
        let id = instance.manifest.id.as_str();
        let provider = &instance.provider;

        let live_priority = or_fault(
            contained(id, Operation::Poll, || provider.has_live_priority()),
            false,
            errors,
        );
        let live_content = live_priority
            && or_fault(
                contained(id, Operation::Poll, || provider.has_live_content()),
                false,
                errors,
            );
        let live_modes = if live_content {
            or_fault(
                contained(id, Operation::Poll, || provider.live_modes()),
                Vec::new(),
                errors,
            )
        } else {
            Vec::new()
        };

        let mut modes = Vec::with_capacity(instance.manifest.display_modes.len());
        for mode in &instance.manifest.display_modes {
            let duration = or_fault(
                contained(id, Operation::Poll, || provider.mode_duration(mode)),
                instance.manifest.default_duration,
                errors,
            );
            modes.push(ModeEntry {
                mode_id: mode.clone(),
                duration,
            });
        }

        ProviderView {
            provider_id: instance.manifest.id.clone(),
            modes,
            live_priority,
            live_modes,
        }
    }
}

fn or_fault<T>(result: LifecycleResult<T>, fallback: T, errors: &mut Vec<PluginError>) -> T {
    result.unwrap_or_else(|e| {
        errors.push(e);
        fallback
    })
}

const CLOCK_MANIFEST: &str = r#"
id: clock
name: Clock
description: Local time
entry_point: builtin
class_name: ClockProvider
display_modes: [clock]
update_interval_seconds: 1
default_duration_seconds: 15
"#;

const ALERT_MANIFEST: &str = r#"
id: alert
name: Alert
description: Urgent message read from a trigger file
entry_point: builtin
class_name: AlertProvider
display_modes: [alert]
update_interval_seconds: 2
default_duration_seconds: 10
"#;

/// Compiled-in providers
pub struct BuiltinProviderLoader;

impl BuiltinProviderLoader {
    /// Register the factories of every compiled-in provider
    pub async fn register_factories(registry: &PluginRegistry) {
        registry
            .register_factory(Arc::new(ClockProviderFactory))
            .await;
        registry
            .register_factory(Arc::new(AlertProviderFactory))
            .await;
    }

    /// Manifests of the compiled-in providers
    pub fn builtin_manifests() -> LifecycleResult<Vec<Manifest>> {
        [("builtin/clock", CLOCK_MANIFEST), ("builtin/alert", ALERT_MANIFEST)]
            .into_iter()
            .map(|(path, content)| Manifest::parse(content, std::path::Path::new(path)))
            .collect()
    }

    /// Register factories and make the built-in manifests known
    pub async fn install(registry: &PluginRegistry) -> LifecycleResult<()> {
        Self::register_factories(registry).await;
        for manifest in Self::builtin_manifests()? {
            registry.insert_manifest(manifest).await;
        }
        Ok(())
    }
}
