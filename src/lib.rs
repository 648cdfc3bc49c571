//! Slateboard
//!
//! Plugin lifecycle manager and rotation scheduler for a shared display.
//! Display providers are discovered from manifests, version-gated, loaded
//! through a factory table and refreshed on a bounded update pool. A render
//! loop asks the rotation scheduler which (provider, mode) owns the surface
//! each tick, letting providers with live content preempt normal rotation.

pub mod cli;
pub mod config;
pub mod executor;
pub mod plugin;
pub mod scheduler;
pub mod utils;

pub use config::Config;
pub use executor::UpdateExecutor;
pub use plugin::{
    BuiltinProviderLoader, DisplayProvider, DisplaySurface, HostCollaborators, LoadSummary,
    MemorySurface, PluginError, PluginRegistry, ProviderCache, ProviderFactory, ProviderHandle,
};
pub use scheduler::{RotationScheduler, SlotSelection};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use plugin::{guarded, Operation};
use scheduler::ProviderView;

/// Main application context that coordinates all components
pub struct Slateboard {
    config: Config,
    surface: Arc<dyn DisplaySurface>,
    registry: Arc<PluginRegistry>,
    executor: Arc<UpdateExecutor>,
    scheduler: Mutex<RotationScheduler>,
}

impl Slateboard {
    /// Create a headless instance rendering into memory
    pub fn new(config: Config) -> SlateboardResult<Self> {
        Self::with_surface(config, Arc::new(MemorySurface::new(128, 32)))
    }

    /// Create an instance rendering onto `surface`
    pub fn with_surface(config: Config, surface: Arc<dyn DisplaySurface>) -> SlateboardResult<Self> {
        config
            .validate()
            .map_err(|e| SlateboardError::Config(format!("{e:#}")))?;

        let cache = ProviderCache::new(config.cache.max_entries, config.cache.default_ttl());
        let collaborators = HostCollaborators::new(Arc::clone(&surface), cache)
            .with_provider_configs(config.providers.clone())
            .with_lifecycle_timeout(config.executor.update_timeout());

        let registry = Arc::new(PluginRegistry::new(collaborators));
        let executor = Arc::new(UpdateExecutor::new(Arc::clone(&registry), &config.executor));

        Ok(Self {
            config,
            surface,
            registry,
            executor,
            scheduler: Mutex::new(RotationScheduler::new(Instant::now())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &Arc<UpdateExecutor> {
        &self.executor
    }

    pub fn surface(&self) -> &Arc<dyn DisplaySurface> {
        &self.surface
    }

    /// Register built-in providers, discover manifests and, with
    /// `plugins.auto_load`, load every enabled provider
    pub async fn initialize(&self) -> SlateboardResult<StartupReport> {
        info!("Initializing provider registry");

        BuiltinProviderLoader::install(&self.registry).await?;

        let dirs = self
            .config
            .plugins
            .expanded_directories()
            .map_err(|e| SlateboardError::Config(format!("{e:#}")))?;
        for dir in dirs {
            if dir.exists() {
                info!("Adding plugin directory: {:?}", dir);
                self.registry.add_plugin_directory(dir).await;
            } else {
                debug!("Plugin directory does not exist, skipping: {:?}", dir);
            }
        }

        let report = self.registry.discover().await;

        let load = if self.config.plugins.auto_load {
            self.registry.load_all().await
        } else {
            info!("Automatic loading disabled");
            LoadSummary::default()
        };

        Ok(StartupReport {
            rejected: report.rejected,
            load,
        })
    }

    /// Per-tick provider views with zero durations replaced by the fallback
    async fn snapshot(&self) -> Vec<ProviderView> {
        let fallback = self.config.rotation.fallback_duration();
        let mut views = self.registry.rotation_snapshot().await;

        for mode in views.iter_mut().flat_map(|view| view.modes.iter_mut()) {
            if mode.duration.is_zero() {
                mode.duration = fallback;
            }
        }
        views
    }

    /// Run one scheduler tick and render the selected slot
    ///
    /// A selected provider that was unloaded in the meantime is skipped and
    /// the next slot is tried on the same tick.
    pub async fn render_tick(&self, now: Instant) -> Option<SlotSelection> {
        let views = self.snapshot().await;
        let mut scheduler = self.scheduler.lock().await;
        let mut selection = scheduler.tick(&views, now);

        for _ in 0..=views.len() {
            let current = selection?;

            match self.registry.get(&current.provider_id).await {
                Some(handle) => {
                    self.present(&handle, &current).await;
                    return Some(current);
                }
                None => {
                    warn!(
                        "Provider {} selected but no longer loaded, skipping",
                        current.provider_id
                    );
                    selection = scheduler.skip_unavailable(&current.provider_id, &views, now);
                }
            }
        }

        None
    }

    async fn present(&self, handle: &ProviderHandle, selection: &SlotSelection) {
        if selection.entered {
            debug!(
                "Showing {}:{}{}",
                selection.provider_id,
                selection.mode_id,
                if selection.live { " (live)" } else { "" }
            );
        }

        let outcome = guarded(
            &handle.id,
            Operation::Display,
            self.config.executor.display_timeout(),
            handle.provider.display(&selection.mode_id, selection.entered),
        )
        .await;

        if outcome.is_err() && !handle.has_rendered {
            self.draw_placeholder(&handle.id);
        }

        self.registry
            .record_display(&handle.id, handle.generation, outcome)
            .await;
    }

    /// Host frame for a provider that has never rendered successfully
    fn draw_placeholder(&self, id: &str) {
        let drawn = self
            .surface
            .clear()
            .and_then(|_| self.surface.draw_text(0, 0, id))
            .and_then(|_| self.surface.draw_text(0, 16, "loading..."))
            .and_then(|_| self.surface.present());

        if let Err(e) = drawn {
            warn!("Failed to draw placeholder for {}: {}", id, e);
        }
    }

    /// Drive the render loop and the update executor until `shutdown` flips
    /// to true or `max_ticks` ticks have run
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>, max_ticks: Option<u64>) -> SlateboardResult<()> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let executor = tokio::spawn(Arc::clone(&self.executor).run(stop_rx));

        let mut interval = tokio::time::interval(self.config.rotation.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Render loop started (tick every {:?})",
            self.config.rotation.tick_interval()
        );

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.render_tick(Instant::now()).await;
                    ticks += 1;
                    if max_ticks.is_some_and(|max| ticks >= max) {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Render loop stopped after {} ticks", ticks);

        let _ = stop_tx.send(true);
        if let Err(e) = executor.await {
            warn!("Update executor task failed: {}", e);
        }
        Ok(())
    }

    /// Stop updates and clean up every loaded provider
    pub async fn shutdown(&self) {
        self.executor.drain().await;
        self.registry.teardown().await;
    }
}

/// What [`Slateboard::initialize`] found and loaded
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// Manifests skipped during discovery
    pub rejected: Vec<PluginError>,

    pub load: LoadSummary,
}

/// Error types for the application context
#[derive(thiserror::Error, Debug)]
pub enum SlateboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] PluginError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

/// Result type for the main application
pub type SlateboardResult<T> = Result<T, SlateboardError>;
