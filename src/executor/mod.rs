//! Update executor
//!
//! Calls `update()` on every loaded, enabled provider on that provider's
//! cadence, independent of what is on screen. Updates for different providers
//! run concurrently on a bounded pool; updates for one provider never overlap.
//! Results are tagged with the instance generation so a result that finishes
//! after a reload is dropped instead of being attributed to the new instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::plugin::{guarded, Operation, PluginRegistry, ProviderHandle, ProviderId};


/// Clears the in-flight flag when the update task ends, however it ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct UpdateSchedule {
    generation: u64,
    next_due: Instant,
    in_flight: Arc<AtomicBool>,
}

impl UpdateSchedule {
    fn new(generation: u64, now: Instant) -> Self {
        Self {
            generation,
            next_due: now,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Bounded update pool
pub struct UpdateExecutor {
    registry: Arc<PluginRegistry>,

    /// Pool size limiter
    limiter: Arc<Semaphore>,

    update_timeout: Duration,

    poll_interval: Duration,

    schedules: Mutex<HashMap<ProviderId, UpdateSchedule>>,

    tasks: Mutex<JoinSet<()>>,
}

impl UpdateExecutor {
    pub fn new(registry: Arc<PluginRegistry>, config: &ExecutorConfig) -> Self {
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_updates.max(1))),
            update_timeout: config.update_timeout(),
            poll_interval: config.poll_interval(),
            schedules: Mutex::new(HashMap::new()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Dispatch every due update; returns how many were spawned
    pub async fn tick(&self, now: Instant) -> usize {
        self.reap().await;

        let handles = self.registry.list_enabled().await;
        let mut schedules = self.schedules.lock().await;
        schedules.retain(|id, _| handles.iter().any(|handle| &handle.id == id));

        let mut tasks = self.tasks.lock().await;
        let mut dispatched = 0;

        for handle in handles {
            let schedule = schedules
                .entry(handle.id.clone())
                .or_insert_with(|| UpdateSchedule::new(handle.generation, now));

            if schedule.generation != handle.generation {
                // Reloaded: the fresh instance is due immediately
                *schedule = UpdateSchedule::new(handle.generation, now);
            }

            if schedule.in_flight.load(Ordering::SeqCst) || now < schedule.next_due {
                continue;
            }

            schedule.in_flight.store(true, Ordering::SeqCst);
            schedule.next_due = now + handle.update_interval;

            let in_flight = InFlight(Arc::clone(&schedule.in_flight));
            tasks.spawn(Self::run_update(
                Arc::clone(&self.registry),
                Arc::clone(&self.limiter),
                self.update_timeout,
                handle,
                in_flight,
            ));
            dispatched += 1;
        }

        if dispatched > 0 {
            debug!("Dispatched {} updates", dispatched);
        }
        dispatched
    }

    async fn run_update(
        registry: Arc<PluginRegistry>,
        limiter: Arc<Semaphore>,
        budget: Duration,
        handle: ProviderHandle,
        in_flight: InFlight,
    ) {
        let _in_flight = in_flight;

        let Ok(_permit) = limiter.acquire_owned().await else {
            return;
        };

        let outcome = guarded(&handle.id, Operation::Update, budget, handle.provider.update()).await;
        registry
            .record_update(&handle.id, handle.generation, outcome)
            .await;
    }

    async fn reap(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                warn!("Update task ended abnormally: {}", e);
            }
        }
    }

    /// Wait for every in-flight update to finish
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Update task ended abnormally: {}", e);
            }
        }
    }

    /// Number of updates currently running or waiting for a pool slot
    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Poll for due updates until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Update executor started (poll every {:?})", self.poll_interval);

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Instant::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.drain().await;
        info!("Update executor stopped");
    }
}
