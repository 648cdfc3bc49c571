//! Rotation scheduler
//!
//! Decides, once per tick, which (provider, mode) pair owns the surface. The
//! scheduler runs in one of two modes:
//!
//! - **Normal**: cycles the normal slot list, re-derived from the enabled
//!   providers only at slot boundaries so enabling or disabling a provider
//!   never cuts a slot short.
//! - **Live**: cycles the live slot list, re-derived every tick from the
//!   providers currently reporting live content.
//!
//! Entering Live (takeover) or leaving it (release) always restarts at the
//! first slot of the newly active list. Time is passed in explicitly so the
//! state machine can be driven deterministically.

pub mod slot;


pub use slot::*;

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::plugin::{ModeId, ProviderId};

/// Scheduler working state
#[derive(Debug, Clone)]
pub struct RotationState {
    /// Index into the active list
    pub current_slot_index: usize,

    /// Whether the live list is active
    pub currently_live: bool,

    /// When the current slot was entered
    pub slot_entered_at: Instant,

    pub normal_slots: Vec<RotationSlot>,

    pub live_slots: Vec<RotationSlot>,
}

impl RotationState {
    fn new(now: Instant) -> Self {
        Self {
            current_slot_index: 0,
            currently_live: false,
            slot_entered_at: now,
            normal_slots: Vec::new(),
            live_slots: Vec::new(),
        }
    }

    /// The list currently being cycled
    pub fn active_slots(&self) -> &[RotationSlot] {
        if self.currently_live {
            &self.live_slots
        } else {
            &self.normal_slots
        }
    }

    /// The slot that owns the surface
    pub fn current_slot(&self) -> Option<&RotationSlot> {
        self.active_slots().get(self.current_slot_index)
    }
}

/// Decision for one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSelection {
    pub provider_id: ProviderId,

    pub mode_id: ModeId,

    /// The slot was entered on this tick
    pub entered: bool,

    /// The slot belongs to the live list
    pub live: bool,
}

/// Two-mode rotation state machine
pub struct RotationScheduler {
    state: RotationState,
}

impl RotationScheduler {
    pub fn new(now: Instant) -> Self {
        Self {
            state: RotationState::new(now),
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    /// The (provider, mode) pair that owns the surface
    pub fn select_active_slot(&self) -> Option<(ProviderId, ModeId)> {
        self.state
            .current_slot()
            .map(|slot| (slot.provider_id.clone(), slot.mode_id.clone()))
    }

    /// Evaluate one tick against the current provider views
    ///
    /// All transitions (advance, takeover, release) are decided here, at most
    /// one per tick.
    pub fn tick(&mut self, views: &[ProviderView], now: Instant) -> Option<SlotSelection> {
        let live_slots = build_live_slots(views);

        let entered = if self.state.currently_live {
            if live_slots.is_empty() {
                self.release(views, now);
                true
            } else {
                self.rotate_live(live_slots, now)
            }
        } else if !live_slots.is_empty() {
            self.takeover(live_slots, now);
            true
        } else {
            self.rotate_normal(views, now)
        };

        self.selection(entered)
    }

    /// Drop every slot of a provider that turned out to be unloaded and move
    /// on to the next surviving slot without waiting for a boundary
    ///
    /// `views` is the snapshot the current tick was decided on; it is used to
    /// rebuild the normal list when the skip ends a live episode.
    pub fn skip_unavailable(
        &mut self,
        provider_id: &str,
        views: &[ProviderView],
        now: Instant,
    ) -> Option<SlotSelection> {
        let old = self.state.active_slots().to_vec();
        let old_index = self.state.current_slot_index;

        self.state
            .normal_slots
            .retain(|slot| slot.provider_id != provider_id);
        self.state
            .live_slots
            .retain(|slot| slot.provider_id != provider_id);

        if self.state.currently_live && self.state.live_slots.is_empty() {
            info!("Live provider {} vanished", provider_id);
            self.release(views, now);
            self.state
                .normal_slots
                .retain(|slot| slot.provider_id != provider_id);
        } else {
            self.state.current_slot_index =
                surviving_index(&old, old_index, self.state.active_slots());
        }

        debug!("Skipped unavailable provider {}", provider_id);
        self.state.slot_entered_at = now;
        self.selection(true)
    }

    fn selection(&self, entered: bool) -> Option<SlotSelection> {
        self.state.current_slot().map(|slot| SlotSelection {
            provider_id: slot.provider_id.clone(),
            mode_id: slot.mode_id.clone(),
            entered,
            live: self.state.currently_live,
        })
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state.slot_entered_at)
    }

    fn takeover(&mut self, live_slots: Vec<RotationSlot>, now: Instant) {
        let preempted = self
            .state
            .current_slot()
            .map(|slot| format!("{}:{}", slot.provider_id, slot.mode_id))
            .unwrap_or_else(|| "<none>".to_string());
        info!(
            "Live takeover by {}:{} ({} live slots), preempting {}",
            live_slots[0].provider_id,
            live_slots[0].mode_id,
            live_slots.len(),
            preempted
        );

        self.state.currently_live = true;
        self.state.live_slots = live_slots;
        self.state.current_slot_index = 0;
        self.state.slot_entered_at = now;
    }

    fn release(&mut self, views: &[ProviderView], now: Instant) {
        info!("Live content ended, resuming normal rotation from the first slot");

        self.state.currently_live = false;
        self.state.live_slots.clear();
        self.state.normal_slots = build_normal_slots(views);
        self.state.current_slot_index = 0;
        self.state.slot_entered_at = now;
    }

    fn rotate_live(&mut self, live_slots: Vec<RotationSlot>, now: Instant) -> bool {
        let old = std::mem::replace(&mut self.state.live_slots, live_slots);
        let old_index = self.state.current_slot_index;
        let current = old.get(old_index);

        let position = current.and_then(|current| {
            self.state
                .live_slots
                .iter()
                .position(|slot| slot.same_target(current))
        });

        match position {
            Some(pos) => {
                self.state.current_slot_index = pos;
                if self.elapsed(now) >= self.state.live_slots[pos].duration {
                    self.state.current_slot_index = (pos + 1) % self.state.live_slots.len();
                    self.state.slot_entered_at = now;
                    true
                } else {
                    false
                }
            }
            None => {
                // Active slot stopped being live mid-cycle
                self.state.current_slot_index =
                    surviving_index(&old, old_index, &self.state.live_slots);
                self.state.slot_entered_at = now;
                debug!("Live slot removed mid-cycle, advancing immediately");
                true
            }
        }
    }

    fn rotate_normal(&mut self, views: &[ProviderView], now: Instant) -> bool {
        let Some(current) = self.state.current_slot().cloned() else {
            // Nothing to cycle yet; pick up whatever is enabled now
            self.state.normal_slots = build_normal_slots(views);
            self.state.current_slot_index = 0;
            self.state.slot_entered_at = now;
            return !self.state.normal_slots.is_empty();
        };

        if self.elapsed(now) < current.duration {
            return false;
        }

        let fresh = build_normal_slots(views);
        let next = successor_index(&self.state.normal_slots, self.state.current_slot_index, &fresh);
        debug!(
            "Slot {}:{} finished after {:?}",
            current.provider_id, current.mode_id, current.duration
        );

        self.state.normal_slots = fresh;
        self.state.current_slot_index = next;
        self.state.slot_entered_at = now;
        !self.state.normal_slots.is_empty()
    }
}
