//! Rotation slots and the per-tick provider view they are built from

use std::time::Duration;

use crate::plugin::{ModeId, ProviderId};

/// One (mode, provider, duration) unit of a rotation sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSlot {
    pub mode_id: ModeId,
    pub provider_id: ProviderId,
    pub duration: Duration,
}

impl RotationSlot {
    pub fn new(provider_id: &str, mode_id: &str, duration: Duration) -> Self {
        Self {
            mode_id: mode_id.to_string(),
            provider_id: provider_id.to_string(),
            duration,
        }
    }

    /// Same provider and mode, regardless of duration
    pub fn same_target(&self, other: &RotationSlot) -> bool {
        self.provider_id == other.provider_id && self.mode_id == other.mode_id
    }
}

/// A declared mode and how long it stays on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEntry {
    pub mode_id: ModeId,
    pub duration: Duration,
}

/// What the scheduler needs to know about one enabled, loaded provider
///
/// Views are produced by the registry each tick in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderView {
    pub provider_id: ProviderId,

    /// Declared modes in declaration order
    pub modes: Vec<ModeEntry>,

    /// Configured live priority
    pub live_priority: bool,

    /// Modes currently reported live; empty unless the provider has both
    /// live priority and live content
    pub live_modes: Vec<ModeId>,
}

impl ProviderView {
    fn slots<'a>(&'a self, modes: impl Iterator<Item = &'a ModeEntry> + 'a) -> impl Iterator<Item = RotationSlot> + 'a {
        modes.map(move |mode| RotationSlot::new(&self.provider_id, &mode.mode_id, mode.duration))
    }
}

/// Normal rotation: every declared mode of every provider without live priority
pub fn build_normal_slots(views: &[ProviderView]) -> Vec<RotationSlot> {
    views
        .iter()
        .filter(|view| !view.live_priority)
        .flat_map(|view| view.slots(view.modes.iter()))
        .collect()
}

/// Live override list: reported live modes, providers in registration order,
/// modes in declaration order
///
/// Live modes that the provider never declared are ignored.
pub fn build_live_slots(views: &[ProviderView]) -> Vec<RotationSlot> {
    views
        .iter()
        .filter(|view| view.live_priority && !view.live_modes.is_empty())
        .flat_map(|view| {
            view.slots(
                view.modes
                    .iter()
                    .filter(move |mode| view.live_modes.contains(&mode.mode_id)),
            )
        })
        .collect()
}

/// Index in `next` of the slot that follows `old[old_index]`
///
/// If the current slot survived into `next`, the slot after it is chosen.
/// Otherwise the first of its successors in `old` that survived is chosen,
/// falling back to the start of `next`.
pub fn successor_index(old: &[RotationSlot], old_index: usize, next: &[RotationSlot]) -> usize {
    if next.is_empty() {
        return 0;
    }

    if let Some(current) = old.get(old_index) {
        if let Some(pos) = next.iter().position(|slot| slot.same_target(current)) {
            return (pos + 1) % next.len();
        }
    }

    surviving_index(old, old_index, next)
}

/// Index in `next` of the first slot at or after `old[old_index]` that still
/// exists, skipping the current slot itself
pub fn surviving_index(old: &[RotationSlot], old_index: usize, next: &[RotationSlot]) -> usize {
    if next.is_empty() || old.is_empty() {
        return 0;
    }

    (1..=old.len())
        .map(|offset| &old[(old_index + offset) % old.len()])
        .find_map(|candidate| next.iter().position(|slot| slot.same_target(candidate)))
        .unwrap_or(0)
}
