//! Laps - Start-line crossing counter
//!
//! Every entry into the start/finish trigger counts. There is no debounce
//! and no direction check, so dwelling on or reversing over the line
//! counts again.

use serde::{Deserialize, Serialize};

use crate::game_server::vehicle::{Vehicle, VehicleId};

/// Trigger entry reported by the physics host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEvent {
    /// Player number of the vehicle that entered the trigger
    pub vehicle: u32,
    pub trigger_tag: String,
}

impl CheckpointEvent {
    pub fn new(vehicle: VehicleId, trigger_tag: impl Into<String>) -> Self {
        Self {
            vehicle: vehicle.number(),
            trigger_tag: trigger_tag.into(),
        }
    }
}

/// Applies checkpoint events to vehicle lap counters
#[derive(Debug, Clone)]
pub struct LapTracker {
    start_line_tag: String,
}

impl LapTracker {
    pub fn new(start_line_tag: impl Into<String>) -> Self {
        Self {
            start_line_tag: start_line_tag.into(),
        }
    }

    /// Consume one event, returning the vehicle whose counter moved
    pub fn record(
        &self,
        event: &CheckpointEvent,
        vehicles: &mut [Vehicle; 2],
    ) -> Option<VehicleId> {
        let Some(id) = VehicleId::from_number(event.vehicle) else {
            log::warn!(
                "Dropping checkpoint '{}' for unknown vehicle {}",
                event.trigger_tag,
                event.vehicle
            );
            return None;
        };

        if event.trigger_tag != self.start_line_tag {
            log::debug!("Ignoring trigger '{}' for {:?}", event.trigger_tag, id);
            return None;
        }

        let vehicle = &mut vehicles[id.index()];
        vehicle.record_crossing();
        log::debug!("{:?} crossed the start line ({})", id, vehicle.lap_count());
        Some(id)
    }

    /// Consume a batch of events in receipt order
    pub fn drain<I>(&self, events: I, vehicles: &mut [Vehicle; 2]) -> usize
    where
        I: IntoIterator<Item = CheckpointEvent>,
    {
        events
            .into_iter()
            .filter(|event| self.record(event, vehicles).is_some())
            .count()
    }
}

/// Completed laps for the HUD: one less than the crossings, capped at the
/// race distance.
pub fn displayed_laps(lap_count: u32, win_threshold: u32) -> u32 {
    lap_count
        .saturating_sub(1)
        .min(win_threshold.saturating_sub(1))
}
