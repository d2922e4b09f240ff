//! Selection - Pre-race car and map carousel
//!
//! Two car slots and one map index, each cycling over a fixed roster.
//! While the selection view is shown every slot owns exactly one preview
//! in the scene; changing a slot's car releases the old preview before the
//! new one is spawned.

use serde::{Deserialize, Serialize};

use crate::game_server::config::SessionConfig;
use crate::game_server::error::SessionError;
use crate::game_server::host::{PreviewId, SceneHost};
use crate::game_server::vehicle::{Pose, VehicleId};

/// Step a cyclic index by +1 or -1
fn wrap(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta + len as isize).rem_euclid(len as isize) as usize
}

/// The single preview owned by a selection slot
#[derive(Debug, Clone, Default)]
pub struct PreviewSlot {
    live: Option<PreviewId>,
}

impl PreviewSlot {
    pub fn live(&self) -> Option<PreviewId> {
        self.live
    }

    /// Release the current preview, then spawn its replacement
    fn replace<S: SceneHost>(
        &mut self,
        host: &mut S,
        slot: VehicleId,
        car_index: usize,
        anchor: Pose,
    ) {
        self.clear(host);
        self.live = Some(host.spawn_preview(slot, car_index, anchor));
    }

    fn clear<S: SceneHost>(&mut self, host: &mut S) {
        if let Some(old) = self.live.take() {
            host.despawn_preview(old);
        }
    }
}

/// Carousel state for both car slots and the map
#[derive(Debug, Clone)]
pub struct SelectionCarousel {
    car_index: [usize; 2],
    map_index: usize,
    car_roster_size: usize,
    map_roster_size: usize,
    anchors: [Pose; 2],
    previews: [PreviewSlot; 2],
    showing: bool,
}

impl SelectionCarousel {
    /// Create a carousel over rosters of the given sizes
    pub fn new(
        car_roster_size: usize,
        map_roster_size: usize,
        anchors: [Pose; 2],
    ) -> Result<Self, SessionError> {
        if car_roster_size == 0 {
            return Err(SessionError::config_validation(
                "cars",
                "car roster cannot be empty",
            ));
        }
        if map_roster_size == 0 {
            return Err(SessionError::config_validation(
                "maps",
                "map roster cannot be empty",
            ));
        }

        Ok(Self {
            car_index: [0, 0],
            map_index: 0,
            car_roster_size,
            map_roster_size,
            anchors,
            previews: Default::default(),
            showing: false,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(config.cars.len(), config.maps.len(), config.preview_anchors)
    }

    /// Next car for a slot
    pub fn advance<S: SceneHost>(&mut self, slot: VehicleId, host: &mut S) {
        self.step_car(slot, 1, host);
    }

    /// Previous car for a slot
    pub fn retreat<S: SceneHost>(&mut self, slot: VehicleId, host: &mut S) {
        self.step_car(slot, -1, host);
    }

    fn step_car<S: SceneHost>(&mut self, slot: VehicleId, delta: isize, host: &mut S) {
        let i = slot.index();
        self.car_index[i] = wrap(self.car_index[i], delta, self.car_roster_size);
        log::debug!("{:?} selected car {}", slot, self.car_index[i]);

        if self.showing {
            self.previews[i].replace(host, slot, self.car_index[i], self.anchors[i]);
        }
    }

    pub fn advance_map(&mut self) {
        self.map_index = wrap(self.map_index, 1, self.map_roster_size);
        log::debug!("Selected map {}", self.map_index);
    }

    pub fn retreat_map(&mut self) {
        self.map_index = wrap(self.map_index, -1, self.map_roster_size);
        log::debug!("Selected map {}", self.map_index);
    }

    /// Spawn one preview per slot for the current choices
    pub fn show_previews<S: SceneHost>(&mut self, host: &mut S) {
        for slot in VehicleId::ALL {
            let i = slot.index();
            self.previews[i].replace(host, slot, self.car_index[i], self.anchors[i]);
        }
        self.showing = true;
    }

    /// Release both previews
    pub fn hide_previews<S: SceneHost>(&mut self, host: &mut S) {
        for preview in &mut self.previews {
            preview.clear(host);
        }
        self.showing = false;
    }

    pub fn car_index(&self, slot: VehicleId) -> usize {
        self.car_index[slot.index()]
    }

    pub fn car_indices(&self) -> [usize; 2] {
        self.car_index
    }

    pub fn map_index(&self) -> usize {
        self.map_index
    }

    pub fn live_preview(&self, slot: VehicleId) -> Option<PreviewId> {
        self.previews[slot.index()].live()
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    /// Get compact selection state for the display layer
    pub fn get_snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            car_index: self.car_index,
            map_index: self.map_index,
            car_roster_size: self.car_roster_size,
            map_roster_size: self.map_roster_size,
            previews: [self.previews[0].live(), self.previews[1].live()],
        }
    }
}

/// Selection state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub car_index: [usize; 2],
    pub map_index: usize,
    pub car_roster_size: usize,
    pub map_roster_size: usize,
    pub previews: [Option<PreviewId>; 2],
}
