//! Host - Collaborator seams
//!
//! Input, physics and scene collaborators are reached only through these
//! traits. The concrete types here are the buffered implementations the
//! desktop shell drives from its frontend.

use serde::{Deserialize, Serialize};

use crate::game_server::laps::CheckpointEvent;
use crate::game_server::vehicle::{DriveCommand, PlayerInput, Pose, VehicleId};

/// Per-slot input, polled once per fixed tick
pub trait InputSource {
    fn sample(&mut self, vehicle: VehicleId) -> PlayerInput;
}

impl InputSource for [PlayerInput; 2] {
    fn sample(&mut self, vehicle: VehicleId) -> PlayerInput {
        self[vehicle.index()]
    }
}

/// Vehicle dynamics and trigger volumes
pub trait PhysicsHost {
    /// Set the drivetrain command of one wheel
    fn apply_wheel(&mut self, vehicle: VehicleId, wheel: usize, command: DriveCommand);

    /// Integrate one fixed step
    fn integrate(&mut self, dt: f32);

    /// World pose of a wheel after integration
    fn wheel_pose(&self, vehicle: VehicleId, wheel: usize) -> Option<Pose>;

    /// World pose of a chassis after integration
    fn chassis_pose(&self, vehicle: VehicleId) -> Option<Pose>;

    /// Trigger entries since the last drain, in receipt order
    fn drain_checkpoints(&mut self) -> Vec<CheckpointEvent>;
}

/// Handle to a preview car placed in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewId(pub u64);

/// Spawns and releases selection previews
pub trait SceneHost {
    fn spawn_preview(&mut self, slot: VehicleId, car_index: usize, anchor: Pose) -> PreviewId;
    fn despawn_preview(&mut self, preview: PreviewId);
}

/// A preview currently live on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub id: PreviewId,
    pub slot: VehicleId,
    pub car_index: usize,
    pub anchor: Pose,
}

/// Scene host that records live previews for the display layer to draw
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewBoard {
    entries: Vec<PreviewEntry>,
    next_id: u64,
}

impl PreviewBoard {
    pub fn entries(&self) -> &[PreviewEntry] {
        &self.entries
    }

    pub fn preview(&self, id: PreviewId) -> Option<&PreviewEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of live previews for a slot
    pub fn live_in(&self, slot: VehicleId) -> usize {
        self.entries.iter().filter(|e| e.slot == slot).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SceneHost for PreviewBoard {
    fn spawn_preview(&mut self, slot: VehicleId, car_index: usize, anchor: Pose) -> PreviewId {
        self.next_id += 1;
        let id = PreviewId(self.next_id);
        self.entries.push(PreviewEntry {
            id,
            slot,
            car_index,
            anchor,
        });
        id
    }

    fn despawn_preview(&mut self, preview: PreviewId) {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != preview);
        if self.entries.len() == before {
            log::warn!("Released unknown preview {:?}", preview);
        }
    }
}

/// Physics results reported by an external engine for the last step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicsReport {
    pub chassis: [Option<Pose>; 2],
    pub wheels: [Vec<Pose>; 2],
    pub checkpoints: Vec<CheckpointEvent>,
}

/// Physics host backed by an external engine.
///
/// Commands are buffered for the engine to collect; poses and trigger
/// entries arrive through [`BufferedPhysics::submit`]. Integration itself
/// happens outside, so `integrate` only counts steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BufferedPhysics {
    commands: [Vec<DriveCommand>; 2],
    chassis: [Option<Pose>; 2],
    wheels: [Vec<Pose>; 2],
    pending: Vec<CheckpointEvent>,
    steps: u64,
}

impl BufferedPhysics {
    /// Accept results from the engine; trigger entries queue up until drained
    pub fn submit(&mut self, report: PhysicsReport) {
        let PhysicsReport {
            chassis,
            wheels,
            checkpoints,
        } = report;
        self.chassis = chassis;
        self.wheels = wheels;
        self.pending.extend(checkpoints);
    }

    /// Latest per-wheel commands for one vehicle
    pub fn commands(&self, vehicle: VehicleId) -> &[DriveCommand] {
        &self.commands[vehicle.index()]
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl PhysicsHost for BufferedPhysics {
    fn apply_wheel(&mut self, vehicle: VehicleId, wheel: usize, command: DriveCommand) {
        let commands = &mut self.commands[vehicle.index()];
        if commands.len() <= wheel {
            commands.resize(wheel + 1, DriveCommand::IDLE);
        }
        commands[wheel] = command;
    }

    fn integrate(&mut self, _dt: f32) {
        self.steps += 1;
    }

    fn wheel_pose(&self, vehicle: VehicleId, wheel: usize) -> Option<Pose> {
        self.wheels[vehicle.index()].get(wheel).copied()
    }

    fn chassis_pose(&self, vehicle: VehicleId) -> Option<Pose> {
        self.chassis[vehicle.index()]
    }

    fn drain_checkpoints(&mut self) -> Vec<CheckpointEvent> {
        std::mem::take(&mut self.pending)
    }
}
