//! Vehicle - Per-player car state and input translation
//!
//! Each vehicle owns its wheels and the drivetrain command produced from
//! player input. The physics host consumes the per-wheel commands and
//! reports wheel poses back after integration.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::game_server::config::CarSpec;

/// World-space position and rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Local +Z in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Local +X in world space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local +Y in world space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One of the two controlled vehicles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleId {
    P1,
    P2,
}

impl VehicleId {
    pub const ALL: [VehicleId; 2] = [VehicleId::P1, VehicleId::P2];

    /// Array index for per-vehicle storage
    pub fn index(self) -> usize {
        match self {
            VehicleId::P1 => 0,
            VehicleId::P2 => 1,
        }
    }

    /// Player number as seen by collaborators (1 or 2)
    pub fn number(self) -> u32 {
        self.index() as u32 + 1
    }

    /// Resolve a player number reported by a collaborator
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(VehicleId::P1),
            2 => Some(VehicleId::P2),
            _ => None,
        }
    }
}

/// Wheel axle classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axle {
    Front,
    Rear,
}

/// A single wheel; its pose is written back from the physics host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wheel {
    pub axle: Axle,
    pub current_pose: Pose,
}

impl Wheel {
    pub fn new(axle: Axle) -> Self {
        Self {
            axle,
            current_pose: Pose::IDENTITY,
        }
    }

    /// Only front wheels steer
    pub fn steerable(&self) -> bool {
        self.axle == Axle::Front
    }
}

/// Drivetrain command for a whole vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub motor_torque: f32,
    pub steer_angle: f32,
    pub brake_torque: f32,
}

impl DriveCommand {
    pub const IDLE: Self = Self {
        motor_torque: 0.0,
        steer_angle: 0.0,
        brake_torque: 0.0,
    };

    /// Command for one wheel; only front wheels receive the steer angle
    pub fn for_wheel(&self, wheel: &Wheel) -> DriveCommand {
        DriveCommand {
            motor_torque: self.motor_torque,
            steer_angle: if wheel.steerable() { self.steer_angle } else { 0.0 },
            brake_torque: self.brake_torque,
        }
    }
}

/// Input sampled for one player slot during a fixed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Throttle axis in [-1, 1]
    pub throttle: f32,
    /// Steering axis in [-1, 1]
    pub steer: f32,
    /// Brake key held
    pub brake: bool,
}

impl PlayerInput {
    /// Clamp axes to [-1, 1]; non-finite values read as released
    pub fn sanitized(self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            throttle: axis(self.throttle),
            steer: axis(self.steer),
            brake: self.brake,
        }
    }
}

/// Maps player input onto a drivetrain command using per-car tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandTranslator {
    pub max_torque: f32,
    pub max_steer_angle: f32,
    /// Fraction of the remaining steer error closed each tick, in [0, 1]
    pub steer_smoothing: f32,
    pub brake_force: f32,
}

impl CommandTranslator {
    pub fn from_spec(spec: &CarSpec) -> Self {
        Self {
            max_torque: spec.max_torque,
            max_steer_angle: spec.max_steer_angle,
            steer_smoothing: spec.steer_smoothing,
            brake_force: spec.brake_force,
        }
    }

    /// Produce the next command from the current one.
    ///
    /// With control disabled every channel is forced to zero. Otherwise the
    /// steer angle moves linearly toward its target by `steer_smoothing` of
    /// the remaining distance, so it never passes the target.
    pub fn translate(
        &self,
        current: &DriveCommand,
        input: PlayerInput,
        control_enabled: bool,
    ) -> DriveCommand {
        if !control_enabled {
            return DriveCommand::IDLE;
        }

        let input = input.sanitized();
        let steer_target = input.steer * self.max_steer_angle;
        let t = self.steer_smoothing.clamp(0.0, 1.0);
        let from = current.steer_angle;
        // lerp can round one ulp past the target at t == 1
        let (lo, hi) = (from.min(steer_target), from.max(steer_target));
        let steer_angle = (from + (steer_target - from) * t).clamp(lo, hi);

        DriveCommand {
            motor_torque: input.throttle * self.max_torque,
            steer_angle,
            brake_torque: if input.brake { self.brake_force } else { 0.0 },
        }
    }
}

/// Complete state for a single controlled vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Roster index of the car this vehicle was built from
    pub car_index: usize,
    pub wheels: Vec<Wheel>,
    pub command: DriveCommand,
    pub chassis_pose: Pose,
    translator: CommandTranslator,
    lap_count: u32,
}

impl Vehicle {
    /// Build a vehicle from a roster entry at a spawn pose
    pub fn new(id: VehicleId, car_index: usize, spec: &CarSpec, spawn: Pose) -> Self {
        Self {
            id,
            car_index,
            wheels: spec.wheels.iter().copied().map(Wheel::new).collect(),
            command: DriveCommand::IDLE,
            chassis_pose: spawn,
            translator: CommandTranslator::from_spec(spec),
            lap_count: 0,
        }
    }

    /// Start-line crossings recorded this session
    pub fn lap_count(&self) -> u32 {
        self.lap_count
    }

    pub fn translator(&self) -> &CommandTranslator {
        &self.translator
    }

    pub(crate) fn record_crossing(&mut self) {
        self.lap_count += 1;
    }

    /// Update the drivetrain command for this tick
    pub fn drive(&mut self, input: PlayerInput, control_enabled: bool) {
        self.command = self
            .translator
            .translate(&self.command, input, control_enabled);
    }

    /// Per-wheel commands in wheel order; empty for a wheelless vehicle
    pub fn wheel_commands(&self) -> impl Iterator<Item = (usize, DriveCommand)> + '_ {
        self.wheels
            .iter()
            .enumerate()
            .map(|(i, wheel)| (i, self.command.for_wheel(wheel)))
    }
}
