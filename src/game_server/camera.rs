//! Camera - Chase and selection camera rigs
//!
//! Cameras read vehicle or view state and produce a pose; they never feed
//! back into race logic.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::game_server::error::SessionError;
use crate::game_server::vehicle::{Pose, VehicleId};

/// Chase camera tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseCameraConfig {
    pub follow_speed: f32,
    pub look_speed: f32,
    /// Offset from the followed car along its right/up/forward axes
    pub offset: Vec3,
    /// Added to the look direction before aiming
    pub look_offset: Vec3,
}

impl Default for ChaseCameraConfig {
    fn default() -> Self {
        Self {
            follow_speed: 10.0,
            look_speed: 10.0,
            offset: Vec3::new(0.0, 2.0, -5.0),
            look_offset: Vec3::ZERO,
        }
    }
}

impl ChaseCameraConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        for (field, value) in [
            ("chase_camera.follow_speed", self.follow_speed),
            ("chase_camera.look_speed", self.look_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SessionError::config_validation(
                    field,
                    format!("must be finite and >= 0, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Rotation whose local +Z points along `direction` with +Y toward `up`.
///
/// Returns `None` when the direction is degenerate or parallel to `up`.
pub fn look_rotation(direction: Vec3, up: Vec3) -> Option<Quat> {
    let forward = direction.try_normalize()?;
    let right = up.cross(forward).try_normalize()?;
    let up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)))
}

/// Smoothed camera that trails one vehicle during a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaseCamera {
    pub target: VehicleId,
    pub pose: Pose,
    config: ChaseCameraConfig,
}

impl ChaseCamera {
    /// Place the camera at its resting offset behind the target
    pub fn new(target: VehicleId, target_pose: &Pose, config: ChaseCameraConfig) -> Self {
        let mut camera = Self {
            target,
            pose: Pose::IDENTITY,
            config,
        };
        camera.pose.position = camera.desired_position(target_pose);
        if let Some(rotation) = camera.desired_rotation(target_pose) {
            camera.pose.rotation = rotation;
        }
        camera
    }

    fn desired_position(&self, target: &Pose) -> Vec3 {
        let offset = self.config.offset;
        target.position
            + target.forward() * offset.z
            + target.right() * offset.x
            + target.up() * offset.y
    }

    fn desired_rotation(&self, target: &Pose) -> Option<Quat> {
        let direction = target.position - self.pose.position;
        look_rotation(direction + self.config.look_offset, Vec3::Y)
    }

    /// Advance one display frame.
    ///
    /// Both rotation and position move by `speed * dt` of the remaining
    /// distance, so the result depends on the frame duration.
    pub fn update(&mut self, target: &Pose, dt: f32) {
        if let Some(rotation) = self.desired_rotation(target) {
            let t = (self.config.look_speed * dt).clamp(0.0, 1.0);
            self.pose.rotation = self.pose.rotation.lerp(rotation, t);
        }

        let t = (self.config.follow_speed * dt).clamp(0.0, 1.0);
        let position = self.desired_position(target);
        self.pose.position = self.pose.position.lerp(position, t);
    }
}

/// Fixed camera placements for the menu
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCameraConfig {
    pub main: Pose,
    pub selection: Pose,
}

impl Default for SelectionCameraConfig {
    fn default() -> Self {
        Self {
            main: Pose::new(Vec3::new(0.0, 2.0, -10.0), Quat::IDENTITY),
            selection: Pose::new(Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY),
        }
    }
}

/// Which fixed view the menu camera shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraView {
    Main,
    Selection,
}

/// Menu camera that snaps between two fixed views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionCamera {
    pub view: CameraView,
    pub pose: Pose,
    config: SelectionCameraConfig,
}

impl SelectionCamera {
    pub fn new(config: SelectionCameraConfig) -> Self {
        Self {
            view: CameraView::Main,
            pose: config.main,
            config,
        }
    }

    /// Switch views instantly
    pub fn show(&mut self, view: CameraView) {
        self.view = view;
        self.pose = match view {
            CameraView::Main => self.config.main,
            CameraView::Selection => self.config.selection,
        };
    }
}
