//! Config - Rosters, anchors and race tuning
//!
//! Every collaborator reference the session needs is listed here and
//! resolved by roster index, so nothing is looked up by name at runtime.

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::game_server::camera::{ChaseCameraConfig, SelectionCameraConfig};
use crate::game_server::error::SessionError;
use crate::game_server::vehicle::{Axle, Pose};

/// A selectable car and its drivetrain tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSpec {
    pub name: String,
    pub max_torque: f32,
    /// Maximum steer angle in degrees
    pub max_steer_angle: f32,
    pub steer_smoothing: f32,
    pub brake_force: f32,
    /// Wheel layout in physics order
    pub wheels: Vec<Axle>,
}

impl Default for CarSpec {
    fn default() -> Self {
        Self {
            name: "Car".to_string(),
            max_torque: 1500.0,
            max_steer_angle: 30.0,
            steer_smoothing: 0.2,
            brake_force: 3000.0,
            wheels: vec![Axle::Front, Axle::Front, Axle::Rear, Axle::Rear],
        }
    }
}

/// A selectable map with one spawn pose per player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSpec {
    pub name: String,
    pub spawns: [Pose; 2],
}

impl MapSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawns: [
                Pose::new(Vec3::new(-2.0, 0.0, 0.0), Quat::IDENTITY),
                Pose::new(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY),
            ],
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Car roster shared by both selection slots
    pub cars: Vec<CarSpec>,
    /// Map roster
    pub maps: Vec<MapSpec>,
    /// Where each slot's preview car is displayed during selection
    pub preview_anchors: [Pose; 2],
    /// Countdown starting value (seconds)
    pub countdown_start: f32,
    /// How long the GO banner stays up after control is enabled
    pub go_hold: f32,
    /// Start-line crossings needed to finish
    pub win_threshold: u32,
    /// Trigger tag of the start/finish line
    pub start_line_tag: String,
    pub chase_camera: ChaseCameraConfig,
    pub selection_camera: SelectionCameraConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cars: (1..=5)
                .map(|i| CarSpec {
                    name: format!("Car {i}"),
                    ..CarSpec::default()
                })
                .collect(),
            maps: (1..=3).map(|i| MapSpec::new(format!("Track {i}"))).collect(),
            preview_anchors: [
                Pose::new(Vec3::new(-3.0, 0.0, 5.0), Quat::IDENTITY),
                Pose::new(Vec3::new(3.0, 0.0, 5.0), Quat::IDENTITY),
            ],
            countdown_start: 6.0,
            go_hold: 2.0,
            win_threshold: 4,
            start_line_tag: "Start".to_string(),
            chase_camera: ChaseCameraConfig::default(),
            selection_camera: SelectionCameraConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(content: &str) -> Result<Self, SessionError> {
        let config: SessionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load_from_path(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check that a session can be built from this config.
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), SessionError> {
        self.validate_cars()?;
        self.validate_maps()?;
        self.validate_race()?;
        self.chase_camera.validate()?;
        Ok(())
    }

    fn validate_cars(&self) -> Result<(), SessionError> {
        if self.cars.is_empty() {
            return Err(SessionError::config_validation(
                "cars",
                "car roster cannot be empty",
            ));
        }

        for (idx, car) in self.cars.iter().enumerate() {
            if car.wheels.is_empty() {
                return Err(SessionError::config_validation(
                    format!("cars[{idx}].wheels"),
                    format!("car '{}' has no wheels", car.name),
                ));
            }

            let tuning = [
                ("max_torque", car.max_torque),
                ("max_steer_angle", car.max_steer_angle),
                ("brake_force", car.brake_force),
            ];
            for (field, value) in tuning {
                if !value.is_finite() || value < 0.0 {
                    return Err(SessionError::config_validation(
                        format!("cars[{idx}].{field}"),
                        format!("must be finite and >= 0, got {value}"),
                    ));
                }
            }

            if !(0.0..=1.0).contains(&car.steer_smoothing) {
                return Err(SessionError::config_validation(
                    format!("cars[{idx}].steer_smoothing"),
                    format!("must be within [0, 1], got {}", car.steer_smoothing),
                ));
            }
        }
        Ok(())
    }

    fn validate_maps(&self) -> Result<(), SessionError> {
        if self.maps.is_empty() {
            return Err(SessionError::config_validation(
                "maps",
                "map roster cannot be empty",
            ));
        }
        Ok(())
    }

    fn validate_race(&self) -> Result<(), SessionError> {
        if !self.countdown_start.is_finite() || self.countdown_start < 0.0 {
            return Err(SessionError::config_validation(
                "countdown_start",
                format!("must be finite and >= 0, got {}", self.countdown_start),
            ));
        }
        if !self.go_hold.is_finite() || self.go_hold < 0.0 {
            return Err(SessionError::config_validation(
                "go_hold",
                format!("must be finite and >= 0, got {}", self.go_hold),
            ));
        }
        if self.win_threshold == 0 {
            return Err(SessionError::config_validation(
                "win_threshold",
                "must be at least 1",
            ));
        }
        if self.start_line_tag.is_empty() {
            return Err(SessionError::config_validation(
                "start_line_tag",
                "start line tag cannot be empty",
            ));
        }
        Ok(())
    }

    /// Laps shown on the HUD once the race is won
    pub fn race_laps(&self) -> u32 {
        self.win_threshold.saturating_sub(1)
    }
}
