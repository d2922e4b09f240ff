//! Game Server Module
//!
//! Local two-player race session controller: selection carousel, race
//! lifecycle, input translation, lap counting and camera rigs.
//! The frontend reaches it through Tauri commands.

pub mod camera;
pub mod config;
pub mod error;
pub mod host;
pub mod laps;
pub mod race;
pub mod selection;
pub mod simulation;
pub mod vehicle;

pub use camera::{CameraView, ChaseCamera, SelectionCamera};
pub use config::{CarSpec, MapSpec, SessionConfig};
pub use error::SessionError;
pub use host::{BufferedPhysics, InputSource, PhysicsHost, PhysicsReport, PreviewBoard, SceneHost};
pub use laps::{CheckpointEvent, LapTracker};
pub use race::{CountdownBanner, RacePhase, RaceSession, RaceSnapshot};
pub use selection::SelectionCarousel;
pub use simulation::{GameServer, GameState};
pub use vehicle::{Axle, DriveCommand, PlayerInput, Pose, Vehicle, VehicleId};
