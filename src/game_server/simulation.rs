//! Simulation - Session context and tick loop
//!
//! `GameServer` is the one process-wide context: it owns the menu flow, the
//! selection carousel, the active race and the cameras. Collaborators are
//! passed in per call, so nothing here is global.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::game_server::camera::{CameraView, ChaseCamera, SelectionCamera};
use crate::game_server::config::SessionConfig;
use crate::game_server::error::SessionError;
use crate::game_server::host::{InputSource, PhysicsHost, PreviewBoard};
use crate::game_server::race::{RaceSession, RaceSnapshot};
use crate::game_server::selection::{SelectionCarousel, SelectionSnapshot};
use crate::game_server::vehicle::{Pose, VehicleId};

/// Samples kept for the tick time average
const TICK_SAMPLES: usize = 60;

/// Where the player is in the menu/race flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    MainMenu,
    CarSelection,
    Racing,
    Results,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub fixed_ticks: u64,
    pub avg_tick_time_ms: f32,
    pub game_state: GameState,
}

/// Main game server
pub struct GameServer {
    config: SessionConfig,
    /// Current game state
    state: GameState,
    selection: SelectionCarousel,
    previews: PreviewBoard,
    menu_camera: SelectionCamera,
    /// Active race (if any)
    race: Option<RaceSession>,
    chase_cameras: Option<[ChaseCamera; 2]>,
    /// Recent fixed tick durations for averaging
    tick_times: Vec<f32>,
    fixed_ticks: u64,
}

impl GameServer {
    /// Create a game server, failing fast on an unusable config
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let selection = SelectionCarousel::from_config(&config)?;
        let menu_camera = SelectionCamera::new(config.selection_camera);

        log::info!(
            "Game server ready with {} cars and {} maps",
            config.cars.len(),
            config.maps.len()
        );

        Ok(Self {
            config,
            state: GameState::MainMenu,
            selection,
            previews: PreviewBoard::default(),
            menu_camera,
            race: None,
            chase_cameras: None,
            tick_times: Vec::with_capacity(TICK_SAMPLES),
            fixed_ticks: 0,
        })
    }

    fn require(&self, action: &'static str, allowed: &[GameState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::invalid_transition(action, self.state))
        }
    }

    /// Show the car selection view with one preview per slot
    pub fn enter_selection_view(&mut self) -> Result<(), SessionError> {
        self.require("enter selection", &[GameState::MainMenu])?;
        self.menu_camera.show(CameraView::Selection);
        self.selection.show_previews(&mut self.previews);
        self.state = GameState::CarSelection;
        log::info!("Entered car selection");
        Ok(())
    }

    /// Return to the main menu, releasing both previews
    pub fn exit_selection_view(&mut self) -> Result<(), SessionError> {
        self.require("exit selection", &[GameState::CarSelection])?;
        self.menu_camera.show(CameraView::Main);
        self.selection.hide_previews(&mut self.previews);
        self.state = GameState::MainMenu;
        log::info!("Left car selection");
        Ok(())
    }

    pub fn advance_car(&mut self, slot: VehicleId) -> Result<(), SessionError> {
        self.require("change car", &[GameState::CarSelection])?;
        self.selection.advance(slot, &mut self.previews);
        Ok(())
    }

    pub fn retreat_car(&mut self, slot: VehicleId) -> Result<(), SessionError> {
        self.require("change car", &[GameState::CarSelection])?;
        self.selection.retreat(slot, &mut self.previews);
        Ok(())
    }

    pub fn advance_map(&mut self) -> Result<(), SessionError> {
        self.require("change map", &[GameState::MainMenu, GameState::CarSelection])?;
        self.selection.advance_map();
        Ok(())
    }

    pub fn retreat_map(&mut self) -> Result<(), SessionError> {
        self.require("change map", &[GameState::MainMenu, GameState::CarSelection])?;
        self.selection.retreat_map();
        Ok(())
    }

    /// Finalize the selection and start a race
    pub fn play(&mut self) -> Result<(), SessionError> {
        self.require("start race", &[GameState::CarSelection])?;
        self.start_session()?;
        self.selection.hide_previews(&mut self.previews);
        self.menu_camera.show(CameraView::Main);
        Ok(())
    }

    /// Replace the current race with a fresh one using the same choices
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.require("restart", &[GameState::Racing, GameState::Results])?;
        self.start_session()?;
        log::info!("Race restarted");
        Ok(())
    }

    /// Drop the current race and go back to the main menu
    pub fn return_to_menu(&mut self) -> Result<(), SessionError> {
        self.require("return to menu", &[GameState::Racing, GameState::Results])?;
        self.race = None;
        self.chase_cameras = None;
        self.menu_camera.show(CameraView::Main);
        self.state = GameState::MainMenu;
        log::info!("Returned to main menu");
        Ok(())
    }

    fn start_session(&mut self) -> Result<(), SessionError> {
        let race = RaceSession::new(
            &self.config,
            self.selection.car_indices(),
            self.selection.map_index(),
        )?;

        let chase = self.config.chase_camera;
        self.chase_cameras = Some(
            VehicleId::ALL.map(|id| ChaseCamera::new(id, &race.vehicle(id).chassis_pose, chase)),
        );
        self.race = Some(race);
        self.state = GameState::Racing;
        Ok(())
    }

    /// Run one fixed tick.
    ///
    /// Order: sample input, advance the countdown, translate commands,
    /// integrate physics and copy poses back, feed trigger events to the
    /// lap tracker, then check for a finish.
    pub fn fixed_tick<I, P>(
        &mut self,
        dt: f32,
        input: &mut I,
        physics: &mut P,
    ) -> Option<RaceSnapshot>
    where
        I: InputSource,
        P: PhysicsHost,
    {
        let race = self.race.as_mut()?;
        let tick_start = Instant::now();

        let inputs = VehicleId::ALL.map(|id| input.sample(id));
        race.advance_clock(dt);
        race.drive(inputs);

        for vehicle in race.vehicles() {
            for (wheel, command) in vehicle.wheel_commands() {
                physics.apply_wheel(vehicle.id, wheel, command);
            }
        }
        physics.integrate(dt);

        for id in VehicleId::ALL {
            let vehicle = race.vehicle_mut(id);
            if let Some(pose) = physics.chassis_pose(id) {
                vehicle.chassis_pose = pose;
            }
            for (i, wheel) in vehicle.wheels.iter_mut().enumerate() {
                if let Some(pose) = physics.wheel_pose(id, i) {
                    wheel.current_pose = pose;
                }
            }
        }

        race.record_checkpoints(physics.drain_checkpoints());
        if race.evaluate_finish().is_some() {
            self.state = GameState::Results;
        }

        let snapshot = race.get_snapshot();

        self.fixed_ticks += 1;
        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > TICK_SAMPLES {
            self.tick_times.remove(0);
        }

        Some(snapshot)
    }

    /// Run one display frame: move the chase cameras toward their cars
    pub fn frame_tick(&mut self, dt: f32) -> Option<[Pose; 2]> {
        let race = self.race.as_ref()?;
        let cameras = self.chase_cameras.as_mut()?;

        for camera in cameras.iter_mut() {
            camera.update(&race.vehicle(camera.target).chassis_pose, dt);
        }
        Some([cameras[0].pose, cameras[1].pose])
    }

    /// Get current race snapshot
    pub fn get_snapshot(&self) -> Option<RaceSnapshot> {
        self.race.as_ref().map(|r| r.get_snapshot())
    }

    pub fn get_selection(&self) -> SelectionSnapshot {
        self.selection.get_snapshot()
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            fixed_ticks: self.fixed_ticks,
            avg_tick_time_ms: avg_tick_time,
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }

    pub fn race(&self) -> Option<&RaceSession> {
        self.race.as_ref()
    }

    pub fn selection(&self) -> &SelectionCarousel {
        &self.selection
    }

    pub fn previews(&self) -> &PreviewBoard {
        &self.previews
    }

    pub fn menu_camera(&self) -> &SelectionCamera {
        &self.menu_camera
    }

    pub fn chase_cameras(&self) -> Option<&[ChaseCamera; 2]> {
        self.chase_cameras.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
