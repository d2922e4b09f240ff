//! Duel Racer - Tauri Backend
//!
//! Session controller for a local two-player arcade race, plus (with the
//! `desktop` feature) the commands the frontend uses to drive it.

pub mod game_server;

pub use game_server::*;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use std::path::Path;
    use std::sync::Mutex;

    use serde::Serialize;
    use tauri::{Manager, State};

    use crate::game_server::host::{BufferedPhysics, PhysicsReport, PreviewEntry};
    use crate::game_server::race::RaceSnapshot;
    use crate::game_server::selection::SelectionSnapshot;
    use crate::game_server::simulation::{GameServer, GameState, ServerStats};
    use crate::game_server::vehicle::{DriveCommand, PlayerInput, Pose, VehicleId};
    use crate::game_server::SessionConfig;

    /// Environment variable pointing at a JSON session config
    const CONFIG_ENV: &str = "DUEL_RACER_CONFIG";

    /// Server plus the physics buffer shared with the frontend engine
    pub struct Desktop {
        server: GameServer,
        physics: BufferedPhysics,
    }

    /// Result of a fixed tick: race state and the wheel commands to integrate
    #[derive(Serialize)]
    struct TickOutput {
        snapshot: RaceSnapshot,
        commands: [Vec<DriveCommand>; 2],
    }

    /// Everything the selection screen draws
    #[derive(Serialize)]
    struct SelectionView {
        selection: SelectionSnapshot,
        previews: Vec<PreviewEntry>,
        camera: Pose,
    }

    fn with_server<T>(
        state: &State<'_, Mutex<Desktop>>,
        f: impl FnOnce(&mut GameServer) -> Result<T, crate::SessionError>,
    ) -> Result<T, String> {
        let mut desktop = state.lock().map_err(|e| e.to_string())?;
        f(&mut desktop.server).map_err(|e| e.to_string())
    }

    /// Show the car selection view
    #[tauri::command]
    fn enter_selection(state: State<'_, Mutex<Desktop>>) -> Result<(), String> {
        with_server(&state, GameServer::enter_selection_view)
    }

    /// Leave the car selection view
    #[tauri::command]
    fn exit_selection(state: State<'_, Mutex<Desktop>>) -> Result<(), String> {
        with_server(&state, GameServer::exit_selection_view)
    }

    /// Cycle a slot's car forward or backward
    #[tauri::command]
    fn cycle_car(
        state: State<'_, Mutex<Desktop>>,
        slot: VehicleId,
        forward: bool,
    ) -> Result<(), String> {
        with_server(&state, |server| {
            if forward {
                server.advance_car(slot)
            } else {
                server.retreat_car(slot)
            }
        })
    }

    /// Cycle the map forward or backward
    #[tauri::command]
    fn cycle_map(state: State<'_, Mutex<Desktop>>, forward: bool) -> Result<(), String> {
        with_server(&state, |server| {
            if forward {
                server.advance_map()
            } else {
                server.retreat_map()
            }
        })
    }

    /// Start a race with the current selection
    #[tauri::command]
    fn play(state: State<'_, Mutex<Desktop>>) -> Result<(), String> {
        with_server(&state, GameServer::play)
    }

    /// Restart the race with the same cars and map
    #[tauri::command]
    fn restart_race(state: State<'_, Mutex<Desktop>>) -> Result<(), String> {
        with_server(&state, GameServer::restart)
    }

    /// Abandon the race and return to the main menu
    #[tauri::command]
    fn return_to_menu(state: State<'_, Mutex<Desktop>>) -> Result<(), String> {
        with_server(&state, GameServer::return_to_menu)
    }

    /// Hand physics results for the last step to the server
    #[tauri::command]
    fn submit_physics(
        state: State<'_, Mutex<Desktop>>,
        report: PhysicsReport,
    ) -> Result<(), String> {
        let mut desktop = state.lock().map_err(|e| e.to_string())?;
        desktop.physics.submit(report);
        Ok(())
    }

    /// Perform a fixed tick and return the commands to integrate
    #[tauri::command]
    fn fixed_tick(
        state: State<'_, Mutex<Desktop>>,
        dt: f32,
        inputs: [PlayerInput; 2],
    ) -> Result<Option<TickOutput>, String> {
        let mut desktop = state.lock().map_err(|e| e.to_string())?;
        let Desktop { server, physics } = &mut *desktop;
        let mut inputs = inputs;

        Ok(server
            .fixed_tick(dt, &mut inputs, physics)
            .map(|snapshot| TickOutput {
                snapshot,
                commands: VehicleId::ALL.map(|id| physics.commands(id).to_vec()),
            }))
    }

    /// Advance the chase cameras by one display frame
    #[tauri::command]
    fn frame_tick(state: State<'_, Mutex<Desktop>>, dt: f32) -> Result<Option<[Pose; 2]>, String> {
        let mut desktop = state.lock().map_err(|e| e.to_string())?;
        Ok(desktop.server.frame_tick(dt))
    }

    /// Get current race snapshot without advancing simulation
    #[tauri::command]
    fn get_snapshot(state: State<'_, Mutex<Desktop>>) -> Result<Option<RaceSnapshot>, String> {
        let desktop = state.lock().map_err(|e| e.to_string())?;
        Ok(desktop.server.get_snapshot())
    }

    /// Get the selection screen state
    #[tauri::command]
    fn get_selection(state: State<'_, Mutex<Desktop>>) -> Result<SelectionView, String> {
        let desktop = state.lock().map_err(|e| e.to_string())?;
        Ok(SelectionView {
            selection: desktop.server.get_selection(),
            previews: desktop.server.previews().entries().to_vec(),
            camera: desktop.server.menu_camera().pose,
        })
    }

    /// Get server statistics
    #[tauri::command]
    fn get_stats(state: State<'_, Mutex<Desktop>>) -> Result<ServerStats, String> {
        let desktop = state.lock().map_err(|e| e.to_string())?;
        Ok(desktop.server.get_stats())
    }

    /// Get current game state
    #[tauri::command]
    fn get_game_state(state: State<'_, Mutex<Desktop>>) -> Result<GameState, String> {
        let desktop = state.lock().map_err(|e| e.to_string())?;
        Ok(desktop.server.get_state())
    }

    fn load_config() -> Result<SessionConfig, crate::SessionError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                log::info!("Loading session config from {}", path);
                SessionConfig::load_from_path(Path::new(&path))
            }
            Err(_) => Ok(SessionConfig::default()),
        }
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        tauri::Builder::default()
            .setup(|app| {
                if cfg!(debug_assertions) {
                    app.handle().plugin(
                        tauri_plugin_log::Builder::default()
                            .level(log::LevelFilter::Info)
                            .build(),
                    )?;
                }

                let server = GameServer::new(load_config()?)?;
                app.manage(Mutex::new(Desktop {
                    server,
                    physics: BufferedPhysics::default(),
                }));
                log::info!("Duel Racer session controller initialized");
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                enter_selection,
                exit_selection,
                cycle_car,
                cycle_map,
                play,
                restart_race,
                return_to_menu,
                submit_physics,
                fixed_tick,
                frame_tick,
                get_snapshot,
                get_selection,
                get_stats,
                get_game_state,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
