//! Race - Session lifecycle and finish detection
//!
//! A session runs Countdown -> Racing -> Finished. The countdown releases
//! the control latch once it drops below one second; the latch then stays
//! set until the session is replaced.

use serde::{Deserialize, Serialize};

use crate::game_server::config::SessionConfig;
use crate::game_server::error::SessionError;
use crate::game_server::laps::{displayed_laps, CheckpointEvent, LapTracker};
use crate::game_server::vehicle::{DriveCommand, PlayerInput, Pose, Vehicle, VehicleId};

/// Countdown value below which control is released
const GO_THRESHOLD: f64 = 1.0;

/// Slack for accumulated tick rounding; well below any real tick length
const CLOCK_EPSILON: f64 = 1e-5;

/// Race phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Countdown,
    Racing,
    Finished,
}

/// What the start banner should show; formatting is left to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownBanner {
    /// Seconds left, rounded
    Ready(u32),
    Go,
    Hidden,
}

/// A single race between the two players
#[derive(Debug, Clone)]
pub struct RaceSession {
    phase: RacePhase,
    countdown_start: f64,
    /// Time run off the countdown clock, accumulated in f64 so long runs of
    /// fixed ticks do not drift. Keeps running past GO to time the banner.
    clock_elapsed: f64,
    go_hold: f64,
    win_threshold: u32,
    control_enabled: bool,
    winner: Option<VehicleId>,
    /// Racing time since GO (seconds)
    elapsed_time: f64,
    finish_time: Option<f32>,
    map_index: usize,
    vehicles: [Vehicle; 2],
    laps: LapTracker,
}

impl RaceSession {
    /// Build a session for the chosen cars on the chosen map.
    ///
    /// Fails if any roster index has no matching asset.
    pub fn new(
        config: &SessionConfig,
        cars: [usize; 2],
        map_index: usize,
    ) -> Result<Self, SessionError> {
        let map = config
            .maps
            .get(map_index)
            .ok_or(SessionError::MissingAsset {
                kind: "map",
                index: map_index,
            })?;

        let vehicles = [
            Self::build_vehicle(config, VehicleId::P1, cars, map.spawns)?,
            Self::build_vehicle(config, VehicleId::P2, cars, map.spawns)?,
        ];

        log::info!(
            "Race session created on '{}' with cars {} vs {}",
            map.name,
            config.cars[cars[0]].name,
            config.cars[cars[1]].name
        );

        Ok(Self {
            phase: RacePhase::Countdown,
            countdown_start: f64::from(config.countdown_start),
            clock_elapsed: 0.0,
            go_hold: f64::from(config.go_hold),
            win_threshold: config.win_threshold,
            control_enabled: false,
            winner: None,
            elapsed_time: 0.0,
            finish_time: None,
            map_index,
            vehicles,
            laps: LapTracker::new(config.start_line_tag.clone()),
        })
    }

    fn build_vehicle(
        config: &SessionConfig,
        id: VehicleId,
        cars: [usize; 2],
        spawns: [Pose; 2],
    ) -> Result<Vehicle, SessionError> {
        let car_index = cars[id.index()];
        let spec = config.cars.get(car_index).ok_or(SessionError::MissingAsset {
            kind: "car",
            index: car_index,
        })?;
        if spec.wheels.is_empty() {
            return Err(SessionError::config_validation(
                format!("cars[{car_index}].wheels"),
                format!("car '{}' has no wheels", spec.name),
            ));
        }
        Ok(Vehicle::new(id, car_index, spec, spawns[id.index()]))
    }

    /// Advance the countdown and race clocks
    pub fn advance_clock(&mut self, delta: f32) {
        let delta = if delta.is_finite() {
            f64::from(delta.max(0.0))
        } else {
            0.0
        };

        match self.phase {
            RacePhase::Countdown => {
                self.clock_elapsed += delta;
                let clock = self.clock();
                if clock < GO_THRESHOLD - CLOCK_EPSILON {
                    self.phase = RacePhase::Racing;
                    self.control_enabled = true;
                    // the part of this tick spent past the threshold is race time
                    self.elapsed_time = (GO_THRESHOLD - clock).min(delta);
                    log::info!("Countdown complete, control enabled");
                }
            }

            RacePhase::Racing => {
                self.elapsed_time += delta;
                self.run_go_banner(delta);
            }

            RacePhase::Finished => self.run_go_banner(delta),
        }
    }

    fn clock(&self) -> f64 {
        self.countdown_start - self.clock_elapsed
    }

    fn run_go_banner(&mut self, delta: f64) {
        if self.clock() >= -self.go_hold {
            self.clock_elapsed += delta;
        }
    }

    /// Translate both players' input into drivetrain commands
    pub fn drive(&mut self, inputs: [PlayerInput; 2]) {
        let enabled = self.control_enabled;
        for vehicle in &mut self.vehicles {
            vehicle.drive(inputs[vehicle.id.index()], enabled);
        }
    }

    /// Feed checkpoint events to the lap tracker in receipt order
    pub fn record_checkpoints<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = CheckpointEvent>,
    {
        self.laps.drain(events, &mut self.vehicles)
    }

    /// Finish the race once either vehicle reaches the win threshold.
    ///
    /// Returns the winner on the tick the race finishes. Equal lap counts
    /// go to P2.
    pub fn evaluate_finish(&mut self) -> Option<VehicleId> {
        if self.phase != RacePhase::Racing {
            return None;
        }

        let p1 = self.vehicles[0].lap_count();
        let p2 = self.vehicles[1].lap_count();
        if p1 < self.win_threshold && p2 < self.win_threshold {
            return None;
        }

        let winner = if p1 > p2 { VehicleId::P1 } else { VehicleId::P2 };
        self.phase = RacePhase::Finished;
        self.winner = Some(winner);
        self.finish_time = Some(self.elapsed_time as f32);
        log::info!(
            "Race finished: {:?} wins ({} - {}) after {:.2}s",
            winner,
            p1,
            p2,
            self.elapsed_time
        );
        Some(winner)
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    /// Countdown seconds left, floored at zero
    pub fn countdown_remaining(&self) -> f32 {
        self.clock().max(0.0) as f32
    }

    pub fn control_enabled(&self) -> bool {
        self.control_enabled
    }

    pub fn winner(&self) -> Option<VehicleId> {
        self.winner
    }

    /// Racing time since GO
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time as f32
    }

    pub fn map_index(&self) -> usize {
        self.map_index
    }

    pub fn win_threshold(&self) -> u32 {
        self.win_threshold
    }

    pub fn banner(&self) -> CountdownBanner {
        match self.phase {
            RacePhase::Countdown => CountdownBanner::Ready(self.clock().round().max(0.0) as u32),
            _ if self.clock() >= -self.go_hold => CountdownBanner::Go,
            _ => CountdownBanner::Hidden,
        }
    }

    pub fn vehicles(&self) -> &[Vehicle; 2] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> &Vehicle {
        &self.vehicles[id.index()]
    }

    pub(crate) fn vehicle_mut(&mut self, id: VehicleId) -> &mut Vehicle {
        &mut self.vehicles[id.index()]
    }

    /// Laps shown on the HUD for one vehicle
    pub fn displayed_laps(&self, id: VehicleId) -> u32 {
        displayed_laps(self.vehicle(id).lap_count(), self.win_threshold)
    }

    /// Get compact snapshot for the display layer
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            phase: self.phase,
            countdown_remaining: self.countdown_remaining(),
            banner: self.banner(),
            control_enabled: self.control_enabled,
            winner: self.winner,
            elapsed_time: self.elapsed_time(),
            finish_time: self.finish_time,
            map_index: self.map_index,
            race_laps: self.win_threshold.saturating_sub(1),
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleSnapshot::from_vehicle(v, self.win_threshold))
                .collect(),
        }
    }
}

/// Compact race snapshot for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: RacePhase,
    pub countdown_remaining: f32,
    pub banner: CountdownBanner,
    pub control_enabled: bool,
    pub winner: Option<VehicleId>,
    pub elapsed_time: f32,
    pub finish_time: Option<f32>,
    pub map_index: usize,
    pub race_laps: u32,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Compact vehicle state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub car_index: usize,
    pub lap_count: u32,
    pub displayed_laps: u32,
    pub command: DriveCommand,
    pub chassis_pose: Pose,
    pub wheel_poses: Vec<Pose>,
}

impl VehicleSnapshot {
    fn from_vehicle(vehicle: &Vehicle, win_threshold: u32) -> Self {
        Self {
            id: vehicle.id,
            car_index: vehicle.car_index,
            lap_count: vehicle.lap_count(),
            displayed_laps: displayed_laps(vehicle.lap_count(), win_threshold),
            command: vehicle.command,
            chassis_pose: vehicle.chassis_pose,
            wheel_poses: vehicle.wheels.iter().map(|w| w.current_pose).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RaceSession {
        RaceSession::new(&SessionConfig::default(), [0, 1], 0).unwrap()
    }

    fn crossings(vehicle: VehicleId, count: usize) -> Vec<CheckpointEvent> {
        vec![CheckpointEvent::new(vehicle, "Start"); count]
    }

    fn run_countdown(race: &mut RaceSession) {
        for _ in 0..11 {
            race.advance_clock(0.5);
        }
        assert_eq!(race.phase(), RacePhase::Racing);
    }

    #[test]
    fn countdown_releases_control_below_one() {
        let mut race = session();
        assert_eq!(race.phase(), RacePhase::Countdown);
        assert_eq!(race.banner(), CountdownBanner::Ready(6));

        for _ in 0..10 {
            race.advance_clock(0.5);
        }
        assert_eq!(race.phase(), RacePhase::Countdown);
        assert!(!race.control_enabled());
        assert_eq!(race.countdown_remaining(), 1.0);

        race.advance_clock(0.1);
        assert_eq!(race.phase(), RacePhase::Racing);
        assert!(race.control_enabled());
        assert_eq!(race.banner(), CountdownBanner::Go);
    }

    #[test]
    fn countdown_holds_at_realistic_tick_rates() {
        for (dt, ticks_to_five) in [(1.0f32 / 60.0, 300), (0.01f32, 500), (0.02f32, 250)] {
            let mut race = session();
            for _ in 0..ticks_to_five {
                race.advance_clock(dt);
            }
            assert_eq!(race.phase(), RacePhase::Countdown, "dt {dt}");
            assert!(!race.control_enabled(), "dt {dt}");

            // another tenth of a second
            let extra = (0.1 / dt).round() as usize;
            for _ in 0..extra {
                race.advance_clock(dt);
            }
            assert_eq!(race.phase(), RacePhase::Racing, "dt {dt}");
            assert!(race.control_enabled(), "dt {dt}");
        }
    }

    #[test]
    fn race_time_includes_overshoot_of_go_tick() {
        let mut race = session();
        for _ in 0..10 {
            race.advance_clock(0.5);
        }
        assert_eq!(race.elapsed_time(), 0.0);

        race.advance_clock(0.25);
        assert_eq!(race.phase(), RacePhase::Racing);
        assert_eq!(race.elapsed_time(), 0.25);

        race.advance_clock(0.5);
        assert_eq!(race.elapsed_time(), 0.75);

        race.record_checkpoints(crossings(VehicleId::P2, race.win_threshold() as usize));
        assert_eq!(race.evaluate_finish(), Some(VehicleId::P2));
        assert_eq!(race.get_snapshot().finish_time, Some(0.75));
    }

    #[test]
    fn zero_countdown_starts_racing_immediately() {
        let config = SessionConfig {
            countdown_start: 0.0,
            ..SessionConfig::default()
        };
        let mut race = RaceSession::new(&config, [0, 1], 0).unwrap();

        race.advance_clock(0.02);
        assert_eq!(race.phase(), RacePhase::Racing);
        assert!(race.elapsed_time() <= 0.02);
    }

    #[test]
    fn latch_stays_set_for_the_session() {
        let mut race = session();
        run_countdown(&mut race);

        for _ in 0..100 {
            race.advance_clock(0.1);
            assert!(race.control_enabled());
        }
        race.record_checkpoints(crossings(VehicleId::P1, 4));
        race.evaluate_finish();
        race.advance_clock(0.1);
        assert!(race.control_enabled());
    }

    #[test]
    fn go_banner_hides_after_hold() {
        let mut race = session();
        run_countdown(&mut race);
        // clock is at 0.5 after the countdown
        race.advance_clock(2.0);
        assert_eq!(race.banner(), CountdownBanner::Go);
        race.advance_clock(1.0);
        assert_eq!(race.banner(), CountdownBanner::Hidden);
        assert_eq!(race.countdown_remaining(), 0.0);
    }

    #[test]
    fn no_finish_during_countdown() {
        let mut race = session();
        race.record_checkpoints(crossings(VehicleId::P1, 4));
        assert_eq!(race.evaluate_finish(), None);
        assert_eq!(race.phase(), RacePhase::Countdown);
    }

    #[test]
    fn fourth_crossing_wins_with_three_laps() {
        let mut race = session();
        run_countdown(&mut race);

        race.record_checkpoints(crossings(VehicleId::P1, 3));
        assert_eq!(race.evaluate_finish(), None);

        race.record_checkpoints(crossings(VehicleId::P1, 1));
        assert_eq!(race.evaluate_finish(), Some(VehicleId::P1));
        assert_eq!(race.phase(), RacePhase::Finished);
        assert_eq!(race.displayed_laps(VehicleId::P1), 3);
    }

    #[test]
    fn leader_wins() {
        let mut race = session();
        run_countdown(&mut race);

        race.record_checkpoints(crossings(VehicleId::P1, 3));
        race.record_checkpoints(crossings(VehicleId::P2, 4));
        assert_eq!(race.evaluate_finish(), Some(VehicleId::P2));
        assert_eq!(race.winner(), Some(VehicleId::P2));
    }

    #[test]
    fn tie_goes_to_second_player() {
        let mut race = session();
        run_countdown(&mut race);

        race.record_checkpoints(crossings(VehicleId::P1, 4));
        race.record_checkpoints(crossings(VehicleId::P2, 4));
        assert_eq!(race.evaluate_finish(), Some(VehicleId::P2));
    }

    #[test]
    fn finished_is_terminal() {
        let mut race = session();
        run_countdown(&mut race);

        race.record_checkpoints(crossings(VehicleId::P1, 4));
        race.evaluate_finish();
        race.record_checkpoints(crossings(VehicleId::P2, 6));
        assert_eq!(race.evaluate_finish(), None);
        assert_eq!(race.winner(), Some(VehicleId::P1));
        assert_eq!(race.vehicle(VehicleId::P2).lap_count(), 6);
    }

    #[test]
    fn drive_is_gated_by_latch() {
        let mut race = session();
        let input = PlayerInput {
            throttle: 1.0,
            steer: 1.0,
            brake: true,
        };

        race.drive([input, input]);
        for vehicle in race.vehicles() {
            assert_eq!(vehicle.command, DriveCommand::IDLE);
        }

        run_countdown(&mut race);
        race.drive([input, PlayerInput::default()]);
        assert!(race.vehicle(VehicleId::P1).command.motor_torque > 0.0);
        assert_eq!(race.vehicle(VehicleId::P2).command, DriveCommand::IDLE);
    }

    #[test]
    fn missing_assets_fail_session_start() {
        let config = SessionConfig::default();
        let err = RaceSession::new(&config, [0, 9], 0).unwrap_err();
        assert!(matches!(err, SessionError::MissingAsset { kind: "car", index: 9 }));

        let err = RaceSession::new(&config, [0, 0], 3).unwrap_err();
        assert!(matches!(err, SessionError::MissingAsset { kind: "map", index: 3 }));
    }

    #[test]
    fn vehicles_spawn_on_map_anchors() {
        let config = SessionConfig::default();
        let race = RaceSession::new(&config, [2, 4], 1).unwrap();
        for id in VehicleId::ALL {
            assert_eq!(race.vehicle(id).chassis_pose, config.maps[1].spawns[id.index()]);
        }
        assert_eq!(race.vehicle(VehicleId::P2).car_index, 4);
    }

    #[test]
    fn snapshot_reports_hud_values() {
        let mut race = session();
        race.record_checkpoints(crossings(VehicleId::P2, 2));
        let snapshot = race.get_snapshot();

        assert_eq!(snapshot.phase, RacePhase::Countdown);
        assert_eq!(snapshot.race_laps, 3);
        assert_eq!(snapshot.vehicles.len(), 2);
        assert_eq!(snapshot.vehicles[1].lap_count, 2);
        assert_eq!(snapshot.vehicles[1].displayed_laps, 1);
        assert_eq!(snapshot.vehicles[0].wheel_poses.len(), 4);
    }
}
