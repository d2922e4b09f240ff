use duel_racer_lib::game_server::host::PhysicsHost;
use duel_racer_lib::game_server::race::CountdownBanner;
use duel_racer_lib::{
    CheckpointEvent, DriveCommand, GameServer, GameState, PlayerInput, Pose, RacePhase,
    SessionConfig, VehicleId,
};
use glam::{Quat, Vec3};

const DT: f32 = 0.02;

/// Straight-line stand-in for the physics engine: speed follows the first
/// wheel's motor torque and every `lap_length` metres is a start line.
struct LineTrack {
    lap_length: f32,
    distance: [f32; 2],
    commands: [Vec<DriveCommand>; 2],
    events: Vec<CheckpointEvent>,
    steps: usize,
}

impl LineTrack {
    fn new() -> Self {
        Self {
            lap_length: 100.0,
            distance: [-1.0, -1.0],
            commands: Default::default(),
            events: Vec::new(),
            steps: 0,
        }
    }
}

impl PhysicsHost for LineTrack {
    fn apply_wheel(&mut self, vehicle: VehicleId, wheel: usize, command: DriveCommand) {
        let commands = &mut self.commands[vehicle.index()];
        if commands.len() <= wheel {
            commands.resize(wheel + 1, DriveCommand::IDLE);
        }
        commands[wheel] = command;
    }

    fn integrate(&mut self, dt: f32) {
        self.steps += 1;
        for id in VehicleId::ALL {
            let i = id.index();
            let torque = self.commands[i].first().map_or(0.0, |c| c.motor_torque);
            let before = (self.distance[i] / self.lap_length).floor();
            self.distance[i] += torque * 0.01 * dt;
            let after = (self.distance[i] / self.lap_length).floor();
            if after > before {
                self.events.push(CheckpointEvent::new(id, "Start"));
            }
        }
    }

    fn wheel_pose(&self, vehicle: VehicleId, wheel: usize) -> Option<Pose> {
        let chassis = self.chassis_pose(vehicle)?;
        Some(Pose::new(
            chassis.position + Vec3::new(wheel as f32, 0.0, 0.0),
            Quat::IDENTITY,
        ))
    }

    fn chassis_pose(&self, vehicle: VehicleId) -> Option<Pose> {
        let x = vehicle.index() as f32 * 4.0;
        Some(Pose::new(
            Vec3::new(x, 0.0, self.distance[vehicle.index()]),
            Quat::IDENTITY,
        ))
    }

    fn drain_checkpoints(&mut self) -> Vec<CheckpointEvent> {
        std::mem::take(&mut self.events)
    }
}

fn racing_server() -> GameServer {
    let mut server = GameServer::new(SessionConfig::default()).unwrap();
    server.enter_selection_view().unwrap();
    server.play().unwrap();
    server
}

fn full_throttle() -> PlayerInput {
    PlayerInput {
        throttle: 1.0,
        steer: 0.0,
        brake: false,
    }
}

#[test]
fn test_countdown_gates_commands() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [
        PlayerInput {
            throttle: 1.0,
            steer: -1.0,
            brake: true,
        };
        2
    ];

    let snapshot = server.fixed_tick(DT, &mut input, &mut physics).unwrap();
    assert_eq!(snapshot.phase, RacePhase::Countdown);
    assert!(!snapshot.control_enabled);
    assert_eq!(snapshot.banner, CountdownBanner::Ready(6));

    for id in VehicleId::ALL {
        let commands = &physics.commands[id.index()];
        assert_eq!(commands.len(), 4);
        assert!(commands.iter().all(|c| *c == DriveCommand::IDLE));
    }
    assert_eq!(physics.distance, [-1.0, -1.0]);
}

#[test]
fn test_full_race_leader_wins() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [
        full_throttle(),
        PlayerInput {
            throttle: 0.5,
            ..full_throttle()
        },
    ];

    let mut latched = false;
    let mut last_laps = [0u32; 2];
    let mut finished = None;

    for _ in 0..5000 {
        let snapshot = server.fixed_tick(DT, &mut input, &mut physics).unwrap();

        if latched {
            assert!(snapshot.control_enabled, "latch must never release");
        }
        latched |= snapshot.control_enabled;

        for v in &snapshot.vehicles {
            assert!(v.lap_count >= last_laps[v.id.index()]);
            last_laps[v.id.index()] = v.lap_count;
        }

        if snapshot.phase == RacePhase::Finished {
            finished = Some(snapshot);
            break;
        }
    }

    let snapshot = finished.expect("race should finish");
    assert_eq!(snapshot.winner, Some(VehicleId::P1));
    assert_eq!(snapshot.vehicles[0].lap_count, 4);
    assert_eq!(snapshot.vehicles[0].displayed_laps, 3);
    assert!(snapshot.vehicles[1].lap_count < 4);
    assert!(snapshot.finish_time.is_some());
    assert_eq!(server.get_state(), GameState::Results);
}

#[test]
fn test_crossing_counts_on_same_tick() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [full_throttle(), PlayerInput::default()];

    let mut previous = -1.0;
    for _ in 0..2000 {
        let snapshot = server.fixed_tick(DT, &mut input, &mut physics).unwrap();
        let now = physics.distance[0];
        if previous < 0.0 && now >= 0.0 {
            assert_eq!(snapshot.vehicles[0].lap_count, 1);
            return;
        }
        assert_eq!(snapshot.vehicles[0].lap_count, 0);
        previous = now;
    }
    panic!("P1 never reached the start line");
}

#[test]
fn test_poses_copied_from_physics() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [PlayerInput::default(); 2];
    server.fixed_tick(DT, &mut input, &mut physics).unwrap();

    let race = server.race().unwrap();
    for id in VehicleId::ALL {
        let vehicle = race.vehicle(id);
        assert_eq!(Some(vehicle.chassis_pose), physics.chassis_pose(id));
        for (i, wheel) in vehicle.wheels.iter().enumerate() {
            assert_eq!(Some(wheel.current_pose), physics.wheel_pose(id, i));
        }
    }
}

#[test]
fn test_unknown_vehicle_event_is_ignored() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [PlayerInput::default(); 2];

    physics.events.push(CheckpointEvent {
        vehicle: 9,
        trigger_tag: "Start".to_string(),
    });
    let snapshot = server.fixed_tick(DT, &mut input, &mut physics).unwrap();

    assert!(snapshot.vehicles.iter().all(|v| v.lap_count == 0));
    assert_eq!(snapshot.phase, RacePhase::Countdown);
}

#[test]
fn test_restart_clears_laps_and_latch() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [full_throttle(); 2];

    for _ in 0..400 {
        server.fixed_tick(DT, &mut input, &mut physics);
    }
    let before = server.get_snapshot().unwrap();
    assert!(before.control_enabled);
    assert!(before.vehicles[0].lap_count > 0);

    server.restart().unwrap();
    let after = server.get_snapshot().unwrap();
    assert_eq!(after.phase, RacePhase::Countdown);
    assert!(!after.control_enabled);
    assert!(after.winner.is_none());
    assert!(after.vehicles.iter().all(|v| v.lap_count == 0));
}

#[test]
fn test_chase_cameras_follow_their_cars() {
    let mut server = racing_server();
    let mut physics = LineTrack::new();
    let mut input = [full_throttle(), PlayerInput::default()];

    for _ in 0..600 {
        server.fixed_tick(DT, &mut input, &mut physics);
        server.frame_tick(1.0 / 60.0);
    }
    // settle on the final positions
    for _ in 0..120 {
        server.frame_tick(1.0 / 60.0);
    }

    let cameras = server.chase_cameras().unwrap();
    let race = server.race().unwrap();
    for camera in cameras {
        let car = race.vehicle(camera.target).chassis_pose.position;
        let expected = car + Vec3::new(0.0, 2.0, -5.0);
        assert!((camera.pose.position - expected).length() < 0.01);
    }
}
