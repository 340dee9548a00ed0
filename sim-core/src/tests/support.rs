use super::*;

fn empty_tier(threshold: f32) -> TierConfig {
    TierConfig {
        robots: 0,
        wastes: 0,
        radioactivity_threshold: threshold,
        deposit: None,
    }
}

/// A world with no generated robots, waste or walls.
pub(super) fn test_config(width: u32, height: u32) -> WorldConfig {
    WorldConfig {
        grid_width: width,
        grid_height: height,
        green: empty_tier(1.0 / 3.0),
        yellow: empty_tier(2.0 / 3.0),
        red: empty_tier(1.0),
        wall_density: 0.0,
        message_delivery: MessageDelivery::Instant,
        policy: PolicyKind::Coordinated,
    }
}

pub(super) fn test_sim(width: u32, height: u32) -> Simulation {
    Simulation::new(test_config(width, height), 7).expect("simulation should initialize")
}

/// Rebuilds the world as flat zero-radioactivity terrain with the configured
/// deposits, the given waste, then the given robots (ids in argument order).
pub(super) fn configure_sim(
    sim: &mut Simulation,
    robots: &[(Tier, Position)],
    wastes: &[(Tier, Position)],
) -> Vec<RobotId> {
    sim.grid = Grid::new(
        sim.config.grid_width,
        sim.config.grid_height,
        sim.config.thresholds(),
    );
    sim.place_deposits();
    sim.robots.clear();
    sim.bus.clear();
    sim.bus.set_delivery(sim.config.message_delivery);
    sim.next_robot_id = 0;
    sim.turn = 0;

    for (color, position) in wastes {
        sim.grid
            .cell_mut(*position)
            .expect("test waste should be inside the grid")
            .waste = Some(*color);
    }
    let ids = robots
        .iter()
        .map(|(tier, position)| {
            sim.add_robot(*tier, *position)
                .expect("test setup should not overlap")
        })
        .collect();

    sim.metrics = MetricsSnapshot::default();
    sim.refresh_metrics();
    ids
}

pub(super) fn tick_once(sim: &mut Simulation) -> TickDelta {
    sim.step_n(1).into_iter().next().expect("exactly one delta")
}

pub(super) fn robot_mut(sim: &mut Simulation, id: RobotId) -> &mut Robot {
    sim.robots
        .iter_mut()
        .find(|robot| robot.id() == id)
        .expect("robot should exist")
}

/// Re-observes every robot's surroundings, as after editing the grid by hand.
pub(super) fn refresh_percepts(sim: &mut Simulation) {
    let turn = sim.turn;
    for robot in &mut sim.robots {
        let observation = observe(&sim.grid, robot.id(), robot.position());
        robot
            .knowledge
            .merge_observation(robot.position(), &observation, turn);
        robot.observation = observation;
    }
}

pub(super) fn set_radioactivity(sim: &mut Simulation, position: Position, level: f32) {
    sim.grid
        .cell_mut(position)
        .expect("cell should be inside the grid")
        .radioactivity = level;
    refresh_percepts(sim);
}

pub(super) fn set_wall(sim: &mut Simulation, position: Position) {
    sim.grid
        .cell_mut(position)
        .expect("cell should be inside the grid")
        .is_wall = true;
    refresh_percepts(sim);
}

pub(super) fn waste_at(sim: &Simulation, position: Position) -> Option<Tier> {
    sim.grid.cell(position).and_then(|cell| cell.waste)
}

/// Runs one grid action for `id` outside the tick loop.
pub(super) fn act(sim: &mut Simulation, id: RobotId, action: Action) -> (ActionOutcome, Observation) {
    let idx = sim
        .robots
        .iter()
        .position(|robot| robot.id() == id)
        .expect("robot should exist");
    let robot = &mut sim.robots[idx];
    sim.grid.perform(&mut robot.body, action)
}

pub(super) fn assert_no_overlap(sim: &Simulation) {
    let mut seen = HashSet::new();
    for robot in &sim.robots {
        assert!(seen.insert(robot.position()), "robots should not overlap");
        let idx = sim
            .grid
            .cell_index(robot.position())
            .expect("robot should be in bounds");
        assert_eq!(sim.grid.occupancy[idx], Some(robot.id()));
    }
    assert_eq!(sim.robots.len(), sim.grid.occupancy.iter().flatten().count());
}
