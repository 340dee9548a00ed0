use super::support::*;
use super::*;
use crate::attribution::{assign, Priority, Request};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

fn check_run(config: WorldConfig, seed: u64, ticks: u32) {
    let mut sim = Simulation::new(config, seed).expect("simulation should initialize");
    let total = sim.metrics().accounted_waste();
    let mut known: HashMap<RobotId, Vec<CellState>> = sim
        .robots
        .iter()
        .map(|robot| (robot.id(), robot.knowledge().states()))
        .collect();

    for _ in 0..ticks {
        let delta = tick_once(&mut sim);
        assert_no_overlap(&sim);
        assert_eq!(delta.metrics.accounted_waste(), total, "seed {seed}");

        for robot in &sim.robots {
            let level = sim
                .grid
                .cell(robot.position())
                .map(|cell| cell.radioactivity)
                .expect("robot should be in bounds");
            assert!(
                level <= robot.profile().threshold,
                "robot {:?} entered radioactivity {level}",
                robot.id()
            );
            assert!(robot.carrying().map_or(true, |color| color == robot.tier()));

            let states = robot.knowledge().states();
            let previous = &known[&robot.id()];
            for (before, after) in previous.iter().zip(&states) {
                assert!(
                    !(before.is_explored() && !after.is_explored()),
                    "knowledge regressed to unexplored"
                );
            }
            known.insert(robot.id(), states);
        }
    }
}

#[test]
fn default_world_keeps_core_invariants() {
    for seed in [1, 2, 3] {
        check_run(default_world_config(), seed, 150);
    }
}

#[test]
fn walled_deferred_world_keeps_core_invariants() {
    let mut config = default_world_config();
    config.wall_density = 0.15;
    config.message_delivery = MessageDelivery::Deferred;
    for seed in [4, 5] {
        check_run(config.clone(), seed, 150);
    }
}

#[test]
fn random_policy_keeps_core_invariants() {
    let mut config = default_world_config();
    config.policy = PolicyKind::Random;
    check_run(config, 6, 150);
}

#[test]
fn noop_changes_neither_grid_nor_knowledge() {
    let mut sim = test_sim(5, 5);
    let ids = configure_sim(
        &mut sim,
        &[(Tier::Green, Position::new(0, 3))],
        &[(Tier::Green, Position::new(0, 4))],
    );
    let cells = sim.grid.cells.clone();
    let states = sim.robots[0].knowledge().states();

    for turn in 1..4 {
        let (_, observation) = act(&mut sim, ids[0], Action::Noop);
        robot_mut(&mut sim, ids[0]).perceive(Action::Noop, observation, turn);
    }
    assert_eq!(sim.grid.cells, cells);
    assert_eq!(sim.robots[0].knowledge().states(), states);
    assert_eq!(sim.robots[0].position(), Position::new(0, 3));
}

#[test]
fn assignment_never_shares_a_target_on_random_inputs() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for _ in 0..200 {
        let requests: Vec<Request> = (0..rng.random_range(0..8))
            .map(|_| Request {
                position: Position::new(rng.random_range(0..6), rng.random_range(0..6)),
                priority: if rng.random_bool(0.3) {
                    Priority::Carrying
                } else {
                    Priority::Free
                },
            })
            .collect();
        let targets: Vec<Position> = (0..rng.random_range(0..8))
            .map(|_| Position::new(rng.random_range(0..6), rng.random_range(0..6)))
            .collect();

        let assignments = assign(&requests, &targets);
        let mut claimed = HashSet::new();
        for (requester, target) in &assignments {
            assert!(claimed.insert(*target), "target {target:?} assigned twice");
            assert!(targets.contains(target));
            assert!(requests.iter().any(|request| request.position == *requester));
        }

        let distinct_requesters: HashSet<_> = requests.iter().map(|r| r.position).collect();
        let distinct_targets: HashSet<_> = targets.iter().copied().collect();
        assert_eq!(
            assignments.len(),
            distinct_requesters.len().min(distinct_targets.len())
        );
    }
}

#[test]
fn default_world_relays_and_disposes_waste() {
    let mut sim = Simulation::new(default_world_config(), 42).expect("simulation init");
    let deltas = sim.step_n(600);
    let handoffs: u64 = deltas
        .iter()
        .map(|delta| delta.metrics.handoffs_last_turn)
        .sum();
    assert!(handoffs > 0, "no item was ever handed to the next tier");
    assert!(sim.metrics().disposed.red > 0, "no red item was disposed");
}
