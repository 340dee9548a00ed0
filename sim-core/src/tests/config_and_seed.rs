use super::support::*;
use super::*;
use sim_types::zone_of_column;

#[test]
fn config_validation_rejects_narrow_grid() {
    let mut cfg = test_config(5, 5);
    cfg.grid_width = 2;
    let err = Simulation::new(cfg, 1).expect_err("config should be rejected");
    assert!(err.to_string().contains("grid_width"));
}

#[test]
fn config_validation_rejects_unordered_thresholds() {
    let mut cfg = test_config(6, 4);
    cfg.red.radioactivity_threshold = 0.5;
    let err = Simulation::new(cfg, 1).expect_err("config should be rejected");
    assert!(matches!(err, SimError::InvalidConfig(ref message) if message.contains("red")));
}

#[test]
fn world_generation_honours_counts_zones_and_deposits() {
    let cfg = default_world_config();
    let sim = Simulation::new(cfg.clone(), 42).expect("simulation should initialize");

    for tier in Tier::ALL {
        let tier_cfg = cfg.tiers()[tier.index()];
        let robots: Vec<_> = sim.robots().iter().filter(|r| r.tier() == tier).collect();
        assert_eq!(robots.len(), tier_cfg.robots as usize);
        assert_eq!(
            sim.grid().waste_counts().get(tier),
            u64::from(tier_cfg.wastes)
        );
        for robot in robots {
            let zone = zone_of_column(cfg.grid_width, robot.position().x as u32);
            assert_eq!(zone, tier.index());
            assert_eq!(robot.phase(), RobotPhase::Initializing);
            assert_eq!(robot.profile().deposit, Position::from(cfg.deposit(tier.index())));
            assert!(robot.knowledge().explored_count() >= 4);
        }

        let deposit = Position::from(cfg.deposit(tier.index()));
        let cell = sim.grid().cell(deposit).expect("deposit inside grid");
        assert_eq!(cell.deposit, Some(tier));
        assert_eq!(cell.waste, None);
        assert!(!cell.is_wall);
    }

    for (position, color) in sim.grid().wastes() {
        assert_eq!(zone_of_column(cfg.grid_width, position.x as u32), color.index());
    }

    let ids: Vec<u64> = sim.robots().iter().map(|robot| robot.id().0).collect();
    assert_eq!(ids, (0..ids.len() as u64).collect::<Vec<_>>());
}

#[test]
fn terrain_radioactivity_stays_inside_each_zone_band() {
    let cfg = default_world_config();
    let sim = Simulation::new(cfg.clone(), 9).expect("simulation should initialize");
    let thresholds = cfg.thresholds();
    for y in 0..sim.grid().height() {
        for x in 0..sim.grid().width() {
            let cell = sim.grid().cell(Position::new(x, y)).expect("cell");
            let zone = zone_of_column(cfg.grid_width, x as u32);
            let low = if zone == 0 { 0.0 } else { thresholds[zone - 1] };
            assert!(cell.radioactivity > low && cell.radioactivity < thresholds[zone]);
            assert_eq!(sim.grid().zone_tier(cell.radioactivity).index(), zone);
        }
    }
}

#[test]
fn walls_follow_density_and_spare_deposits() {
    let mut cfg = default_world_config();
    cfg.wall_density = 0.2;
    let sim = Simulation::new(cfg.clone(), 5).expect("simulation should initialize");
    let cells = (cfg.grid_width * cfg.grid_height) as usize;
    let walls = (0..sim.grid().height())
        .flat_map(|y| (0..sim.grid().width()).map(move |x| Position::new(x, y)))
        .filter(|position| sim.grid().cell(*position).is_some_and(|cell| cell.is_wall))
        .count();
    assert_eq!(walls, (cells as f32 * 0.2).round() as usize);
    for tier in Tier::ALL {
        let deposit = Position::from(cfg.deposit(tier.index()));
        assert!(!sim.grid().cell(deposit).expect("deposit").is_wall);
    }
    for robot in sim.robots() {
        assert!(!sim.grid().cell(robot.position()).expect("cell").is_wall);
    }
}

#[test]
fn different_seeds_produce_different_layouts() {
    let cfg = default_world_config();
    let a = Simulation::new(cfg.clone(), 1).expect("simulation should initialize");
    let b = Simulation::new(cfg, 2).expect("simulation should initialize");
    assert_ne!(compare_snapshots(&a.snapshot(), &b.snapshot()), Ordering::Equal);
}

#[test]
fn reset_with_new_seed_matches_a_fresh_simulation() {
    let cfg = default_world_config();
    let mut sim = Simulation::new(cfg.clone(), 1).expect("simulation should initialize");
    sim.step_n(10);
    sim.reset(Some(77));
    let fresh = Simulation::new(cfg, 77).expect("simulation should initialize");

    assert_eq!(sim.seed(), 77);
    assert_eq!(sim.turn(), 0);
    assert_eq!(
        compare_snapshots(&sim.snapshot(), &fresh.snapshot()),
        Ordering::Equal
    );
    assert_eq!(sim.bus().sent_total(), 0);
}

#[test]
fn snapshot_is_sorted_and_metrics_start_clean() {
    let sim = Simulation::new(default_world_config(), 3).expect("simulation should initialize");
    let snapshot = sim.snapshot();
    assert!(snapshot.robots.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert!(snapshot
        .wastes
        .windows(2)
        .all(|pair| pair[0].position < pair[1].position));
    assert_eq!(snapshot.metrics.turns, 0);
    assert_eq!(snapshot.metrics.waste_carried.total(), 0);
    assert_eq!(
        snapshot.metrics.waste_on_grid.total(),
        snapshot.wastes.len() as u64
    );
}

#[test]
fn step_advances_turn_and_reports_it() {
    let mut sim = Simulation::new(default_world_config(), 8).expect("simulation should initialize");
    let delta = sim.step();
    assert_eq!(delta.turn, 1);
    assert_eq!(sim.turn(), 1);
    assert_eq!(sim.metrics().turns, 1);
    assert_eq!(delta.metrics.moves_last_turn as usize, delta.moves.len());
    assert_eq!(sim.bus().sent_total(), sim.robots().len() as u64);
}
