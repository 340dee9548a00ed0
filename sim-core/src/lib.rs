use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_types::{
    validate_world_config, MetricsSnapshot, RobotId, TickDelta, WasteState, WorldConfig,
    WorldSnapshot,
};
use std::cmp::Ordering;
use thiserror::Error;

pub mod attribution;
mod bus;
mod deliberation;
mod grid;
mod knowledge;
mod perception;
mod robot;
mod spawn;
mod turn;

pub use bus::MessageBus;
pub use grid::{Cell, Grid, RobotBody};
pub use knowledge::{Knowledge, PeerStatus};
pub use robot::{DeliberationError, Robot, TierProfile};

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: WorldConfig,
    turn: u64,
    seed: u64,
    rng: ChaCha8Rng,
    next_robot_id: u64,
    grid: Grid,
    robots: Vec<Robot>,
    bus: MessageBus,
    metrics: MetricsSnapshot,
}

impl Simulation {
    pub fn new(config: WorldConfig, seed: u64) -> Result<Self, SimError> {
        validate_world_config(&config).map_err(SimError::InvalidConfig)?;

        let mut sim = Self {
            grid: Grid::new(
                config.grid_width,
                config.grid_height,
                config.thresholds(),
            ),
            bus: MessageBus::new(config.message_delivery),
            config,
            turn: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_robot_id: 0,
            robots: Vec::new(),
            metrics: MetricsSnapshot::default(),
        };
        sim.initialize_world();
        sim.refresh_metrics();
        Ok(sim)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.iter().find(|robot| robot.id() == id)
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut robots: Vec<_> = self.robots.iter().map(Robot::state).collect();
        robots.sort_by_key(|robot| robot.id);

        let mut wastes: Vec<WasteState> = self
            .grid
            .wastes()
            .map(|(position, color)| WasteState { position, color })
            .collect();
        wastes.sort_by_key(|waste| waste.position);

        WorldSnapshot {
            turn: self.turn,
            rng_seed: self.seed,
            config: self.config.clone(),
            robots,
            wastes,
            metrics: self.metrics.clone(),
        }
    }

    pub fn reset(&mut self, seed: Option<u64>) {
        self.seed = seed.unwrap_or(self.seed);
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.turn = 0;
        self.next_robot_id = 0;
        self.metrics = MetricsSnapshot::default();
        self.initialize_world();
        self.refresh_metrics();
    }

    /// Advances every robot exactly once.
    pub fn step(&mut self) -> TickDelta {
        self.tick()
    }

    pub fn step_n(&mut self, count: u32) -> Vec<TickDelta> {
        let mut deltas = Vec::with_capacity(count as usize);
        for _ in 0..count {
            deltas.push(self.tick());
        }
        deltas
    }

    pub fn export_trace_jsonl(&mut self, turns: u32) -> Vec<String> {
        let mut lines = Vec::with_capacity(turns as usize + 1);
        lines.push(
            serde_json::to_string(&self.snapshot())
                .expect("serialize initial snapshot for trace export"),
        );

        for _ in 0..turns {
            self.tick();
            lines.push(
                serde_json::to_string(&self.snapshot())
                    .expect("serialize turn snapshot for trace export"),
            );
        }
        lines
    }

    fn debug_assert_consistent_state(&self) {
        if cfg!(debug_assertions) {
            debug_assert_eq!(
                self.robots.len(),
                self.grid.occupancy.iter().flatten().count(),
                "occupancy count should match robot count",
            );
            for robot in &self.robots {
                let idx = self
                    .grid
                    .cell_index(robot.position())
                    .expect("robot position must remain in bounds");
                debug_assert_eq!(
                    self.grid.occupancy[idx],
                    Some(robot.id()),
                    "occupancy must point at the robot standing on that cell",
                );
            }
        }
    }
}

pub fn compare_snapshots(a: &WorldSnapshot, b: &WorldSnapshot) -> Ordering {
    let snapshot_a = serde_json::to_string(a).expect("serialize snapshot A");
    let snapshot_b = serde_json::to_string(b).expect("serialize snapshot B");
    snapshot_a.cmp(&snapshot_b)
}
