use crate::grid::{Grid, RobotBody};
use crate::knowledge::Knowledge;
use crate::perception::observe;
use crate::robot::{Robot, TierProfile};
use crate::Simulation;
use rand::seq::SliceRandom;
use rand::Rng;
use sim_types::{zone_columns, zone_of_column, Position, RobotId, Tier};
use tracing::warn;

/// Share of each radioactivity band kept clear at both ends, so sampled
/// terrain never lands exactly on a tier threshold.
const BAND_MARGIN: f32 = 0.05;

impl Simulation {
    /// Builds terrain, deposits, walls, waste and robots from the config.
    pub(crate) fn initialize_world(&mut self) {
        self.grid = Grid::new(
            self.config.grid_width,
            self.config.grid_height,
            self.config.thresholds(),
        );
        self.robots.clear();
        self.bus.clear();
        self.bus.set_delivery(self.config.message_delivery);

        self.initialize_terrain();
        self.place_deposits();
        self.place_walls();
        for tier in Tier::ALL {
            self.seed_wastes(tier);
        }
        for tier in Tier::ALL {
            self.spawn_robots(tier);
        }
    }

    fn initialize_terrain(&mut self) {
        let thresholds = self.config.thresholds();
        for idx in 0..self.grid.cells.len() {
            let position = self.grid.position_of(idx);
            let zone = zone_of_column(self.config.grid_width, position.x as u32);
            let low = if zone == 0 { 0.0 } else { thresholds[zone - 1] };
            let high = thresholds[zone];
            let fraction = self.rng.random_range(BAND_MARGIN..1.0 - BAND_MARGIN);
            self.grid.cells[idx].radioactivity = low + (high - low) * fraction;
        }
    }

    pub(crate) fn place_deposits(&mut self) {
        for tier in Tier::ALL {
            let position = Position::from(self.config.deposit(tier.index()));
            if let Some(cell) = self.grid.cell_mut(position) {
                cell.deposit = Some(tier);
            }
        }
    }

    fn place_walls(&mut self) {
        let total = self.grid.cells.len();
        let wall_count = (self.config.wall_density * total as f32).round() as usize;
        if wall_count == 0 {
            return;
        }
        let mut candidates: Vec<usize> = (0..total)
            .filter(|idx| self.grid.cells[*idx].deposit.is_none())
            .collect();
        candidates.shuffle(&mut self.rng);
        for idx in candidates.into_iter().take(wall_count) {
            self.grid.cells[idx].is_wall = true;
        }
    }

    fn seed_wastes(&mut self, tier: Tier) {
        let count = self.config.tiers()[tier.index()].wastes as usize;
        let candidates = self.open_cells_for(tier, |grid, idx| {
            let cell = &grid.cells[idx];
            cell.waste.is_none() && cell.deposit.is_none()
        });
        if candidates.len() < count {
            warn!(
                tier = ?tier,
                requested = count,
                placed = candidates.len(),
                "not enough open cells for the configured waste"
            );
        }
        for idx in candidates.into_iter().take(count) {
            self.grid.cells[idx].waste = Some(tier);
        }
    }

    fn spawn_robots(&mut self, tier: Tier) {
        let count = self.config.tiers()[tier.index()].robots as usize;
        let candidates = self.open_cells_for(tier, |grid, idx| {
            grid.occupancy[idx].is_none() && grid.cells[idx].deposit.is_none()
        });
        if candidates.len() < count {
            warn!(
                tier = ?tier,
                requested = count,
                placed = candidates.len(),
                "not enough open cells for the configured robots"
            );
        }

        for idx in candidates.into_iter().take(count) {
            let position = self.grid.position_of(idx);
            let added = self.add_robot(tier, position);
            debug_assert!(added.is_some());
        }
    }

    /// Places a fresh robot of `tier` and gives it its first percept.
    pub(crate) fn add_robot(&mut self, tier: Tier, position: Position) -> Option<RobotId> {
        let id = RobotId(self.next_robot_id);
        if !self.grid.place_robot(id, position) {
            return None;
        }
        self.next_robot_id += 1;

        let (zone_start, _) = zone_columns(self.config.grid_width, tier.index());
        let profile = TierProfile {
            tier,
            threshold: self.config.thresholds()[tier.index()],
            deposit: Position::from(self.config.deposit(tier.index())),
            origin: Position::new(zone_start as i32, position.y),
        };
        let body = RobotBody {
            id,
            tier,
            position,
            carrying: None,
        };
        let mut knowledge = Knowledge::new(self.grid.width(), self.grid.height());
        let observation = observe(&self.grid, id, position);
        knowledge.merge_observation(position, &observation, self.turn);

        let mut robot = Robot::new(body, profile, self.config.policy, knowledge);
        robot.observation = observation;
        self.bus.register(id);
        self.robots.push(robot);
        Some(id)
    }

    /// Shuffled non-wall cells a tier can reach that satisfy `accept`: cells
    /// of the tier's own zone first, then the cleaner zones.
    fn open_cells_for(&mut self, tier: Tier, accept: impl Fn(&Grid, usize) -> bool) -> Vec<usize> {
        let width = self.config.grid_width;
        let mut ordered = Vec::new();
        for zone in (0..=tier.index()).rev() {
            let mut zone_cells: Vec<usize> = (0..self.grid.cells.len())
                .filter(|idx| {
                    let x = self.grid.position_of(*idx).x as u32;
                    zone_of_column(width, x) == zone
                        && !self.grid.cells[*idx].is_wall
                        && accept(&self.grid, *idx)
                })
                .collect();
            zone_cells.shuffle(&mut self.rng);
            ordered.extend(zone_cells);
        }
        ordered
    }
}
