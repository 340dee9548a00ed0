use crate::perception::observe;
use serde::{Deserialize, Serialize};
use sim_types::{Action, Direction, Observation, Position, RobotId, Tier, TierCounts};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub radioactivity: f32,
    pub is_wall: bool,
    /// Tier whose deposit this cell is.
    pub deposit: Option<Tier>,
    pub waste: Option<Tier>,
}

impl Cell {
    pub fn open(radioactivity: f32) -> Self {
        Self {
            radioactivity,
            is_wall: false,
            deposit: None,
            waste: None,
        }
    }
}

/// The physical part of a robot the grid acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotBody {
    pub id: RobotId,
    pub tier: Tier,
    pub position: Position,
    pub carrying: Option<Tier>,
}

impl RobotBody {
    pub fn licensed_for(&self, color: Tier) -> bool {
        color == self.tier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionOutcome {
    Failed,
    Idle,
    Moved { from: Position, to: Position },
    Picked(Tier),
    Dropped(Tier),
    HandedOff { from: Tier, to: Tier },
    Disposed(Tier),
}

impl ActionOutcome {
    pub(crate) fn succeeded(self) -> bool {
        self != ActionOutcome::Failed
    }
}

/// Cell state and robot occupancy. Mutated only through [`Grid::execute`].
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    thresholds: [f32; 3],
    pub(crate) cells: Vec<Cell>,
    pub(crate) occupancy: Vec<Option<RobotId>>,
    pub(crate) disposed: TierCounts,
}

impl Grid {
    pub(crate) fn new(width: u32, height: u32, thresholds: [f32; 3]) -> Self {
        let capacity = width as usize * height as usize;
        Self {
            width: width as i32,
            height: height as i32,
            thresholds,
            cells: vec![Cell::open(0.0); capacity],
            occupancy: vec![None; capacity],
            disposed: TierCounts::default(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    pub(crate) fn cell_index(&self, position: Position) -> Option<usize> {
        if !self.in_bounds(position) {
            return None;
        }
        Some(position.y as usize * self.width as usize + position.x as usize)
    }

    pub(crate) fn position_of(&self, idx: usize) -> Position {
        let width = self.width as usize;
        Position::new((idx % width) as i32, (idx / width) as i32)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.cell_index(position).map(|idx| &self.cells[idx])
    }

    pub(crate) fn cell_mut(&mut self, position: Position) -> Option<&mut Cell> {
        self.cell_index(position).map(move |idx| &mut self.cells[idx])
    }

    pub fn occupant_at(&self, position: Position) -> Option<RobotId> {
        self.cell_index(position)
            .and_then(|idx| self.occupancy[idx])
    }

    pub fn disposed(&self) -> TierCounts {
        self.disposed
    }

    pub fn waste_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for waste in self.cells.iter().filter_map(|cell| cell.waste) {
            *counts.get_mut(waste) += 1;
        }
        counts
    }

    pub fn wastes(&self) -> impl Iterator<Item = (Position, Tier)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.waste.map(|waste| (self.position_of(idx), waste)))
    }

    /// Lowest tier allowed to traverse a cell with this radioactivity.
    pub fn zone_tier(&self, radioactivity: f32) -> Tier {
        Tier::ALL
            .into_iter()
            .find(|tier| radioactivity <= self.thresholds[tier.index()])
            .unwrap_or(Tier::Red)
    }

    pub(crate) fn place_robot(&mut self, id: RobotId, position: Position) -> bool {
        let Some(idx) = self.cell_index(position) else {
            return false;
        };
        if self.occupancy[idx].is_some() || self.cells[idx].is_wall {
            return false;
        }
        self.occupancy[idx] = Some(id);
        true
    }

    /// Applies `action` for `body` and returns the percept taken after it.
    /// Infeasible actions leave every piece of state untouched and report
    /// `success = false`.
    pub fn execute(&mut self, body: &mut RobotBody, action: Action) -> Observation {
        self.perform(body, action).1
    }

    pub(crate) fn perform(
        &mut self,
        body: &mut RobotBody,
        action: Action,
    ) -> (ActionOutcome, Observation) {
        let outcome = match action {
            Action::Pick => self.pick(body),
            Action::Release => self.release(body),
            Action::Move(direction) => self.move_robot(body, direction),
            Action::Noop => ActionOutcome::Idle,
        };
        let mut observation = observe(self, body.id, body.position);
        observation.success = outcome.succeeded();
        (outcome, observation)
    }

    fn pick(&mut self, body: &mut RobotBody) -> ActionOutcome {
        if body.carrying.is_some() {
            return ActionOutcome::Failed;
        }
        let Some(idx) = self.cell_index(body.position) else {
            return ActionOutcome::Failed;
        };
        // Another robot on the same cell would own it for this turn.
        if self.occupancy[idx] != Some(body.id) {
            return ActionOutcome::Failed;
        }
        let Some(color) = self.cells[idx].waste else {
            return ActionOutcome::Failed;
        };
        if !body.licensed_for(color) {
            return ActionOutcome::Failed;
        }

        self.cells[idx].waste = None;
        body.carrying = Some(color);
        ActionOutcome::Picked(color)
    }

    fn release(&mut self, body: &mut RobotBody) -> ActionOutcome {
        let Some(color) = body.carrying else {
            return ActionOutcome::Failed;
        };
        let Some(idx) = self.cell_index(body.position) else {
            return ActionOutcome::Failed;
        };
        let zone = self.zone_tier(self.cells[idx].radioactivity);
        let cell = &mut self.cells[idx];
        if cell.waste.is_some() {
            return ActionOutcome::Failed;
        }

        let outcome = match cell.deposit {
            Some(deposit) if deposit == color => match color.next() {
                Some(next) => {
                    cell.waste = Some(next);
                    ActionOutcome::HandedOff {
                        from: color,
                        to: next,
                    }
                }
                None => {
                    *self.disposed.get_mut(color) += 1;
                    ActionOutcome::Disposed(color)
                }
            },
            Some(_) => return ActionOutcome::Failed,
            None if zone > color => return ActionOutcome::Failed,
            None => {
                cell.waste = Some(color);
                ActionOutcome::Dropped(color)
            }
        };
        body.carrying = None;
        outcome
    }

    fn move_robot(&mut self, body: &mut RobotBody, direction: Direction) -> ActionOutcome {
        let from = body.position;
        let to = from.step(direction);
        let (Some(from_idx), Some(to_idx)) = (self.cell_index(from), self.cell_index(to)) else {
            return ActionOutcome::Failed;
        };
        if self.cells[to_idx].is_wall || self.occupancy[to_idx].is_some() {
            return ActionOutcome::Failed;
        }

        self.occupancy[from_idx] = None;
        self.occupancy[to_idx] = Some(body.id);
        body.position = to;
        ActionOutcome::Moved { from, to }
    }
}
