use sim_types::{
    CellState, KnownCell, Message, Observation, Position, RobotId, SubmapCell, Tier, WINDOW_SIZE,
};
use std::collections::BTreeMap;

/// Last reported whereabouts of a peer robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatus {
    pub position: Position,
    pub carrying: Option<Tier>,
    pub turn: u64,
}

/// A robot's private, partially filled map of the whole grid.
///
/// Cells only ever move from `Unexplored` to an explored state. Each explored
/// cell remembers the turn it was observed so fused peer data can never
/// replace fresher local data.
#[derive(Debug, Clone)]
pub struct Knowledge {
    width: i32,
    height: i32,
    cells: Vec<KnownCell>,
    peers: [BTreeMap<RobotId, PeerStatus>; 3],
}

impl Knowledge {
    pub(crate) fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![KnownCell::UNEXPLORED; width as usize * height as usize],
            peers: Default::default(),
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

    fn index(&self, position: Position) -> Option<usize> {
        if !self.in_bounds(position) {
            return None;
        }
        Some(position.y as usize * self.width as usize + position.x as usize)
    }

    pub fn get(&self, position: Position) -> Option<&KnownCell> {
        self.index(position).map(|idx| &self.cells[idx])
    }

    /// Off-grid positions read as walls.
    pub fn state(&self, position: Position) -> CellState {
        self.get(position)
            .map_or(CellState::Wall, |cell| cell.state)
    }

    pub fn states(&self) -> Vec<CellState> {
        self.cells.iter().map(|cell| cell.state).collect()
    }

    pub fn explored_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.state.is_explored())
            .count()
    }

    /// Positions believed to hold an item of `color`.
    pub fn known_wastes(&self, color: Tier) -> Vec<Position> {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.state == CellState::Occupied(color))
            .map(|(idx, _)| Position::new((idx % width) as i32, (idx / width) as i32))
            .collect()
    }

    /// Writes the window centred on `center`. Own observations always win.
    pub(crate) fn merge_observation(
        &mut self,
        center: Position,
        observation: &Observation,
        turn: u64,
    ) {
        for row in 0..WINDOW_SIZE {
            for col in 0..WINDOW_SIZE {
                let (dx, dy) = Observation::cell_offset(row, col);
                let Some(idx) = self.index(center.offset(dx, dy)) else {
                    continue;
                };
                let state = if observation.is_wall[row][col] {
                    CellState::Wall
                } else {
                    observation.waste[row][col].map_or(CellState::Empty, CellState::Occupied)
                };
                self.cells[idx] = KnownCell {
                    state,
                    radioactivity: observation.radioactivity[row][col],
                    is_deposit: observation.is_deposit[row][col],
                    observed_turn: turn,
                };
            }
        }
    }

    /// The explored cells of the window centred on `center`, for broadcasting.
    pub(crate) fn window_submap(&self, center: Position) -> Vec<SubmapCell> {
        let mut submap = Vec::with_capacity(WINDOW_SIZE * WINDOW_SIZE);
        for row in 0..WINDOW_SIZE {
            for col in 0..WINDOW_SIZE {
                let (dx, dy) = Observation::cell_offset(row, col);
                let position = center.offset(dx, dy);
                if let Some(cell) = self.get(position) {
                    if cell.state.is_explored() {
                        submap.push(SubmapCell {
                            position,
                            cell: *cell,
                        });
                    }
                }
            }
        }
        submap
    }

    /// Fuses a peer's broadcast. Returns how many cells changed.
    pub(crate) fn merge_message(&mut self, message: &Message) -> usize {
        let mut updated = 0;
        for entry in &message.submap {
            if !entry.cell.state.is_explored() {
                continue;
            }
            let Some(idx) = self.index(entry.position) else {
                continue;
            };
            let local = &mut self.cells[idx];
            if !local.state.is_explored() || entry.cell.observed_turn > local.observed_turn {
                *local = entry.cell;
                updated += 1;
            }
        }

        let peers = &mut self.peers[message.sender_tier.index()];
        let is_newer = peers
            .get(&message.sender_id)
            .map_or(true, |status| message.sent_turn >= status.turn);
        if is_newer {
            peers.insert(
                message.sender_id,
                PeerStatus {
                    position: message.sender_position,
                    carrying: message.sender_carrying,
                    turn: message.sent_turn,
                },
            );
        }
        updated
    }

    /// Peers of `tier` with their last reported position and cargo.
    pub fn carried_by_others(
        &self,
        tier: Tier,
    ) -> impl Iterator<Item = (RobotId, &PeerStatus)> + '_ {
        self.peers[tier.index()]
            .iter()
            .map(|(id, status)| (*id, status))
    }

    pub fn peer(&self, tier: Tier, id: RobotId) -> Option<&PeerStatus> {
        self.peers[tier.index()].get(&id)
    }
}
