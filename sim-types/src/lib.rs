use serde::{Deserialize, Serialize};

pub use sim_config::{
    default_world_config, validate_world_config, world_config_from_toml_str, zone_columns,
    zone_of_column, MessageDelivery, PolicyKind, TierConfig, WorldConfig,
};

/// Side length of the square observation window.
pub const WINDOW_SIZE: usize = 3;

/// Radioactivity reported for walls and for cells beyond the grid edge.
pub const WALL_RADIOACTIVITY: f32 = 2.0;

pub type Window<T> = [[T; WINDOW_SIZE]; WINDOW_SIZE];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobotId(pub u64);

/// Waste colour class. Robots, deposits and items all carry one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Green, Tier::Yellow, Tier::Red];

    /// Zero-based index used for every per-tier array.
    pub fn index(self) -> usize {
        match self {
            Tier::Green => 0,
            Tier::Yellow => 1,
            Tier::Red => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Tier> {
        Tier::ALL.get(index).copied()
    }

    /// The tier that receives this tier's items at its deposit, if any.
    pub fn next(self) -> Option<Tier> {
        Tier::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Position::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// North is toward row 0.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    Pick,
    Release,
    Move(Direction),
    Noop,
}

impl Action {
    pub fn code(self) -> u8 {
        match self {
            Action::Pick => 0,
            Action::Release => 1,
            Action::Move(Direction::North) => 4,
            Action::Move(Direction::East) => 5,
            Action::Move(Direction::South) => 6,
            Action::Move(Direction::West) => 7,
            Action::Noop => 8,
        }
    }

    /// Codes 1 to 3 were once per-colour releases; all of them decode to the
    /// generic release, whose colour is implied by the carried item.
    pub fn from_code(code: u8) -> Option<Action> {
        match code {
            0 => Some(Action::Pick),
            1..=3 => Some(Action::Release),
            4 => Some(Action::Move(Direction::North)),
            5 => Some(Action::Move(Direction::East)),
            6 => Some(Action::Move(Direction::South)),
            7 => Some(Action::Move(Direction::West)),
            8 => Some(Action::Noop),
            _ => None,
        }
    }
}

/// Local 3x3 percept returned after every action. Row 0 is north, column 0
/// is west, `[1][1]` is the acting robot's own cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub radioactivity: Window<f32>,
    pub waste: Window<Option<Tier>>,
    pub is_deposit: Window<bool>,
    pub is_wall: Window<bool>,
    pub other_robot: Window<bool>,
    pub success: bool,
}

impl Observation {
    /// Window offset `(dx, dy)` of the cell at `[row][col]`.
    pub fn cell_offset(row: usize, col: usize) -> (i32, i32) {
        (col as i32 - 1, row as i32 - 1)
    }

    /// `[row][col]` of the neighbour in `direction`.
    pub fn neighbor_index(direction: Direction) -> (usize, usize) {
        let (dx, dy) = direction.offset();
        ((dy + 1) as usize, (dx + 1) as usize)
    }

    pub fn center_waste(&self) -> Option<Tier> {
        self.waste[1][1]
    }

    pub fn center_is_deposit(&self) -> bool {
        self.is_deposit[1][1]
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            radioactivity: [[WALL_RADIOACTIVITY; WINDOW_SIZE]; WINDOW_SIZE],
            waste: [[None; WINDOW_SIZE]; WINDOW_SIZE],
            is_deposit: [[false; WINDOW_SIZE]; WINDOW_SIZE],
            is_wall: [[true; WINDOW_SIZE]; WINDOW_SIZE],
            other_robot: [[false; WINDOW_SIZE]; WINDOW_SIZE],
            success: false,
        }
    }
}

/// What a robot believes about one cell's content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", content = "color", rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Unexplored,
    Wall,
    Empty,
    Occupied(Tier),
}

impl CellState {
    pub fn is_explored(self) -> bool {
        self != CellState::Unexplored
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct KnownCell {
    pub state: CellState,
    /// Meaningful only once the cell is explored.
    pub radioactivity: f32,
    pub is_deposit: bool,
    /// Turn on which the content was directly observed by some robot.
    pub observed_turn: u64,
}

impl KnownCell {
    pub const UNEXPLORED: KnownCell = KnownCell {
        state: CellState::Unexplored,
        radioactivity: 0.0,
        is_deposit: false,
        observed_turn: 0,
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SubmapCell {
    pub position: Position,
    pub cell: KnownCell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Broadcast,
    Robot(RobotId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub sender_id: RobotId,
    pub recipient: Recipient,
    pub sent_turn: u64,
    pub submap: Vec<SubmapCell>,
    pub sender_position: Position,
    pub sender_carrying: Option<Tier>,
    pub sender_tier: Tier,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RobotPhase {
    Initializing,
    Seeking,
    Carrying,
    AtDeposit,
    BlockedRelay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TierCounts {
    pub green: u64,
    pub yellow: u64,
    pub red: u64,
}

impl TierCounts {
    pub fn get(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Green => self.green,
            Tier::Yellow => self.yellow,
            Tier::Red => self.red,
        }
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut u64 {
        match tier {
            Tier::Green => &mut self.green,
            Tier::Yellow => &mut self.yellow,
            Tier::Red => &mut self.red,
        }
    }

    pub fn total(&self) -> u64 {
        self.green + self.yellow + self.red
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotState {
    pub id: RobotId,
    pub tier: Tier,
    pub position: Position,
    pub carrying: Option<Tier>,
    pub phase: RobotPhase,
    pub target: Option<Position>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WasteState {
    pub position: Position,
    pub color: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricsSnapshot {
    pub turns: u64,
    pub waste_on_grid: TierCounts,
    pub waste_carried: TierCounts,
    pub disposed: TierCounts,
    pub picks_last_turn: u64,
    pub drops_last_turn: u64,
    pub handoffs_last_turn: u64,
    pub disposals_last_turn: u64,
    pub moves_last_turn: u64,
    pub failed_actions_last_turn: u64,
    pub skipped_agents_last_turn: u64,
}

impl MetricsSnapshot {
    /// Items still in play plus items permanently disposed.
    pub fn accounted_waste(&self) -> u64 {
        self.waste_on_grid.total() + self.waste_carried.total() + self.disposed.total()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotMove {
    pub id: RobotId,
    pub from: Position,
    pub to: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TickDelta {
    pub turn: u64,
    pub moves: Vec<RobotMove>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub turn: u64,
    pub rng_seed: u64,
    pub config: WorldConfig,
    pub robots: Vec<RobotState>,
    pub wastes: Vec<WasteState>,
    pub metrics: MetricsSnapshot,
}
