use crate::attribution::{assign, Priority, Request};
use crate::robot::{DeliberationError, Robot};
use rand::Rng;
use sim_config::PolicyKind;
use sim_types::{Action, CellState, Direction, Observation, Position, RobotPhase};
use std::collections::{BTreeMap, VecDeque};

impl Robot {
    /// Chooses the next action from the robot's own knowledge and last
    /// percept. Errors mean the robot's private state is inconsistent; the
    /// caller skips the robot for this turn.
    pub(crate) fn deliberate<R: Rng>(&mut self, rng: &mut R) -> Result<Action, DeliberationError> {
        self.check_consistency()?;
        let action = match self.policy {
            PolicyKind::Coordinated => self.deliberate_coordinated(rng),
            PolicyKind::Random => self.deliberate_random(rng),
        };
        Ok(action)
    }

    fn deliberate_coordinated<R: Rng>(&mut self, rng: &mut R) -> Action {
        if self.phase == RobotPhase::Initializing {
            if let Some(direction) = self.approach_origin() {
                return Action::Move(direction);
            }
            self.transition(RobotPhase::Seeking);
        }

        match (self.phase, self.body.carrying) {
            (RobotPhase::Seeking, Some(_)) => self.transition(RobotPhase::Carrying),
            (RobotPhase::Carrying | RobotPhase::AtDeposit | RobotPhase::BlockedRelay, None) => {
                self.transition(RobotPhase::Seeking)
            }
            _ => {}
        }

        match self.phase {
            RobotPhase::BlockedRelay => self.relay_to_buffer(rng),
            RobotPhase::Carrying | RobotPhase::AtDeposit => self.deliver(rng),
            RobotPhase::Initializing | RobotPhase::Seeking => self.seek(rng),
        }
    }

    fn deliberate_random<R: Rng>(&mut self, rng: &mut R) -> Action {
        let here = self.body.position;
        match self.body.carrying {
            Some(_) => {
                self.transition(RobotPhase::Carrying);
                if here == self.profile.deposit {
                    self.transition(RobotPhase::AtDeposit);
                    return Action::Release;
                }
            }
            None => {
                self.transition(RobotPhase::Seeking);
                if here != self.profile.deposit
                    && self.observation.center_waste() == Some(self.body.tier)
                {
                    return Action::Pick;
                }
            }
        }
        self.random_move(rng)
    }

    /// One greedy step toward the lane origin, or `None` once there or when
    /// no legal step gets closer.
    fn approach_origin(&self) -> Option<Direction> {
        let here = self.body.position;
        let origin = self.profile.origin;
        if here == origin {
            return None;
        }
        let distance = here.manhattan(origin);
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_legal_move(*direction))
            .find(|direction| here.step(*direction).manhattan(origin) < distance)
    }

    fn seek<R: Rng>(&mut self, rng: &mut R) -> Action {
        let here = self.body.position;
        let deposit = self.profile.deposit;

        // Collecting while our deposit is full would only end in a relay drop.
        if self.deposit_known_full() {
            self.target = None;
            return self.explore(rng);
        }

        if here != deposit && self.observation.center_waste() == Some(self.body.tier) {
            self.target = Some(here);
            return Action::Pick;
        }

        self.target = self.allocate().get(&here).copied();
        if let Some(direction) = self.target.and_then(|target| self.step_towards(target)) {
            return Action::Move(direction);
        }
        self.explore(rng)
    }

    fn deliver<R: Rng>(&mut self, rng: &mut R) -> Action {
        let deposit = self.profile.deposit;
        self.target = Some(deposit);
        if self.body.position == deposit {
            self.transition(RobotPhase::AtDeposit);
            return Action::Release;
        }
        self.transition(RobotPhase::Carrying);
        match self.step_towards(deposit) {
            Some(direction) => Action::Move(direction),
            None => self.random_move(rng),
        }
    }

    /// Drops the cargo on the nearest buffer cell so the deposit can clear.
    fn relay_to_buffer<R: Rng>(&mut self, rng: &mut R) -> Action {
        self.target = None;
        if self.is_buffer(1, 1) {
            return Action::Release;
        }
        let buffer_step = Direction::ALL.into_iter().find(|direction| {
            let (row, col) = Observation::neighbor_index(*direction);
            self.is_legal_move(*direction) && self.is_buffer(row, col)
        });
        match buffer_step {
            Some(direction) => Action::Move(direction),
            None => self.random_move(rng),
        }
    }

    /// Conflict-free assignment over this robot and its known same-tier peers.
    pub(crate) fn allocate(&self) -> BTreeMap<Position, Position> {
        let tier = self.body.tier;
        let own_priority = if self.body.carrying.is_some() {
            Priority::Carrying
        } else {
            Priority::Free
        };
        let mut requests = vec![Request {
            position: self.body.position,
            priority: own_priority,
        }];
        for (_, peer) in self.knowledge.carried_by_others(tier) {
            let priority = match peer.carrying {
                None => Priority::Free,
                Some(color) if color == tier => Priority::Carrying,
                Some(_) => continue,
            };
            requests.push(Request {
                position: peer.position,
                priority,
            });
        }

        let deposit = self.profile.deposit;
        let targets: Vec<Position> = self
            .knowledge
            .known_wastes(tier)
            .into_iter()
            .filter(|position| *position != deposit)
            .collect();
        assign(&requests, &targets)
    }

    /// First step of a shortest path to `goal` over known permitted cells,
    /// treating unexplored cells as passable. Falls back to a greedy step.
    pub(crate) fn step_towards(&self, goal: Position) -> Option<Direction> {
        let start = self.body.position;
        if start == goal {
            return None;
        }
        let width = self.knowledge.width() as usize;
        let index = |p: Position| p.y as usize * width + p.x as usize;
        let mut visited = vec![false; width * self.knowledge.height() as usize];
        visited[index(start)] = true;

        let mut queue = VecDeque::new();
        for direction in Direction::ALL {
            if !self.is_legal_move(direction) {
                continue;
            }
            let next = start.step(direction);
            if next == goal {
                return Some(direction);
            }
            visited[index(next)] = true;
            queue.push_back((next, direction));
        }

        while let Some((position, first)) = queue.pop_front() {
            for direction in Direction::ALL {
                let next = position.step(direction);
                if !self.knowledge.in_bounds(next) || visited[index(next)] {
                    continue;
                }
                if next == goal {
                    return Some(first);
                }
                visited[index(next)] = true;
                if self.is_passable(next, true) {
                    queue.push_back((next, first));
                }
            }
        }

        let distance = start.manhattan(goal);
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_legal_move(*direction))
            .min_by_key(|direction| start.step(*direction).manhattan(goal))
            .filter(|direction| start.step(*direction).manhattan(goal) < distance)
    }

    /// Heads for the nearest known permitted cell bordering unexplored
    /// ground; random legal move otherwise, `noop` when boxed in.
    fn explore<R: Rng>(&mut self, rng: &mut R) -> Action {
        match self.frontier_step() {
            Some(direction) => Action::Move(direction),
            None => self.random_move(rng),
        }
    }

    pub(crate) fn frontier_step(&self) -> Option<Direction> {
        let start = self.body.position;
        let width = self.knowledge.width() as usize;
        let index = |p: Position| p.y as usize * width + p.x as usize;
        let mut visited = vec![false; width * self.knowledge.height() as usize];
        visited[index(start)] = true;

        let mut queue = VecDeque::new();
        for direction in Direction::ALL {
            if !self.is_legal_move(direction) {
                continue;
            }
            let next = start.step(direction);
            visited[index(next)] = true;
            queue.push_back((next, direction));
        }

        while let Some((position, first)) = queue.pop_front() {
            if self.borders_unexplored(position) {
                return Some(first);
            }
            for direction in Direction::ALL {
                let next = position.step(direction);
                if !self.knowledge.in_bounds(next) || visited[index(next)] {
                    continue;
                }
                visited[index(next)] = true;
                if self.is_passable(next, false) {
                    queue.push_back((next, first));
                }
            }
        }
        None
    }

    fn random_move<R: Rng>(&self, rng: &mut R) -> Action {
        let moves = self.legal_moves();
        if moves.is_empty() {
            return Action::Noop;
        }
        Action::Move(moves[rng.random_range(0..moves.len())])
    }

    pub(crate) fn legal_moves(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_legal_move(*direction))
            .collect()
    }

    /// Legal per the latest percept: inside the grid, no wall, no robot, and
    /// within this tier's radioactivity threshold.
    pub(crate) fn is_legal_move(&self, direction: Direction) -> bool {
        let (row, col) = Observation::neighbor_index(direction);
        let observation = &self.observation;
        !observation.is_wall[row][col]
            && !observation.other_robot[row][col]
            && self.profile.permits(observation.radioactivity[row][col])
            && self.knowledge.in_bounds(self.body.position.step(direction))
    }

    fn is_passable(&self, position: Position, unexplored_ok: bool) -> bool {
        let Some(cell) = self.knowledge.get(position) else {
            return false;
        };
        match cell.state {
            CellState::Unexplored => unexplored_ok,
            CellState::Wall => false,
            CellState::Empty | CellState::Occupied(_) => self.profile.permits(cell.radioactivity),
        }
    }

    fn borders_unexplored(&self, position: Position) -> bool {
        Direction::ALL.into_iter().any(|direction| {
            let next = position.step(direction);
            self.knowledge.in_bounds(next) && self.knowledge.state(next) == CellState::Unexplored
        })
    }

    fn is_buffer(&self, row: usize, col: usize) -> bool {
        let observation = &self.observation;
        !observation.is_wall[row][col]
            && !observation.is_deposit[row][col]
            && observation.waste[row][col].is_none()
            && self.profile.permits(observation.radioactivity[row][col])
    }

    fn deposit_known_full(&self) -> bool {
        matches!(
            self.knowledge.state(self.profile.deposit),
            CellState::Occupied(_)
        )
    }
}
