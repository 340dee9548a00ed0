use crate::grid::ActionOutcome;
use crate::Simulation;
use rand::seq::SliceRandom;
use sim_types::{RobotMove, TickDelta, TierCounts};
use tracing::{debug, warn};

#[derive(Default)]
struct TurnCounters {
    picks: u64,
    drops: u64,
    handoffs: u64,
    disposals: u64,
    moves: u64,
    failed_actions: u64,
    skipped_agents: u64,
}

impl Simulation {
    pub(crate) fn tick(&mut self) -> TickDelta {
        // Percepts gathered during this tick are stamped with the turn it completes.
        let stamp = self.turn + 1;

        let mut order: Vec<usize> = (0..self.robots.len()).collect();
        order.shuffle(&mut self.rng);

        let mut counters = TurnCounters::default();
        let mut moves = Vec::new();
        for idx in order {
            self.take_turn(idx, stamp, &mut counters, &mut moves);
        }

        self.bus.end_turn();
        self.turn = stamp;
        self.refresh_metrics();
        self.metrics.picks_last_turn = counters.picks;
        self.metrics.drops_last_turn = counters.drops;
        self.metrics.handoffs_last_turn = counters.handoffs;
        self.metrics.disposals_last_turn = counters.disposals;
        self.metrics.moves_last_turn = counters.moves;
        self.metrics.failed_actions_last_turn = counters.failed_actions;
        self.metrics.skipped_agents_last_turn = counters.skipped_agents;
        self.debug_assert_consistent_state();

        moves.sort_by_key(|robot_move: &RobotMove| robot_move.id);
        TickDelta {
            turn: self.turn,
            moves,
            metrics: self.metrics.clone(),
        }
    }

    /// One robot's full turn: deliberate, act, perceive, fuse mail, broadcast.
    fn take_turn(
        &mut self,
        idx: usize,
        stamp: u64,
        counters: &mut TurnCounters,
        moves: &mut Vec<RobotMove>,
    ) {
        let robot = &mut self.robots[idx];
        let action = match robot.deliberate(&mut self.rng) {
            Ok(action) => action,
            Err(error) => {
                warn!(
                    robot = robot.id().0,
                    tier = ?robot.tier(),
                    turn = stamp,
                    %error,
                    "deliberation failed; skipping robot for this turn"
                );
                counters.skipped_agents += 1;
                return;
            }
        };

        let (outcome, observation) = self.grid.perform(&mut robot.body, action);
        match outcome {
            ActionOutcome::Failed => counters.failed_actions += 1,
            ActionOutcome::Idle => {}
            ActionOutcome::Moved { from, to } => {
                counters.moves += 1;
                moves.push(RobotMove {
                    id: robot.id(),
                    from,
                    to,
                });
            }
            ActionOutcome::Picked(_) => counters.picks += 1,
            ActionOutcome::Dropped(_) => counters.drops += 1,
            ActionOutcome::HandedOff { from, to } => {
                counters.handoffs += 1;
                debug!(
                    robot = robot.id().0,
                    position = ?robot.position(),
                    from = ?from,
                    to = ?to,
                    "waste handed off to the next tier"
                );
            }
            ActionOutcome::Disposed(color) => {
                counters.disposals += 1;
                debug!(
                    robot = robot.id().0,
                    color = ?color,
                    turn = stamp,
                    "waste permanently disposed"
                );
            }
        }

        robot.perceive(action, observation, stamp);
        for message in self.bus.drain(robot.id()) {
            robot.knowledge.merge_message(&message);
        }
        self.bus.send(robot.broadcast(stamp));
    }

    pub(crate) fn refresh_metrics(&mut self) {
        let mut carried = TierCounts::default();
        for color in self.robots.iter().filter_map(|robot| robot.carrying()) {
            *carried.get_mut(color) += 1;
        }
        self.metrics.turns = self.turn;
        self.metrics.waste_on_grid = self.grid.waste_counts();
        self.metrics.waste_carried = carried;
        self.metrics.disposed = self.grid.disposed();
    }
}
