use crate::grid::RobotBody;
use crate::knowledge::Knowledge;
use sim_config::PolicyKind;
use sim_types::{
    Action, Message, Observation, Position, Recipient, RobotId, RobotPhase, RobotState, Tier,
};
use thiserror::Error;
use tracing::debug;

/// Per-tier behaviour table: how far into the radioactive zones a robot may
/// go, where it unloads, and the lane it lines up on at start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProfile {
    pub tier: Tier,
    pub threshold: f32,
    pub deposit: Position,
    pub origin: Position,
}

impl TierProfile {
    pub fn permits(&self, radioactivity: f32) -> bool {
        radioactivity <= self.threshold
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliberationError {
    #[error("position {0:?} is outside the robot's knowledge map")]
    PositionOutOfBounds(Position),
    #[error("robot carries {0:?} waste it is not licensed for")]
    UnlicensedCargo(Tier),
}

#[derive(Debug, Clone)]
pub struct Robot {
    pub(crate) body: RobotBody,
    pub(crate) profile: TierProfile,
    pub(crate) policy: PolicyKind,
    pub(crate) phase: RobotPhase,
    pub(crate) knowledge: Knowledge,
    pub(crate) observation: Observation,
    pub(crate) target: Option<Position>,
}

impl Robot {
    pub(crate) fn new(
        body: RobotBody,
        profile: TierProfile,
        policy: PolicyKind,
        knowledge: Knowledge,
    ) -> Self {
        Self {
            body,
            profile,
            policy,
            phase: RobotPhase::Initializing,
            knowledge,
            observation: Observation::default(),
            target: None,
        }
    }

    pub fn id(&self) -> RobotId {
        self.body.id
    }

    pub fn tier(&self) -> Tier {
        self.body.tier
    }

    pub fn position(&self) -> Position {
        self.body.position
    }

    pub fn carrying(&self) -> Option<Tier> {
        self.body.carrying
    }

    pub fn phase(&self) -> RobotPhase {
        self.phase
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn profile(&self) -> &TierProfile {
        &self.profile
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn state(&self) -> RobotState {
        RobotState {
            id: self.body.id,
            tier: self.body.tier,
            position: self.body.position,
            carrying: self.body.carrying,
            phase: self.phase,
            target: self.target,
        }
    }

    /// Folds the percept of the action just executed into knowledge and
    /// advances the state machine on pick/release outcomes.
    pub(crate) fn perceive(&mut self, action: Action, observation: Observation, turn: u64) {
        self.knowledge
            .merge_observation(self.body.position, &observation, turn);
        match (action, observation.success) {
            (Action::Pick, true) => {
                self.target = None;
                self.transition(RobotPhase::Carrying);
            }
            (Action::Release, true) => self.transition(RobotPhase::Seeking),
            (Action::Release, false) if self.phase == RobotPhase::AtDeposit => {
                self.transition(RobotPhase::BlockedRelay);
            }
            _ => {}
        }
        self.observation = observation;
    }

    pub(crate) fn broadcast(&self, turn: u64) -> Message {
        Message {
            sender_id: self.body.id,
            recipient: Recipient::Broadcast,
            sent_turn: turn,
            submap: self.knowledge.window_submap(self.body.position),
            sender_position: self.body.position,
            sender_carrying: self.body.carrying,
            sender_tier: self.body.tier,
        }
    }

    pub(crate) fn transition(&mut self, next: RobotPhase) {
        if self.phase != next {
            debug!(
                robot = self.body.id.0,
                tier = ?self.body.tier,
                from = ?self.phase,
                to = ?next,
                "phase transition"
            );
            self.phase = next;
        }
    }

    pub(crate) fn check_consistency(&self) -> Result<(), DeliberationError> {
        if !self.knowledge.in_bounds(self.body.position) {
            return Err(DeliberationError::PositionOutOfBounds(self.body.position));
        }
        if let Some(color) = self.body.carrying {
            if !self.body.licensed_for(color) {
                return Err(DeliberationError::UnlicensedCargo(color));
            }
        }
        Ok(())
    }
}
