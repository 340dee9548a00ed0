pub(super) use super::*;
pub(super) use crate::grid::ActionOutcome;
pub(super) use crate::perception::observe;
pub(super) use sim_types::{
    default_world_config, Action, CellState, Direction, Message, MessageDelivery, Observation,
    PolicyKind, Position, Recipient, RobotPhase, Tier, TierConfig, WALL_RADIOACTIVITY,
};
pub(super) use std::collections::HashSet;

mod config_and_seed;
mod invariants;
mod support;
