//! Node roles and the actions a player can take on arrival.
//!
//! A node's role is drawn once at generation time and never reassigned.
//! The start and end nodes are always [`NodeType::Basic`].

use serde::{Deserialize, Serialize};

use crate::config::NodeTypeWeights;
use crate::random::RandomSource;

/// Gameplay role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    /// Nothing happens; arriving completes the visit.
    Basic = 0,
    /// An encounter: fight it or try to slip past.
    Battle = 1,
    /// Safe ground where the player can rebuild their machine.
    SafeHaven = 2,
}

/// Choice offered to the player on a non-basic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeAction {
    Fight,
    Sneak,
    Build,
    DoNothing,
}

impl NodeType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Basic),
            1 => Some(Self::Battle),
            2 => Some(Self::SafeHaven),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeType::Basic => "Basic",
            NodeType::Battle => "Battle",
            NodeType::SafeHaven => "SafeHaven",
        }
    }

    /// Actions offered on arrival. Basic nodes offer none.
    pub fn actions(self) -> &'static [NodeAction] {
        match self {
            NodeType::Basic => &[],
            NodeType::Battle => &[NodeAction::Fight, NodeAction::Sneak],
            NodeType::SafeHaven => &[NodeAction::Build, NodeAction::DoNothing],
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl NodeAction {
    /// Whether taking this action marks the node visited right away.
    /// `Fight` defers to the battle outcome instead.
    pub fn completes_visit(self) -> bool {
        !matches!(self, NodeAction::Fight)
    }
}

/// Pick the role for a node at `level` in a map of depth `max_level`.
///
/// Endpoints are always `Basic` and consume no randomness. Interior nodes
/// take one draw from `rng`.
pub fn assign_node_type<R: RandomSource + ?Sized>(
    level: u32,
    max_level: u32,
    weights: &NodeTypeWeights,
    rng: &mut R,
) -> NodeType {
    if level == 0 || level == max_level {
        return NodeType::Basic;
    }

    let r = rng.next_f64();
    if r < weights.battle {
        NodeType::Battle
    } else if r < weights.battle + weights.safe_haven {
        NodeType::SafeHaven
    } else {
        NodeType::Basic
    }
}
