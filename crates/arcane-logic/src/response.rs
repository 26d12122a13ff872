//! Response shapes handed to callers (API layer, game client).
//!
//! Field names are camelCase on the wire; lanes and node types render as
//! their variant names (`"Center"`, `"SafeHaven"`).

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MapError};
use crate::lane::Lane;
use crate::map::{MapId, NodeId};
use crate::node_type::NodeType;
use crate::service::NodeView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResponse {
    pub to_node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub id: NodeId,
    pub level: u32,
    pub lane: Lane,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub visited: bool,
    pub outgoing_paths: Vec<PathResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub map_id: MapId,
    pub nodes: Vec<NodeResponse>,
}

impl MapResponse {
    pub fn new(map_id: &MapId, nodes: &[NodeView]) -> Self {
        Self {
            map_id: map_id.clone(),
            nodes: nodes
                .iter()
                .map(|n| NodeResponse {
                    id: n.id,
                    level: n.level,
                    lane: n.lane,
                    node_type: n.node_type,
                    visited: n.visited,
                    outgoing_paths: n
                        .outgoing
                        .iter()
                        .map(|&to_node_id| PathResponse { to_node_id })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Error body: a stable kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&MapError> for ErrorResponse {
    fn from(err: &MapError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
