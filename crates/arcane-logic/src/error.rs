//! Error taxonomy for map operations.
//!
//! Every error is terminal for the call that raised it. Nothing here is
//! retried internally; the caller decides what the player sees.

use serde::{Deserialize, Serialize};

use crate::map::{MapId, NodeId};
use crate::store::StoreError;

/// Stable machine-readable error kind, safe to expose to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    NotFound,
    OwnershipMismatch,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::NotFound => "not_found",
            ErrorKind::OwnershipMismatch => "ownership_mismatch",
            ErrorKind::PersistenceFailure => "persistence_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Map(MapId),
    Node(NodeId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Map(id) => write!(f, "map '{}'", id),
            Missing::Node(id) => write!(f, "node {}", id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Requested depth is outside what the generator or the policy allows.
    #[error("max_level {requested} is outside the allowed range [{min}, {max}]")]
    InvalidParameter { requested: u32, min: u32, max: u32 },

    /// Unknown map or node for the calling owner. Also returned for rows that
    /// exist under another owner, so ids cannot be guessed.
    #[error("{0} not found")]
    NotFound(Missing),

    /// The node is owned by the caller but belongs to a different map.
    #[error("node {node_id} does not belong to map '{map_id}'")]
    OwnershipMismatch { node_id: NodeId, map_id: MapId },

    /// The store could not complete a write, or holds inconsistent rows.
    /// No partial state is left behind; retry the whole operation.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            MapError::NotFound(_) => ErrorKind::NotFound,
            MapError::OwnershipMismatch { .. } => ErrorKind::OwnershipMismatch,
            MapError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        let err = MapError::InvalidParameter {
            requested: 1,
            min: 2,
            max: 10,
        };
        assert_eq!(err.kind().as_str(), "invalid_parameter");
        assert_eq!(
            err.to_string(),
            "max_level 1 is outside the allowed range [2, 10]"
        );

        let err = MapError::NotFound(Missing::Node(NodeId(7)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "node 7 not found");
    }

    #[test]
    fn test_store_errors_become_persistence_failures() {
        let err: MapError = StoreError::Rejected("disk full".into()).into();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::OwnershipMismatch).unwrap();
        assert_eq!(json, "\"ownership_mismatch\"");
    }
}
