//! Flat, storable node and path records.
//!
//! [`flatten`] turns an in-memory map into one row per node and one row per
//! path; [`rehydrate`] rebuilds the map from those rows. Adjacency is always
//! rebuilt from the path rows, never from anything cached on a node row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::lane::{Coordinate, Lane};
use crate::map::{ExplorationMap, MapId, MapNode, NodeId, NodeIndex};
use crate::node_type::NodeType;
use crate::store::StoreError;

/// One stored node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub map_id: MapId,
    pub level: u32,
    pub lane: Lane,
    pub node_type: NodeType,
    pub visited: bool,
}

impl NodeRecord {
    pub fn coord(&self) -> Coordinate {
        Coordinate::new(self.level, self.lane)
    }
}

/// One stored path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub id: u64,
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// Every row a single generation run produces.
///
/// Ids inside a freshly flattened batch are local (node and path position);
/// the store swaps them for persistent ids on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecords {
    pub map_id: MapId,
    pub max_level: u32,
    pub nodes: Vec<NodeRecord>,
    pub paths: Vec<PathRecord>,
}

/// Flatten a map into node and path rows, one row per node and per path.
pub fn flatten(map: &ExplorationMap) -> MapRecords {
    let nodes = map
        .nodes()
        .map(|(idx, node)| NodeRecord {
            id: local_id(idx),
            map_id: map.id().clone(),
            level: node.level(),
            lane: node.lane(),
            node_type: node.node_type(),
            visited: node.visited(),
        })
        .collect();

    let paths = map
        .paths()
        .iter()
        .enumerate()
        .map(|(i, path)| PathRecord {
            id: i as u64,
            from_node: local_id(path.from),
            to_node: local_id(path.to),
        })
        .collect();

    MapRecords {
        map_id: map.id().clone(),
        max_level: map.max_level(),
        nodes,
        paths,
    }
}

fn local_id(idx: NodeIndex) -> NodeId {
    NodeId(idx.index() as u64)
}

/// Rebuild a map of depth `max_level` from stored rows.
///
/// Node order follows `nodes`, path order follows `paths`, so rehydrating
/// the output of [`flatten`] gives back the original map. Rows that could
/// not have come from one generation run (mixed map ids, repeated ids or
/// coordinates, nodes past the stored depth, a missing start or end node,
/// dangling or illegal paths) are reported as a persistence failure.
pub fn rehydrate(
    max_level: u32,
    nodes: &[NodeRecord],
    paths: &[PathRecord],
) -> Result<ExplorationMap, MapError> {
    let first = nodes
        .first()
        .ok_or_else(|| corrupt("map has no node rows".to_string()))?;
    let mut map = ExplorationMap::new(first.map_id.clone(), max_level);

    let mut index: BTreeMap<NodeId, NodeIndex> = BTreeMap::new();
    for record in nodes {
        if record.map_id != first.map_id {
            return Err(corrupt(format!(
                "node {} belongs to map '{}', expected '{}'",
                record.id, record.map_id, first.map_id
            )));
        }
        if record.level > max_level {
            return Err(corrupt(format!(
                "node {} sits at level {} past depth {}",
                record.id, record.level, max_level
            )));
        }
        if index.contains_key(&record.id) {
            return Err(corrupt(format!("node id {} appears twice", record.id)));
        }
        let node = MapNode::new(record.coord(), record.node_type, record.visited);
        let idx = map
            .insert_node(node)
            .ok_or_else(|| corrupt(format!("two nodes share coordinate {}", record.coord())))?;
        index.insert(record.id, idx);
    }
    if map.start().is_none() {
        return Err(corrupt("start node is missing".to_string()));
    }
    if map.end().is_none() {
        return Err(corrupt(format!("end node at depth {} is missing", max_level)));
    }

    for path in paths {
        let lookup = |id: NodeId| {
            index.get(&id).copied().ok_or_else(|| {
                corrupt(format!("path {} references unknown node {}", path.id, id))
            })
        };
        let from = lookup(path.from_node)?;
        let to = lookup(path.to_node)?;
        let (a, b) = (map.node(from).coord(), map.node(to).coord());
        if !a.can_reach(b) {
            return Err(corrupt(format!("path {} from {} to {} is not legal", path.id, a, b)));
        }
        map.insert_path(from, to);
    }

    Ok(map)
}

fn corrupt(detail: String) -> MapError {
    MapError::PersistenceFailure(StoreError::Corrupt(detail))
}

/// Outgoing and incoming neighbours by node id, derived from path rows.
#[derive(Debug, Default)]
pub struct Adjacency {
    outgoing: BTreeMap<NodeId, Vec<NodeId>>,
    incoming: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    pub fn from_paths(paths: &[PathRecord]) -> Self {
        let mut adj = Self::default();
        for path in paths {
            adj.outgoing.entry(path.from_node).or_default().push(path.to_node);
            adj.incoming.entry(path.to_node).or_default().push(path.from_node);
        }
        adj
    }

    pub fn outgoing(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn incoming(&self, id: NodeId) -> &[NodeId] {
        self.incoming.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
