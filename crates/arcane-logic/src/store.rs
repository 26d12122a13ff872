//! Persistence contract for exploration maps, plus an in-memory store.
//!
//! A store keeps node and path rows tagged with their map and owner. The
//! only multi-row write is [`MapStore::insert_map`], which must land all of
//! a map's rows or none of them. The only row mutation is the visited flag.
//!
//! [`MemoryStore`] can be saved to and loaded from a bincode snapshot.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::map::{MapId, NodeId, OwnerId};
use crate::records::{MapRecords, NodeRecord, PathRecord};

/// Version number for snapshot format (increment when format changes)
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] Box<bincode::ErrorKind>),
    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("map '{0}' already exists")]
    DuplicateMap(MapId),
    #[error("stored rows are inconsistent: {0}")]
    Corrupt(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Logical operations a backing store must support.
pub trait MapStore {
    /// Persist every row of one generated map for `owner`, as one unit.
    ///
    /// On error nothing from `records` may be visible to later reads.
    /// Node and path ids in `records` are batch-local; the store assigns
    /// persistent ones.
    fn insert_map(&mut self, owner: &OwnerId, records: &MapRecords) -> Result<(), StoreError>;

    /// Node rows of `map_id` owned by `owner`. Empty when the map is unknown
    /// or belongs to someone else.
    fn map_nodes(&self, map_id: &MapId, owner: &OwnerId) -> Result<Vec<NodeRecord>, StoreError>;

    /// Depth `map_id` was generated with, if `owner` owns it.
    fn map_depth(&self, map_id: &MapId, owner: &OwnerId) -> Result<Option<u32>, StoreError>;

    /// Path rows of `map_id`.
    fn map_paths(&self, map_id: &MapId) -> Result<Vec<PathRecord>, StoreError>;

    /// A node row, only if `owner` owns it.
    fn find_node(&self, node_id: NodeId, owner: &OwnerId)
        -> Result<Option<NodeRecord>, StoreError>;

    /// Set the visited flag on a node. Returns whether the flag changed.
    fn set_visited(&mut self, node_id: NodeId) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMap {
    owner: OwnerId,
    max_level: u32,
    node_ids: Vec<NodeId>,
    paths: Vec<PathRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    owner: OwnerId,
    record: NodeRecord,
}

/// In-process store keyed by map and node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    maps: BTreeMap<MapId, StoredMap>,
    nodes: BTreeMap<NodeId, StoredNode>,
    next_node_id: u64,
    next_path_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            maps: BTreeMap::new(),
            nodes: BTreeMap::new(),
            next_node_id: 1,
            next_path_id: 1,
        }
    }
}

/// Serializable snapshot of a store.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    store: MemoryStore,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn path_count(&self) -> usize {
        self.maps.values().map(|m| m.paths.len()).sum()
    }

    /// Write the whole store to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            store: self.clone(),
        };
        bincode::serialize_into(writer, &snapshot)?;
        Ok(())
    }

    /// Read a store previously written by [`MemoryStore::save`].
    pub fn load<R: Read>(reader: R) -> Result<Self, StoreError> {
        let snapshot: Snapshot = bincode::deserialize_from(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        Ok(snapshot.store)
    }
}

impl MapStore for MemoryStore {
    fn insert_map(&mut self, owner: &OwnerId, records: &MapRecords) -> Result<(), StoreError> {
        if self.maps.contains_key(&records.map_id) {
            return Err(StoreError::DuplicateMap(records.map_id.clone()));
        }

        // Stage everything first; nothing touches `self` until it all checks out.
        let mut id_map: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut staged_nodes = Vec::with_capacity(records.nodes.len());
        let mut next_node_id = self.next_node_id;
        for record in &records.nodes {
            if record.map_id != records.map_id {
                return Err(StoreError::Rejected(format!(
                    "node {} is tagged for map '{}'",
                    record.id, record.map_id
                )));
            }
            let id = NodeId(next_node_id);
            next_node_id += 1;
            if id_map.insert(record.id, id).is_some() {
                return Err(StoreError::Rejected(format!("duplicate node id {}", record.id)));
            }
            staged_nodes.push(StoredNode {
                owner: owner.clone(),
                record: NodeRecord {
                    id,
                    ..record.clone()
                },
            });
        }

        let mut staged_paths = Vec::with_capacity(records.paths.len());
        let mut next_path_id = self.next_path_id;
        for path in &records.paths {
            let resolve = |local: NodeId| {
                id_map.get(&local).copied().ok_or_else(|| {
                    StoreError::Rejected(format!("path {} references unknown node {}", path.id, local))
                })
            };
            staged_paths.push(PathRecord {
                id: next_path_id,
                from_node: resolve(path.from_node)?,
                to_node: resolve(path.to_node)?,
            });
            next_path_id += 1;
        }

        // Commit.
        let node_ids = staged_nodes.iter().map(|n| n.record.id).collect();
        for node in staged_nodes {
            self.nodes.insert(node.record.id, node);
        }
        self.maps.insert(
            records.map_id.clone(),
            StoredMap {
                owner: owner.clone(),
                max_level: records.max_level,
                node_ids,
                paths: staged_paths,
            },
        );
        self.next_node_id = next_node_id;
        self.next_path_id = next_path_id;
        Ok(())
    }

    fn map_nodes(&self, map_id: &MapId, owner: &OwnerId) -> Result<Vec<NodeRecord>, StoreError> {
        let Some(map) = self.maps.get(map_id).filter(|m| &m.owner == owner) else {
            return Ok(Vec::new());
        };
        Ok(map
            .node_ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| n.record.clone())
            .collect())
    }

    fn map_depth(&self, map_id: &MapId, owner: &OwnerId) -> Result<Option<u32>, StoreError> {
        Ok(self
            .maps
            .get(map_id)
            .filter(|m| &m.owner == owner)
            .map(|m| m.max_level))
    }

    fn map_paths(&self, map_id: &MapId) -> Result<Vec<PathRecord>, StoreError> {
        Ok(self
            .maps
            .get(map_id)
            .map(|m| m.paths.clone())
            .unwrap_or_default())
    }

    fn find_node(
        &self,
        node_id: NodeId,
        owner: &OwnerId,
    ) -> Result<Option<NodeRecord>, StoreError> {
        Ok(self
            .nodes
            .get(&node_id)
            .filter(|n| &n.owner == owner)
            .map(|n| n.record.clone()))
    }

    fn set_visited(&mut self, node_id: NodeId) -> Result<bool, StoreError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or_else(|| StoreError::Rejected(format!("node {} does not exist", node_id)))?;
        let changed = !node.record.visited;
        node.record.visited = true;
        Ok(changed)
    }
}
