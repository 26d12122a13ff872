//! `MapStore` over the reducer transaction.
//!
//! Everything written here is rolled back by SpacetimeDB if the calling
//! reducer returns `Err`, which is what makes `insert_map` all-or-nothing.

use std::collections::BTreeMap;

use arcane_logic::lane::Lane;
use arcane_logic::map::{MapId, NodeId, OwnerId};
use arcane_logic::node_type::NodeType;
use arcane_logic::records::{MapRecords, NodeRecord, PathRecord};
use arcane_logic::store::{MapStore, StoreError};
use spacetimedb::{Identity, ReducerContext, Table};

use crate::tables::*;

pub struct SpacetimeStore<'a> {
    ctx: &'a ReducerContext,
    seed: u64,
}

impl<'a> SpacetimeStore<'a> {
    pub fn new(ctx: &'a ReducerContext) -> Self {
        Self { ctx, seed: 0 }
    }

    /// Seed recorded on maps inserted through this store.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn owned_map(&self, map_id: &MapId, owner: &OwnerId) -> Option<MapRow> {
        let owner = owner_identity(owner)?;
        self.ctx
            .db
            .exploration_map()
            .map_id()
            .find(&map_id.0)
            .filter(|m| m.owner == owner)
    }
}

/// Owners reaching the store are identity hex strings; anything else owns nothing.
pub fn owner_identity(owner: &OwnerId) -> Option<Identity> {
    Identity::from_hex(&owner.0).ok()
}

pub fn owner_id(identity: Identity) -> OwnerId {
    OwnerId(identity.to_hex().to_string())
}

fn to_record(row: NodeRow) -> Result<NodeRecord, StoreError> {
    let lane = Lane::from_u8(row.lane)
        .ok_or_else(|| StoreError::Corrupt(format!("node {} has lane {}", row.id, row.lane)))?;
    let node_type = NodeType::from_u8(row.node_type).ok_or_else(|| {
        StoreError::Corrupt(format!("node {} has type {}", row.id, row.node_type))
    })?;
    Ok(NodeRecord {
        id: NodeId(row.id),
        map_id: MapId(row.map_id),
        level: row.level,
        lane,
        node_type,
        visited: row.visited,
    })
}

impl MapStore for SpacetimeStore<'_> {
    fn insert_map(&mut self, owner: &OwnerId, records: &MapRecords) -> Result<(), StoreError> {
        let db = &self.ctx.db;
        let identity = owner_identity(owner)
            .ok_or_else(|| StoreError::Rejected(format!("owner '{}' is not an identity", owner)))?;
        if db.exploration_map().map_id().find(&records.map_id.0).is_some() {
            return Err(StoreError::DuplicateMap(records.map_id.clone()));
        }

        db.exploration_map().insert(MapRow {
            map_id: records.map_id.0.clone(),
            owner: identity,
            max_level: records.max_level,
            seed: self.seed,
            created_at: self.ctx.timestamp,
        });

        let mut id_map: BTreeMap<NodeId, u64> = BTreeMap::new();
        for record in &records.nodes {
            let row = db.exploration_node().insert(NodeRow {
                id: 0,
                map_id: records.map_id.0.clone(),
                owner: identity,
                level: record.level,
                lane: record.lane as u8,
                node_type: record.node_type as u8,
                visited: record.visited,
            });
            if id_map.insert(record.id, row.id).is_some() {
                return Err(StoreError::Rejected(format!("duplicate node id {}", record.id)));
            }
        }

        for path in &records.paths {
            let resolve = |local: NodeId| {
                id_map.get(&local).copied().ok_or_else(|| {
                    StoreError::Rejected(format!("path {} references unknown node {}", path.id, local))
                })
            };
            db.exploration_path().insert(PathRow {
                id: 0,
                map_id: records.map_id.0.clone(),
                from_node: resolve(path.from_node)?,
                to_node: resolve(path.to_node)?,
            });
        }
        Ok(())
    }

    fn map_nodes(&self, map_id: &MapId, owner: &OwnerId) -> Result<Vec<NodeRecord>, StoreError> {
        if self.owned_map(map_id, owner).is_none() {
            return Ok(Vec::new());
        }
        // Auto-inc ids preserve insertion order.
        let mut rows: Vec<NodeRow> = self
            .ctx
            .db
            .exploration_node()
            .map_id()
            .filter(&map_id.0)
            .collect();
        rows.sort_by_key(|r| r.id);
        rows.into_iter().map(to_record).collect()
    }

    fn map_depth(&self, map_id: &MapId, owner: &OwnerId) -> Result<Option<u32>, StoreError> {
        Ok(self.owned_map(map_id, owner).map(|m| m.max_level))
    }

    fn map_paths(&self, map_id: &MapId) -> Result<Vec<PathRecord>, StoreError> {
        let mut paths: Vec<PathRecord> = self
            .ctx
            .db
            .exploration_path()
            .map_id()
            .filter(&map_id.0)
            .map(|p| PathRecord {
                id: p.id,
                from_node: NodeId(p.from_node),
                to_node: NodeId(p.to_node),
            })
            .collect();
        paths.sort_by_key(|p| p.id);
        Ok(paths)
    }

    fn find_node(
        &self,
        node_id: NodeId,
        owner: &OwnerId,
    ) -> Result<Option<NodeRecord>, StoreError> {
        let Some(owner) = owner_identity(owner) else {
            return Ok(None);
        };
        match self.ctx.db.exploration_node().id().find(node_id.0) {
            Some(row) if row.owner == owner => to_record(row).map(Some),
            _ => Ok(None),
        }
    }

    fn set_visited(&mut self, node_id: NodeId) -> Result<bool, StoreError> {
        let nodes = self.ctx.db.exploration_node();
        let mut row = nodes
            .id()
            .find(node_id.0)
            .ok_or_else(|| StoreError::Rejected(format!("node {} does not exist", node_id)))?;
        if row.visited {
            return Ok(false);
        }
        row.visited = true;
        nodes.id().update(row);
        Ok(true)
    }
}
