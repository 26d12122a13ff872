//! Owner-scoped map operations: generate, fetch, mark visited.
//!
//! Ownership is part of every lookup key. A caller asking for a map or node
//! that belongs to another player gets `NotFound`, exactly as if the id did
//! not exist.

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{MapError, Missing};
use crate::generator::MapGenerator;
use crate::lane::{Coordinate, Lane};
use crate::map::{ExplorationMap, MapId, NodeId, OwnerId};
use crate::node_type::NodeType;
use crate::random::RandomSource;
use crate::records::{flatten, rehydrate, Adjacency};
use crate::response::MapResponse;
use crate::store::MapStore;
use crate::validate::check_invariants;

/// A stored node with its adjacency resolved from the path rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub map_id: MapId,
    pub level: u32,
    pub lane: Lane,
    pub node_type: NodeType,
    pub visited: bool,
    pub outgoing: Vec<NodeId>,
    pub incoming: Vec<NodeId>,
}

impl NodeView {
    pub fn coord(&self) -> Coordinate {
        Coordinate::new(self.level, self.lane)
    }
}

pub struct MapService<S> {
    store: S,
    generator: MapGenerator,
}

impl<S: MapStore> MapService<S> {
    pub fn new(store: S, config: GenerationConfig) -> Self {
        Self {
            store,
            generator: MapGenerator::new(config),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        self.generator.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Generate a map for `owner` and persist it in one write.
    ///
    /// `max_level` must fall inside the configured policy range.
    pub fn generate_map<R: RandomSource + ?Sized>(
        &mut self,
        max_level: u32,
        owner: &OwnerId,
        rng: &mut R,
    ) -> Result<MapId, MapError> {
        let config = self.generator.config();
        if !config.allows_level(max_level) {
            let (min, max) = config.level_bounds();
            log::warn!(
                "Rejected map request from {}: max_level {} outside [{}, {}]",
                owner,
                max_level,
                min,
                max
            );
            return Err(MapError::InvalidParameter {
                requested: max_level,
                min,
                max,
            });
        }

        let map = self.generator.generate(max_level, rng)?;
        debug_assert!(
            check_invariants(&map).is_empty(),
            "generated map breaks invariants: {:?}",
            check_invariants(&map)
        );

        let records = flatten(&map);
        self.store.insert_map(owner, &records)?;

        log::info!(
            "Generated map {} for {}: depth {}, {} nodes, {} paths",
            map.id(),
            owner,
            max_level,
            records.nodes.len(),
            records.paths.len()
        );
        Ok(map.id().clone())
    }

    /// All nodes of a map, ordered by level then lane, with adjacency.
    pub fn get_map_nodes(
        &self,
        map_id: &MapId,
        owner: &OwnerId,
    ) -> Result<Vec<NodeView>, MapError> {
        let mut nodes = self.store.map_nodes(map_id, owner)?;
        if nodes.is_empty() {
            log::warn!("Map {} not found for {}", map_id, owner);
            return Err(MapError::NotFound(Missing::Map(map_id.clone())));
        }
        let adjacency = Adjacency::from_paths(&self.store.map_paths(map_id)?);
        nodes.sort_by_key(|n| n.coord());

        Ok(nodes
            .into_iter()
            .map(|n| NodeView {
                outgoing: adjacency.outgoing(n.id).to_vec(),
                incoming: adjacency.incoming(n.id).to_vec(),
                id: n.id,
                map_id: n.map_id,
                level: n.level,
                lane: n.lane,
                node_type: n.node_type,
                visited: n.visited,
            })
            .collect())
    }

    /// Rebuild the in-memory graph of a stored map at its stored depth.
    pub fn load_map(&self, map_id: &MapId, owner: &OwnerId) -> Result<ExplorationMap, MapError> {
        let Some(max_level) = self.store.map_depth(map_id, owner)? else {
            return Err(MapError::NotFound(Missing::Map(map_id.clone())));
        };
        let nodes = self.store.map_nodes(map_id, owner)?;
        let paths = self.store.map_paths(map_id)?;
        rehydrate(max_level, &nodes, &paths)
    }

    pub fn map_response(&self, map_id: &MapId, owner: &OwnerId) -> Result<MapResponse, MapError> {
        let nodes = self.get_map_nodes(map_id, owner)?;
        Ok(MapResponse::new(map_id, &nodes))
    }

    /// Set `visited` on a node owned by `owner`. Idempotent.
    pub fn mark_node_visited(&mut self, node_id: NodeId, owner: &OwnerId) -> Result<(), MapError> {
        let Some(node) = self.store.find_node(node_id, owner)? else {
            log::warn!("Node {} not found for {}", node_id, owner);
            return Err(MapError::NotFound(Missing::Node(node_id)));
        };
        if node.visited {
            return Ok(());
        }
        self.store.set_visited(node_id)?;
        log::info!("Node {} of map {} visited by {}", node_id, node.map_id, owner);
        Ok(())
    }

    /// Visit a node on behalf of a caller acting on `map_id`.
    ///
    /// The map must exist for `owner` and the node must belong to it: an
    /// owned node from another map is an `OwnershipMismatch`, anything
    /// else unknown is `NotFound`.
    pub fn visit_node(
        &mut self,
        map_id: &MapId,
        node_id: NodeId,
        owner: &OwnerId,
    ) -> Result<(), MapError> {
        let nodes = self.get_map_nodes(map_id, owner)?;
        let node_map = match nodes.iter().find(|n| n.id == node_id) {
            Some(node) => node.map_id.clone(),
            None => self
                .store
                .find_node(node_id, owner)?
                .map(|n| n.map_id)
                .ok_or(MapError::NotFound(Missing::Node(node_id)))?,
        };
        if &node_map != map_id {
            log::warn!(
                "Node {} belongs to map {}, not {} (owner {})",
                node_id,
                node_map,
                map_id,
                owner
            );
            return Err(MapError::OwnershipMismatch {
                node_id,
                map_id: map_id.clone(),
            });
        }
        self.mark_node_visited(node_id, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::random::seeded_source;
    use crate::store::MemoryStore;

    fn service() -> MapService<MemoryStore> {
        MapService::new(MemoryStore::new(), GenerationConfig::default())
    }

    #[test]
    fn test_policy_bounds() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let mut rng = seeded_source(1);
        for depth in [0, 1, 11, 50] {
            let err = svc.generate_map(depth, &owner, &mut rng).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
        assert_eq!(svc.store().map_count(), 0);
        assert!(svc.generate_map(2, &owner, &mut rng).is_ok());
        assert!(svc.generate_map(10, &owner, &mut rng).is_ok());
    }

    #[test]
    fn test_unvalidated_config_cannot_raise_ceiling() {
        let config = GenerationConfig {
            max_level: 5_000,
            ..GenerationConfig::default()
        };
        let mut svc = MapService::new(MemoryStore::new(), config);
        let err = svc
            .generate_map(5_000, &OwnerId::from("alice"), &mut seeded_source(9))
            .unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidParameter { requested: 5_000, min: 2, max: 10 }
        ));
        assert_eq!(svc.store().node_count(), 0);
    }

    #[test]
    fn test_nodes_are_ordered_with_adjacency() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let map_id = svc.generate_map(5, &owner, &mut seeded_source(2)).unwrap();
        let nodes = svc.get_map_nodes(&map_id, &owner).unwrap();

        assert!(nodes.windows(2).all(|w| w[0].coord() < w[1].coord()));
        assert_eq!(nodes[0].coord(), Coordinate::new(0, Lane::Center));
        assert!(nodes[0].visited);
        assert!(nodes[0].incoming.is_empty());
        let last = nodes.last().unwrap();
        assert_eq!(last.coord(), Coordinate::new(5, Lane::Center));
        assert!(last.outgoing.is_empty());
        for node in &nodes[..nodes.len() - 1] {
            assert!(!node.outgoing.is_empty());
        }
    }

    #[test]
    fn test_other_owner_sees_nothing() {
        let mut svc = service();
        let alice = OwnerId::from("alice");
        let bob = OwnerId::from("bob");
        let map_id = svc.generate_map(3, &alice, &mut seeded_source(3)).unwrap();

        let err = svc.get_map_nodes(&map_id, &bob).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let node = svc.get_map_nodes(&map_id, &alice).unwrap()[1].id;
        let err = svc.mark_node_visited(node, &bob).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!svc.get_map_nodes(&map_id, &alice).unwrap()[1].visited);
    }

    #[test]
    fn test_visiting_twice_is_fine() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let map_id = svc.generate_map(3, &owner, &mut seeded_source(4)).unwrap();
        let node = svc.get_map_nodes(&map_id, &owner).unwrap()[1].id;

        svc.mark_node_visited(node, &owner).unwrap();
        assert!(svc.get_map_nodes(&map_id, &owner).unwrap()[1].visited);
        svc.mark_node_visited(node, &owner).unwrap();
        assert!(svc.get_map_nodes(&map_id, &owner).unwrap()[1].visited);
    }

    #[test]
    fn test_visit_checks_map_membership() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let first = svc.generate_map(3, &owner, &mut seeded_source(5)).unwrap();
        let second = svc.generate_map(3, &owner, &mut seeded_source(6)).unwrap();
        let foreign = svc.get_map_nodes(&second, &owner).unwrap()[1].id;

        let err = svc.visit_node(&first, foreign, &owner).unwrap_err();
        assert!(matches!(err, MapError::OwnershipMismatch { node_id, .. } if node_id == foreign));

        let err = svc.visit_node(&first, NodeId(999_999), &owner).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = svc
            .visit_node(&MapId::from("missing"), foreign, &owner)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let own = svc.get_map_nodes(&first, &owner).unwrap()[1].id;
        svc.visit_node(&first, own, &owner).unwrap();
    }

    #[test]
    fn test_load_map_matches_stored_rows() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let map_id = svc.generate_map(6, &owner, &mut seeded_source(7)).unwrap();
        let map = svc.load_map(&map_id, &owner).unwrap();
        assert_eq!(map.id(), &map_id);
        assert_eq!(map.max_level(), 6);
        assert!(check_invariants(&map).is_empty());
        assert_eq!(map.node_count(), svc.get_map_nodes(&map_id, &owner).unwrap().len());
    }

    #[test]
    fn test_map_response_lists_every_node() {
        let mut svc = service();
        let owner = OwnerId::from("alice");
        let map_id = svc.generate_map(4, &owner, &mut seeded_source(8)).unwrap();
        let response = svc.map_response(&map_id, &owner).unwrap();
        let nodes = svc.get_map_nodes(&map_id, &owner).unwrap();
        assert_eq!(response.map_id, map_id);
        assert_eq!(response.nodes.len(), nodes.len());
        let paths: usize = response.nodes.iter().map(|n| n.outgoing_paths.len()).sum();
        assert_eq!(paths, svc.store().path_count());
    }
}
