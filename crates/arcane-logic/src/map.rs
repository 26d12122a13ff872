//! Exploration map graph model.
//!
//! Nodes live in one vector and paths in another, as `(from, to)` index
//! pairs. Adjacency in either direction is derived from the path list on
//! demand, so there are no back-references to keep in sync.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lane::{Coordinate, Lane};
use crate::node_type::NodeType;
use crate::random::RandomSource;

/// Opaque map identity token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub String);

impl MapId {
    /// Length of a generated id in hex characters.
    pub const LEN: usize = 32;

    /// Draw a fresh 128-bit id from `rng`, rendered as lowercase hex.
    pub fn generate<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let id = (0..Self::LEN)
            .map(|_| HEX[rng.next_index(HEX.len())] as char)
            .collect();
        MapId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(s: &str) -> Self {
        MapId(s.to_string())
    }
}

/// Persistent node identity, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player identity a map is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        OwnerId(s.to_string())
    }
}

/// Position of a node inside one [`ExplorationMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node: where it is, what it is, whether the player has been there.
///
/// Type is fixed at creation and `visited` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    coord: Coordinate,
    node_type: NodeType,
    visited: bool,
}

impl MapNode {
    pub(crate) fn new(coord: Coordinate, node_type: NodeType, visited: bool) -> Self {
        Self {
            coord,
            node_type,
            visited,
        }
    }

    pub fn coord(&self) -> Coordinate {
        self.coord
    }

    pub fn level(&self) -> u32 {
        self.coord.level
    }

    pub fn lane(&self) -> Lane {
        self.coord.lane
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn visited(&self) -> bool {
        self.visited
    }
}

/// A directed path one level forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapPath {
    pub from: NodeIndex,
    pub to: NodeIndex,
}

/// Node counts by role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub basic: u32,
    pub battle: u32,
    pub safe_haven: u32,
}

/// A leveled node graph from `(0, Center)` to `(max_level, Center)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationMap {
    id: MapId,
    max_level: u32,
    nodes: Vec<MapNode>,
    paths: Vec<MapPath>,
    by_coord: BTreeMap<Coordinate, NodeIndex>,
}

impl ExplorationMap {
    pub(crate) fn new(id: MapId, max_level: u32) -> Self {
        Self {
            id,
            max_level,
            nodes: Vec::new(),
            paths: Vec::new(),
            by_coord: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn node(&self, idx: NodeIndex) -> &MapNode {
        &self.nodes[idx.0]
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &MapNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), n))
    }

    /// All paths in creation order.
    pub fn paths(&self) -> &[MapPath] {
        &self.paths
    }

    pub fn node_at(&self, coord: Coordinate) -> Option<NodeIndex> {
        self.by_coord.get(&coord).copied()
    }

    /// Nodes on `level`, left to right.
    pub fn nodes_at_level(&self, level: u32) -> impl Iterator<Item = NodeIndex> + '_ {
        self.by_coord
            .range(Coordinate::new(level, Lane::Left)..=Coordinate::new(level, Lane::Right))
            .map(|(_, idx)| *idx)
    }

    pub fn start(&self) -> Option<NodeIndex> {
        self.node_at(Coordinate::new(0, Lane::Center))
    }

    pub fn end(&self) -> Option<NodeIndex> {
        self.node_at(Coordinate::new(self.max_level, Lane::Center))
    }

    pub fn outgoing(&self, idx: NodeIndex) -> impl Iterator<Item = &MapPath> + '_ {
        self.paths.iter().filter(move |p| p.from == idx)
    }

    pub fn incoming(&self, idx: NodeIndex) -> impl Iterator<Item = &MapPath> + '_ {
        self.paths.iter().filter(move |p| p.to == idx)
    }

    /// Nodes a player standing on `current` may move to next.
    pub fn next_choices(&self, current: NodeIndex) -> Vec<NodeIndex> {
        let mut choices: Vec<NodeIndex> = self.outgoing(current).map(|p| p.to).collect();
        choices.sort_by_key(|idx| self.node(*idx).lane());
        choices.dedup();
        choices
    }

    /// Movement is only allowed along an existing path.
    pub fn can_advance(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.paths.iter().any(|p| p.from == from && p.to == to)
    }

    /// Mark a node visited. Returns whether the flag changed.
    pub fn mark_visited(&mut self, idx: NodeIndex) -> bool {
        let node = &mut self.nodes[idx.0];
        let changed = !node.visited;
        node.visited = true;
        changed
    }

    pub fn type_counts(&self) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for node in &self.nodes {
            match node.node_type {
                NodeType::Basic => counts.basic += 1,
                NodeType::Battle => counts.battle += 1,
                NodeType::SafeHaven => counts.safe_haven += 1,
            }
        }
        counts
    }

    /// Add a node. Returns `None` if the coordinate is already taken.
    pub(crate) fn insert_node(&mut self, node: MapNode) -> Option<NodeIndex> {
        if self.by_coord.contains_key(&node.coord) {
            return None;
        }
        let idx = NodeIndex(self.nodes.len());
        self.by_coord.insert(node.coord, idx);
        self.nodes.push(node);
        Some(idx)
    }

    /// Return the node at `coord`, creating it with `make` if the slot is free.
    pub(crate) fn get_or_insert_with(
        &mut self,
        coord: Coordinate,
        make: impl FnOnce() -> MapNode,
    ) -> NodeIndex {
        if let Some(idx) = self.node_at(coord) {
            return idx;
        }
        let node = make();
        debug_assert_eq!(node.coord, coord);
        let idx = NodeIndex(self.nodes.len());
        self.by_coord.insert(coord, idx);
        self.nodes.push(node);
        idx
    }

    pub(crate) fn insert_path(&mut self, from: NodeIndex, to: NodeIndex) {
        debug_assert!(
            self.node(from).coord.can_reach(self.node(to).coord),
            "illegal path {} -> {}",
            self.node(from).coord,
            self.node(to).coord
        );
        self.paths.push(MapPath { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded_source;

    /// start -> (1, Left) and (1, Center) -> end
    fn small_map() -> ExplorationMap {
        let mut map = ExplorationMap::new(MapId::from("m"), 2);
        let start = map
            .insert_node(MapNode::new(Coordinate::new(0, Lane::Center), NodeType::Basic, true))
            .unwrap();
        let left = map
            .insert_node(MapNode::new(Coordinate::new(1, Lane::Left), NodeType::Battle, false))
            .unwrap();
        let center = map
            .insert_node(MapNode::new(Coordinate::new(1, Lane::Center), NodeType::SafeHaven, false))
            .unwrap();
        let end = map
            .insert_node(MapNode::new(Coordinate::new(2, Lane::Center), NodeType::Basic, false))
            .unwrap();
        map.insert_path(start, center);
        map.insert_path(start, left);
        map.insert_path(left, end);
        map.insert_path(center, end);
        map
    }

    #[test]
    fn test_coordinate_is_unique() {
        let mut map = small_map();
        let dup = MapNode::new(Coordinate::new(1, Lane::Left), NodeType::Basic, false);
        assert!(map.insert_node(dup).is_none());
        assert_eq!(map.node_count(), 4);
    }

    #[test]
    fn test_level_iteration_is_left_to_right() {
        let map = small_map();
        let lanes: Vec<Lane> = map.nodes_at_level(1).map(|i| map.node(i).lane()).collect();
        assert_eq!(lanes, vec![Lane::Left, Lane::Center]);
        assert_eq!(map.nodes_at_level(3).count(), 0);
    }

    #[test]
    fn test_adjacency_is_derived_both_ways() {
        let map = small_map();
        let start = map.start().unwrap();
        let end = map.end().unwrap();
        assert_eq!(map.outgoing(start).count(), 2);
        assert_eq!(map.incoming(start).count(), 0);
        assert_eq!(map.incoming(end).count(), 2);
        assert_eq!(map.outgoing(end).count(), 0);
    }

    #[test]
    fn test_next_choices_sorted_by_lane() {
        let map = small_map();
        let start = map.start().unwrap();
        let lanes: Vec<Lane> = map
            .next_choices(start)
            .into_iter()
            .map(|i| map.node(i).lane())
            .collect();
        assert_eq!(lanes, vec![Lane::Left, Lane::Center]);
    }

    #[test]
    fn test_can_only_advance_along_paths() {
        let map = small_map();
        let start = map.start().unwrap();
        let end = map.end().unwrap();
        let left = map.node_at(Coordinate::new(1, Lane::Left)).unwrap();
        assert!(map.can_advance(start, left));
        assert!(map.can_advance(left, end));
        assert!(!map.can_advance(start, end));
        assert!(!map.can_advance(left, start));
    }

    #[test]
    fn test_visited_only_goes_forward() {
        let mut map = small_map();
        let left = map.node_at(Coordinate::new(1, Lane::Left)).unwrap();
        assert!(!map.node(left).visited());
        assert!(map.mark_visited(left));
        assert!(!map.mark_visited(left));
        assert!(map.node(left).visited());
    }

    #[test]
    fn test_type_counts() {
        let counts = small_map().type_counts();
        assert_eq!(
            counts,
            TypeCounts {
                basic: 2,
                battle: 1,
                safe_haven: 1
            }
        );
    }

    #[test]
    fn test_generated_ids_are_hex() {
        let mut rng = seeded_source(5);
        let id = MapId::generate(&mut rng);
        assert_eq!(id.as_str().len(), MapId::LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, MapId::generate(&mut rng));
    }
}
