//! Structural checks for a generated or reconstructed map.
//!
//! The service asserts a clean result before writing a map in debug builds;
//! the harness runs it over every map in its sweep. Type immutability and
//! the forward-only `visited` flag are enforced by the [`crate::map`] API
//! itself and are not re-checked here.

use std::collections::{BTreeMap, VecDeque};

use crate::lane::{Coordinate, Lane};
use crate::map::ExplorationMap;
use crate::node_type::NodeType;

/// A broken map invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingStart,
    StartNotBasic,
    StartNotVisited,
    MissingEnd,
    EndNotBasic,
    /// Start or end level holds more than the Center node.
    ExtraEndpointNode(Coordinate),
    NodeBeyondDepth(Coordinate),
    DeadEnd(Coordinate),
    Unreachable(Coordinate),
    IllegalPath { from: Coordinate, to: Coordinate },
    Crossing { first: (Coordinate, Coordinate), second: (Coordinate, Coordinate) },
}

/// Check every structural invariant, returning all violations found.
pub fn check_invariants(map: &ExplorationMap) -> Vec<Violation> {
    let mut violations = Vec::new();
    let max_level = map.max_level();

    match map.start() {
        None => violations.push(Violation::MissingStart),
        Some(idx) => {
            let start = map.node(idx);
            if start.node_type() != NodeType::Basic {
                violations.push(Violation::StartNotBasic);
            }
            if !start.visited() {
                violations.push(Violation::StartNotVisited);
            }
        }
    }
    match map.end() {
        None => violations.push(Violation::MissingEnd),
        Some(idx) => {
            if map.node(idx).node_type() != NodeType::Basic {
                violations.push(Violation::EndNotBasic);
            }
        }
    }

    for (idx, node) in map.nodes() {
        let coord = node.coord();
        if coord.level > max_level {
            violations.push(Violation::NodeBeyondDepth(coord));
        }
        if (coord.level == 0 || coord.level == max_level) && coord.lane != Lane::Center {
            violations.push(Violation::ExtraEndpointNode(coord));
        }
        if coord.level < max_level && map.outgoing(idx).next().is_none() {
            violations.push(Violation::DeadEnd(coord));
        }
    }

    // Everything must hang off the start node.
    let mut reached = vec![false; map.node_count()];
    if let Some(start) = map.start() {
        let mut queue = VecDeque::from([start]);
        reached[start.index()] = true;
        while let Some(current) = queue.pop_front() {
            for path in map.outgoing(current) {
                if !reached[path.to.index()] {
                    reached[path.to.index()] = true;
                    queue.push_back(path.to);
                }
            }
        }
    }
    for (idx, node) in map.nodes() {
        if !reached[idx.index()] {
            violations.push(Violation::Unreachable(node.coord()));
        }
    }

    let mut by_level: BTreeMap<u32, Vec<(Coordinate, Coordinate)>> = BTreeMap::new();
    for path in map.paths() {
        let from = map.node(path.from).coord();
        let to = map.node(path.to).coord();
        if !from.can_reach(to) {
            violations.push(Violation::IllegalPath { from, to });
        }
        by_level.entry(from.level).or_default().push((from, to));
    }
    for level_paths in by_level.values() {
        for (i, &(a, b)) in level_paths.iter().enumerate() {
            for &(c, d) in &level_paths[i + 1..] {
                let crosses = (a.lane < c.lane && b.lane > d.lane)
                    || (a.lane > c.lane && b.lane < d.lane);
                if crosses {
                    violations.push(Violation::Crossing {
                        first: (a, b),
                        second: (c, d),
                    });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapId, MapNode};

    fn node(level: u32, lane: Lane, node_type: NodeType) -> MapNode {
        MapNode::new(Coordinate::new(level, lane), node_type, level == 0)
    }

    #[test]
    fn test_clean_map_passes() {
        let mut map = ExplorationMap::new(MapId::from("ok"), 2);
        let s = map.insert_node(node(0, Lane::Center, NodeType::Basic)).unwrap();
        let m = map.insert_node(node(1, Lane::Center, NodeType::Battle)).unwrap();
        let e = map.insert_node(node(2, Lane::Center, NodeType::Basic)).unwrap();
        map.insert_path(s, m);
        map.insert_path(m, e);
        assert!(check_invariants(&map).is_empty());
    }

    #[test]
    fn test_detects_crossing_and_dead_end() {
        let mut map = ExplorationMap::new(MapId::from("bad"), 3);
        let s = map.insert_node(node(0, Lane::Center, NodeType::Basic)).unwrap();
        let l1 = map.insert_node(node(1, Lane::Left, NodeType::Basic)).unwrap();
        let c1 = map.insert_node(node(1, Lane::Center, NodeType::Basic)).unwrap();
        let l2 = map.insert_node(node(2, Lane::Left, NodeType::Basic)).unwrap();
        let c2 = map.insert_node(node(2, Lane::Center, NodeType::Basic)).unwrap();
        let e = map.insert_node(node(3, Lane::Center, NodeType::Basic)).unwrap();
        map.insert_path(s, l1);
        map.insert_path(s, c1);
        map.insert_path(l1, c2);
        map.insert_path(c1, l2);
        map.insert_path(c2, e);

        let violations = check_invariants(&map);
        assert!(violations.contains(&Violation::DeadEnd(Coordinate::new(2, Lane::Left))));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::Crossing { .. })));
    }

    #[test]
    fn test_detects_missing_end_and_orphans() {
        let mut map = ExplorationMap::new(MapId::from("orphan"), 2);
        let s = map.insert_node(node(0, Lane::Center, NodeType::Basic)).unwrap();
        let c = map.insert_node(node(1, Lane::Center, NodeType::Basic)).unwrap();
        map.insert_node(node(1, Lane::Right, NodeType::SafeHaven)).unwrap();
        map.insert_path(s, c);

        let violations = check_invariants(&map);
        assert!(violations.contains(&Violation::MissingEnd));
        assert!(violations.contains(&Violation::Unreachable(Coordinate::new(1, Lane::Right))));
        assert!(violations.contains(&Violation::DeadEnd(Coordinate::new(1, Lane::Center))));
    }

    #[test]
    fn test_detects_bad_endpoints() {
        let mut map = ExplorationMap::new(MapId::from("ends"), 2);
        map.insert_node(MapNode::new(Coordinate::new(0, Lane::Center), NodeType::Battle, false))
            .unwrap();
        map.insert_node(node(2, Lane::Center, NodeType::SafeHaven)).unwrap();
        map.insert_node(node(2, Lane::Left, NodeType::Basic)).unwrap();

        let violations = check_invariants(&map);
        assert!(violations.contains(&Violation::StartNotBasic));
        assert!(violations.contains(&Violation::StartNotVisited));
        assert!(violations.contains(&Violation::EndNotBasic));
        assert!(violations.contains(&Violation::ExtraEndpointNode(Coordinate::new(2, Lane::Left))));
    }
}
