//! Procedural exploration map generation.
//!
//! The map is built one level transition at a time, left lane to right:
//!
//!   1. every node picks a primary path among its legal, non-crossing moves
//!   2. with `secondary_path_chance` it draws one more move; a draw that
//!      would cross a path already laid at this level is dropped
//!   3. missing target nodes are created (and typed) on first use
//!   4. if nothing reached the next Center slot, the node closest to Center
//!      links to a fresh Center node, so the Center chain never breaks
//!
//! The last transition funnels every node within one lane of Center into
//! the single end node. Generation is pure: the only input besides
//! `max_level` is the random source, so a seeded source gives the same map
//! every time.

use crate::config::{GenerationConfig, MIN_GENERATABLE_LEVEL};
use crate::error::MapError;
use crate::lane::{Coordinate, Lane};
use crate::map::{ExplorationMap, MapId, MapNode, NodeIndex};
use crate::node_type::assign_node_type;
use crate::random::RandomSource;

/// Whether a path `from -> to` would cross any path in `laid`, all of which
/// leave the same level.
///
/// Two paths cross when their lane order flips between source and target.
/// Paths sharing a source or a target lane never cross.
pub fn would_cross(laid: &[(Lane, Lane)], from: Lane, to: Lane) -> bool {
    laid.iter()
        .any(|&(a, b)| (a < from && b > to) || (a > from && b < to))
}

#[derive(Debug, Clone, Default)]
pub struct MapGenerator {
    config: GenerationConfig,
}

impl MapGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate a map `max_level` levels deep.
    ///
    /// Fails with [`MapError::InvalidParameter`] when `max_level < 2`. The
    /// upper policy bound is the access layer's business, not the
    /// generator's.
    pub fn generate<R: RandomSource + ?Sized>(
        &self,
        max_level: u32,
        rng: &mut R,
    ) -> Result<ExplorationMap, MapError> {
        if max_level < MIN_GENERATABLE_LEVEL {
            return Err(MapError::InvalidParameter {
                requested: max_level,
                min: MIN_GENERATABLE_LEVEL,
                max: u32::MAX,
            });
        }

        let id = MapId::generate(rng);
        let mut map = ExplorationMap::new(id, max_level);
        self.node(&mut map, Coordinate::new(0, Lane::Center), rng);

        for level in 0..max_level {
            if level == max_level - 1 {
                self.connect_to_end(&mut map, level, rng);
            } else {
                self.expand_level(&mut map, level, rng);
            }
        }

        log::debug!(
            "Generated map {} (depth {}): {} nodes, {} paths",
            map.id(),
            max_level,
            map.node_count(),
            map.path_count()
        );
        Ok(map)
    }

    /// Lay paths from `level` to `level + 1`.
    fn expand_level<R: RandomSource + ?Sized>(
        &self,
        map: &mut ExplorationMap,
        level: u32,
        rng: &mut R,
    ) {
        let sources: Vec<NodeIndex> = map.nodes_at_level(level).collect();
        let mut laid: Vec<(Lane, Lane)> = Vec::new();

        for source in sources {
            let from = map.node(source).lane();
            let targets: Vec<Lane> = from
                .directions()
                .iter()
                .filter_map(|&dir| from.shifted(dir))
                .collect();

            // Straight never crosses anything, so `open` is never empty.
            let open: Vec<Lane> = targets
                .iter()
                .copied()
                .filter(|&to| !would_cross(&laid, from, to))
                .collect();
            let primary = open[rng.next_index(open.len())];
            let mut picks = vec![primary];

            if rng.next_f64() < self.config.secondary_path_chance {
                let remaining: Vec<Lane> =
                    targets.iter().copied().filter(|&to| to != primary).collect();
                if !remaining.is_empty() {
                    let extra = remaining[rng.next_index(remaining.len())];
                    if would_cross(&laid, from, extra) {
                        log::trace!(
                            "Dropped crossing path ({}, {}) -> ({}, {})",
                            level,
                            from,
                            level + 1,
                            extra
                        );
                    } else {
                        picks.push(extra);
                    }
                }
            }

            for to in picks {
                let target = self.node(map, Coordinate::new(level + 1, to), rng);
                map.insert_path(source, target);
                laid.push((from, to));
            }
        }

        let center = Coordinate::new(level + 1, Lane::Center);
        if map.node_at(center).is_none() {
            let closest = map
                .nodes_at_level(level)
                .min_by_key(|&idx| map.node(idx).lane().distance_to(Lane::Center));
            let target = self.node(map, center, rng);
            if let Some(source) = closest {
                map.insert_path(source, target);
            }
        }
    }

    /// Final transition: every node within one lane of Center links to the
    /// end node. With three lanes that is every node on the level.
    fn connect_to_end<R: RandomSource + ?Sized>(
        &self,
        map: &mut ExplorationMap,
        level: u32,
        rng: &mut R,
    ) {
        let end = self.node(map, Coordinate::new(level + 1, Lane::Center), rng);
        let sources: Vec<NodeIndex> = map
            .nodes_at_level(level)
            .filter(|&idx| map.node(idx).lane().distance_to(Lane::Center) <= 1)
            .collect();
        for source in sources {
            map.insert_path(source, end);
        }
    }

    /// Existing node at `coord`, or a new one typed by the node assigner.
    fn node<R: RandomSource + ?Sized>(
        &self,
        map: &mut ExplorationMap,
        coord: Coordinate,
        rng: &mut R,
    ) -> NodeIndex {
        let max_level = map.max_level();
        let weights = &self.config.node_weights;
        map.get_or_insert_with(coord, || {
            let node_type = assign_node_type(coord.level, max_level, weights, rng);
            MapNode::new(coord, node_type, coord.level == 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::node_type::NodeType;
    use crate::random::seeded_source;
    use crate::validate::check_invariants;

    /// Plays back queued draws; falls back to index 0 / 0.99 when empty.
    struct Scripted {
        indices: VecDeque<usize>,
        floats: VecDeque<f64>,
    }

    impl Scripted {
        fn new(indices: &[usize], floats: &[f64]) -> Self {
            let mut queued = vec![0; MapId::LEN];
            queued.extend_from_slice(indices);
            Self {
                indices: queued.into(),
                floats: floats.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            self.floats.pop_front().unwrap_or(0.99)
        }

        fn next_index(&mut self, len: usize) -> usize {
            self.indices.pop_front().unwrap_or(0).min(len - 1)
        }
    }

    fn lanes_from(map: &ExplorationMap, coord: Coordinate) -> Vec<Lane> {
        let idx = map.node_at(coord).unwrap();
        let mut lanes: Vec<Lane> = map
            .outgoing(idx)
            .map(|p| map.node(p.to).lane())
            .collect();
        lanes.sort();
        lanes
    }

    #[test]
    fn test_rejects_shallow_maps() {
        let mut rng = seeded_source(1);
        for depth in [0, 1] {
            let err = MapGenerator::default().generate(depth, &mut rng).unwrap_err();
            assert!(matches!(err, MapError::InvalidParameter { requested, .. } if requested == depth));
        }
    }

    #[test]
    fn test_depth_two_seed_42() {
        let mut rng = seeded_source(42);
        let map = MapGenerator::default().generate(2, &mut rng).unwrap();

        let start = map.start().expect("start node");
        let end = map.end().expect("end node");
        assert_eq!(map.nodes_at_level(0).count(), 1);
        assert_eq!(map.nodes_at_level(2).count(), 1);
        assert!(map.node(start).visited());
        assert!(map.nodes_at_level(1).count() >= 1);
        for idx in map.nodes_at_level(1) {
            assert!(map.outgoing(idx).any(|p| p.to == end));
        }
        assert!(check_invariants(&map).is_empty());
    }

    #[test]
    fn test_invariants_hold_across_depths_and_seeds() {
        let generator = MapGenerator::default();
        for depth in 2..=10 {
            for seed in 0..50 {
                let mut rng = seeded_source(seed);
                let map = generator.generate(depth, &mut rng).unwrap();
                let violations = check_invariants(&map);
                assert!(
                    violations.is_empty(),
                    "depth {} seed {}: {:?}",
                    depth,
                    seed,
                    violations
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_map() {
        let generator = MapGenerator::default();
        let a = generator.generate(8, &mut seeded_source(77)).unwrap();
        let b = generator.generate(8, &mut seeded_source(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_endpoints_are_basic() {
        let generator = MapGenerator::default();
        for seed in 0..20 {
            let map = generator.generate(5, &mut seeded_source(seed)).unwrap();
            assert_eq!(map.node(map.start().unwrap()).node_type(), NodeType::Basic);
            assert_eq!(map.node(map.end().unwrap()).node_type(), NodeType::Basic);
        }
    }

    #[test]
    fn test_interior_nodes_start_unvisited() {
        let map = MapGenerator::default()
            .generate(6, &mut seeded_source(3))
            .unwrap();
        for (_, node) in map.nodes() {
            assert_eq!(node.visited(), node.level() == 0);
        }
    }

    #[test]
    fn test_all_roles_appear_over_many_maps() {
        let generator = MapGenerator::default();
        let mut seen = [false; 3];
        for seed in 0..20 {
            let map = generator.generate(5, &mut seeded_source(seed)).unwrap();
            for (_, node) in map.nodes() {
                if node.level() > 0 && node.level() < 5 {
                    seen[node.node_type() as usize] = true;
                }
            }
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn test_crossing_secondary_is_dropped() {
        // Level 0: Center picks ToLeft, then a secondary Straight.
        // Level 1: Left picks ToRight (Left -> Center). Center picks Straight
        // and draws a secondary ToLeft, which would cross Left -> Center.
        let mut rng = Scripted::new(&[1, 0, 1, 0, 0], &[0.1, 0.9, 0.9, 0.9, 0.9, 0.1]);
        let map = MapGenerator::default().generate(3, &mut rng).unwrap();

        assert_eq!(lanes_from(&map, Coordinate::new(0, Lane::Center)), vec![Lane::Left, Lane::Center]);
        assert_eq!(lanes_from(&map, Coordinate::new(1, Lane::Left)), vec![Lane::Center]);
        assert_eq!(lanes_from(&map, Coordinate::new(1, Lane::Center)), vec![Lane::Center]);
        assert!(map.node_at(Coordinate::new(2, Lane::Left)).is_none());
        assert!(check_invariants(&map).is_empty());
    }

    #[test]
    fn test_non_crossing_secondary_is_kept() {
        // Level 0: Center picks Straight, secondary ToRight (remaining[1]).
        let mut rng = Scripted::new(&[0, 1], &[0.1]);
        let map = MapGenerator::default().generate(2, &mut rng).unwrap();
        assert_eq!(
            lanes_from(&map, Coordinate::new(0, Lane::Center)),
            vec![Lane::Center, Lane::Right]
        );
        assert_eq!(map.path_count(), 4);
    }

    #[test]
    fn test_primary_avoids_crossing() {
        // Level 1 holds Left and Center. Left goes ToRight; Center's primary
        // draw of index 1 must land on ToRight, not the crossing ToLeft.
        let mut rng = Scripted::new(&[1, 0, 1, 1], &[0.1, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9]);
        let map = MapGenerator::default().generate(3, &mut rng).unwrap();
        assert_eq!(lanes_from(&map, Coordinate::new(1, Lane::Center)), vec![Lane::Right]);
        assert!(check_invariants(&map).is_empty());
    }

    #[test]
    fn test_center_chain_is_repaired() {
        // Level 0: Center only goes ToLeft, so (1, Center) must be added and
        // linked from the start node.
        let mut rng = Scripted::new(&[1], &[0.9]);
        let map = MapGenerator::default().generate(2, &mut rng).unwrap();
        assert_eq!(
            lanes_from(&map, Coordinate::new(0, Lane::Center)),
            vec![Lane::Left, Lane::Center]
        );
        assert!(check_invariants(&map).is_empty());
    }

    #[test]
    fn test_would_cross() {
        let laid = [(Lane::Left, Lane::Center)];
        assert!(would_cross(&laid, Lane::Center, Lane::Left));
        assert!(!would_cross(&laid, Lane::Center, Lane::Center));
        assert!(!would_cross(&laid, Lane::Center, Lane::Right));
        assert!(!would_cross(&laid, Lane::Left, Lane::Left));
        let laid = [(Lane::Right, Lane::Center)];
        assert!(would_cross(&laid, Lane::Center, Lane::Right));
        assert!(!would_cross(&laid, Lane::Center, Lane::Left));
    }
}
