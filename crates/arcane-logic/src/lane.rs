//! Lane model: the three parallel tracks a map is laid out on.
//!
//! Nodes sit at a `(level, lane)` coordinate. A path always advances one
//! level and drifts at most one lane, which is what keeps the map free of
//! crossing paths.

use serde::{Deserialize, Serialize};

/// One of the three parallel tracks. Ordered `Left < Center < Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Lane {
    Left = 0,
    Center = 1,
    Right = 2,
}

/// Lateral movement of a path between two consecutive levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathDirection {
    Straight,
    ToLeft,
    ToRight,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Legal transitions out of this lane, in a fixed order.
    ///
    /// The order matters: the generator indexes into this slice with the
    /// random source, so reordering changes every seeded map.
    pub fn directions(self) -> &'static [PathDirection] {
        match self {
            Lane::Left => &[PathDirection::Straight, PathDirection::ToRight],
            Lane::Center => &[
                PathDirection::Straight,
                PathDirection::ToLeft,
                PathDirection::ToRight,
            ],
            Lane::Right => &[PathDirection::Straight, PathDirection::ToLeft],
        }
    }

    /// Lane reached by taking `direction`, or `None` when it would leave
    /// the three-lane space.
    pub fn shifted(self, direction: PathDirection) -> Option<Lane> {
        match direction {
            PathDirection::Straight => Some(self),
            PathDirection::ToLeft => Lane::from_u8((self as u8).checked_sub(1)?),
            PathDirection::ToRight => Lane::from_u8(self as u8 + 1),
        }
    }

    /// Number of lane steps between `self` and `other`.
    pub fn distance_to(self, other: Lane) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Left),
            1 => Some(Self::Center),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Lane::Left => "Left",
            Lane::Center => "Center",
            Lane::Right => "Right",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(level, lane)` position. At most one node exists per coordinate.
///
/// Ordering is level first, then lane, so a sorted collection of
/// coordinates walks the map level by level from left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub level: u32,
    pub lane: Lane,
}

impl Coordinate {
    pub fn new(level: u32, lane: Lane) -> Self {
        Self { level, lane }
    }

    /// Whether a path from `self` to `to` is structurally legal: exactly one
    /// level forward and at most one lane of drift.
    pub fn can_reach(self, to: Coordinate) -> bool {
        to.level == self.level + 1 && self.lane.distance_to(to.lane) <= 1
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.level, self.lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_lanes_cannot_leave_the_map() {
        assert_eq!(Lane::Left.directions().len(), 2);
        assert!(!Lane::Left.directions().contains(&PathDirection::ToLeft));
        assert_eq!(Lane::Right.directions().len(), 2);
        assert!(!Lane::Right.directions().contains(&PathDirection::ToRight));
        assert_eq!(Lane::Center.directions().len(), 3);
    }

    #[test]
    fn test_every_legal_direction_resolves() {
        for lane in Lane::ALL {
            for &dir in lane.directions() {
                let target = lane.shifted(dir).expect("legal direction must resolve");
                assert!(lane.distance_to(target) <= 1);
            }
        }
    }

    #[test]
    fn test_shift_out_of_range() {
        assert_eq!(Lane::Left.shifted(PathDirection::ToLeft), None);
        assert_eq!(Lane::Right.shifted(PathDirection::ToRight), None);
        assert_eq!(Lane::Left.shifted(PathDirection::ToRight), Some(Lane::Center));
        assert_eq!(Lane::Center.shifted(PathDirection::ToLeft), Some(Lane::Left));
    }

    #[test]
    fn test_lane_order() {
        assert!(Lane::Left < Lane::Center);
        assert!(Lane::Center < Lane::Right);
        assert_eq!(Lane::Left.distance_to(Lane::Right), 2);
    }

    #[test]
    fn test_u8_roundtrip() {
        for lane in Lane::ALL {
            assert_eq!(Lane::from_u8(lane as u8), Some(lane));
        }
        assert_eq!(Lane::from_u8(3), None);
    }

    #[test]
    fn test_coordinate_reach() {
        let start = Coordinate::new(0, Lane::Center);
        assert!(start.can_reach(Coordinate::new(1, Lane::Left)));
        assert!(start.can_reach(Coordinate::new(1, Lane::Right)));
        assert!(!start.can_reach(Coordinate::new(2, Lane::Center)));
        assert!(!Coordinate::new(3, Lane::Left).can_reach(Coordinate::new(4, Lane::Right)));
    }

    #[test]
    fn test_coordinate_sorts_level_first() {
        let mut coords = vec![
            Coordinate::new(1, Lane::Left),
            Coordinate::new(0, Lane::Right),
            Coordinate::new(0, Lane::Left),
        ];
        coords.sort();
        assert_eq!(coords[0], Coordinate::new(0, Lane::Left));
        assert_eq!(coords[1], Coordinate::new(0, Lane::Right));
        assert_eq!(coords[2], Coordinate::new(1, Lane::Left));
    }
}
