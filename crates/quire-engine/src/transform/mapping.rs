//! Position maps.
//!
//! A [`StepMap`] records the ranges one step replaced. Positions before a
//! range stay put, positions after it shift by `new - old`, and positions
//! strictly inside it collapse to its start. A [`Mapping`] chains the maps of
//! a whole transaction.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapRange {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

/// Outcome of mapping one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position sat inside a replaced range
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepMap {
    ranges: Vec<MapRange>,
}

impl StepMap {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::identity();
        }
        Self {
            ranges: vec![MapRange {
                start,
                old_size,
                new_size,
            }],
        }
    }

    pub fn ranges(&self) -> &[MapRange] {
        &self.ranges
    }

    pub fn map(&self, pos: usize) -> usize {
        self.map_result(pos).pos
    }

    pub fn map_result(&self, pos: usize) -> MapResult {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let start = range.start;
            let end = start + range.old_size;
            if pos < start || (pos == start && range.old_size > 0) {
                break;
            }
            if pos < end {
                return MapResult {
                    pos: shift(start, diff),
                    deleted: true,
                };
            }
            // Insertions at `pos` push it to the right
            diff += range.new_size as isize - range.old_size as isize;
        }
        MapResult {
            pos: shift(pos, diff),
            deleted: false,
        }
    }
}

fn shift(pos: usize, diff: isize) -> usize {
    pos.saturating_add_signed(diff)
}

/// The composed maps of a sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn map(&self, pos: usize) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos))
    }

    /// Map a position, reporting whether any step deleted the content
    /// around it.
    pub fn map_result(&self, pos: usize) -> MapResult {
        self.maps.iter().fold(
            MapResult {
                pos,
                deleted: false,
            },
            |acc, map| {
                let next = map.map_result(acc.pos);
                MapResult {
                    pos: next.pos,
                    deleted: acc.deleted || next.deleted,
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(15, 12)]
    #[case(3, 3)]
    #[case(5, 5)]
    #[case(7, 5)]
    #[case(10, 7)]
    #[case(20, 17)]
    fn replace_five_to_ten_with_two_chars(#[case] before: usize, #[case] after: usize) {
        let map = StepMap::new(5, 5, 2);
        assert_eq!(map.map(before), after);
    }

    #[test]
    fn inside_positions_are_flagged_deleted() {
        let map = StepMap::new(5, 5, 2);
        assert!(map.map_result(7).deleted);
        assert!(!map.map_result(10).deleted);
        assert!(!map.map_result(5).deleted);
    }

    #[test]
    fn insertion_point_moves_right() {
        let map = StepMap::new(4, 0, 3);
        assert_eq!(map.map(4), 7);
        assert_eq!(map.map(3), 3);
    }

    #[test]
    fn mappings_compose() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(2, 0, 4));
        mapping.push(StepMap::new(10, 2, 0));
        assert_eq!(mapping.map(1), 1);
        assert_eq!(mapping.map(5), 9);
        assert_eq!(mapping.map(8), 10);
        assert_eq!(mapping.map(9), 11);
        assert!(mapping.map_result(7).deleted);
    }

    #[test]
    fn identity_maps_do_nothing() {
        assert_eq!(StepMap::new(4, 0, 0).map(9), 9);
        assert_eq!(Mapping::new().map(9), 9);
    }
}
