//! Trajectory path building for a longitude-wrapped map.
//!
//! Splits a chronological run of sub-satellite points into segments at
//! antimeridian crossings, colors them cyclically, and produces copies
//! shifted by whole turns of longitude so the path lines up on every
//! horizontal repetition of the map.

use serde::{Deserialize, Serialize};

pub const ANTIMERIDIAN_JUMP_DEG: f64 = 180.0;
pub const FULL_TURN_DEG: f64 = 360.0;
pub const TILE_SHIFTS: [i32; 3] = [-1, 0, 1];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn shifted(&self, turns: i32) -> Self {
        Self { lat: self.lat, lon: self.lon + FULL_TURN_DEG * turns as f64 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathColor {
    Red,
    Green,
    Blue,
}

impl PathColor {
    pub const PALETTE: [PathColor; 3] = [PathColor::Red, PathColor::Green, PathColor::Blue];

    pub fn cycle(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub points: Vec<Position>,
    pub color: PathColor,
}

pub fn crosses_antimeridian(prev: &Position, next: &Position) -> bool {
    (next.lon - prev.lon).abs() > ANTIMERIDIAN_JUMP_DEG
}

pub fn build_segments(positions: &[Position]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let Some((first, rest)) = positions.split_first() else {
        return segments;
    };

    let mut color_index = 0;
    let mut current = vec![*first];
    let mut previous = first;

    for pos in rest {
        if crosses_antimeridian(previous, pos) {
            segments.push(Segment {
                points: std::mem::take(&mut current),
                color: PathColor::cycle(color_index),
            });
            color_index += 1;
        }
        current.push(*pos);
        previous = pos;
    }

    segments.push(Segment { points: current, color: PathColor::cycle(color_index) });
    segments
}

// Nine copies of `path`, one per cell of a 3x3 tiling grid. Only the inner
// axis moves longitude, so the outer axis repeats the same three offsets.
pub fn duplicate_path(path: &[Position]) -> Vec<Vec<Position>> {
    let mut copies = Vec::with_capacity(TILE_SHIFTS.len() * TILE_SHIFTS.len());
    for _row in TILE_SHIFTS {
        for turns in TILE_SHIFTS {
            copies.push(path.iter().map(|p| p.shifted(turns)).collect());
        }
    }
    copies
}

pub fn duplicate_position(pos: Position) -> Vec<Position> {
    TILE_SHIFTS.iter().map(|&turns| pos.shifted(turns)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Position> {
        raw.iter().map(|&(lat, lon)| Position::new(lat, lon)).collect()
    }

    #[test]
    fn empty_input_has_no_segments() {
        assert!(build_segments(&[]).is_empty());
    }

    #[test]
    fn single_point_is_one_degenerate_segment() {
        let segs = build_segments(&pts(&[(10.0, 20.0)]));
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].points, pts(&[(10.0, 20.0)]));
        assert_eq!(segs[0].color, PathColor::Red);
    }

    #[test]
    fn dateline_crossing_splits_and_advances_color() {
        let segs = build_segments(&pts(&[(0.0, 170.0), (0.0, -170.0)]));
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].points, pts(&[(0.0, 170.0)]));
        assert_eq!(segs[0].color, PathColor::PALETTE[0]);
        assert_eq!(segs[1].points, pts(&[(0.0, -170.0)]));
        assert_eq!(segs[1].color, PathColor::PALETTE[1]);
    }

    #[test]
    fn continuous_run_stays_together() {
        let input = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let segs = build_segments(&input);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].points, input);
    }

    #[test]
    fn exactly_180_is_not_a_crossing() {
        let segs = build_segments(&pts(&[(0.0, -90.0), (0.0, 90.0)]));
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn colors_wrap_after_palette() {
        let input = pts(&[
            (0.0, 170.0), (0.0, -170.0), (0.0, 170.0), (0.0, -170.0), (0.0, 170.0),
        ]);
        let colors: Vec<PathColor> = build_segments(&input).iter().map(|s| s.color).collect();
        assert_eq!(
            colors,
            vec![PathColor::Red, PathColor::Green, PathColor::Blue, PathColor::Red, PathColor::Green]
        );
    }

    #[test]
    fn nine_copies_shift_longitude_only() {
        let path = pts(&[(10.0, 5.0), (11.0, 6.0)]);
        let copies = duplicate_path(&path);
        assert_eq!(copies.len(), 9);
        for (i, copy) in copies.iter().enumerate() {
            let turns = TILE_SHIFTS[i % 3] as f64;
            assert_eq!(copy.len(), path.len());
            for (orig, dup) in path.iter().zip(copy) {
                assert_eq!(dup.lat, orig.lat);
                assert_eq!(dup.lon, orig.lon + 360.0 * turns);
            }
        }
    }

    #[test]
    fn marker_copies() {
        let copies = duplicate_position(Position::new(1.0, 2.0));
        assert_eq!(copies, pts(&[(1.0, -358.0), (1.0, 2.0), (1.0, 362.0)]));
    }
}
