use assert_float_eq::assert_float_absolute_eq;
use iss_tracker::trajectory::{
    build_segments, crosses_antimeridian, duplicate_path, duplicate_position, PathColor, Position,
};

fn positions(lons: &[f64]) -> Vec<Position> {
    lons.iter().enumerate().map(|(i, &lon)| Position::new(i as f64, lon)).collect()
}

fn lons(segment: &[Position]) -> Vec<f64> {
    segment.iter().map(|p| p.lon).collect()
}

#[test]
fn two_crossings_give_three_colored_segments() {
    let input = positions(&[170.0, 178.0, -179.0, -170.0, 175.0]);
    let segments = build_segments(&input);
    assert_eq!(segments.len(), 3);
    assert_eq!(lons(&segments[0].points), vec![170.0, 178.0]);
    assert_eq!(lons(&segments[1].points), vec![-179.0, -170.0]);
    assert_eq!(lons(&segments[2].points), vec![175.0]);
    let colors: Vec<_> = segments.iter().map(|s| s.color).collect();
    assert_eq!(colors, vec![PathColor::Red, PathColor::Green, PathColor::Blue]);
}

#[test]
fn slow_eastward_track_stays_whole() {
    let input = positions(&[0.0, 10.0, 20.0]);
    let segments = build_segments(&input);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].points, input);
    assert_eq!(segments[0].color, PathColor::Red);
}

#[test]
fn segments_partition_the_input_at_jumps() {
    // Ten orbits' worth of sawtooth longitudes.
    let mut track = Vec::new();
    for orbit in 0..10 {
        for step in 0..24 {
            let lon = -180.0 + 15.0 * step as f64 + 3.0 * orbit as f64;
            let lon = if lon > 180.0 { lon - 360.0 } else { lon };
            track.push(Position::new(0.0, lon));
        }
    }
    let segments = build_segments(&track);

    let rejoined: Vec<Position> = segments.iter().flat_map(|s| s.points.clone()).collect();
    assert_eq!(rejoined, track);

    for (k, segment) in segments.iter().enumerate() {
        assert!(!segment.points.is_empty());
        assert_eq!(segment.color, PathColor::cycle(k));
        assert_eq!(segment.color, PathColor::PALETTE[k % 3]);
        for pair in segment.points.windows(2) {
            assert!(!crosses_antimeridian(&pair[0], &pair[1]));
        }
    }
    for pair in segments.windows(2) {
        let last = pair[0].points.last().unwrap();
        let first = pair[1].points.first().unwrap();
        assert!(crosses_antimeridian(last, first));
    }
}

#[test]
fn copies_keep_latitudes_and_shift_whole_turns() {
    let path = positions(&[100.0, 120.0]);
    for copy in duplicate_path(&path) {
        assert_eq!(copy.len(), path.len());
        for (c, p) in copy.iter().zip(&path) {
            assert_eq!(c.lat, p.lat);
            let turns = (c.lon - p.lon) / 360.0;
            assert_eq!(turns, turns.round());
            assert!(turns.abs() <= 1.0);
        }
    }
    let marker = duplicate_position(Position::new(51.5, -0.1));
    assert_eq!(marker.len(), 3);
    for (copy, expected) in marker.iter().zip([-360.1, -0.1, 359.9]) {
        assert_float_absolute_eq!(copy.lon, expected, 1e-9);
        assert_eq!(copy.lat, 51.5);
    }
}
