//! Sidereal time for rotating inertial positions into the Earth-fixed frame.

use chrono::{DateTime, Utc};

pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;
pub const GMST_BASE_DEG: f64 = 280.46061837;
pub const GMST_ROTATION_PER_DAY: f64 = 360.98564736629;
pub const GMST_CORRECTION: f64 = 0.000387933;
// 2000-01-01T12:00:00Z
const J2000_UNIX_SECONDS: f64 = 946_728_000.0;

pub fn days_since_j2000(timestamp: DateTime<Utc>) -> f64 {
    (timestamp.timestamp_millis() as f64 / 1000.0 - J2000_UNIX_SECONDS) / SECONDS_PER_DAY
}

// GMST in radians, normalised to [0, 2π).
pub fn greenwich_mean_sidereal_time(timestamp: DateTime<Utc>) -> f64 {
    let days = days_since_j2000(timestamp);
    let centuries = days / DAYS_PER_JULIAN_CENTURY;
    let gmst_degrees = GMST_BASE_DEG
        + GMST_ROTATION_PER_DAY * days
        + GMST_CORRECTION * centuries * centuries
        - centuries * centuries * centuries / 38710000.0;
    gmst_degrees.rem_euclid(360.0).to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::assert_float_absolute_eq;
    use chrono::TimeZone;

    #[test]
    fn gmst_at_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_float_absolute_eq!(days_since_j2000(t), 0.0, 1e-12);
        assert_float_absolute_eq!(greenwich_mean_sidereal_time(t).to_degrees(), GMST_BASE_DEG, 1e-6);
    }

    #[test]
    fn gmst_advances_about_one_degree_per_day_beyond_a_turn() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::days(1);
        let delta = (greenwich_mean_sidereal_time(b) - greenwich_mean_sidereal_time(a))
            .to_degrees()
            .rem_euclid(360.0);
        assert_float_absolute_eq!(delta, 0.9856, 1e-3);
    }
}
