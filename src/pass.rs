use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;

use crate::api::PassWindow;
use crate::tle::{TleSatellite, EARTH_RADIUS_KM};

pub const SCAN_STEP_SECONDS: f64 = 30.0;
pub const BISECTION_STEPS: usize = 15;
pub const DEFAULT_PASS_COUNT: usize = 3;
pub const DEFAULT_SEARCH_DAYS: i64 = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub elevation_m: f64,
}

impl Observer {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg, elevation_m: 10.0 }
    }

    pub fn ecef(&self) -> Vector3<f64> {
        let r = EARTH_RADIUS_KM + self.elevation_m / 1000.0;
        let lat = self.lat_deg.to_radians();
        let lon = self.lon_deg.to_radians();
        Vector3::new(r * lat.cos() * lon.cos(), r * lat.cos() * lon.sin(), r * lat.sin())
    }
}

// Degrees above the local horizon at `gs` of a target at `sat` (both Earth-fixed, km).
fn elevation_from_ground(gs: &Vector3<f64>, sat: &Vector3<f64>) -> f64 {
    let up = gs.normalize();
    let d = sat - gs;
    let dist = d.norm();
    if dist < 1e-9 {
        return 90.0;
    }
    (up.dot(&d) / dist).asin().to_degrees()
}

pub fn elevation_at(sat: &TleSatellite, observer: &Observer, at: DateTime<Utc>) -> Result<f64> {
    let (ecef, _) = sat.state_ecef(at)?;
    Ok(elevation_from_ground(&observer.ecef(), &ecef))
}

fn offset(start: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    start + Duration::milliseconds((seconds * 1000.0).round() as i64)
}

// Rising horizon crossing between `below` and `above`, in seconds after `start`.
fn bisect_entry(
    sat: &TleSatellite,
    observer: &Observer,
    start: DateTime<Utc>,
    below: f64,
    above: f64,
) -> Result<f64> {
    let mut lo = below;
    let mut hi = above;
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) * 0.5;
        if elevation_at(sat, observer, offset(start, mid))? > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok((lo + hi) * 0.5)
}

pub fn predict_passes(
    sat: &TleSatellite,
    observer: &Observer,
    start: DateTime<Utc>,
    window: Duration,
    count: usize,
) -> Result<Vec<PassWindow>> {
    let window_s = window.num_seconds().max(0) as f64;
    let steps = (window_s / SCAN_STEP_SECONDS).ceil() as usize;

    let mut passes = Vec::new();
    let mut in_pass = false;
    let mut rise = 0.0;
    let mut max_elev = 0.0_f64;
    let mut prev_t = 0.0;

    for si in 0..=steps {
        if passes.len() >= count {
            break;
        }
        let t = (si as f64 * SCAN_STEP_SECONDS).min(window_s);
        let elev = elevation_at(sat, observer, offset(start, t))?;

        if elev > 0.0 {
            if !in_pass {
                in_pass = true;
                rise = if si == 0 { t } else { bisect_entry(sat, observer, start, prev_t, t)? };
                max_elev = elev;
            } else {
                max_elev = max_elev.max(elev);
            }
        } else if in_pass {
            let set = bisect_exit(sat, observer, start, prev_t, t)?;
            passes.push(PassWindow {
                rise_time: offset(start, rise),
                set_time: offset(start, set),
                max_elevation: Some(max_elev),
            });
            in_pass = false;
        }
        prev_t = t;
    }

    if in_pass && passes.len() < count {
        passes.push(PassWindow {
            rise_time: offset(start, rise),
            set_time: offset(start, window_s),
            max_elevation: Some(max_elev),
        });
    }

    Ok(passes)
}

fn bisect_exit(
    sat: &TleSatellite,
    observer: &Observer,
    start: DateTime<Utc>,
    above: f64,
    below: f64,
) -> Result<f64> {
    let mut lo = above;
    let mut hi = below;
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) * 0.5;
        if elevation_at(sat, observer, offset(start, mid))? > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok((lo + hi) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zenith_and_horizon() {
        let gs = Vector3::new(EARTH_RADIUS_KM, 0.0, 0.0);
        let overhead = Vector3::new(EARTH_RADIUS_KM + 400.0, 0.0, 0.0);
        assert!((elevation_from_ground(&gs, &overhead) - 90.0).abs() < 1e-9);
        let sideways = Vector3::new(EARTH_RADIUS_KM, 500.0, 0.0);
        assert!(elevation_from_ground(&gs, &sideways).abs() < 1e-9);
        let below = Vector3::new(0.0, 0.0, 0.0);
        assert!(elevation_from_ground(&gs, &below) < -89.0);
    }

    #[test]
    fn observer_on_equator_at_prime_meridian() {
        let ecef = Observer { lat_deg: 0.0, lon_deg: 0.0, elevation_m: 0.0 }.ecef();
        assert!((ecef.x - EARTH_RADIUS_KM).abs() < 1e-9);
        assert!(ecef.y.abs() < 1e-9 && ecef.z.abs() < 1e-9);
    }
}
