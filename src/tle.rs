//! Two-Line Element (TLE) handling for the station.
//!
//! Parses element sets with `sgp4`, fetches fresh ones from CelesTrak with
//! retries, keeps a one-day file cache and falls back to an embedded ISS
//! element set when the network is unavailable. Propagated states are
//! rotated into the Earth-fixed frame to give sub-satellite points.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use nalgebra::{Rotation3, Vector3};
use sgp4::Constants;

use crate::backend::http_agent;
use crate::time::greenwich_mean_sidereal_time;
use crate::trajectory::Position;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const STATION_NAME: &str = "ISS";
pub const DEFAULT_TLE_URL: &str = "https://celestrak.org/NORAD/elements/stations.txt";
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 3600);
pub const FETCH_RETRIES: u32 = 3;
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

pub const EMBEDDED_TLE: [&str; 3] = [
    "ISS (ZARYA)",
    "1 25544U 98067A   24241.03733169  .00022625  00000+0  40054-3 0  9997",
    "2 25544  51.6393 319.3593 0006301 282.8570 136.4539 15.50177998469691",
];

#[derive(Clone)]
pub struct TleSatellite {
    pub name: String,
    pub constants: Constants,
    pub epoch: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug)]
pub struct SubPoint {
    pub position: Position,
    pub altitude_km: f64,
    pub speed_kmh: f64,
}

impl TleSatellite {
    pub fn embedded() -> Result<Self> {
        parse_tle_data(&EMBEDDED_TLE.join("\n"))?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedded element set did not parse"))
    }

    // Earth-fixed position and velocity (km, km/s) at `at`.
    pub fn state_ecef(&self, at: DateTime<Utc>) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let minutes = (at - self.epoch).num_milliseconds() as f64 / 60_000.0;
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| anyhow!("propagation of {} failed: {:?}", self.name, e))?;
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), -greenwich_mean_sidereal_time(at));
        let pos = Vector3::from(prediction.position);
        let vel = Vector3::from(prediction.velocity);
        Ok((rot * pos, vel))
    }

    pub fn sub_point(&self, at: DateTime<Utc>) -> Result<SubPoint> {
        let (ecef, vel) = self.state_ecef(at)?;
        let r = ecef.norm();
        let lat = (ecef.z / r).asin().to_degrees();
        let lon = ecef.y.atan2(ecef.x).to_degrees();
        Ok(SubPoint {
            position: Position::new(lat, lon),
            altitude_km: r - EARTH_RADIUS_KM,
            speed_kmh: vel.norm() * 3600.0,
        })
    }

    // Samples every `interval_s` from `start` while `t <= start + duration_s`.
    pub fn ground_track(
        &self,
        start: DateTime<Utc>,
        duration_s: f64,
        interval_s: f64,
    ) -> Result<Vec<Position>> {
        if interval_s <= 0.0 {
            bail!("sampling interval must be positive, got {interval_s}");
        }
        let steps = (duration_s.max(0.0) / interval_s).floor() as usize;
        (0..=steps)
            .map(|i| {
                let t = start + chrono::Duration::milliseconds((i as f64 * interval_s * 1000.0) as i64);
                self.sub_point(t).map(|s| s.position)
            })
            .collect()
    }
}

// Name line followed by its two element lines, with blank lines ignored.
fn element_groups(data: &str) -> Vec<[&str; 3]> {
    let lines: Vec<&str> = data.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .windows(3)
        .filter(|w| {
            !w[0].starts_with("1 ") && !w[0].starts_with("2 ")
                && w[1].starts_with("1 ") && w[2].starts_with("2 ")
        })
        .map(|w| [w[0], w[1], w[2]])
        .collect()
}

fn satellite_from_group([name, line1, line2]: [&str; 3]) -> Result<TleSatellite> {
    let elements = sgp4::Elements::from_tle(Some(name.to_string()), line1.as_bytes(), line2.as_bytes())
        .map_err(|e| anyhow!("bad element set for {name}: {e:?}"))?;
    let constants = Constants::from_elements(&elements)
        .map_err(|e| anyhow!("cannot propagate {name}: {e:?}"))?;
    Ok(TleSatellite {
        name: name.to_string(),
        epoch: elements.datetime.and_utc(),
        constants,
    })
}

pub fn parse_tle_data(data: &str) -> Result<Vec<TleSatellite>> {
    let satellites: Vec<TleSatellite> = element_groups(data)
        .into_iter()
        .filter_map(|group| match satellite_from_group(group) {
            Ok(sat) => Some(sat),
            Err(e) => {
                warn!("Skipping element set: {e:#}");
                None
            }
        })
        .collect();
    if satellites.is_empty() {
        bail!("no valid TLE data found");
    }
    Ok(satellites)
}

// First group whose name contains `name`, else the first group.
pub fn select_station_lines(data: &str, name: &str) -> Option<[String; 3]> {
    let groups = element_groups(data);
    groups
        .iter()
        .find(|g| g[0].contains(name))
        .or_else(|| groups.first())
        .map(|g| (*g).map(|l| l.to_string()))
}

pub struct TleSource {
    pub url: String,
    pub cache_path: PathBuf,
    pub retries: u32,
    pub retry_delay: Duration,
    pub max_age: Duration,
    agent: ureq::Agent,
}

impl TleSource {
    pub fn new(url: impl Into<String>, cache_dir: PathBuf) -> Self {
        Self {
            url: url.into(),
            cache_path: cache_dir.join("tle_cache.txt"),
            retries: FETCH_RETRIES,
            retry_delay: FETCH_RETRY_DELAY,
            max_age: CACHE_MAX_AGE,
            agent: http_agent(),
        }
    }

    pub fn cache_is_fresh(&self) -> bool {
        std::fs::metadata(&self.cache_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age < self.max_age)
    }

    fn read_cache(&self) -> Result<TleSatellite> {
        let text = std::fs::read_to_string(&self.cache_path)
            .with_context(|| format!("reading {}", self.cache_path.display()))?;
        first_satellite(&text)
    }

    fn write_cache(&self, lines: &[String; 3]) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.cache_path, lines.join("\n"))
            .with_context(|| format!("writing {}", self.cache_path.display()))
    }

    fn fetch_once(&self) -> Result<[String; 3]> {
        let body = self
            .agent
            .get(&self.url)
            .call()
            .with_context(|| format!("GET {}", self.url))?
            .into_string()
            .context("reading TLE response")?;
        select_station_lines(&body, STATION_NAME)
            .ok_or_else(|| anyhow!("no element sets in response from {}", self.url))
    }

    pub fn load(&self) -> Result<TleSatellite> {
        if self.cache_is_fresh() {
            match self.read_cache() {
                Ok(sat) => return Ok(sat),
                Err(e) => warn!("Ignoring unreadable TLE cache: {e:#}"),
            }
        }

        for attempt in 1..=self.retries {
            match self.fetch_once() {
                Ok(lines) => {
                    if let Err(e) = self.write_cache(&lines) {
                        warn!("Could not cache TLE: {e:#}");
                    }
                    info!("Fetched TLE for {}", lines[0]);
                    return first_satellite(&lines.join("\n"));
                }
                Err(e) => {
                    warn!("TLE fetch attempt {attempt} failed: {e:#}");
                    if attempt < self.retries {
                        std::thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        warn!("All TLE fetch attempts failed, using embedded element set");
        TleSatellite::embedded()
    }
}

fn first_satellite(text: &str) -> Result<TleSatellite> {
    parse_tle_data(text)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no satellites in element data"))
}
