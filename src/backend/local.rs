use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{http_agent, round2, station_crew, Backend};
use crate::api::{AstrosResponse, CrewMember, IssInfo, MapSettings, PassWindow};
use crate::pass::{predict_passes, Observer, DEFAULT_PASS_COUNT, DEFAULT_SEARCH_DAYS};
use crate::tle::{TleSatellite, TleSource};
use crate::trajectory::Position;

pub const TRAJECTORY_INTERVAL_SECONDS: f64 = 60.0;
pub const CREW_URL: &str = "http://api.open-notify.org/astros.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredReminder {
    pub user_id: String,
    pub pass_time: DateTime<Utc>,
    pub notified: bool,
}

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    // Hex keeps every id distinct and filesystem-safe.
    fn settings_path(&self, user_id: &str) -> PathBuf {
        let stem = if user_id.is_empty() { "default".to_string() } else { hex::encode(user_id) };
        self.dir.join("settings").join(format!("{stem}.json"))
    }

    fn reminders_path(&self) -> PathBuf {
        self.dir.join("reminders.json")
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn save_settings(&self, settings: &MapSettings) -> Result<()> {
        Self::write_json(&self.settings_path(&settings.user_id), settings)
    }

    pub fn load_settings(&self, user_id: &str) -> Result<Option<MapSettings>> {
        let path = self.settings_path(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(settings))
    }

    pub fn reminders(&self) -> Result<Vec<StoredReminder>> {
        let path = self.reminders_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn add_reminder(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        let mut all = self.reminders()?;
        if all.iter().any(|r| r.user_id == user_id && r.pass_time == pass_time) {
            return Ok(());
        }
        all.push(StoredReminder { user_id: user_id.to_string(), pass_time, notified: false });
        Self::write_json(&self.reminders_path(), &all)
    }

    pub fn pending_reminders(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        Ok(self
            .reminders()?
            .into_iter()
            .filter(|r| r.user_id == user_id && !r.notified)
            .map(|r| r.pass_time)
            .collect())
    }

    pub fn mark_notified(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        let mut all = self.reminders()?;
        let mut changed = false;
        for r in all.iter_mut().filter(|r| r.user_id == user_id && r.pass_time == pass_time) {
            changed |= !r.notified;
            r.notified = true;
        }
        if changed {
            Self::write_json(&self.reminders_path(), &all)?;
        }
        Ok(())
    }
}

pub struct LocalBackend {
    tle_source: TleSource,
    satellite: Mutex<Option<(Instant, Arc<TleSatellite>)>>,
    store: LocalStore,
    crew_url: String,
    agent: ureq::Agent,
}

impl LocalBackend {
    pub fn new(tle_source: TleSource, store: LocalStore) -> Self {
        Self {
            tle_source,
            satellite: Mutex::new(None),
            store,
            crew_url: CREW_URL.to_string(),
            agent: http_agent(),
        }
    }

    pub fn with_crew_url(mut self, url: impl Into<String>) -> Self {
        self.crew_url = url.into();
        self
    }

    // Pins `sat`; it is never refreshed.
    pub fn with_satellite(mut self, sat: TleSatellite) -> Self {
        self.satellite = Mutex::new(Some((Instant::now(), Arc::new(sat))));
        self.tle_source.max_age = std::time::Duration::MAX;
        self
    }

    fn satellite(&self) -> Result<Arc<TleSatellite>> {
        let mut guard = self
            .satellite
            .lock()
            .map_err(|_| anyhow!("satellite cache poisoned"))?;
        if let Some((loaded_at, sat)) = guard.as_ref() {
            if loaded_at.elapsed() < self.tle_source.max_age {
                return Ok(sat.clone());
            }
        }
        let sat = Arc::new(self.tle_source.load()?);
        info!("Propagating {} (epoch {})", sat.name, sat.epoch);
        *guard = Some((Instant::now(), sat.clone()));
        Ok(sat)
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn current_position(&self) -> Result<Position> {
        Ok(self.satellite()?.sub_point(Utc::now())?.position)
    }

    fn future_trajectory(&self, duration_s: f64) -> Result<Vec<Position>> {
        self.satellite()?.ground_track(Utc::now(), duration_s, TRAJECTORY_INTERVAL_SECONDS)
    }

    fn info(&self) -> Result<IssInfo> {
        let now = Utc::now();
        let sp = self.satellite()?.sub_point(now)?;
        Ok(IssInfo {
            latitude: sp.position.lat,
            longitude: sp.position.lon,
            altitude: round2(sp.altitude_km),
            speed: round2(sp.speed_kmh),
            timestamp: now,
        })
    }

    fn crew(&self) -> Result<Vec<CrewMember>> {
        let resp: AstrosResponse = self
            .agent
            .get(&self.crew_url)
            .call()
            .with_context(|| format!("GET {}", self.crew_url))?
            .into_json()
            .context("decoding crew list")?;
        Ok(station_crew(resp.people))
    }

    fn next_passes(&self, lat: f64, lon: f64) -> Result<Vec<PassWindow>> {
        let sat = self.satellite()?;
        debug!("Predicting passes over ({lat:.3}, {lon:.3})");
        predict_passes(
            &sat,
            &Observer::new(lat, lon),
            Utc::now(),
            chrono::Duration::days(DEFAULT_SEARCH_DAYS),
            DEFAULT_PASS_COUNT,
        )
    }

    fn save_settings(&self, settings: &MapSettings) -> Result<()> {
        self.store.save_settings(settings)
    }

    fn load_settings(&self, user_id: &str) -> Result<Option<MapSettings>> {
        self.store.load_settings(user_id)
    }

    fn add_reminder(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        self.store.add_reminder(user_id, pass_time)
    }

    fn pending_reminders(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        self.store.pending_reminders(user_id)
    }

    fn mark_notified(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        self.store.mark_notified(user_id, pass_time)
    }
}
