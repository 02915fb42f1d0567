//! Command-line and environment configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::backend::{Backend, HttpBackend, LocalBackend, LocalStore};
use crate::geo::default_cache_dir;
use crate::pass::Observer;
use crate::tle::{TleSource, DEFAULT_TLE_URL};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Propagate the station's element set on this machine.
    Local,
    /// Ask the tracking server.
    Http,
}

/// Live ISS position, trajectory and pass reminders
#[derive(Parser, Debug, Clone)]
#[command(name = "iss-tracker", version, about, long_about = None)]
pub struct Config {
    /// Where positions, passes and settings come from
    #[arg(long, value_enum, default_value = "local", env = "ISS_BACKEND")]
    pub backend: BackendKind,

    /// Base URL of the tracking server (http backend)
    #[arg(long, default_value = "http://127.0.0.1:5000", env = "ISS_BACKEND_URL")]
    pub backend_url: String,

    /// User whose map settings are loaded and saved; empty disables remote settings
    #[arg(long, default_value = "", env = "ISS_USER_ID")]
    pub user_id: String,

    /// Observer latitude for pass predictions, degrees
    #[arg(long, default_value_t = 48.864716, allow_hyphen_values = true, env = "ISS_OBSERVER_LAT")]
    pub observer_lat: f64,

    /// Observer longitude for pass predictions, degrees
    #[arg(long, default_value_t = 2.349014, allow_hyphen_values = true, env = "ISS_OBSERVER_LON")]
    pub observer_lon: f64,

    /// Seconds between position refreshes
    #[arg(long, default_value_t = 10, env = "ISS_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: u64,

    /// Notify this many minutes before a reminded pass
    #[arg(long, default_value_t = 0, env = "ISS_REMINDER_LEAD_MINUTES")]
    pub reminder_lead_minutes: i64,

    /// Element set source (local backend)
    #[arg(long, default_value = DEFAULT_TLE_URL, env = "ISS_TLE_URL")]
    pub tle_url: String,

    /// Cache directory for element sets, basemap and local settings
    #[arg(long, env = "ISS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(-90.0..=90.0).contains(&self.observer_lat) {
            anyhow::bail!("observer latitude {} is outside [-90, 90]", self.observer_lat);
        }
        if !(-180.0..=180.0).contains(&self.observer_lon) {
            anyhow::bail!("observer longitude {} is outside [-180, 180]", self.observer_lon);
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll interval must be at least one second");
        }
        if self.reminder_lead_minutes < 0 {
            anyhow::bail!("reminder lead cannot be negative");
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reminder_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_lead_minutes)
    }

    pub fn observer(&self) -> Observer {
        Observer::new(self.observer_lat, self.observer_lon)
    }

    pub fn build_backend(&self) -> Arc<dyn Backend> {
        match self.backend {
            BackendKind::Http => Arc::new(HttpBackend::new(&self.backend_url)),
            BackendKind::Local => {
                let cache_dir = self.cache_dir();
                Arc::new(LocalBackend::new(
                    TleSource::new(self.tle_url.clone(), cache_dir.clone()),
                    LocalStore::new(cache_dir),
                ))
            }
        }
    }
}
