//! Data sources for the tracker.
//!
//! `HttpBackend` talks to the tracking server; `LocalBackend` answers the
//! same questions offline by propagating the station's element set.
//! All calls block and are meant to run on worker threads.

mod http;
mod local;

pub use http::HttpBackend;
pub use local::{LocalBackend, LocalStore};

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::api::{CrewMember, IssInfo, MapSettings, PassWindow};
use crate::trajectory::Position;

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;
    fn current_position(&self) -> Result<Position>;
    fn future_trajectory(&self, duration_s: f64) -> Result<Vec<Position>>;
    fn info(&self) -> Result<IssInfo>;
    fn crew(&self) -> Result<Vec<CrewMember>>;
    fn next_passes(&self, lat: f64, lon: f64) -> Result<Vec<PassWindow>>;
    fn save_settings(&self, settings: &MapSettings) -> Result<()>;
    // `Ok(None)` when the user has no saved settings yet.
    fn load_settings(&self, user_id: &str) -> Result<Option<MapSettings>>;
    fn add_reminder(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()>;
    // Reminders for `user_id` that have not been delivered yet.
    fn pending_reminders(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>>;
    fn mark_notified(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()>;
}

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build()
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn station_crew(people: Vec<CrewMember>) -> Vec<CrewMember> {
    people.into_iter().filter(|p| p.craft == "ISS").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round2(27_583.456), 27_583.46);
        assert_eq!(round2(417.0), 417.0);
    }

    #[test]
    fn crew_filter_keeps_station_only() {
        let people = vec![
            CrewMember { name: "A".into(), craft: "ISS".into() },
            CrewMember { name: "B".into(), craft: "Tiangong".into() },
        ];
        let crew = station_crew(people);
        assert_eq!(crew.len(), 1);
        assert_eq!(crew[0].name, "A");
    }
}
