use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;

use super::{http_agent, Backend};
use crate::api::{
    reminder_time, CrewMember, CrewResponse, IssInfo, MapSettings, PassWindow, StatusResponse,
    WirePosition,
};
use crate::trajectory::Position;

pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: http_agent(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        debug!("GET {url} {query:?}");
        let mut req = self.agent.get(&url);
        for (k, v) in query {
            req = req.query(k, v);
        }
        req.call()
            .with_context(|| format!("GET {url}"))?
            .into_json()
            .with_context(|| format!("decoding response of {url}"))
    }

    fn expect_success(&self, path: &str, resp: ureq::Response) -> Result<()> {
        let status: StatusResponse = resp
            .into_json()
            .with_context(|| format!("decoding response of {path}"))?;
        if !status.is_success() {
            bail!("{path} answered {:?} / {:?}", status.status, status.error);
        }
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn current_position(&self) -> Result<Position> {
        let p: WirePosition = self.get_json("/iss-now", &[])?;
        Ok(p.into())
    }

    fn future_trajectory(&self, duration_s: f64) -> Result<Vec<Position>> {
        let pts: Vec<WirePosition> =
            self.get_json("/future-trajectory", &[("duration", duration_s.to_string())])?;
        Ok(pts.into_iter().map(Position::from).collect())
    }

    fn info(&self) -> Result<IssInfo> {
        self.get_json("/iss-info", &[])
    }

    fn crew(&self) -> Result<Vec<CrewMember>> {
        let resp: CrewResponse = self.get_json("/iss-crew", &[])?;
        if let Some(err) = resp.error {
            bail!("crew endpoint reported: {err}");
        }
        Ok(resp.crew)
    }

    fn next_passes(&self, lat: f64, lon: f64) -> Result<Vec<PassWindow>> {
        self.get_json("/next-passes", &[("lat", lat.to_string()), ("lon", lon.to_string())])
    }

    fn save_settings(&self, settings: &MapSettings) -> Result<()> {
        let url = self.url("/save-map-settings");
        debug!("POST {url}");
        let resp = self
            .agent
            .post(&url)
            .send_json(settings)
            .with_context(|| format!("POST {url}"))?;
        self.expect_success("/save-map-settings", resp)
    }

    fn load_settings(&self, user_id: &str) -> Result<Option<MapSettings>> {
        let url = self.url("/load-map-settings");
        debug!("POST {url} user_id={user_id}");
        let value: serde_json::Value = self
            .agent
            .post(&url)
            .send_form(&[("user_id", user_id)])
            .with_context(|| format!("POST {url}"))?
            .into_json()
            .context("decoding saved settings")?;
        if let Some(err) = value.get("error") {
            debug!("No saved settings for {user_id}: {err}");
            return Ok(None);
        }
        let mut settings: MapSettings =
            serde_json::from_value(value).map_err(|e| anyhow!("malformed settings: {e}"))?;
        if settings.user_id.is_empty() {
            settings.user_id = user_id.to_string();
        }
        Ok(Some(settings))
    }

    fn add_reminder(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        let url = self.url("/add-reminder");
        let when = reminder_time(pass_time);
        debug!("POST {url} user_id={user_id} pass_time={when}");
        let resp = self
            .agent
            .post(&url)
            .send_form(&[("user_id", user_id), ("pass_time", when.as_str())])
            .with_context(|| format!("POST {url}"))?;
        self.expect_success("/add-reminder", resp)
    }

    // The server delivers its own reminders and exposes no listing.
    fn pending_reminders(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        debug!("Reminders for {user_id} are delivered by the server");
        Ok(Vec::new())
    }

    fn mark_notified(&self, _user_id: &str, _pass_time: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_cleanly() {
        let b = HttpBackend::new("http://localhost:5000/");
        assert_eq!(b.url("/iss-now"), "http://localhost:5000/iss-now");
        assert_eq!(b.url("iss-info"), "http://localhost:5000/iss-info");
    }

    #[test]
    fn unreachable_server_is_an_error() {
        let b = HttpBackend::new("http://127.0.0.1:9");
        assert!(b.current_position().is_err());
        assert!(b.add_reminder("1", Utc::now()).is_err());
    }
}
