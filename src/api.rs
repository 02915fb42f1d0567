//! Wire types for the tracking backend's HTTP contract.
//!
//! The backend reports coordinates either as JSON numbers or as numeric
//! strings, and pass times as `"%Y-%m-%d %H:%M:%S UTC"`. Both are accepted
//! here so the rest of the crate only sees typed values.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::trajectory::Position;

pub const PASS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn flexible_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    match NumberOrString::deserialize(de)? {
        NumberOrString::Number(v) => Ok(v),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct WirePosition {
    #[serde(deserialize_with = "flexible_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub lon: f64,
}

impl From<WirePosition> for Position {
    fn from(w: WirePosition) -> Self {
        Position::new(w.lat, w.lon)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub craft: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CrewResponse {
    #[serde(default)]
    pub crew: Vec<CrewMember>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AstrosResponse {
    #[serde(default)]
    pub people: Vec<CrewMember>,
}

pub fn parse_pass_time(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let bare = s.strip_suffix("UTC").unwrap_or(s).trim_end();
    NaiveDateTime::parse_from_str(bare, PASS_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("bad pass time {s:?}: {e}"))
}

fn pass_time<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(de)?;
    parse_pass_time(&s).map_err(serde::de::Error::custom)
}

fn write_pass_time<S: Serializer>(t: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&format!("{} UTC", t.format(PASS_TIME_FORMAT)))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassWindow {
    #[serde(deserialize_with = "pass_time", serialize_with = "write_pass_time")]
    pub rise_time: DateTime<Utc>,
    #[serde(deserialize_with = "pass_time", serialize_with = "write_pass_time")]
    pub set_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elevation: Option<f64>,
}

// Per-user display settings. The save endpoint expects `userId`; the load
// endpoint answers with `user_id` or omits it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    #[serde(rename = "userId", alias = "user_id", default)]
    pub user_id: String,
    pub toggle_iss: bool,
    pub toggle_trajectory: bool,
    #[serde(deserialize_with = "flexible_f64")]
    pub trajectory_time: f64,
    pub zoom_level: i32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            toggle_iss: true,
            toggle_trajectory: true,
            trajectory_time: 1.5,
            zoom_level: 2,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

pub fn reminder_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
