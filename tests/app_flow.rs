use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use iss_tracker::api::{CrewMember, IssInfo, MapSettings, PassWindow};
use iss_tracker::backend::{Backend, LocalBackend, LocalStore};
use iss_tracker::dispatch::{Dispatcher, Reply, Request};
use iss_tracker::tle::{TleSatellite, TleSource};
use iss_tracker::trajectory::Position;
use iss_tracker::{App, Config};
use tempdir::TempDir;

// In-memory backend. Trajectory requests sleep one millisecond per thousand
// seconds requested so an older request can be made to finish last.
#[derive(Default)]
struct FakeBackend {
    stored: Option<MapSettings>,
    failing: AtomicBool,
    trajectory_calls: AtomicUsize,
    reminders: Mutex<Vec<(String, DateTime<Utc>, bool)>>,
}

impl FakeBackend {
    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("backend unavailable");
        }
        Ok(())
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn current_position(&self) -> Result<Position> {
        Ok(Position::new(12.5, -45.0))
    }

    fn future_trajectory(&self, duration_s: f64) -> Result<Vec<Position>> {
        self.trajectory_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        std::thread::sleep(Duration::from_millis((duration_s / 1000.0) as u64));
        Ok(vec![
            Position::new(0.0, 170.0),
            Position::new(1.0, 179.0),
            Position::new(2.0, -172.0),
            Position::new(duration_s, -165.0),
        ])
    }

    fn info(&self) -> Result<IssInfo> {
        self.check()?;
        Ok(IssInfo { latitude: 12.5, longitude: -45.0, altitude: 417.0, speed: 27600.0, timestamp: Utc::now() })
    }

    fn crew(&self) -> Result<Vec<CrewMember>> {
        Ok(vec![CrewMember { name: "Suni Williams".into(), craft: "ISS".into() }])
    }

    fn next_passes(&self, _lat: f64, _lon: f64) -> Result<Vec<PassWindow>> {
        Ok(Vec::new())
    }

    fn save_settings(&self, _settings: &MapSettings) -> Result<()> {
        Ok(())
    }

    fn load_settings(&self, _user_id: &str) -> Result<Option<MapSettings>> {
        Ok(self.stored.clone())
    }

    fn add_reminder(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        self.reminders.lock().unwrap().push((user_id.to_string(), pass_time, false));
        Ok(())
    }

    fn pending_reminders(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let all = self.reminders.lock().unwrap();
        Ok(all.iter().filter(|r| r.0 == user_id && !r.2).map(|r| r.1).collect())
    }

    fn mark_notified(&self, user_id: &str, pass_time: DateTime<Utc>) -> Result<()> {
        for r in self.reminders.lock().unwrap().iter_mut() {
            if r.0 == user_id && r.1 == pass_time {
                r.2 = true;
            }
        }
        Ok(())
    }
}

fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for replies");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn config(dir: &TempDir, extra: &[&str]) -> Config {
    let cache = dir.path().to_string_lossy().to_string();
    let mut args = vec!["iss-tracker", "--cache-dir", cache.as_str()];
    args.extend_from_slice(extra);
    Config::try_parse_from(args).unwrap()
}

fn app_with(dir: &TempDir, extra: &[&str], backend: Arc<FakeBackend>) -> App {
    App::with_dispatcher(config(dir, extra), Dispatcher::new(backend))
}

// Drains until every issued request has answered.
fn settle(app: &mut App) {
    wait_for(|| {
        app.handle_replies();
        app.in_flight() == 0
    });
}

#[test]
fn superseded_trajectory_reply_is_dropped() {
    let mut dispatcher = Dispatcher::new(Arc::new(FakeBackend::default()));
    dispatcher.send(Request::Trajectory { duration_s: 300_000.0 });
    dispatcher.send(Request::Trajectory { duration_s: 1000.0 });

    let mut replies = Vec::new();
    wait_for(|| {
        replies.extend(dispatcher.poll());
        dispatcher.in_flight() == 0
    });
    assert_eq!(replies.len(), 1);
    match &replies[0] {
        Reply::Trajectory { generation, result } => {
            assert_eq!(*generation, 2);
            assert_eq!(result.as_ref().unwrap().last().unwrap().lat, 1000.0);
        }
        _ => panic!("expected a trajectory reply"),
    }
}

#[test]
fn poll_updates_marker_and_path_set() {
    let dir = TempDir::new("app").unwrap();
    let mut app = app_with(&dir, &[], Arc::new(FakeBackend::default()));
    app.start();
    assert!(app.poll_backend(Instant::now()));
    assert!(!app.poll_backend(Instant::now()));

    settle(&mut app);
    assert_eq!(app.map().marker(), Some(Position::new(12.5, -45.0)));
    assert_eq!(app.map().segments().len(), 2);
    assert!(app.telemetry().is_some());
}

#[test]
fn failures_clear_telemetry_and_paths() {
    let dir = TempDir::new("app").unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut app = app_with(&dir, &[], backend.clone());
    let first = Instant::now();
    app.poll_backend(first);
    settle(&mut app);
    assert!(app.telemetry().is_some());
    assert!(!app.map().segments().is_empty());

    backend.failing.store(true, Ordering::SeqCst);
    assert!(app.poll_backend(first + Duration::from_secs(10)));
    settle(&mut app);
    assert!(app.telemetry().is_none());
    assert!(app.map().segments().is_empty());
    assert!(app.map().marker().is_some());
}

#[test]
fn stored_settings_are_applied_at_startup() {
    let dir = TempDir::new("app").unwrap();
    let stored = MapSettings {
        user_id: "7".into(),
        toggle_iss: false,
        toggle_trajectory: true,
        trajectory_time: 3.0,
        zoom_level: 6,
    };
    let backend = Arc::new(FakeBackend { stored: Some(stored), ..FakeBackend::default() });
    let mut app = app_with(&dir, &["--user-id", "7"], backend);
    app.start();
    settle(&mut app);
    assert_eq!(app.map().zoom_level(), 6);
    assert!(!app.map().show_marker);
    assert!(app.map().show_trajectory);
}

#[test]
fn loaded_trajectory_off_hides_path_and_stops_polling_it() {
    let dir = TempDir::new("app").unwrap();
    let stored = MapSettings {
        user_id: "7".into(),
        toggle_iss: true,
        toggle_trajectory: false,
        trajectory_time: 2.0,
        zoom_level: 3,
    };
    let backend = Arc::new(FakeBackend { stored: Some(stored), ..FakeBackend::default() });
    let mut app = app_with(&dir, &["--user-id", "7"], backend.clone());

    let first = Instant::now();
    app.poll_backend(first);
    settle(&mut app);
    assert!(!app.map().segments().is_empty());
    assert_eq!(backend.trajectory_calls.load(Ordering::SeqCst), 1);

    app.start();
    settle(&mut app);
    assert!(!app.map().show_trajectory);
    assert!(app.map().segments().is_empty());

    app.poll_backend(first + Duration::from_secs(10));
    settle(&mut app);
    assert_eq!(backend.trajectory_calls.load(Ordering::SeqCst), 1);
    assert!(app.map().segments().is_empty());
}

#[test]
fn command_line_user_survives_session_restore() {
    let dir = TempDir::new("app").unwrap();
    let mut app = app_with(&dir, &["--user-id", "8"], Arc::new(FakeBackend::default()));
    app.restore_session(MapSettings { user_id: "7".into(), zoom_level: 5, ..MapSettings::default() });
    assert_eq!(app.user_id(), "8");
    assert_eq!(app.map().zoom_level(), 5);

    let mut anonymous = app_with(&dir, &[], Arc::new(FakeBackend::default()));
    anonymous.restore_session(MapSettings { user_id: "7".into(), ..MapSettings::default() });
    assert_eq!(anonymous.user_id(), "7");
}

#[test]
fn reminders_fire_once_after_registration() {
    let dir = TempDir::new("app").unwrap();
    let backend = Arc::new(FakeBackend::default());
    let mut app = app_with(&dir, &[], backend.clone());
    let past = Utc.with_ymd_and_hms(2024, 8, 30, 10, 15, 0).unwrap();
    app.request_reminder(past);
    settle(&mut app);
    assert!(app.reminders().contains("default", past));
    assert_eq!(app.reminders().pending().count(), 1);

    app.deliver_reminders();
    assert_eq!(app.reminders().pending().count(), 0);
    assert_eq!(app.notifications().len(), 1);
    settle(&mut app);
    assert!(backend.pending_reminders("default").unwrap().is_empty());
}

#[test]
fn stored_reminder_is_delivered_after_restart() {
    let dir = TempDir::new("app").unwrap();
    let past = Utc.with_ymd_and_hms(2024, 8, 30, 10, 15, 0).unwrap();
    let local = || {
        let source = TleSource::new("http://127.0.0.1:9/unreachable", dir.path().to_path_buf());
        LocalBackend::new(source, LocalStore::new(dir.path().to_path_buf()))
            .with_satellite(TleSatellite::embedded().unwrap())
            .with_crew_url("http://127.0.0.1:9/astros.json")
    };
    local().add_reminder("default", past).unwrap();

    let mut app = App::with_dispatcher(config(&dir, &[]), Dispatcher::new(Arc::new(local())));
    app.start();
    settle(&mut app);
    assert!(app.reminders().contains("default", past));
    app.deliver_reminders();
    assert_eq!(app.notifications().len(), 1);
    assert!(app.notifications()[0].message.starts_with("The ISS will pass overhead at "));

    let store = LocalStore::new(dir.path().to_path_buf());
    wait_for(|| store.pending_reminders("default").unwrap().is_empty());

    let mut restarted = App::with_dispatcher(config(&dir, &[]), Dispatcher::new(Arc::new(local())));
    restarted.start();
    settle(&mut restarted);
    assert_eq!(restarted.reminders().pending().count(), 0);
    restarted.deliver_reminders();
    assert!(restarted.notifications().is_empty());
}
