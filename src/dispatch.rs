//! Fire-and-forget backend requests.
//!
//! Every request runs on its own thread and posts a `Reply` back over a
//! channel that the UI drains once per frame. Trajectory replies carry the
//! generation they were issued with so a slow, superseded request cannot
//! overwrite a newer path.

use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use eframe::egui;
use log::debug;

use crate::api::{CrewMember, IssInfo, MapSettings, PassWindow};
use crate::backend::Backend;
use crate::trajectory::Position;

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    CurrentPosition,
    Trajectory { duration_s: f64 },
    Info,
    Crew,
    NextPasses { lat: f64, lon: f64 },
    SaveSettings(MapSettings),
    LoadSettings { user_id: String },
    AddReminder { user_id: String, pass_time: DateTime<Utc> },
    PendingReminders { user_id: String },
    MarkNotified { user_id: String, pass_time: DateTime<Utc> },
}

pub enum Reply {
    CurrentPosition(Result<Position>),
    Trajectory { generation: u64, result: Result<Vec<Position>> },
    Info(Result<IssInfo>),
    Crew(Result<Vec<CrewMember>>),
    NextPasses(Result<Vec<PassWindow>>),
    SettingsSaved(Result<()>),
    SettingsLoaded(Result<Option<MapSettings>>),
    ReminderAdded { user_id: String, pass_time: DateTime<Utc>, result: Result<()> },
    PendingReminders { user_id: String, result: Result<Vec<DateTime<Utc>>> },
    ReminderNotified(Result<()>),
}

fn execute(backend: &dyn Backend, request: Request, generation: u64) -> Reply {
    match request {
        Request::CurrentPosition => Reply::CurrentPosition(backend.current_position()),
        Request::Trajectory { duration_s } => Reply::Trajectory {
            generation,
            result: backend.future_trajectory(duration_s),
        },
        Request::Info => Reply::Info(backend.info()),
        Request::Crew => Reply::Crew(backend.crew()),
        Request::NextPasses { lat, lon } => Reply::NextPasses(backend.next_passes(lat, lon)),
        Request::SaveSettings(settings) => Reply::SettingsSaved(backend.save_settings(&settings)),
        Request::LoadSettings { user_id } => Reply::SettingsLoaded(backend.load_settings(&user_id)),
        Request::AddReminder { user_id, pass_time } => {
            let result = backend.add_reminder(&user_id, pass_time);
            Reply::ReminderAdded { user_id, pass_time, result }
        }
        Request::PendingReminders { user_id } => {
            let result = backend.pending_reminders(&user_id);
            Reply::PendingReminders { user_id, result }
        }
        Request::MarkNotified { user_id, pass_time } => {
            Reply::ReminderNotified(backend.mark_notified(&user_id, pass_time))
        }
    }
}

pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    tx: mpsc::Sender<Reply>,
    rx: mpsc::Receiver<Reply>,
    repaint: Option<egui::Context>,
    trajectory_generation: u64,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { backend, tx, rx, repaint: None, trajectory_generation: 0, in_flight: 0 }
    }

    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn send(&mut self, request: Request) {
        if matches!(request, Request::Trajectory { .. }) {
            self.trajectory_generation += 1;
        }
        let generation = self.trajectory_generation;
        self.in_flight += 1;
        debug!("Dispatching {request:?}");

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        std::thread::spawn(move || {
            let reply = execute(backend.as_ref(), request, generation);
            if tx.send(reply).is_ok() {
                if let Some(ctx) = repaint {
                    ctx.request_repaint();
                }
            }
        });
    }

    // Requests whose reply has not been polled yet, superseded ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn poll(&mut self) -> Vec<Reply> {
        let latest = self.trajectory_generation;
        let received: Vec<Reply> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(received.len());
        received
            .into_iter()
            .filter(|reply| match reply {
                Reply::Trajectory { generation, .. } => *generation == latest,
                _ => true,
            })
            .collect()
    }
}
