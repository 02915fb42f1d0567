//! Application shell and eframe integration.
//!
//! Owns the map, the request dispatcher and the reminder book, polls the
//! backend on a fixed interval and routes replies into UI state.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use eframe::egui;
use log::{error, info, warn};

use crate::api::{IssInfo, MapSettings};
use crate::backend::Backend;
use crate::config::Config;
use crate::dispatch::{Dispatcher, Reply, Request};
use crate::geo::{load_coastlines, GeoLoadState};
use crate::info::{Fetch, InfoState, REMINDER_FAILED, REMINDER_SET};
use crate::map_view::MapView;
use crate::reminders::{Notification, ReminderBook};

const SETTINGS_KEY: &str = "map_settings";
// Upper bound between frames so due reminders are noticed without input.
const IDLE_REPAINT: Duration = Duration::from_secs(1);
const ANONYMOUS_USER: &str = "default";

pub struct App {
    pub(crate) config: Config,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) map: MapView,
    pub(crate) user_id: String,
    pub(crate) trajectory_hours: f64,
    pub(crate) info: InfoState,
    pub(crate) reminders: ReminderBook,
    last_poll: Option<Instant>,
    cache_dir: PathBuf,
    geo_data: GeoLoadState,
    geo_fetch_rx: Option<mpsc::Receiver<anyhow::Result<Vec<Vec<[f64; 2]>>>>>,
    show_side_panel: bool,
    show_info_panel: bool,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, backend: Arc<dyn Backend>) -> Self {
        let stored: Option<MapSettings> = cc.storage.and_then(|s| eframe::get_value(s, SETTINGS_KEY));
        let dispatcher = Dispatcher::new(backend).with_repaint(cc.egui_ctx.clone());
        let mut app = Self::with_dispatcher(config, dispatcher);
        if let Some(settings) = stored {
            info!("Restoring map settings from the previous session");
            app.restore_session(settings);
        }
        app.start();
        app
    }

    pub fn with_dispatcher(config: Config, dispatcher: Dispatcher) -> Self {
        let defaults = MapSettings::default();
        let mut map = MapView::new(defaults.zoom_level);
        map.show_marker = defaults.toggle_iss;
        map.show_trajectory = defaults.toggle_trajectory;
        Self {
            user_id: config.user_id.clone(),
            trajectory_hours: defaults.trajectory_time,
            reminders: ReminderBook::new(config.reminder_lead()),
            cache_dir: config.cache_dir(),
            config,
            dispatcher,
            map,
            info: InfoState::default(),
            last_poll: None,
            geo_data: GeoLoadState::NotLoaded,
            geo_fetch_rx: None,
            show_side_panel: true,
            show_info_panel: true,
        }
    }

    pub fn start(&mut self) {
        self.dispatcher.send(Request::Crew);
        if !self.user_id.is_empty() {
            let user_id = self.user_id.clone();
            self.dispatcher.send(Request::LoadSettings { user_id });
        }
        let user_id = self.reminder_user().to_string();
        self.dispatcher.send(Request::PendingReminders { user_id });
    }

    pub(crate) fn reminder_user(&self) -> &str {
        if self.user_id.is_empty() { ANONYMOUS_USER } else { &self.user_id }
    }

    pub fn request_reminder(&mut self, pass_time: DateTime<Utc>) {
        let user_id = self.reminder_user().to_string();
        self.dispatcher.send(Request::AddReminder { user_id, pass_time });
    }

    pub fn poll_backend(&mut self, now: Instant) -> bool {
        let due = self.last_poll.map_or(true, |t| now.duration_since(t) >= self.config.poll_interval());
        if !due {
            return false;
        }
        self.last_poll = Some(now);
        self.dispatcher.send(Request::CurrentPosition);
        if self.map.show_trajectory {
            self.request_trajectory();
        }
        self.dispatcher.send(Request::Info);
        true
    }

    pub fn handle_replies(&mut self) {
        for reply in self.dispatcher.poll() {
            self.handle_reply(reply);
        }
    }

    fn handle_reply(&mut self, reply: Reply) {
        match reply {
            Reply::CurrentPosition(Ok(pos)) => self.map.set_marker(pos),
            Reply::CurrentPosition(Err(e)) => warn!("Failed to fetch ISS position: {e:#}"),
            Reply::Trajectory { result: Ok(points), .. } => self.map.set_trajectory(&points),
            Reply::Trajectory { result: Err(e), .. } => {
                warn!("Failed to fetch trajectory: {e:#}");
                self.map.clear_trajectory();
            }
            Reply::Info(Ok(telemetry)) => self.info.telemetry = Some(telemetry),
            Reply::Info(Err(e)) => {
                warn!("Failed to fetch ISS info: {e:#}");
                self.info.telemetry = None;
            }
            Reply::Crew(Ok(crew)) => self.info.crew = Fetch::Ready(crew),
            Reply::Crew(Err(e)) => {
                warn!("Failed to fetch crew: {e:#}");
                self.info.crew = Fetch::Failed;
            }
            Reply::NextPasses(Ok(passes)) => self.info.passes = Fetch::Ready(passes),
            Reply::NextPasses(Err(e)) => {
                warn!("Failed to fetch next passes: {e:#}");
                self.info.passes = Fetch::Failed;
            }
            Reply::SettingsSaved(Ok(())) => {}
            Reply::SettingsSaved(Err(e)) => error!("Failed to save map settings: {e:#}"),
            Reply::SettingsLoaded(Ok(Some(settings))) => {
                info!("Loaded map settings for user {}", self.user_id);
                self.apply_settings(settings);
                if self.map.show_trajectory {
                    self.request_trajectory();
                } else {
                    self.map.clear_trajectory();
                }
            }
            Reply::SettingsLoaded(Ok(None)) => info!("No stored map settings for user {}", self.user_id),
            Reply::SettingsLoaded(Err(e)) => error!("Failed to load map settings: {e:#}"),
            Reply::ReminderAdded { user_id, pass_time, result: Ok(()) } => {
                self.reminders.add(&user_id, pass_time);
                self.info.status = Some(REMINDER_SET.to_string());
            }
            Reply::ReminderAdded { result: Err(e), .. } => {
                warn!("Failed to add reminder: {e:#}");
                self.info.status = Some(REMINDER_FAILED.to_string());
            }
            Reply::PendingReminders { user_id, result: Ok(times) } => {
                if !times.is_empty() {
                    info!("Restored {} pending reminder(s) for {user_id}", times.len());
                }
                for pass_time in times {
                    self.reminders.add(&user_id, pass_time);
                }
            }
            Reply::PendingReminders { result: Err(e), .. } => warn!("Failed to list reminders: {e:#}"),
            Reply::ReminderNotified(Ok(())) => {}
            Reply::ReminderNotified(Err(e)) => error!("Failed to record delivered reminder: {e:#}"),
        }
    }

    pub fn deliver_reminders(&mut self) {
        for notification in self.reminders.take_due(Utc::now()) {
            info!("{}", notification.message);
            self.dispatcher.send(Request::MarkNotified {
                user_id: notification.user_id.clone(),
                pass_time: notification.pass_time,
            });
            self.info.notify(notification);
        }
    }

    fn load_basemap(&mut self) {
        if matches!(self.geo_data, GeoLoadState::NotLoaded) {
            let (tx, rx) = mpsc::channel();
            let cache_dir = self.cache_dir.clone();
            self.geo_fetch_rx = Some(rx);
            self.geo_data = GeoLoadState::Loading;
            std::thread::spawn(move || {
                let _ = tx.send(load_coastlines(&cache_dir));
            });
        }
        if let Some(rx) = &self.geo_fetch_rx {
            if let Ok(result) = rx.try_recv() {
                self.geo_data = match result {
                    Ok(lines) => {
                        self.map.set_basemap(lines);
                        GeoLoadState::Loaded
                    }
                    Err(e) => {
                        warn!("Basemap unavailable: {e:#}");
                        GeoLoadState::Failed
                    }
                };
                self.geo_fetch_rx = None;
            }
        }
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn reminders(&self) -> &ReminderBook {
        &self.reminders
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn telemetry(&self) -> Option<&IssInfo> {
        self.info.telemetry.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.info.notifications
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_replies();
        self.poll_backend(Instant::now());
        self.deliver_reminders();
        self.load_basemap();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("ISS Tracker");
                ui.toggle_value(&mut self.show_side_panel, "Settings");
                ui.toggle_value(&mut self.show_info_panel, "Info");
                if self.dispatcher.in_flight() > 0 || matches!(self.geo_data, GeoLoadState::Loading) {
                    ui.spinner();
                }
            });
        });

        if self.show_side_panel {
            egui::SidePanel::left("settings_panel")
                .resizable(true)
                .default_width(200.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().id_salt("settings_scroll").show(ui, |ui| {
                        self.show_settings(ui);
                    });
                });
        }

        if self.show_info_panel {
            egui::SidePanel::right("info_panel")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().id_salt("info_scroll").show(ui, |ui| {
                        self.show_info(ui);
                    });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.map.show(ui) {
                self.save_settings();
            }
        });

        let until_poll = self
            .last_poll
            .map(|t| self.config.poll_interval().saturating_sub(t.elapsed()))
            .unwrap_or_default();
        ctx.request_repaint_after(until_poll.min(IDLE_REPAINT));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, SETTINGS_KEY, &self.current_settings());
    }
}
