//! Side-panel controls for the map and the glue that persists them.

use eframe::egui;

use crate::api::MapSettings;
use crate::app::App;
use crate::dispatch::Request;

pub const MIN_TRAJECTORY_HOURS: f64 = 0.5;
pub const MAX_TRAJECTORY_HOURS: f64 = 12.0;
const TRAJECTORY_STEP_HOURS: f64 = 0.5;

pub fn trajectory_seconds(hours: f64) -> f64 {
    hours * 3600.0
}

impl App {
    pub(crate) fn current_settings(&self) -> MapSettings {
        MapSettings {
            user_id: self.user_id.clone(),
            toggle_iss: self.map.show_marker,
            toggle_trajectory: self.map.show_trajectory,
            trajectory_time: self.trajectory_hours,
            zoom_level: self.map.zoom_level(),
        }
    }

    // Applies stored settings. An empty user id in `settings` keeps the current one.
    pub(crate) fn apply_settings(&mut self, settings: MapSettings) {
        if !settings.user_id.is_empty() {
            self.user_id = settings.user_id;
        }
        self.map.show_marker = settings.toggle_iss;
        self.map.show_trajectory = settings.toggle_trajectory;
        self.trajectory_hours = settings.trajectory_time.clamp(MIN_TRAJECTORY_HOURS, MAX_TRAJECTORY_HOURS);
        self.map.set_zoom(settings.zoom_level);
    }

    // Settings kept by eframe from the last run. A user id given on the
    // command line wins over the one stored there.
    pub fn restore_session(&mut self, mut settings: MapSettings) {
        if !self.user_id.is_empty() {
            settings.user_id.clear();
        }
        self.apply_settings(settings);
    }

    pub(crate) fn save_settings(&mut self) {
        if self.user_id.is_empty() {
            return;
        }
        let settings = self.current_settings();
        self.dispatcher.send(Request::SaveSettings(settings));
    }

    pub(crate) fn request_trajectory(&mut self) {
        let duration_s = trajectory_seconds(self.trajectory_hours);
        self.dispatcher.send(Request::Trajectory { duration_s });
    }

    pub(crate) fn show_settings(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;

        ui.label(egui::RichText::new("User").strong());
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.user_id).desired_width(110.0).hint_text("user id"));
            if ui.add_enabled(!self.user_id.is_empty(), egui::Button::new("Load")).clicked() {
                let user_id = self.user_id.clone();
                self.dispatcher.send(Request::LoadSettings { user_id });
            }
        });

        ui.separator();
        ui.label(egui::RichText::new("Map").strong());
        changed |= ui.checkbox(&mut self.map.show_marker, "Show ISS").changed();

        let was_showing = self.map.show_trajectory;
        if ui.checkbox(&mut self.map.show_trajectory, "Show trajectory").changed() {
            changed = true;
            if self.map.show_trajectory && !was_showing {
                self.request_trajectory();
            }
        }
        if self.map.show_trajectory {
            let slider = ui.add(
                egui::Slider::new(&mut self.trajectory_hours, MIN_TRAJECTORY_HOURS..=MAX_TRAJECTORY_HOURS)
                    .step_by(TRAJECTORY_STEP_HOURS)
                    .suffix(" h")
                    .text("Trajectory"),
            );
            if slider.changed() {
                changed = true;
                self.request_trajectory();
            }
        }
        ui.checkbox(&mut self.map.wrap_copies, "Repeat world horizontally");

        ui.horizontal(|ui| {
            ui.label(format!("Zoom: {}", self.map.zoom_level()));
            if ui.small_button("-").clicked() {
                self.map.set_zoom(self.map.zoom_level() - 1);
                changed = true;
            }
            if ui.small_button("+").clicked() {
                self.map.set_zoom(self.map.zoom_level() + 1);
                changed = true;
            }
        });
        if ui.add_enabled(self.map.marker().is_some(), egui::Button::new("Center on ISS")).clicked() {
            if let Some(pos) = self.map.marker() {
                self.map.center_on(pos);
            }
        }

        if changed {
            self.save_settings();
        }

        ui.separator();
        ui.small(format!("Backend: {}", self.dispatcher.backend_name()));
        ui.small(format!("Build {}", env!("GIT_HASH")));
    }
}
