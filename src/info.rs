//! Right-hand panel: station telemetry, crew, pass predictions and reminders.

use chrono::{DateTime, Local, TimeZone};
use eframe::egui;

use crate::api::{CrewMember, IssInfo, PassWindow};
use crate::app::App;
use crate::dispatch::Request;
use crate::reminders::Notification;

pub const NO_PASSES: &str = "Could not retrieve the next passes of the ISS.";
pub const NO_CREW: &str = "No crew members currently aboard the ISS.";
pub const CREW_ERROR: &str = "Error loading crew information.";
pub const REMINDER_SET: &str = "Reminder set successfully!";
pub const REMINDER_FAILED: &str = "Could not set the reminder.";
const MAX_NOTIFICATIONS: usize = 20;

pub(crate) enum Fetch<T> {
    Idle,
    Loading,
    Ready(T),
    Failed,
}

pub(crate) struct InfoState {
    pub(crate) telemetry: Option<IssInfo>,
    pub(crate) crew: Fetch<Vec<CrewMember>>,
    pub(crate) passes: Fetch<Vec<PassWindow>>,
    pub(crate) status: Option<String>,
    pub(crate) notifications: Vec<Notification>,
}

impl Default for InfoState {
    fn default() -> Self {
        Self {
            telemetry: None,
            crew: Fetch::Loading,
            passes: Fetch::Idle,
            status: None,
            notifications: Vec::new(),
        }
    }
}

impl InfoState {
    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.insert(0, notification);
        self.notifications.truncate(MAX_NOTIFICATIONS);
    }
}

// `Monday, 26 August 2024, 07:24:00 am`
pub fn format_pass_time<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    t.format("%A, %-d %B %Y, %I:%M:%S %P").to_string()
}

pub fn speed_text(info: Option<&IssInfo>) -> String {
    info.map_or_else(|| "N/A".to_string(), |i| format!("{:.2} km/h", i.speed))
}

pub fn altitude_text(info: Option<&IssInfo>) -> String {
    info.map_or_else(|| "N/A".to_string(), |i| format!("{:.2} km", i.altitude))
}

pub fn crew_lines(crew: Option<&[CrewMember]>) -> Vec<String> {
    match crew {
        None => vec![CREW_ERROR.to_string()],
        Some([]) => vec![NO_CREW.to_string()],
        Some(people) => people.iter().map(|m| format!("{} ({})", m.name, m.craft)).collect(),
    }
}

impl App {
    pub(crate) fn show_info(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Station").strong());
        egui::Grid::new("telemetry_grid").num_columns(2).show(ui, |ui| {
            ui.label("Latitude:");
            ui.label(self.map.marker().map_or("N/A".into(), |p| format!("{:.4}°", p.lat)));
            ui.end_row();
            ui.label("Longitude:");
            ui.label(self.map.marker().map_or("N/A".into(), |p| format!("{:.4}°", p.lon)));
            ui.end_row();
            ui.label("Speed:");
            ui.label(speed_text(self.info.telemetry.as_ref()));
            ui.end_row();
            ui.label("Altitude:");
            ui.label(altitude_text(self.info.telemetry.as_ref()));
            ui.end_row();
        });

        ui.separator();
        ui.label(egui::RichText::new("Crew").strong());
        match &self.info.crew {
            Fetch::Idle | Fetch::Loading => {
                ui.label("Loading...");
            }
            Fetch::Ready(people) => {
                for line in crew_lines(Some(people.as_slice())) {
                    ui.label(line);
                }
            }
            Fetch::Failed => {
                ui.label(CREW_ERROR);
            }
        }

        ui.separator();
        ui.label(egui::RichText::new("Next passes").strong());
        let observer = self.config.observer();
        ui.small(format!("Observer {:.4}°, {:.4}°", observer.lat_deg, observer.lon_deg));
        if ui.button("Predict passes").clicked() {
            self.info.passes = Fetch::Loading;
            self.dispatcher.send(Request::NextPasses { lat: observer.lat_deg, lon: observer.lon_deg });
        }

        let mut remind = None;
        match &self.info.passes {
            Fetch::Idle => {}
            Fetch::Loading => {
                ui.label("Loading...");
            }
            Fetch::Failed => {
                ui.label(NO_PASSES);
            }
            Fetch::Ready(passes) if passes.is_empty() => {
                ui.label(NO_PASSES);
            }
            Fetch::Ready(passes) => {
                for (i, pass) in passes.iter().enumerate() {
                    ui.group(|ui| {
                        ui.strong(format!("Pass {}", i + 1));
                        ui.label(format!("Rise: {}", format_pass_time(&pass.rise_time.with_timezone(&Local))));
                        ui.label(format!("Set: {}", format_pass_time(&pass.set_time.with_timezone(&Local))));
                        if let Some(elev) = pass.max_elevation {
                            ui.label(format!("Max elevation: {elev:.1}°"));
                        }
                        let already = self.reminders.contains(self.reminder_user(), pass.rise_time);
                        if ui.add_enabled(!already, egui::Button::new("Remind me")).clicked() {
                            remind = Some(pass.rise_time);
                        }
                    });
                }
            }
        }
        if let Some(pass_time) = remind {
            self.request_reminder(pass_time);
        }

        if let Some(status) = &self.info.status {
            ui.label(status);
        }

        if !self.info.notifications.is_empty() {
            ui.separator();
            ui.label(egui::RichText::new("Notifications").strong());
            for n in &self.info.notifications {
                let created: DateTime<Local> = n.created.with_timezone(&Local);
                ui.label(format!("[{}] {}", created.format("%H:%M:%S"), n.message));
            }
            if ui.small_button("Clear").clicked() {
                self.info.notifications.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn pass_time_format() {
        let t = Utc.with_ymd_and_hms(2024, 8, 26, 7, 24, 0).unwrap();
        assert_eq!(format_pass_time(&t), "Monday, 26 August 2024, 07:24:00 am");
        let t = Utc.with_ymd_and_hms(2024, 9, 5, 19, 2, 9).unwrap();
        assert_eq!(format_pass_time(&t), "Thursday, 5 September 2024, 07:02:09 pm");
    }

    #[test]
    fn telemetry_falls_back_to_na() {
        assert_eq!(speed_text(None), "N/A");
        assert_eq!(altitude_text(None), "N/A");
        let info = IssInfo { latitude: 0.0, longitude: 0.0, altitude: 417.456, speed: 27600.0, timestamp: Utc::now() };
        assert_eq!(speed_text(Some(&info)), "27600.00 km/h");
        assert_eq!(altitude_text(Some(&info)), "417.46 km");
    }

    #[test]
    fn crew_messages() {
        assert_eq!(crew_lines(None), vec![CREW_ERROR]);
        assert_eq!(crew_lines(Some(&[])), vec![NO_CREW]);
        let crew = [CrewMember { name: "Suni Williams".into(), craft: "ISS".into() }];
        assert_eq!(crew_lines(Some(&crew)), vec!["Suni Williams (ISS)"]);
    }

    #[test]
    fn notifications_newest_first_and_bounded() {
        let mut state = InfoState::default();
        for i in 0..30 {
            let now = Utc::now();
            state.notify(Notification { user_id: "1".into(), pass_time: now, message: i.to_string(), created: now });
        }
        assert_eq!(state.notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(state.notifications[0].message, "29");
    }
}
