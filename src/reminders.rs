//! Pass reminders held by the client and turned into notifications when due.

use chrono::{DateTime, Duration, Local, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct Reminder {
    pub user_id: String,
    pub pass_time: DateTime<Utc>,
    pub notified: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub user_id: String,
    pub pass_time: DateTime<Utc>,
    pub message: String,
    pub created: DateTime<Utc>,
}

pub struct ReminderBook {
    reminders: Vec<Reminder>,
    lead: Duration,
}

impl ReminderBook {
    pub fn new(lead: Duration) -> Self {
        Self { reminders: Vec::new(), lead }
    }

    pub fn add(&mut self, user_id: &str, pass_time: DateTime<Utc>) -> bool {
        if self.contains(user_id, pass_time) {
            return false;
        }
        self.reminders.push(Reminder { user_id: user_id.to_string(), pass_time, notified: false });
        self.reminders.sort_by_key(|r| r.pass_time);
        true
    }

    pub fn contains(&self, user_id: &str, pass_time: DateTime<Utc>) -> bool {
        self.reminders.iter().any(|r| r.user_id == user_id && r.pass_time == pass_time)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter().filter(|r| !r.notified)
    }

    // Marks every reminder whose alert time has come as notified and returns
    // one notification for each.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        let lead = self.lead;
        self.reminders
            .iter_mut()
            .filter(|r| !r.notified && r.pass_time - lead <= now)
            .map(|r| {
                r.notified = true;
                Notification {
                    user_id: r.user_id.clone(),
                    pass_time: r.pass_time,
                    message: format!(
                        "The ISS will pass overhead at {}",
                        r.pass_time.with_timezone(&Local).format("%H:%M:%S %d/%m/%Y")
                    ),
                    created: now,
                }
            })
            .collect()
    }
}
