//! ISS tracker: live position, antimeridian-aware trajectory rendering,
//! pass predictions and reminders.

pub mod api;
pub mod app;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod geo;
mod info;
pub mod map_view;
pub mod pass;
pub mod reminders;
mod settings;
pub mod time;
pub mod tle;
pub mod trajectory;

pub use app::App;
pub use config::Config;
