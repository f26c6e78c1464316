mod about_dialog;
mod geometry;
mod settings_dialog;

pub use about_dialog::build as build_about_dialog;
pub use geometry::{Geometry, WidgetPlacement, FALLBACK_MONITOR, WIDGET_HEIGHT, WIDGET_WIDTH};
pub use settings_dialog::SettingsDialog;
