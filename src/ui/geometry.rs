/// Compact widget size in logical pixels
pub const WIDGET_WIDTH: i32 = 250;
pub const WIDGET_HEIGHT: i32 = 130;

/// Gap between the widget and the screen's right and bottom edges
const SCREEN_MARGIN: i32 = 50;
/// Room left for a bottom taskbar
const TASKBAR_HEIGHT: i32 = 48;

/// Extra room while a dialog is open, grown toward the top-left
const DIALOG_EXTRA_WIDTH: i32 = 50;
const DIALOG_EXTRA_HEIGHT: i32 = 300;

/// Used when the display reports no monitor
pub const FALLBACK_MONITOR: (i32, i32) = (1920, 1920);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Where the widget sits on a monitor of the given size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetPlacement {
    compact: Geometry,
}

impl WidgetPlacement {
    /// Anchor the widget to the bottom-right corner of a monitor
    pub fn for_monitor(monitor_width: i32, monitor_height: i32) -> Self {
        Self {
            compact: Geometry {
                x: monitor_width - SCREEN_MARGIN - WIDGET_WIDTH,
                y: monitor_height - SCREEN_MARGIN - TASKBAR_HEIGHT - WIDGET_HEIGHT,
                width: WIDGET_WIDTH,
                height: WIDGET_HEIGHT,
            },
        }
    }

    pub fn compact(&self) -> Geometry {
        self.compact
    }

    /// Width the bars are scaled to, whatever size the window currently has
    pub fn canvas_width(&self) -> f64 {
        f64::from(self.compact.width)
    }

    /// Geometry while the settings or about dialog is showing
    pub fn expanded(&self) -> Geometry {
        Geometry {
            x: self.compact.x - DIALOG_EXTRA_WIDTH,
            y: self.compact.y - DIALOG_EXTRA_HEIGHT,
            width: self.compact.width + DIALOG_EXTRA_WIDTH,
            height: self.compact.height + DIALOG_EXTRA_HEIGHT,
        }
    }
}
