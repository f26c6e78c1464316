use glib::ControlFlow;
use gtk::prelude::*;
use gtk::{Align, Box as GtkBox, Button, DrawingArea, Orientation, Overlay, Window, WindowType};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

use crate::canvas::CairoCanvas;
use crate::monitor::{MetricsSampler, SysinfoBridge};
use crate::scheduler::{FrameScheduler, SchedulerMode, StopToken};
use crate::settings::{SettingKey, SettingsStore};
use crate::ui::{
    build_about_dialog, Geometry, SettingsDialog, WidgetPlacement, FALLBACK_MONITOR,
    WIDGET_HEIGHT, WIDGET_WIDTH,
};

/// How often the widget re-asserts itself above other windows
const KEEP_ON_TOP_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize GTK: {0}")]
    GtkInit(#[from] glib::BoolError),
    #[error("no display available; is a graphical session running?")]
    NoDisplay,
}

/// Main application state
pub struct App {
    window: Window,
    canvas: DrawingArea,
    placement: WidgetPlacement,
    settings: Rc<SettingsStore>,
    sampler: Rc<MetricsSampler>,
    settings_dialog: SettingsDialog,
    about_dialog: gtk::AboutDialog,
    mode: SchedulerMode,
    stop: StopToken,
    keep_on_top_source: RefCell<Option<glib::SourceId>>,
    tick_id: RefCell<Option<gtk::TickCallbackId>>,
}

impl App {
    /// Build the widget window and its dialogs. GTK must already be initialized.
    pub fn new(
        settings: Rc<SettingsStore>,
        mode: SchedulerMode,
        stop: StopToken,
    ) -> Result<Rc<Self>, AppError> {
        let display = gdk::Display::default().ok_or(AppError::NoDisplay)?;
        let (monitor_width, monitor_height) = match display.primary_monitor() {
            Some(monitor) => {
                let area = monitor.geometry();
                (area.width(), area.height())
            }
            None => {
                tracing::warn!("no primary monitor reported, assuming {:?}", FALLBACK_MONITOR);
                FALLBACK_MONITOR
            }
        };
        let placement = WidgetPlacement::for_monitor(monitor_width, monitor_height);

        let window = Window::new(WindowType::Toplevel);
        window.set_title("Lifebar");
        window.set_decorated(false);
        window.set_skip_taskbar_hint(true);
        window.set_keep_above(true);
        window.set_resizable(false);
        window.set_app_paintable(true);
        // Transparent background where the compositor allows it
        if let Some(visual) = WidgetExt::screen(&window).and_then(|screen| screen.rgba_visual()) {
            window.set_visual(Some(&visual));
        }
        if let Some(accessible) = window.accessible() {
            accessible.set_name("Lifebar");
            accessible.set_description("Memory usage and CPU load bars");
        }

        let canvas = DrawingArea::new();
        canvas.set_size_request(WIDGET_WIDTH, WIDGET_HEIGHT);
        // Stay at the compact size while a dialog expands the window.
        canvas.set_halign(Align::Start);
        canvas.set_valign(Align::Start);

        let settings_button = Button::with_label("Settings");
        let about_button = Button::with_label("About");
        let button_box = GtkBox::new(Orientation::Horizontal, 4);
        button_box.set_halign(Align::End);
        button_box.set_valign(Align::End);
        button_box.set_margin_end(4);
        button_box.set_margin_bottom(4);
        button_box.pack_start(&settings_button, false, false, 0);
        button_box.pack_start(&about_button, false, false, 0);

        let overlay = Overlay::new();
        overlay.add(&canvas);
        overlay.add_overlay(&button_box);
        window.add(&overlay);

        let settings_dialog = SettingsDialog::new(&window);
        let about_dialog = build_about_dialog(&window);
        settings.init(&settings_dialog);

        let app = Rc::new(Self {
            window,
            canvas,
            placement,
            settings,
            sampler: Rc::new(MetricsSampler::new(SysinfoBridge::new())),
            settings_dialog,
            about_dialog,
            mode,
            stop,
            keep_on_top_source: RefCell::new(None),
            tick_id: RefCell::new(None),
        });

        Self::connect_signals(&app, &settings_button, &about_button);
        Ok(app)
    }

    fn connect_signals(app: &Rc<Self>, settings_button: &Button, about_button: &Button) {
        let sampler = Rc::clone(&app.sampler);
        let bar_span = app.placement.canvas_width();
        app.canvas.connect_draw(move |_, cr| {
            let mut surface = CairoCanvas::new(cr, bar_span);
            sampler.render(&mut surface);
            glib::Propagation::Stop
        });

        let app_weak = Rc::downgrade(app);
        settings_button.connect_clicked(move |_| {
            if let Some(app) = app_weak.upgrade() {
                app.apply_geometry(app.placement.expanded());
                app.settings_dialog.show();
            }
        });

        let app_weak = Rc::downgrade(app);
        about_button.connect_clicked(move |_| {
            if let Some(app) = app_weak.upgrade() {
                app.apply_geometry(app.placement.expanded());
                app.about_dialog.show_all();
            }
        });

        // Shrink back once either popup goes away
        let app_weak = Rc::downgrade(app);
        app.settings_dialog.window().connect_hide(move |_| {
            if let Some(app) = app_weak.upgrade() {
                app.apply_geometry(app.placement.compact());
            }
        });

        let app_weak = Rc::downgrade(app);
        app.about_dialog.connect_hide(move |_| {
            if let Some(app) = app_weak.upgrade() {
                app.apply_geometry(app.placement.compact());
            }
        });

        let stop = app.stop.clone();
        app.window.connect_delete_event(move |_, _| {
            stop.stop();
            gtk::main_quit();
            glib::Propagation::Stop
        });
    }

    /// Show the widget and start the keep-on-top timer and the frame scheduler
    pub fn start(app: &Rc<Self>) {
        app.apply_geometry(app.placement.compact());
        app.window.show_all();

        let window = app.window.clone();
        let stop = app.stop.clone();
        let source_id = glib::timeout_add_local(KEEP_ON_TOP_INTERVAL, move || {
            // Removed in shutdown(), so keep the source alive here.
            if stop.is_stopped() {
                gtk::main_quit();
                return ControlFlow::Continue;
            }
            window.show();
            window.set_keep_above(false);
            let window = window.clone();
            glib::idle_add_local_once(move || window.set_keep_above(true));
            ControlFlow::Continue
        });
        *app.keep_on_top_source.borrow_mut() = Some(source_id);

        let scheduler = FrameScheduler::new(app.mode, app.stop.clone());
        let tick_id = scheduler.attach(&app.canvas, Rc::clone(&app.sampler), Rc::clone(&app.settings));
        *app.tick_id.borrow_mut() = Some(tick_id);

        tracing::info!(
            fps = app.settings.get(SettingKey::Fps),
            ups = app.settings.get(SettingKey::Ups),
            "widget started"
        );
    }

    fn apply_geometry(&self, geometry: Geometry) {
        self.window.resize(geometry.width, geometry.height);
        self.window.move_(geometry.x, geometry.y);
    }

    /// Clean shutdown
    pub fn shutdown(&self) {
        self.stop.stop();

        if let Some(source_id) = self.keep_on_top_source.borrow_mut().take() {
            source_id.remove();
        }
        if let Some(tick_id) = self.tick_id.borrow_mut().take() {
            tick_id.remove();
        }
    }
}
