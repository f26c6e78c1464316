use gtk::prelude::*;
use gtk::{
    Align, Box as GtkBox, Button, Entry, Grid, Label, Orientation, Window, WindowPosition,
    WindowType,
};

use crate::settings::SettingKey;

/// Popup with one numeric field per setting
pub struct SettingsDialog {
    window: Window,
    fields: Vec<(SettingKey, Entry)>,
}

impl SettingsDialog {
    pub fn new(parent: &Window) -> Self {
        let window = Window::new(WindowType::Toplevel);
        window.set_title("Settings");
        window.set_transient_for(Some(parent));
        window.set_position(WindowPosition::CenterOnParent);
        window.set_resizable(false);
        window.set_keep_above(true);

        if let Some(accessible) = window.accessible() {
            accessible.set_name("Widget settings");
            accessible.set_description("Change how often the widget repaints and samples metrics");
        }

        let main_box = GtkBox::new(Orientation::Vertical, 12);
        main_box.set_margin_top(12);
        main_box.set_margin_bottom(12);
        main_box.set_margin_start(12);
        main_box.set_margin_end(12);

        let grid = Grid::new();
        grid.set_row_spacing(8);
        grid.set_column_spacing(12);

        let mut fields = Vec::new();
        for (row, key) in SettingKey::ALL.into_iter().enumerate() {
            let label = Label::new(Some(key.label()));
            label.set_halign(Align::Start);

            let entry = Entry::new();
            entry.set_widget_name(key.name());
            entry.set_input_purpose(gtk::InputPurpose::Number);
            entry.set_width_chars(6);
            if let Some(accessible) = entry.accessible() {
                accessible.set_name(key.label());
                accessible.set_role(atk::Role::Text);
            }

            grid.attach(&label, 0, row as i32, 1, 1);
            grid.attach(&entry, 1, row as i32, 1, 1);
            fields.push((key, entry));
        }
        main_box.pack_start(&grid, false, false, 0);

        let close_button = Button::with_label("Close");
        close_button.set_halign(Align::End);
        if let Some(accessible) = close_button.accessible() {
            accessible.set_name("Close");
            accessible.set_description("Close the settings popup");
        }
        main_box.pack_start(&close_button, false, false, 0);

        window.add(&main_box);

        let window_weak = window.downgrade();
        close_button.connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.hide();
            }
        });

        // Closing with the window manager only hides, so the dialog can reopen.
        window.connect_delete_event(|window, _| {
            window.hide();
            glib::Propagation::Stop
        });

        Self { window, fields }
    }

    pub fn fields(&self) -> &[(SettingKey, Entry)] {
        &self.fields
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn show(&self) {
        self.window.show_all();
    }
}
