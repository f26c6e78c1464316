use gtk::prelude::*;

pub fn build(parent: &gtk::Window) -> gtk::AboutDialog {
    let dialog = gtk::AboutDialog::new();
    dialog.set_transient_for(Some(parent));
    dialog.set_keep_above(true);
    dialog.set_program_name("Lifebar");
    dialog.set_version(Some(env!("CARGO_PKG_VERSION")));
    dialog.set_comments(Some(env!("CARGO_PKG_DESCRIPTION")));
    dialog.set_license_type(gtk::License::MitX11);

    dialog.connect_response(|dialog, _| dialog.hide());
    dialog.connect_delete_event(|dialog, _| {
        dialog.hide();
        glib::Propagation::Stop
    });

    dialog
}
