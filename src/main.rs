mod app;
mod canvas;
mod logging;
mod monitor;
mod scheduler;
mod settings;
mod ui;

use std::env;
use std::rc::Rc;

use app::{App, AppError};
use scheduler::{SchedulerMode, StopToken};
use settings::{IniStorage, MemoryStorage, SettingKey, SettingsError, SettingsStore};

fn print_usage() {
    eprintln!("Usage: lifebar [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --coupled          Fetch metrics on every rendered frame instead of");
    eprintln!("                     sampling at the separate update rate");
    eprintln!("  --set KEY=VALUE    Store a setting (fps, ups) and exit");
    eprintln!("  -h, --help         Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  lifebar                 # Start the widget");
    eprintln!("  lifebar --set fps=30    # Repaint 30 times per second from now on");
}

enum Command {
    Run(SchedulerMode),
    Set(Vec<String>),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut mode = SchedulerMode::Decoupled;
    let mut assignments = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--coupled" => mode = SchedulerMode::Coupled,
            "--set" => match iter.next() {
                Some(assignment) => assignments.push(assignment.clone()),
                None => return Err("--set needs a KEY=VALUE argument".to_string()),
            },
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }

    if assignments.is_empty() {
        Ok(Command::Run(mode))
    } else {
        Ok(Command::Set(assignments))
    }
}

fn apply_assignment(store: &SettingsStore, assignment: &str) -> Result<(), SettingsError> {
    let (key, value) = assignment.split_once('=').unwrap_or((assignment, ""));
    let key: SettingKey = key.trim().parse()?;
    store.set_str(key, value)?;
    Ok(())
}

/// Settings for the interactive widget, kept in memory when storage is unusable
fn open_settings() -> SettingsStore {
    match IniStorage::open_default() {
        Ok(storage) => {
            tracing::info!("settings stored in {}", storage.path().display());
            SettingsStore::new(storage)
        }
        Err(e) => {
            tracing::warn!("{}; settings will not persist", e);
            SettingsStore::new(MemoryStorage::new())
        }
    }
}

fn main() {
    logging::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    let mode = match command {
        Command::Help => {
            print_usage();
            std::process::exit(0);
        }
        Command::Set(assignments) => {
            // No in-memory fallback here: a setting that cannot be saved is an error.
            let store = match IniStorage::open_default() {
                Ok(storage) => SettingsStore::new(storage),
                Err(e) => {
                    tracing::error!("{}", e);
                    std::process::exit(1);
                }
            };
            for assignment in &assignments {
                if let Err(e) = apply_assignment(&store, assignment) {
                    tracing::error!("{}", e);
                    std::process::exit(1);
                }
            }
            return;
        }
        Command::Run(mode) => mode,
    };

    let stop = StopToken::new();
    let signal_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || signal_stop.stop()) {
        tracing::warn!("failed to install Ctrl-C handler: {}", e);
    }

    if let Err(e) = gtk::init().map_err(AppError::from) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    glib::set_application_name("Lifebar");
    glib::set_prgname(Some("lifebar"));

    let settings = Rc::new(open_settings());
    let app = match App::new(settings, mode, stop) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("failed to initialize widget: {}", e);
            std::process::exit(1);
        }
    };

    App::start(&app);

    // Run GTK main loop
    gtk::main();

    // Cleanup
    app.shutdown();
}
