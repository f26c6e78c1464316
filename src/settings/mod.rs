mod storage;

use serde_json::{Map, Number, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

use gtk::prelude::*;

use crate::ui::SettingsDialog;

pub use storage::{IniStorage, MemoryStorage, Storage, StorageError};

/// Storage key holding the JSON-encoded settings record
const RECORD_KEY: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Frames painted per second
    Fps,
    /// Metric updates per second
    Ups,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::Fps, SettingKey::Ups];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fps => "fps",
            Self::Ups => "ups",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fps => "Frames per second",
            Self::Ups => "Updates per second",
        }
    }

    pub fn default_value(&self) -> f64 {
        match self {
            Self::Fps => 1.0,
            Self::Ups => 3.0,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("`{value}` is not a valid value for {key}: expected a positive number")]
    InvalidValue { key: SettingKey, value: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Render and update rates read together for one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub fps: f64,
    pub ups: f64,
}

/// Write-through settings over durable storage.
///
/// Every read goes to storage, so values written by another store or process
/// over the same storage are seen immediately. Values read back are always
/// positive and finite.
pub struct SettingsStore {
    storage: RefCell<Box<dyn Storage>>,
}

impl SettingsStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: RefCell::new(Box::new(storage)),
        }
    }

    /// Current value, or the compiled default when absent or unusable
    pub fn get(&self, key: SettingKey) -> f64 {
        let record = self.record();
        let default = key.default_value();

        match record.get(key.name()) {
            None => default,
            Some(Value::Number(n)) => match n.as_f64().filter(|v| is_valid(*v)) {
                Some(v) => v,
                None => {
                    tracing::warn!("stored {} = {} is out of range, using {}", key, n, default);
                    default
                }
            },
            Some(Value::String(s)) => match parse_value(s) {
                Some(v) => {
                    tracing::debug!("coerced stored {} = {:?} to {}", key, s, v);
                    v
                }
                None => {
                    tracing::warn!("stored {} = {:?} is not a number, using {}", key, s, default);
                    default
                }
            },
            Some(other) => {
                tracing::warn!("stored {} = {} is not a number, using {}", key, other, default);
                default
            }
        }
    }

    /// Validate and persist a value immediately
    pub fn set(&self, key: SettingKey, value: f64) -> Result<(), SettingsError> {
        let number = Number::from_f64(value)
            .filter(|_| is_valid(value))
            .ok_or_else(|| SettingsError::InvalidValue {
                key,
                value: value.to_string(),
            })?;

        let mut record = self.record();
        record.insert(key.name().to_string(), Value::Number(number));
        let encoded = Value::Object(record).to_string();

        self.storage.borrow_mut().set_item(RECORD_KEY, &encoded)?;
        tracing::info!("{} set to {}", key, value);
        Ok(())
    }

    /// Parse user input and persist it. Invalid input leaves the stored value untouched.
    pub fn set_str(&self, key: SettingKey, text: &str) -> Result<f64, SettingsError> {
        let value = parse_value(text).ok_or_else(|| SettingsError::InvalidValue {
            key,
            value: text.to_string(),
        })?;
        self.set(key, value)?;
        Ok(value)
    }

    pub fn rates(&self) -> Rates {
        Rates {
            fps: self.get(SettingKey::Fps),
            ups: self.get(SettingKey::Ups),
        }
    }

    /// Show current values in the dialog's fields and persist edits as they
    /// are committed. Rejected input is reverted to the stored value.
    pub fn init(self: &Rc<Self>, dialog: &SettingsDialog) {
        for (key, entry) in dialog.fields() {
            let key = *key;
            entry.set_text(&format_value(self.get(key)));

            let store = Rc::downgrade(self);
            let commit = move |entry: &gtk::Entry| {
                let Some(store) = store.upgrade() else {
                    return;
                };
                let text = entry.text();
                if parse_value(&text) == Some(store.get(key)) {
                    return;
                }
                match store.set_str(key, text.trim()) {
                    Ok(value) => entry.set_text(&format_value(value)),
                    Err(e) => {
                        tracing::warn!("rejected setting change: {}", e);
                        entry.set_text(&format_value(store.get(key)));
                    }
                }
            };

            let on_activate = commit.clone();
            entry.connect_activate(move |entry| on_activate(entry));
            entry.connect_focus_out_event(move |entry, _| {
                commit(entry);
                glib::Propagation::Proceed
            });
        }
    }

    fn record(&self) -> Map<String, Value> {
        let Some(raw) = self.storage.borrow().get_item(RECORD_KEY) else {
            return Map::new();
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(record)) => record,
            Ok(_) | Err(_) => {
                tracing::warn!("ignoring malformed settings record: {}", raw);
                Map::new()
            }
        }
    }
}

fn is_valid(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn parse_value(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| is_valid(*v))
}

fn format_value(value: f64) -> String {
    // Above this, `as i64` would saturate and the field would no longer round-trip.
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
