//! Process-wide typed key/value store, CLI-arg parsing, and the
//! persisted config file format.

pub mod keys;

mod cli;
mod file;

pub use cli::parse_cli_args;
pub use file::{load_file, save_file};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::errors::{Result, WeaveError};
pub use crate::key::KeyLike as ConfigKey;

/// A config value's concrete type. Kept as a closed enum — the config
/// store never needs to hold arbitrary user types.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    I32(i32),
    F32(f32),
    Str(String),
    Char(char),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::I32(_) => "i32",
            ConfigValue::F32(_) => "f32",
            ConfigValue::Str(_) => "string",
            ConfigValue::Char(_) => "char",
        }
    }
}

/// Accepts whatever JSON shape a pipeline description's flag values
/// come in: bools, numbers, or strings. `Char` never arrives this way
/// (JSON has no character type) — it's only ever produced by the CLI
/// and config-file parsers.
impl<'de> serde::Deserialize<'de> for ConfigValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Bool(b) => Ok(ConfigValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ConfigValue::I32(i as i32))
                } else {
                    Ok(ConfigValue::F32(n.as_f64().unwrap_or_default() as f32))
                }
            }
            serde_json::Value::String(s) => Ok(ConfigValue::Str(s)),
            other => Err(serde::de::Error::custom(format!(
                "unsupported config value shape: {other}"
            ))),
        }
    }
}

/// Converts between a Rust type and the [`ConfigValue`] it's stored as.
pub trait ConfigType: Sized {
    fn into_value(self) -> ConfigValue;
    fn from_value(value: &ConfigValue) -> Option<Self>;
}

macro_rules! config_type {
    ($ty:ty, $variant:ident) => {
        impl ConfigType for $ty {
            fn into_value(self) -> ConfigValue {
                ConfigValue::$variant(self)
            }
            fn from_value(value: &ConfigValue) -> Option<Self> {
                match value {
                    ConfigValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

config_type!(bool, Bool);
config_type!(i32, I32);
config_type!(f32, F32);
config_type!(String, Str);
config_type!(char, Char);

struct Entry {
    text_key: String,
    value: ConfigValue,
    /// `Runtime` entries are computed, not user-tunable, and are never
    /// written back by `save_file`.
    runtime: bool,
}

/// A typed key/value store guarded by a single `RwLock`, the way the
/// rest of this codebase's global caches (the string interner, the
/// registry) are built: a lazily-initialized lock around a hash map.
pub struct Config {
    entries: RwLock<FxHashMap<u64, Entry>>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn set<K: ConfigKey, T: ConfigType>(&self, key: K, value: T, runtime: bool) {
        self.entries.write().insert(
            key.key_hash(),
            Entry {
                text_key: key.key_text(),
                value: value.into_value(),
                runtime,
            },
        );
    }

    #[must_use]
    pub fn get<T: ConfigType>(&self, key: impl ConfigKey) -> Option<T> {
        self.entries
            .read()
            .get(&key.key_hash())
            .and_then(|e| T::from_value(&e.value))
    }

    pub fn get_or<T: ConfigType>(&self, key: impl ConfigKey, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn try_get<T: ConfigType>(&self, key: impl ConfigKey) -> Result<T> {
        let entries = self.entries.read();
        let entry = entries
            .get(&key.key_hash())
            .ok_or_else(|| WeaveError::ConfigKeyMissing(key.key_text()))?;
        T::from_value(&entry.value).ok_or_else(|| WeaveError::ConfigTypeMismatch {
            key: key.key_text(),
        })
    }

    #[must_use]
    pub fn has(&self, key: impl ConfigKey) -> bool {
        self.entries.read().contains_key(&key.key_hash())
    }

    #[must_use]
    pub fn value_type_name(&self, key: impl ConfigKey) -> Option<&'static str> {
        self.entries
            .read()
            .get(&key.key_hash())
            .map(|e| e.value.type_name())
    }

    /// Iterates over every persisted (non-runtime) entry, for
    /// [`file::save_file`].
    pub(crate) fn persisted_entries(&self) -> Vec<(String, ConfigValue)> {
        self.entries
            .read()
            .values()
            .filter(|e| !e.runtime)
            .map(|e| (e.text_key.clone(), e.value.clone()))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let config = Config::new();
        config.set(keys::WINDOW_WIDTH, 1920i32, false);
        assert_eq!(config.get::<i32>(keys::WINDOW_WIDTH), Some(1920));
    }

    #[test]
    fn get_or_falls_back_when_absent() {
        let config = Config::new();
        assert_eq!(config.get_or::<bool>(keys::VSYNC_ENABLED, true), true);
    }

    #[test]
    fn wrong_type_is_reported_not_silently_coerced() {
        let config = Config::new();
        config.set(keys::WINDOW_WIDTH, 1920i32, false);
        assert!(config.get::<bool>(keys::WINDOW_WIDTH).is_none());
        assert!(matches!(
            config.try_get::<bool>(keys::WINDOW_WIDTH),
            Err(WeaveError::ConfigTypeMismatch { .. })
        ));
    }

    #[test]
    fn missing_key_reported() {
        let config = Config::new();
        assert!(matches!(
            config.try_get::<i32>(keys::WINDOW_WIDTH),
            Err(WeaveError::ConfigKeyMissing(_))
        ));
    }
}
