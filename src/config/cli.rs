//! Command-line argument parsing: space-separated `-key value` tokens.

use crate::config::{Config, ConfigValue};
use crate::event_bus::{EventBus, EventData, EventInfo};
use crate::key::HashKey;

/// Parses `args` (already split on whitespace, e.g. `std::env::args()`
/// minus argv[0]) and writes each `-key value` pair into `config` as a
/// runtime value. Repeated `-import <path>` tokens post a
/// `FileImportRequest` event per occurrence instead of being stored.
pub fn parse_cli_args(args: &[String], config: &Config, event_bus: &EventBus) {
    const IMPORT: &str = "import";

    let mut i = 0;
    while i < args.len() {
        let Some(key) = args[i].strip_prefix('-') else {
            i += 1;
            continue;
        };
        let Some(raw_value) = args.get(i + 1) else {
            log::warn!("cli arg `-{key}` has no value; skipping");
            i += 1;
            continue;
        };

        if key.eq_ignore_ascii_case(IMPORT) {
            event_bus.post(EventInfo {
                kind: crate::events::FILE_IMPORT_REQUEST,
                data: EventData::Str(raw_value.clone()),
            });
        } else {
            let value = parse_value(raw_value);
            let runtime_key = HashKey::runtime(key.to_lowercase());
            match value {
                ConfigValue::Bool(v) => config.set(runtime_key, v, true),
                ConfigValue::I32(v) => config.set(runtime_key, v, true),
                ConfigValue::F32(v) => config.set(runtime_key, v, true),
                ConfigValue::Str(v) => config.set(runtime_key, v, true),
                ConfigValue::Char(v) => config.set(runtime_key, v, true),
            }
        }
        i += 2;
    }
}

fn parse_value(raw: &str) -> ConfigValue {
    if let Ok(i) = raw.parse::<i32>() {
        return ConfigValue::I32(i);
    }
    if let Ok(f) = raw.parse::<f32>() {
        return ConfigValue::F32(f);
    }
    match raw {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        _ => {}
    }
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return ConfigValue::Char(c);
    }
    ConfigValue::Str(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;

    #[test]
    fn numeric_bool_and_string_values_parse() {
        let config = Config::new();
        let bus = EventBus::new();
        parse_cli_args(
            &[
                "-width".into(),
                "1920".into(),
                "-vsync".into(),
                "true".into(),
                "-scenePipeline".into(),
                "scene.json".into(),
            ],
            &config,
            &bus,
        );
        assert_eq!(config.get::<i32>(HashKey::runtime("width")), Some(1920));
        let _ = keys::WINDOW_WIDTH; // canonical key constant, used elsewhere
    }

    #[test]
    fn import_tokens_post_one_event_each() {
        use std::sync::{Arc, Mutex};

        let config = Config::new();
        let bus = EventBus::new();
        let imports: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let imports_clone = imports.clone();
        bus.subscribe(
            crate::events::FILE_IMPORT_REQUEST,
            Box::new(move |e: &EventInfo| {
                if let EventData::Str(path) = &e.data {
                    imports_clone.lock().unwrap().push(path.clone());
                }
            }),
        );

        parse_cli_args(
            &[
                "-import".into(),
                "a.gltf".into(),
                "-import".into(),
                "b.gltf".into(),
            ],
            &config,
            &bus,
        );
        bus.update();
        assert_eq!(*imports.lock().unwrap(), vec!["a.gltf", "b.gltf"]);
    }
}
