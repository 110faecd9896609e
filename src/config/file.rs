//! The persisted config file: `set <key> <value>` / `bind <key>
//! <char-or-string>` lines, `#`-prefixed comments, quoted strings.

use std::path::Path;

use crate::config::{Config, ConfigValue};
use crate::errors::{Result, WeaveError};
use crate::key::HashKey;

/// Loads `path` into `config`, seeding any key it doesn't mention from
/// `defaults`. Malformed lines are warned about and skipped rather than
/// aborting the whole load — per the config error-recovery policy,
/// a bad line is not fatal.
pub fn load_file(path: &Path, config: &Config, defaults: &[(HashKey, ConfigValue)]) -> Result<()> {
    for (key, value) in defaults {
        set_value(config, key.as_str(), value.clone(), false);
    }

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(WeaveError::ConfigIo {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(reason) = parse_line(config, line) {
            log::warn!("config file {}:{}: {reason}", path.display(), line_no + 1);
        }
    }

    Ok(())
}

fn parse_line(config: &Config, line: &str) -> std::result::Result<(), String> {
    let mut parts = line.splitn(3, ' ');
    let verb = parts.next().unwrap_or_default();
    let key = parts
        .next()
        .ok_or_else(|| "missing key".to_string())?;
    let raw_value = parts.next().ok_or_else(|| "missing value".to_string())?;

    match verb {
        "set" | "bind" => {
            let value = parse_value(raw_value)?;
            set_value(config, key, value, false);
            Ok(())
        }
        other => Err(format!("unknown verb `{other}`")),
    }
}

fn parse_value(raw: &str) -> std::result::Result<ConfigValue, String> {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        return Ok(ConfigValue::Str(inner.to_string()));
    }
    match trimmed {
        "true" => return Ok(ConfigValue::Bool(true)),
        "false" => return Ok(ConfigValue::Bool(false)),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i32>() {
        return Ok(ConfigValue::I32(i));
    }
    if let Ok(f) = trimmed.parse::<f32>() {
        return Ok(ConfigValue::F32(f));
    }
    let mut chars = trimmed.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(ConfigValue::Char(c));
    }
    Err(format!("could not parse value `{raw}`"))
}

fn set_value(config: &Config, key: &str, value: ConfigValue, runtime: bool) {
    let key = HashKey::runtime(key);
    match value {
        ConfigValue::Bool(v) => config.set(key, v, runtime),
        ConfigValue::I32(v) => config.set(key, v, runtime),
        ConfigValue::F32(v) => config.set(key, v, runtime),
        ConfigValue::Str(v) => config.set(key, v, runtime),
        ConfigValue::Char(v) => config.set(key, v, runtime),
    }
}

/// Writes every non-runtime entry back to `path` as `set <key> <value>`
/// lines. `Runtime`-classified keys are never persisted.
pub fn save_file(path: &Path, config: &Config) -> Result<()> {
    let mut out = String::new();
    let mut entries = config.persisted_entries();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in entries {
        let rendered = match value {
            ConfigValue::Bool(v) => v.to_string(),
            ConfigValue::I32(v) => v.to_string(),
            ConfigValue::F32(v) => v.to_string(),
            ConfigValue::Str(v) => format!("\"{v}\""),
            ConfigValue::Char(v) => v.to_string(),
        };
        out.push_str(&format!("set {key} {rendered}\n"));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;

    #[test]
    fn load_missing_file_seeds_defaults_only() {
        let config = Config::new();
        let defaults = vec![(keys::WINDOW_WIDTH, ConfigValue::I32(1280))];
        load_file(Path::new("/nonexistent/path/config.cfg"), &config, &defaults).unwrap();
        assert_eq!(config.get::<i32>(keys::WINDOW_WIDTH), Some(1280));
    }

    #[test]
    fn parses_set_and_bind_lines_and_skips_bad_ones() {
        let config = Config::new();
        let dir = std::env::temp_dir().join(format!("weave-cfg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.cfg");
        std::fs::write(
            &path,
            "# comment\nset width 1920\nset vsync true\nbind toggleVsync v\ngarbage line\n",
        )
        .unwrap();

        load_file(&path, &config, &[]).unwrap();

        assert_eq!(
            config.get::<i32>(HashKey::runtime("width")),
            Some(1920)
        );
        assert_eq!(config.get::<bool>(HashKey::runtime("vsync")), Some(true));
        assert_eq!(
            config.get::<char>(HashKey::runtime("toggleVsync")),
            Some('v')
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_skips_runtime_entries() {
        let config = Config::new();
        config.set(keys::WINDOW_WIDTH, 1920i32, false);
        config.set(keys::COMMAND_LINE_ARGS, "ignored".to_string(), true);

        let dir = std::env::temp_dir().join(format!("weave-cfg-save-{}", std::process::id()));
        let path = dir.join("config.cfg");
        save_file(&path, &config).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("width"));
        assert!(!contents.contains("commandLineArgs"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
