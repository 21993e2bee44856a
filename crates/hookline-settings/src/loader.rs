//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HooklineSettings::default()`]
//! 2. If `~/.hookline/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `HOOKLINE_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::HooklineSettings;

/// Resolve the path to the settings file (`~/.hookline/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".hookline").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HooklineSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<HooklineSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Read and merge the settings file without applying env overrides.
pub fn read_settings_file(path: &Path) -> Result<HooklineSettings> {
    let defaults = serde_json::to_value(HooklineSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject settings the client could never run with.
pub fn validate(settings: &HooklineSettings) -> Result<()> {
    if settings.relay_url.trim().is_empty() {
        return Err(SettingsError::InvalidValue("relayUrl must not be empty".into()));
    }
    if !settings.channels.routes.is_empty() && settings.channels.port == 0 {
        return Err(SettingsError::InvalidValue(
            "channels.port must be non-zero when routes are configured".into(),
        ));
    }
    Ok(())
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut HooklineSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup (the process environment in
/// production, a map in tests).
///
/// Invalid values are ignored with a warning and the file/default value stays.
pub fn apply_overrides<F>(settings: &mut HooklineSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("HOOKLINE_SOURCE") {
        settings.source = Some(v);
    }
    if let Some(v) = string("HOOKLINE_TARGET") {
        settings.target = Some(v);
    }
    if let Some(v) = string("HOOKLINE_RELAY_URL") {
        settings.relay_url = v;
    }
    if let Some(v) = string("HOOKLINE_LOG_LEVEL") {
        settings.log_level = v;
    }
    if let Some(v) = checked(
        "HOOKLINE_QUERY_FORWARDING",
        string("HOOKLINE_QUERY_FORWARDING"),
        parse_bool,
    ) {
        settings.query_forwarding = v;
    }
    if let Some(v) = checked("HOOKLINE_FORWARD", string("HOOKLINE_FORWARD"), parse_bool) {
        settings.forward = Some(v);
    }
    if let Some(v) = checked(
        "HOOKLINE_MAX_CONNECTION_TIMEOUT_MS",
        string("HOOKLINE_MAX_CONNECTION_TIMEOUT_MS"),
        |s| parse_u64_range(s, 100, 3_600_000),
    ) {
        settings.max_connection_timeout_ms = Some(v);
    }
    if let Some(v) = checked(
        "HOOKLINE_IDLE_RECONNECT_MS",
        string("HOOKLINE_IDLE_RECONNECT_MS"),
        |s| parse_u64_range(s, 1000, 604_800_000),
    ) {
        settings.idle_reconnect_ms = Some(v);
    }
}

fn checked<T>(name: &str, raw: Option<String>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let val = raw?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
