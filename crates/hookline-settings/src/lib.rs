//! # hookline-settings
//!
//! Configuration management with layered sources for the hookline relay
//! client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`HooklineSettings::default()`]
//! 2. **User file**: `~/.hookline/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HOOKLINE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<HooklineSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.hookline/settings.json` with env
/// var overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static HooklineSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: HooklineSettings) -> std::result::Result<(), HooklineSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
