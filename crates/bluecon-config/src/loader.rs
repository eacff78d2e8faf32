// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./bluecon.toml` > `~/.config/bluecon/bluecon.toml` >
//! `/etc/bluecon/bluecon.toml`, with `BLUECON_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BlueconConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/bluecon/bluecon.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "bluecon.toml";

/// Sections recognized in `BLUECON_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: [&str; 6] = ["account", "push", "api", "storage", "listener", "logging"];

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("bluecon/bluecon.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bluecon/bluecon.toml`
/// 3. `~/.config/bluecon/bluecon.toml`
/// 4. `./bluecon.toml`
/// 5. `BLUECON_*` environment variables
pub fn load_config() -> Result<BlueconConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<BlueconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BlueconConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BlueconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BlueconConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BlueconConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps `BLUECON_API_BASE_URL` to `api.base_url`.
///
/// Only the first underscore after the section name becomes a dot, so keys
/// that contain underscores themselves stay intact.
fn env_provider() -> Env {
    Env::prefixed("BLUECON_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
