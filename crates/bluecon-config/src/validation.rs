// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation. Collects every problem instead of
//! stopping at the first.

use crate::diagnostic::ConfigError;
use crate::model::BlueconConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &BlueconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    for (key, url) in [
        ("api.base_url", &config.api.base_url),
        ("api.oauth_url", &config.api.oauth_url),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            invalid(format!("{key} must be an http(s) URL, got `{url}`"));
        }
    }

    if config.api.request_timeout_secs == 0 {
        invalid("api.request_timeout_secs must be greater than 0".to_string());
    }

    if config.listener.stop_timeout_secs == 0 {
        invalid("listener.stop_timeout_secs must be greater than 0".to_string());
    }

    if config.push.heartbeat_interval_secs < 10 {
        invalid(format!(
            "push.heartbeat_interval_secs must be at least 10, got {}",
            config.push.heartbeat_interval_secs
        ));
    }

    // The push identity is all-or-nothing: a partial identity is a typo.
    let missing = config.push.missing_fields();
    if !missing.is_empty() && missing.len() < 5 {
        invalid(format!(
            "push section is incomplete, missing: {}",
            missing.join(", ")
        ));
    }

    if config.account.client_id.is_some() != config.account.client_secret.is_some() {
        invalid("account.client_id and account.client_secret must be set together".to_string());
    }

    if let Some(dir) = &config.storage.data_dir
        && dir.trim().is_empty()
    {
        invalid("storage.data_dir must not be empty when set".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        invalid(format!(
            "logging.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.logging.level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
