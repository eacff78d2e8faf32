// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading, env overrides, and diagnostics.

use bluecon_config::{
    BlueconConfig, ConfigError, load_and_validate_path, load_and_validate_str,
    load_config_from_path, load_config_from_str,
};

/// A complete config parses into the expected values.
#[test]
fn full_config_parses() {
    let toml = r#"
[account]
client_id = "cid"
client_secret = "csecret"
username = "me@example.com"

[push]
sender_id = "123"
api_key = "AIza-key"
project_id = "blue-project"
app_id = "1:123:android:abc"
package_name = "com.fermax.blue"
heartbeat_interval_secs = 120
max_persistent_ids = 500

[api]
base_url = "https://staging.example.com"
request_timeout_secs = 5

[storage]
data_dir = "/tmp/bluecon"

[listener]
stop_timeout_secs = 3

[logging]
level = "debug"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.account.username.as_deref(), Some("me@example.com"));
    assert_eq!(config.push.max_persistent_ids, 500);
    assert_eq!(config.push.push_app().unwrap().project_id, "blue-project");
    assert_eq!(config.api.base_url, "https://staging.example.com");
    assert_eq!(
        config.api.oauth_url,
        "https://oauth.blue.fermax.com/oauth/token"
    );
    assert_eq!(config.listener.stop_timeout_secs, 3);
    assert_eq!(config.logging.level, "debug");
}

/// An empty file is all defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.api.base_url, "https://blue.fermax.io");
    assert_eq!(config.api.request_timeout_secs, 30);
    assert_eq!(config.push.heartbeat_interval_secs, 300);
    assert_eq!(config.push.max_persistent_ids, 10_000);
    assert!(config.push.push_app().is_none());
    assert_eq!(config.listener.stop_timeout_secs, 10);
    assert_eq!(config.logging.level, "info");
    assert!(config.account.client_id.is_none());
}

/// A misspelled key is rejected with a suggestion and a source span.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = "[account]\nusernme = \"me\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "usernme");
            assert_eq!(suggestion.as_deref(), Some("username"));
            assert!(span.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// An unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

/// Wrong value types become InvalidType diagnostics.
#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[listener]\nstop_timeout_secs = \"soon\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::InvalidType { key, .. } => assert_eq!(key, "listener.stop_timeout_secs"),
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

/// Semantic validation runs after a successful parse.
#[test]
fn semantic_errors_are_collected() {
    let toml = "[api]\noauth_url = \"oauth.local\"\n\n[logging]\nlevel = \"chatty\"\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// `BLUECON_<SECTION>_<KEY>` overrides the file, keeping underscores in key names.
#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            "[api]\nbase_url = \"https://from-file.example\"\n",
        )?;
        jail.set_env("BLUECON_API_BASE_URL", "https://from-env.example");
        jail.set_env("BLUECON_PUSH_MAX_PERSISTENT_IDS", "42");
        jail.set_env("BLUECON_ACCOUNT_USERNAME", "env-user");

        let config: BlueconConfig =
            load_config_from_path(std::path::Path::new("custom.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.api.base_url, "https://from-env.example");
        assert_eq!(config.push.max_persistent_ids, 42);
        assert_eq!(config.account.username.as_deref(), Some("env-user"));
        Ok(())
    });
}

/// Errors from an explicit file carry that file as the diagnostic source.
#[test]
fn explicit_path_errors_point_at_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("bad.toml", "[storage]\ndata_dirr = \"/x\"\n")?;
        let errors = load_and_validate_path(std::path::Path::new("bad.toml"))
            .err()
            .ok_or("expected errors")?;
        match &errors[0] {
            ConfigError::UnknownKey {
                suggestion, src, ..
            } => {
                assert_eq!(suggestion.as_deref(), Some("data_dir"));
                assert!(src.is_some());
            }
            other => panic!("expected UnknownKey, got {other:?}"),
        }
        Ok(())
    });
}

/// A missing explicit file falls back to defaults.
#[test]
fn missing_file_is_skipped() {
    figment::Jail::expect_with(|_jail| {
        let config = load_config_from_path(std::path::Path::new("/nonexistent/bluecon.toml"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.api.base_url, "https://blue.fermax.io");
        Ok(())
    });
}
