// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use bluecon_client::{ChannelNotificationHandler, SessionClient};
use bluecon_config::BlueconConfig;
use bluecon_core::{AccessDoor, BlueconError, Notification, NotificationHandler, Pairing};
use serde::Serialize;
use tracing::{info, warn};

use crate::{prompt, shutdown, wiring};

/// Handler for commands that never start the listener.
fn no_notifications() -> Arc<dyn NotificationHandler> {
    Arc::new(|_notification: Notification| {})
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BlueconError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| BlueconError::Decode(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

pub async fn login(config: &BlueconConfig, username: Option<String>) -> Result<(), BlueconError> {
    let username = username
        .or_else(|| config.account.username.clone())
        .ok_or_else(|| {
            BlueconError::Config(
                "no username given; pass --username or set account.username".into(),
            )
        })?;
    let password = prompt::get_password(&username)?;

    SessionClient::login(
        wiring::client_settings(config)?,
        &username,
        &password,
        wiring::storages(config),
        wiring::push_provider(config)?,
        no_notifications(),
    )
    .await?;
    println!(
        "logged in as {username}; token stored in {}",
        config.storage.token_path().display()
    );
    Ok(())
}

pub async fn pairings(config: &BlueconConfig) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    print_json(&client.get_pairings().await?)
}

pub async fn user(config: &BlueconConfig) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    print_json(&client.get_user_info().await?)
}

pub async fn device_info(config: &BlueconConfig, device_id: &str) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    match client.get_device_info(device_id).await? {
        Some(info) => print_json(&info),
        None => Err(BlueconError::Config(format!("device {device_id} is not available"))),
    }
}

/// Finds `door` on the pairing for `device_id`, by map key first, then by
/// case-insensitive title.
pub fn find_door<'a>(
    pairings: &'a [Pairing],
    device_id: &str,
    door: &str,
) -> Result<&'a AccessDoor, BlueconError> {
    let pairing = pairings
        .iter()
        .find(|p| p.device_id == device_id)
        .ok_or_else(|| BlueconError::Config(format!("no pairing for device {device_id}")))?;

    pairing
        .access_doors
        .get(door)
        .or_else(|| {
            pairing
                .access_doors
                .values()
                .find(|d| d.title.eq_ignore_ascii_case(door))
        })
        .ok_or_else(|| {
            let known: Vec<&str> = pairing.access_doors.keys().map(String::as_str).collect();
            BlueconError::Config(format!(
                "no door `{door}` on device {device_id}; known doors: {}",
                known.join(", ")
            ))
        })
}

pub async fn open_door(
    config: &BlueconConfig,
    device_id: &str,
    door: &str,
) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    let pairings = client.get_pairings().await?;
    let access_door = find_door(&pairings, device_id, door)?;

    if client.open_door(device_id, access_door).await? {
        println!("door `{door}` opened");
        Ok(())
    } else {
        Err(BlueconError::Transport {
            message: format!("the backend refused to open door `{door}`"),
            source: None,
        })
    }
}

pub async fn app_token(config: &BlueconConfig, active: bool) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    let accepted = client.register_app_token(active).await?;
    println!(
        "app token marked {}: {}",
        if active { "active" } else { "inactive" },
        if accepted { "accepted" } else { "rejected" }
    );
    Ok(())
}

pub async fn last_picture(
    config: &BlueconConfig,
    device_id: &str,
    output: &Path,
) -> Result<(), BlueconError> {
    let client = wiring::connect(config, no_notifications()).await?;
    let Some(photo) = client.get_last_picture(device_id).await? else {
        println!("no call photo for device {device_id}");
        return Ok(());
    };
    tokio::fs::write(output, &photo)
        .await
        .map_err(BlueconError::storage)?;
    println!("saved {} bytes to {}", photo.len(), output.display());
    Ok(())
}

pub fn describe(notification: &Notification) -> String {
    match notification {
        Notification::CallStarted(call) => format!(
            "call started on {} at door {}",
            call.device_id, call.access_door_key
        ),
        Notification::CallEnded(end) if end.device_id.is_empty() => "call ended".to_string(),
        Notification::CallEnded(end) => format!("call ended on {}", end.device_id),
    }
}

pub async fn listen(config: &BlueconConfig) -> Result<(), BlueconError> {
    let (handler, mut notifications) = ChannelNotificationHandler::new();
    let client = wiring::connect(config, Arc::new(handler)).await?;
    let cancel = shutdown::install_signal_handler();

    client.start_notification_listener().await?;
    info!("listening for call notifications, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = notifications.recv() => match received {
                Some(notification) => println!("{}", describe(&notification)),
                None => break,
            },
        }
    }

    if client.stop_notification_listener().await {
        warn!("listener thread did not finish within the stop timeout");
    }
    Ok(())
}
