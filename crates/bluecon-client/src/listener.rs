// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background push-notification listener.
//!
//! The provider connection runs on a dedicated OS thread that owns a
//! current-thread tokio runtime, so a blocking provider can never stall the
//! caller's scheduler. The provider hands messages to a single consumer over
//! an ordered channel; the consumer processes each one to completion
//! (dedup, persist id, decode, acknowledge, deliver) before taking the next.
//!
//! State machine: `Stopped -> Starting -> Listening -> Stopping -> Stopped`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use bluecon_core::{
    BlueconError, ListenSession, Notification, NotificationHandler, NotificationInfoStorage,
    PushCredentials, PushMessage, PushProvider,
};
use strum::Display;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::registrar::PushRegistrar;

/// Capacity of the provider-to-consumer channel.
const INBOUND_CAPACITY: usize = 64;

const THREAD_NAME: &str = "bluecon-push-listener";

/// Sends the vendor acknowledgment for a notification.
#[async_trait]
pub trait Acknowledger: Send + Sync + 'static {
    /// Returns whether the vendor accepted the acknowledgment.
    async fn acknowledge(&self, notification: &Notification) -> Result<bool, BlueconError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ListenerState {
    Stopped,
    Starting,
    Listening,
    Stopping,
}

struct Running {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
    done: oneshot::Receiver<()>,
}

struct Inner {
    state: ListenerState,
    running: Option<Running>,
    /// Cancellation for a start still in progress.
    starting: Option<CancellationToken>,
}

impl Inner {
    /// Settles a listener whose thread exited on its own back to stopped.
    fn reap_finished(&mut self) {
        if self.state == ListenerState::Listening
            && self
                .running
                .as_ref()
                .is_some_and(|running| running.thread.is_finished())
        {
            debug!("listener thread exited on its own");
            self.state = ListenerState::Stopped;
            self.running = None;
        }
    }
}

/// Everything the listener thread needs to process messages.
#[derive(Clone)]
struct Pipeline {
    provider: Arc<dyn PushProvider>,
    storage: Arc<dyn NotificationInfoStorage>,
    acknowledger: Arc<dyn Acknowledger>,
    handler: Arc<dyn NotificationHandler>,
}

pub struct NotificationListener {
    pipeline: Pipeline,
    registrar: Arc<PushRegistrar>,
    stop_timeout: Duration,
    inner: Mutex<Inner>,
}

impl NotificationListener {
    pub fn new(
        provider: Arc<dyn PushProvider>,
        storage: Arc<dyn NotificationInfoStorage>,
        registrar: Arc<PushRegistrar>,
        acknowledger: Arc<dyn Acknowledger>,
        handler: Arc<dyn NotificationHandler>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                provider,
                storage,
                acknowledger,
                handler,
            },
            registrar,
            stop_timeout,
            inner: Mutex::new(Inner {
                state: ListenerState::Stopped,
                running: None,
                starting: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State transitions never panic while holding the lock; recover anyway.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state. A listener whose thread exited on its own reads as stopped.
    pub fn state(&self) -> ListenerState {
        let mut inner = self.lock();
        inner.reap_finished();
        inner.state
    }

    /// Registers for push if needed, then starts the listener thread.
    ///
    /// A fresh registration also marks the new token active at the vendor
    /// backend, which only routes notifications to tokens it knows.
    pub async fn start(&self) -> Result<(), BlueconError> {
        let cancel = {
            let mut inner = self.lock();
            inner.reap_finished();
            if inner.state != ListenerState::Stopped {
                return Err(BlueconError::Listener(format!(
                    "cannot start listener while {}",
                    inner.state
                )));
            }
            let cancel = CancellationToken::new();
            inner.state = ListenerState::Starting;
            inner.starting = Some(cancel.clone());
            cancel
        };

        let result = self.spawn(cancel.clone()).await;

        let mut inner = self.lock();
        inner.starting = None;
        match result {
            // The thread sees the cancelled token and exits promptly.
            Ok(_) if cancel.is_cancelled() => {
                inner.state = ListenerState::Stopped;
                Err(stopped_while_starting())
            }
            Ok(running) => {
                inner.state = ListenerState::Listening;
                inner.running = Some(running);
                info!(
                    provider = self.pipeline.provider.name(),
                    "notification listener started"
                );
                Ok(())
            }
            Err(e) => {
                inner.state = ListenerState::Stopped;
                Err(e)
            }
        }
    }

    async fn spawn(&self, cancel: CancellationToken) -> Result<Running, BlueconError> {
        let (credentials, newly_registered) = self.registrar.ensure_registered().await?;
        if newly_registered {
            match self.registrar.set_active(true).await {
                Ok(true) => {}
                Ok(false) => warn!("vendor backend rejected the new app token"),
                Err(e) => warn!(error = %e, "failed to register the new app token"),
            }
        }
        if cancel.is_cancelled() {
            return Err(stopped_while_starting());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BlueconError::Listener(format!("failed to build listener runtime: {e}")))?;

        let (done_tx, done) = oneshot::channel();
        let pipeline = self.pipeline.clone();
        let thread_cancel = cancel.clone();

        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(pipeline.run(credentials, thread_cancel));
                // Receiver may already be gone after a timed-out stop.
                let _ = done_tx.send(());
            })
            .map_err(|e| BlueconError::Listener(format!("failed to spawn listener thread: {e}")))?;

        Ok(Running {
            cancel,
            thread,
            done,
        })
    }

    /// Stops with the configured timeout. See [`stop_with_timeout`](Self::stop_with_timeout).
    pub async fn stop(&self) -> bool {
        self.stop_with_timeout(self.stop_timeout).await
    }

    /// Cancels the connection and waits up to `timeout` for the listener
    /// thread to exit. Returns `true` if the thread is still alive.
    ///
    /// Stopping a listener that is not running returns `false`. A stop that
    /// arrives while the listener is starting cancels that start.
    pub async fn stop_with_timeout(&self, timeout: Duration) -> bool {
        let running = {
            let mut inner = self.lock();
            match inner.running.take() {
                Some(running) => {
                    inner.state = ListenerState::Stopping;
                    running
                }
                None => {
                    if let Some(starting) = &inner.starting {
                        info!("stop requested while starting, cancelling start");
                        starting.cancel();
                    }
                    return false;
                }
            }
        };

        running.cancel.cancel();
        let finished = tokio::time::timeout(timeout, running.done).await.is_ok();

        let still_alive = if finished {
            if running.thread.join().is_err() {
                error!("notification listener thread panicked");
            }
            false
        } else {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "notification listener did not stop in time"
            );
            !running.thread.is_finished()
        };

        self.lock().state = ListenerState::Stopped;
        info!(still_alive, "notification listener stopped");
        still_alive
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        if let Some(running) = self.lock().running.take() {
            running.cancel.cancel();
        }
    }
}

fn stopped_while_starting() -> BlueconError {
    BlueconError::Listener("listener was stopped while starting".to_string())
}

impl Pipeline {
    async fn run(self, credentials: PushCredentials, cancel: CancellationToken) {
        let (sender, mut receiver) = mpsc::channel::<PushMessage>(INBOUND_CAPACITY);
        let session = ListenSession {
            credentials,
            seen_ids: self.storage.clone(),
            sender,
            cancel: cancel.clone(),
        };

        let provider = self.provider.clone();
        let connection = async move {
            match provider.listen(session).await {
                Ok(()) => debug!("push connection closed"),
                Err(e) => error!(error = %e, "push connection failed"),
            }
        };

        // The sender lives in the session, so the consumer drains whatever
        // was delivered and ends once the connection future returns.
        let consumer = async {
            while let Some(message) = receiver.recv().await {
                self.process(message).await;
            }
        };

        tokio::join!(connection, consumer);
    }

    async fn process(&self, message: PushMessage) {
        let persistent_id = message.persistent_id.as_str();

        match self.storage.contains_persistent_id(persistent_id).await {
            Ok(true) => {
                debug!(persistent_id, "duplicate push message discarded");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(persistent_id, error = %e, "cannot check seen ids, dropping message");
                return;
            }
        }

        if let Err(e) = self.storage.store_persistent_id(persistent_id).await {
            error!(persistent_id, error = %e, "cannot record persistent id, dropping message");
            return;
        }

        let notification = match Notification::decode(&message.data, &message.message_id) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(persistent_id, error = %e, "dropping undecodable push message");
                return;
            }
        };

        if notification.requires_ack() {
            match self.acknowledger.acknowledge(&notification).await {
                Ok(true) => debug!(persistent_id, "notification acknowledged"),
                Ok(false) => warn!(persistent_id, "notification acknowledgment rejected"),
                Err(e) => warn!(persistent_id, error = %e, "notification acknowledgment failed"),
            }
        }

        debug!(
            persistent_id,
            device_id = notification.device_id(),
            "delivering notification"
        );
        self.handler.on_notification(notification);
    }
}
