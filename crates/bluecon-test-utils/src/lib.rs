// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for BlueCon integration tests.
//!
//! Deterministic stand-ins for the push provider and the vendor backend,
//! so the session core can be exercised without network access.
//!
//! # Components
//!
//! - [`ScriptedPushProvider`] - push provider replaying a fixed message script
//! - [`RecordingHandler`] - notification handler that records deliveries
//! - [`TestHarness`] - a [`SessionClient`](bluecon_client::SessionClient) wired to a mock backend

pub mod harness;
pub mod recording_handler;
pub mod scripted_provider;

pub use harness::TestHarness;
pub use recording_handler::RecordingHandler;
pub use scripted_provider::{ScriptedPushProvider, call_end_message, call_message};
