// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for the BlueCon session core.
//!
//! Two families implement the storage traits from `bluecon-core`:
//! in-memory stores for tests and short-lived processes, and JSON file
//! stores that survive restarts. File writes go through a temp file in the
//! target directory followed by an atomic rename, so a crash never leaves
//! a half-written document behind.

pub mod file;
pub mod memory;
pub mod retention;

pub use file::{FileNotificationInfoStorage, FileOAuthTokenStorage};
pub use memory::{InMemoryNotificationInfoStorage, InMemoryOAuthTokenStorage};
pub use retention::PersistentIdLog;
