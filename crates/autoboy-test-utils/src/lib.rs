// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for AutoBoy integration tests.
//!
//! Provides recording collaborators and a harness that wires a real hub,
//! store and alert engine together, so end-to-end tests run without any
//! external service.
//!
//! # Components
//!
//! - [`MockSink`] - notification sink that records every send
//! - [`RecordingPush`] - `UserPush` that records pushes and forwards them to a hub
//! - [`StaticTokenValidator`] / [`StaticSessions`] - table-driven handshake auth
//! - [`TestHarness`] - store + clock + hub + engine, plus an optional HTTP server

pub mod harness;
pub mod mock_push;
pub mod mock_sink;
pub mod static_auth;

pub use harness::{TEST_JWT_SECRET, TestHarness, TestServer, mint_token};
pub use mock_push::RecordingPush;
pub use mock_sink::MockSink;
pub use static_auth::{StaticSessions, StaticTokenValidator};
