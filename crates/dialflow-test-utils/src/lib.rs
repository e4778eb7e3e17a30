// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Dialflow integration tests.
//!
//! Provides mock adapters and harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockVoiceProvider`] - Scripted voice provider with per-phone call
//!   behaviors and concurrency instrumentation
//! - [`DispatchHarness`] - A full dispatcher stack over a temp SQLite
//!   database with short timeouts
//! - [`FailingStorage`] - Storage wrapper that fails claims after a budget,
//!   for campaign-fatal tests

pub mod failing_storage;
pub mod harness;
pub mod mock_provider;

pub use failing_storage::FailingStorage;
pub use harness::DispatchHarness;
pub use mock_provider::{CallScript, MockVoiceProvider};
