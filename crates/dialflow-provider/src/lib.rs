// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP voice provider adapter for the Dialflow campaign engine.
//!
//! Speaks the provider's session API: create a call, long-poll its event
//! feed, request a graceful stop. The adapter translates the wire protocol
//! into the engine's [`dialflow_core::types::SessionEvent`] stream.

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::HttpVoiceProvider;
pub use client::VoiceClient;
