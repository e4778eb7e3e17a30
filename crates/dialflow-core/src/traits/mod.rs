// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.

pub mod adapter;
pub mod storage;
pub mod voice;

pub use adapter::PluginAdapter;
pub use storage::StorageAdapter;
pub use voice::VoiceProvider;
