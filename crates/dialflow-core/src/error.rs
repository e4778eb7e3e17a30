// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Dialflow campaign engine.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Dialflow adapter traits and core operations.
///
/// Per-call faults (provider timeouts, busy signals, rejections) are recovered
/// locally by the call worker and recorded as `CallResult` data; they only
/// appear here while in transit between the provider adapter and the session
/// driver. Campaign-wide faults surface as [`DialflowError::CampaignFatal`].
#[derive(Debug, Error)]
pub enum DialflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// A request was rejected synchronously: empty recipient list,
    /// non-positive concurrency limit, malformed campaign input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Voice provider errors (API failure, auth rejection, malformed agent configuration).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider handshake did not complete within the configured timeout.
    /// The owning call worker maps this to a `no_answer` call result.
    #[error("provider unavailable: handshake did not complete within {timeout:?}")]
    ProviderUnavailable { timeout: Duration },

    /// No campaign with the requested id exists.
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// A fault that aborts the whole campaign (store unreachable, no worker
    /// capacity at all). Never produced by an individual call failure.
    #[error("campaign-fatal error: {0}")]
    CampaignFatal(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
