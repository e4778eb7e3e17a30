// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Dialflow campaign engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Dialflow workspace. Adapter plugins
//! (voice provider, storage) implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DialflowError;
pub use types::{
    AdapterType, AgentType, CallOutcome, CallResult, CallStatus, Campaign, CampaignStatus,
    HealthStatus, Recipient, SessionEvent, SessionEventStream, SessionRequest,
};

// Re-export all adapter traits at crate root.
pub use traits::{PluginAdapter, StorageAdapter, VoiceProvider};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialflow_error_has_all_variants() {
        let _config = DialflowError::Config("test".into());
        let _invalid = DialflowError::InvalidInput("test".into());
        let _storage = DialflowError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = DialflowError::Provider {
            message: "test".into(),
            source: None,
        };
        let _unavailable = DialflowError::ProviderUnavailable {
            timeout: std::time::Duration::from_secs(30),
        };
        let _not_found = DialflowError::CampaignNotFound("c-1".into());
        let _fatal = DialflowError::CampaignFatal("test".into());
        let _timeout = DialflowError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _internal = DialflowError::Internal("test".into());
    }

    #[test]
    fn error_messages_name_their_scope() {
        let e = DialflowError::InvalidInput("recipient list is empty".into());
        assert_eq!(e.to_string(), "invalid input: recipient list is empty");

        let e = DialflowError::CampaignNotFound("c-404".into());
        assert_eq!(e.to_string(), "campaign not found: c-404");
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;
        for variant in [AdapterType::Voice, AdapterType::Storage] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that the adapter traits are reachable from the
        // crate root.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_voice_provider<T: VoiceProvider>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
    }
}
