// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice session state machine for the Dialflow campaign engine.
//!
//! One [`SessionDriver`] owns exactly one live call: it opens the provider
//! session, walks the event stream through the connection handshake and
//! floor changes, and resolves to a single [`SessionOutcome`]. Provider
//! faults and timeouts become outcomes, never errors; the dispatcher's
//! workers translate outcomes into call-result statuses.

pub mod driver;

pub use driver::{DriverConfig, Floor, SessionDriver, SessionOutcome, SessionState};
