// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway exposing the campaign API.
//!
//! Thin axum layer over [`dialflow_dispatch::CampaignDispatcher`]: routes
//! translate JSON bodies to dispatcher calls, engine errors to HTTP
//! statuses, and nothing else. Campaign state lives entirely in the
//! dispatcher and storage layers.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, HealthState, ServerConfig};
