// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the campaign REST API.
//!
//! Campaign and call-result bodies reuse the engine's serde encodings
//! directly; handlers translate between HTTP and the dispatcher.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use dialflow_core::types::{AgentType, Recipient};
use dialflow_core::DialflowError;
use dialflow_dispatch::CampaignSpec;

use crate::server::GatewayState;

/// Request body for POST /v1/campaigns.
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    /// Campaign display name.
    pub name: String,
    /// Script template with `{variable}` placeholders.
    pub script_content: String,
    /// Agent persona driving the calls.
    pub agent_type: AgentType,
    /// Maximum simultaneously active voice sessions.
    pub concurrency_limit: u32,
    /// Whether the agent may consult the knowledge base.
    #[serde(default)]
    pub use_knowledge_base: bool,
    /// Optional system prompt override.
    #[serde(default)]
    pub custom_system_prompt: Option<String>,
    /// Full recipient list in dispatch priority order.
    pub recipients: Vec<Recipient>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway started.
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Maps an engine error to an HTTP status plus JSON error body.
///
/// Synchronous rejections are client errors; provider trouble is a bad
/// gateway; everything else is internal.
fn error_response(err: DialflowError) -> Response {
    let status = match &err {
        DialflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DialflowError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
        DialflowError::Provider { .. } | DialflowError::ProviderUnavailable { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/campaigns
///
/// Validates the spec, persists the campaign, and starts dispatching.
pub async fn post_campaigns(
    State(state): State<GatewayState>,
    Json(body): Json<CreateCampaignRequest>,
) -> Response {
    let spec = CampaignSpec {
        name: body.name,
        script_content: body.script_content,
        agent_type: body.agent_type,
        concurrency_limit: body.concurrency_limit,
        use_knowledge_base: body.use_knowledge_base,
        custom_system_prompt: body.custom_system_prompt,
        recipients: body.recipients,
    };
    match state.dispatcher.start_campaign(spec).await {
        Ok(campaign) => (StatusCode::CREATED, Json(campaign)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/campaigns
pub async fn get_campaigns(State(state): State<GatewayState>) -> Response {
    match state.dispatcher.list_campaigns().await {
        Ok(campaigns) => (StatusCode::OK, Json(campaigns)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.get_campaign(&id).await {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /v1/campaigns/{id}/results
///
/// Call results in dispatch order; unknown ids are 404.
pub async fn get_campaign_results(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.list_results(&id).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/campaigns/{id}/pause
pub async fn post_pause(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.pause_campaign(&id).await {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/campaigns/{id}/resume
pub async fn post_resume(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.resume_campaign(&id).await {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/campaigns/{id}/cancel
pub async fn post_cancel(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.dispatcher.cancel_campaign(&id).await {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
///
/// Unauthenticated liveness probe for systemd and load balancers.
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_deserializes_with_defaults() {
        let json = r#"{
            "name": "Summer promo",
            "script_content": "Hi {name}",
            "agent_type": "sales",
            "concurrency_limit": 4,
            "recipients": [{"id": "c1", "name": "Sara", "phone": "+96650000001"}]
        }"#;
        let req: CreateCampaignRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.name, "Summer promo");
        assert_eq!(req.agent_type, AgentType::Sales);
        assert!(!req.use_knowledge_base);
        assert!(req.custom_system_prompt.is_none());
        assert_eq!(req.recipients.len(), 1);
    }

    #[test]
    fn create_request_rejects_unknown_agent_type() {
        let json = r#"{
            "name": "n",
            "script_content": "s",
            "agent_type": "billing",
            "concurrency_limit": 1,
            "recipients": []
        }"#;
        assert!(serde_json::from_str::<CreateCampaignRequest>(json).is_err());
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("something went wrong"));
    }
}
