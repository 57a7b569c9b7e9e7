//! HTTP routes for the proxy

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use samba_core::pre::{PublicKey, PublicKeySerialized, PublicParamsSerialized};
use samba_core::{FunctionId, InstanceId, SambaMessage};
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::client::Forwarded;
use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::SharedState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Instances with a key record
    pub instances: usize,
    /// Functions with an assigned leader
    pub functions: usize,
}

#[derive(Deserialize)]
struct RegisterParams {
    #[serde(rename = "instanceId")]
    instance_id: Option<String>,
}

#[derive(Deserialize)]
struct PublicKeyParams {
    #[serde(rename = "functionId")]
    function_id: Option<String>,
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let instances = state.registry.len();
    let functions = state.directory.len();
    metrics::set_registered_instances(instances);
    metrics::set_assigned_functions(functions);

    Json(HealthResponse {
        status: "ok".to_string(),
        instances,
        functions,
    })
}

/// Prometheus scrape endpoint
async fn render_metrics(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Serve the scheme's public parameters
async fn public_params(State(state): State<SharedState>) -> Json<PublicParamsSerialized> {
    Json(state.params.serialized().clone())
}

/// Register or replace an instance's public key
async fn register_public_key(
    State(state): State<SharedState>,
    Query(params): Query<RegisterParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let instance = params
        .instance_id
        .filter(|id| !id.is_empty())
        .map(InstanceId::new)
        .ok_or(ServerError::MissingParameter("instanceId"))?;

    let wire: PublicKeySerialized = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidKey(format!("Failed to decode public key: {}", e)))?;
    let public_key = PublicKey::from_serialized(&wire)
        .map_err(|e| ServerError::InvalidKey(format!("Failed to deserialize public key: {}", e)))?;
    state
        .scheme
        .check_public_key(state.params.get_params(), &public_key)
        .map_err(|e| ServerError::InvalidKey(e.to_string()))?;

    state.registry.set_public_key(&instance, public_key);
    metrics::set_registered_instances(state.registry.len());
    tracing::info!(instance = %instance, "Stored public key");

    Ok(StatusCode::OK)
}

/// Public key of a function's leader
async fn leader_public_key(
    State(state): State<SharedState>,
    Query(params): Query<PublicKeyParams>,
) -> Result<Json<PublicKeySerialized>> {
    let raw = params.function_id.unwrap_or_default();
    let function: FunctionId = raw
        .parse()
        .map_err(|e| ServerError::LeaderLookup(format!("invalid functionId '{}': {}", raw, e)))?;

    let leader = state
        .directory
        .get_or_assign_leader(function)
        .map_err(|e| ServerError::LeaderLookup(e.to_string()))?;

    let public_key = state
        .registry
        .public_key(&leader)
        .ok_or(ServerError::LeaderHasNoPublicKey(leader))?;

    Ok(Json(public_key.serialize()))
}

/// Route a message to its destination and relay the response
async fn message(State(state): State<SharedState>, body: Bytes) -> Response {
    let start = Instant::now();
    let result = route_message(&state, &body).await;

    let outcome = match &result {
        Ok(_) => metrics::OUTCOME_OK,
        Err(e) if e.status_code().is_client_error() => metrics::OUTCOME_CLIENT_ERROR,
        Err(_) => metrics::OUTCOME_SERVER_ERROR,
    };
    metrics::record_message(outcome, start.elapsed());

    match result {
        Ok(forwarded) => relay(forwarded),
        Err(e) => e.into_response(),
    }
}

async fn route_message(state: &SharedState, body: &[u8]) -> Result<Forwarded> {
    let message: SambaMessage =
        serde_json::from_slice(body).map_err(|e| ServerError::InvalidMessage(e.to_string()))?;
    state.router.route(message).await
}

/// Turn a destination's response into ours, status and body untouched
fn relay(forwarded: Forwarded) -> Response {
    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, forwarded.body).into_response();
    match forwarded
        .content_type
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(value)) => {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        _ => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    response
}

/// Create the router with all routes
pub fn create_router(state: SharedState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/publicParams", get(public_params))
        .route("/registerPublicKey", post(register_public_key))
        .route("/publicKey", get(leader_public_key))
        .route("/message", post(message))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
