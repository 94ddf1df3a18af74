//! Parameter handlers
//!
//! Parameter writes always succeed at this boundary. Whether the value also
//! reached the bus is only visible in the logs.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use cangw_core::{Parameter, ParameterType, ParameterValue, SignalTarget};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NamesQuery {
    /// Comma-separated parameter names; all when absent
    #[serde(default)]
    pub names: Option<String>,
}

impl NamesQuery {
    fn names(&self) -> Vec<String> {
        self.names
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ParameterListResponse {
    pub count: usize,
    pub items: Vec<Parameter>,
}

impl From<Vec<Parameter>> for ParameterListResponse {
    fn from(items: Vec<Parameter>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetParametersRequest {
    pub parameters: Vec<Parameter>,
}

/// Body of a single-parameter write; a null value removes the parameter
#[derive(Debug, Deserialize)]
pub struct SetParameterRequest {
    #[serde(default)]
    pub value: Option<ParameterValue>,
    #[serde(default, rename = "type")]
    pub kind: Option<ParameterType>,
}

#[derive(Debug, Deserialize)]
pub struct BindRequest {
    pub parameter: String,
    pub message: String,
    pub signal: String,
}

#[derive(Debug, Serialize)]
pub struct BindingResponse {
    pub parameter: String,
    #[serde(flatten)]
    pub target: SignalTarget,
}

#[derive(Debug, Serialize)]
struct StreamEvent {
    /// Unix timestamp in milliseconds
    ts: i64,
    seq: u64,
    parameters: Vec<Parameter>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /parameters?names=a,b
pub async fn list_parameters(
    State(state): State<AppState>,
    Query(query): Query<NamesQuery>,
) -> Json<ParameterListResponse> {
    Json(state.parameters().get_by_names(&query.names()).into())
}

/// PUT /parameters
/// Apply a batch in order and return every parameter afterwards
pub async fn set_parameters(
    State(state): State<AppState>,
    Json(request): Json<SetParametersRequest>,
) -> Json<ParameterListResponse> {
    Json(state.parameters().set_many(request.parameters).await.into())
}

/// GET /parameters/{name}
pub async fn get_parameter(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Parameter>, ApiError> {
    Ok(Json(state.parameters().get(&name)?))
}

/// PUT /parameters/{name}
pub async fn set_parameter(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SetParameterRequest>,
) -> impl IntoResponse {
    let parameter = Parameter {
        name,
        value: request.value,
        kind: request.kind,
    };
    match state.parameters().set(parameter).await {
        Some(stored) => Json(stored).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /parameters/bindings
pub async fn list_bindings(State(state): State<AppState>) -> Json<Vec<BindingResponse>> {
    let mut bindings: Vec<_> = state
        .parameters()
        .bindings()
        .map(|map| map.entries())
        .unwrap_or_default()
        .into_iter()
        .map(|(parameter, target)| BindingResponse { parameter, target })
        .collect();
    bindings.sort_by(|a, b| a.parameter.cmp(&b.parameter));
    Json(bindings)
}

/// POST /parameters/bindings
pub async fn create_binding(
    State(state): State<AppState>,
    Json(request): Json<BindRequest>,
) -> Result<(StatusCode, Json<BindingResponse>), ApiError> {
    let target = state
        .parameters()
        .bind(&request.parameter, &request.message, &request.signal)?;
    tracing::info!(
        parameter = %request.parameter,
        message_name = %target.message,
        signal = %target.signal,
        "Parameter bound"
    );
    Ok((
        StatusCode::CREATED,
        Json(BindingResponse {
            parameter: request.parameter,
            target,
        }),
    ))
}

/// GET /parameters/subscribe?names=a,b
/// SSE stream of parameter batches, starting with the current values
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<NamesQuery>,
) -> impl IntoResponse {
    let subscription = state.parameters().subscribe(&query.names());
    let (filter, receiver) = subscription.into_parts();
    let seq_counter = Arc::new(AtomicU64::new(1));

    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let batch = match result {
            Ok(batch) => filter.filter(batch),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Parameter stream lagged");
                return None;
            }
        };
        if batch.is_empty() {
            return None;
        }

        let event = StreamEvent {
            ts: Utc::now().timestamp_millis(),
            seq: seq_counter.fetch_add(1, Ordering::SeqCst),
            parameters: batch,
        };
        Some(Ok::<_, Infallible>(
            Event::default()
                .event("parameters")
                .data(serde_json::to_string(&event).unwrap_or_default()),
        ))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
