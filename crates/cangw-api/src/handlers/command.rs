//! Command/status handlers
//!
//! `/send_can` always answers 200 with the status line; failures are part of
//! the text, not the HTTP status.

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use cangw_core::{SendCommand, StatusSnapshot};
use serde::Deserialize;

use crate::state::AppState;

/// Send parameters, accepted from the query string or a form body
#[derive(Debug, Default, Deserialize)]
pub struct SendCanParams {
    pub message: Option<String>,
    pub value: Option<String>,
    pub payload: Option<String>,
}

impl SendCanParams {
    /// Fields present in `other` win
    fn merge(self, other: SendCanParams) -> Self {
        Self {
            message: other.message.or(self.message),
            value: other.value.or(self.value),
            payload: other.payload.or(self.payload),
        }
    }
}

impl From<SendCanParams> for SendCommand {
    fn from(params: SendCanParams) -> Self {
        SendCommand {
            message: params.message,
            value: params.value,
            payload: params.payload,
        }
    }
}

/// POST /send_can
pub async fn send_can(
    State(state): State<AppState>,
    Query(query): Query<SendCanParams>,
    form: Result<Form<SendCanParams>, FormRejection>,
) -> String {
    let params = match form {
        Ok(Form(form)) => query.merge(form),
        Err(_) => query,
    };
    tracing::debug!(?params, "send_can");
    state.gateway().send(params.into()).await
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.gateway().status().await)
}

/// Any unrouted request; POSTs get the command protocol's rejection text
pub async fn not_recognized(method: Method) -> Response {
    if method == Method::POST {
        "Command not recognized.".into_response()
    } else {
        (axum::http::StatusCode::NOT_FOUND, "Not found.").into_response()
    }
}
