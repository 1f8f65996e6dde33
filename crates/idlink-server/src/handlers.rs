use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use idlink_core::{CONTACT_ENVELOPE_KEY, coerce_phone, validate_email};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "idlink",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Identify request body. `phoneNumber` stays a raw JSON value so numeric
/// input can be coerced to its canonical string form at this boundary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<Value>,
}

/// `POST /identify` — resolves the supplied pair into its consolidated
/// identity group.
pub async fn identify(
    State(state): State<AppState>,
    Json(payload): Json<IdentifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let phone = match &payload.phone_number {
        Some(value) => coerce_phone(value).map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => None,
    };

    if let Some(email) = &payload.email {
        validate_email(email).map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let identity = state
        .reconciler
        .resolve(payload.email.as_deref(), phone.as_deref())
        .await
        .map_err(|e| ApiError::from_reconcile(e, state.expose_errors))?;

    Ok((
        StatusCode::OK,
        Json(json!({ CONTACT_ENVELOPE_KEY: identity })),
    ))
}
