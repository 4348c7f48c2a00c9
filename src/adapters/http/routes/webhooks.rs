//! Mercado Pago notification endpoint.
//!
//! Responses steer the processor's retry: `200` acknowledges (including every
//! soft no-op), `5xx` asks for redelivery. Every fetch or store failure is
//! retryable, including an id the processor does not know yet. Anything else
//! non-retryable is logged and acknowledged.

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::payment_event::PaymentNotification,
    infra::mercado_pago_client::verify_webhook_signature,
    use_cases::reconciler::{IgnoreReason, ReconcileOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/mercadopago", post(handle_notification))
}

/// Some notification variants put the pointer in the query string.
#[derive(Debug, Default, Deserialize)]
struct NotificationQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "data.id")]
    data_id: Option<String>,
}

/// POST /api/webhooks/mercadopago
async fn handle_notification(
    State(app_state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let payload: Value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?
    };

    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(query.kind)
        .unwrap_or_default();
    let data_id = query
        .data_id
        .or_else(|| payload.get("data").and_then(|d| d.get("id")).and_then(id_to_string));

    if let Some(secret) = &app_state.config.webhook_secret {
        let signature = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::InvalidSignature)?;
        let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok());
        verify_webhook_signature(signature, request_id, data_id.as_deref(), secret.expose_secret())?;
    }

    let notification = PaymentNotification::classify(&kind, data_id);
    let event_type = notification.kind().to_string();

    match app_state.reconciler.reconcile(&notification, Utc::now()).await {
        Ok(outcome) => Ok((StatusCode::OK, ack_body(&outcome))),
        Err(err) if err.is_retryable() => {
            error!(
                error = %err,
                event_type,
                retryable = true,
                "Webhook processing failed, returning 500 for redelivery"
            );
            Err(err)
        }
        Err(AppError::ProviderNotConfigured) => Err(AppError::ProviderNotConfigured),
        Err(err) => {
            warn!(
                error = %err,
                event_type,
                retryable = false,
                "Webhook processing failed, acknowledging"
            );
            Ok((StatusCode::OK, "IGNORED"))
        }
    }
}

/// `data.id` arrives as a string for preapprovals and a number for payments.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn ack_body(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Applied { .. } | ReconcileOutcome::Stale { .. } => "OK",
        ReconcileOutcome::Ignored(IgnoreReason::MissingUserReference) => "NO_REF",
        ReconcileOutcome::Ignored(_) => "IGNORED",
    }
}
