use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(_)
            | AppError::ProviderNotConfigured
            | AppError::Upstream(_)
            | AppError::Internal(_) => tracing::error!(error = ?self, "Request failed"),
            _ => tracing::debug!(error = ?self, "Request rejected"),
        }

        match self {
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "Falha ao acessar os dados.",
            ),
            AppError::InvalidInput(msg) => error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, msg),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Não encontrado."),
            AppError::TrialUnavailable => error_resp(
                StatusCode::CONFLICT,
                ErrorCode::TrialUnavailable,
                "O período de teste já foi utilizado.",
            ),
            AppError::EntitlementRequired {
                remediation,
                can_start_trial,
            } => {
                let body = serde_json::json!({
                    "code": ErrorCode::EntitlementRequired.as_str(),
                    "remediation": remediation,
                    "message": remediation.message(),
                    "canStartTrial": can_start_trial,
                });
                (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
            }
            AppError::InvalidSignature => error_resp(
                StatusCode::UNAUTHORIZED,
                ErrorCode::InvalidSignature,
                "Assinatura inválida.",
            ),
            AppError::ProviderNotConfigured => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ProviderNotConfigured,
                "Provedor não configurado.",
            ),
            AppError::Upstream(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::UpstreamError,
                "Falha ao comunicar com o provedor.",
            ),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Erro interno.",
            ),
        }
    }
}

/// `{code, error}`; `error` is what the web client shows.
fn error_resp(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "code": code.as_str(), "error": message.into() });
    (status, Json(body)).into_response()
}
