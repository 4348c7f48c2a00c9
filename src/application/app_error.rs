use thiserror::Error;

use crate::domain::entitlement_policy::RemediationPath;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Trial already used or subscription already started")]
    TrialUnavailable,

    #[error("Access denied: {}", .remediation.as_str())]
    EntitlementRequired {
        remediation: RemediationPath,
        can_start_trial: bool,
    },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Provider not configured")]
    ProviderNotConfigured,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the payment processor should redeliver a notification that
    /// failed with this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_) => true,
            AppError::InvalidInput(_)
            | AppError::NotFound
            | AppError::TrialUnavailable
            | AppError::EntitlementRequired { .. }
            | AppError::InvalidSignature
            | AppError::ProviderNotConfigured => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidInput,
    NotFound,
    TrialUnavailable,
    EntitlementRequired,
    InvalidSignature,
    ProviderNotConfigured,
    UpstreamError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TrialUnavailable => "TRIAL_UNAVAILABLE",
            ErrorCode::EntitlementRequired => "ENTITLEMENT_REQUIRED",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
