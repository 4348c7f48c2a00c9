use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::oracle::OracleProvider,
    domain::entitlement_policy::RemediationPath,
    use_cases::entitlement::EntitlementUseCases,
};

const MAX_QUESTION_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleAnswer {
    pub answer: String,
}

/// Entitlement-gated questions to the oracle.
#[derive(Clone)]
pub struct OracleUseCases {
    entitlements: Arc<EntitlementUseCases>,
    provider: Option<Arc<dyn OracleProvider>>,
}

impl OracleUseCases {
    pub fn new(entitlements: Arc<EntitlementUseCases>, provider: Option<Arc<dyn OracleProvider>>) -> Self {
        Self { entitlements, provider }
    }

    #[instrument(skip(self, question), fields(question_chars = question.chars().count()))]
    pub async fn ask(&self, user_id: &str, question: &str, now: DateTime<Utc>) -> AppResult<OracleAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question is required".into()));
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(AppError::InvalidInput(format!(
                "question must be at most {MAX_QUESTION_CHARS} characters"
            )));
        }

        let check = self.entitlements.check_access(user_id, now).await?;
        if !check.decision.allowed {
            let remediation = check.decision.reason.unwrap_or(RemediationPath::Subscribe);
            tracing::info!(user_id, remediation = remediation.as_str(), "question denied");
            return Err(AppError::EntitlementRequired {
                remediation,
                can_start_trial: check.can_start_trial,
            });
        }

        let provider = self.provider.as_ref().ok_or_else(|| {
            tracing::error!("question allowed but no generative provider is configured");
            AppError::ProviderNotConfigured
        })?;

        let answer = provider.ask(question).await?;
        Ok(OracleAnswer { answer })
    }
}
