//! Access decisions for entitlement-gated actions.
//!
//! Pure functions over a [`UserEntitlement`] and the current instant. Expiry of
//! a trial or of a paid-through date is derived here at read time and never
//! written back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{
    subscription_status::SubscriptionStatus, user_entitlement::UserEntitlement,
};

/// The next step surfaced to a denied user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemediationPath {
    /// Never subscribed (or status unknown).
    Subscribe,
    TrialExpired,
    /// Paid-through date passed on an otherwise active record.
    Renew,
    /// Recurring charge was paused or canceled by the processor.
    PaymentFailed,
}

impl RemediationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationPath::Subscribe => "subscribe",
            RemediationPath::TrialExpired => "trial-expired",
            RemediationPath::Renew => "renew",
            RemediationPath::PaymentFailed => "payment-failed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RemediationPath::Subscribe => {
                "Assine o plano cósmico ou inicie seu período de teste para consultar o Oráculo."
            }
            RemediationPath::TrialExpired => {
                "Seu período de teste de 24 horas expirou. Assine o plano cósmico para continuar."
            }
            RemediationPath::Renew => {
                "Seu acesso expirou. Renove sua assinatura mensal para continuar usando o Oráculo."
            }
            RemediationPath::PaymentFailed => {
                "Tentamos cobrar o seu plano, mas o pagamento não foi autorizado. Atualize sua assinatura para continuar."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RemediationPath>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn deny(reason: RemediationPath) -> Self {
        Self { allowed: false, reason: Some(reason) }
    }
}

/// Evaluates entitlements, with a single administrative account that bypasses
/// every check.
#[derive(Debug, Clone)]
pub struct EntitlementPolicy {
    admin_email: String,
}

impl EntitlementPolicy {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into().trim().to_lowercase(),
        }
    }

    pub fn is_admin(&self, email: Option<&str>) -> bool {
        match email {
            Some(email) if !self.admin_email.is_empty() => {
                email.trim().to_lowercase() == self.admin_email
            }
            _ => false,
        }
    }

    /// Decide from the record alone; the admin check uses the record's email.
    pub fn evaluate(&self, entitlement: Option<&UserEntitlement>, now: DateTime<Utc>) -> AccessDecision {
        self.evaluate_for(entitlement.map(|e| e.email.as_str()), entitlement, now)
    }

    /// Decide for a caller whose identity email is known even when the record
    /// is missing.
    pub fn evaluate_for(
        &self,
        email: Option<&str>,
        entitlement: Option<&UserEntitlement>,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        if self.is_admin(email) {
            return AccessDecision::allow();
        }
        evaluate_status(entitlement, now)
    }
}

/// Status rules without the admin bypass. A missing record is `none`.
pub fn evaluate_status(entitlement: Option<&UserEntitlement>, now: DateTime<Utc>) -> AccessDecision {
    let Some(entitlement) = entitlement else {
        return AccessDecision::deny(RemediationPath::Subscribe);
    };

    match entitlement.subscription_status {
        SubscriptionStatus::Active => match entitlement.access_until {
            Some(until) if now >= until => AccessDecision::deny(RemediationPath::Renew),
            _ => AccessDecision::allow(),
        },
        SubscriptionStatus::Trial => match entitlement.trial_ends_at {
            Some(ends_at) if now < ends_at => AccessDecision::allow(),
            _ => AccessDecision::deny(RemediationPath::TrialExpired),
        },
        status if status.is_payment_failure() => AccessDecision::deny(RemediationPath::PaymentFailed),
        _ => AccessDecision::deny(RemediationPath::Subscribe),
    }
}

/// Only a signed-up user who never trialed or paid may start a trial.
pub fn can_start_trial(entitlement: Option<&UserEntitlement>) -> bool {
    entitlement.is_some_and(|e| e.subscription_status == SubscriptionStatus::None && !e.trial_used())
}
