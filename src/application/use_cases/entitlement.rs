use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::session_mirror::{PollOutcome, SessionMirror},
    application::validators::is_valid_email,
    domain::{
        entitlement_policy::{AccessDecision, EntitlementPolicy, can_start_trial},
        entities::{
            subscription_status::SubscriptionStatus,
            user_entitlement::{EntitlementUpdate, NewUserEntitlement, UserEntitlement, WriteOutcome},
        },
    },
};

/// Entitlement store. One record per user; unconditional profile writes,
/// conditional processor writes.
#[async_trait]
pub trait EntitlementRepo: Send + Sync {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserEntitlement>>;

    /// Insert a `none` record, or return the existing one untouched.
    async fn create(&self, input: &NewUserEntitlement, now: DateTime<Utc>) -> AppResult<UserEntitlement>;

    /// Move `none` to `trial`. Returns `None` if the record is missing or no
    /// longer eligible.
    async fn start_trial(
        &self,
        user_id: &str,
        trial_ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserEntitlement>>;

    /// Apply a processor-driven update unless a newer event was already
    /// applied.
    async fn apply_update(&self, user_id: &str, update: &EntitlementUpdate) -> AppResult<WriteOutcome>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub decision: AccessDecision,
    pub entitlement: Option<UserEntitlement>,
    pub can_start_trial: bool,
    /// Decided from the mirror because the store read failed.
    pub from_snapshot: bool,
}

#[derive(Clone)]
pub struct EntitlementUseCases {
    repo: Arc<dyn EntitlementRepo>,
    mirror: Arc<SessionMirror>,
    policy: EntitlementPolicy,
    trial_length: chrono::Duration,
}

impl EntitlementUseCases {
    pub fn new(
        repo: Arc<dyn EntitlementRepo>,
        mirror: Arc<SessionMirror>,
        policy: EntitlementPolicy,
        trial_length: chrono::Duration,
    ) -> Self {
        Self { repo, mirror, policy, trial_length }
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn register(&self, input: &NewUserEntitlement, now: DateTime<Utc>) -> AppResult<UserEntitlement> {
        if input.user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("userId is required".into()));
        }
        if !is_valid_email(&input.email) {
            return Err(AppError::InvalidInput("email is invalid".into()));
        }
        let record = self.repo.create(input, now).await?;
        self.mirror.remember(&record);
        Ok(record)
    }

    /// Store read that also refreshes the mirror; used on session restore.
    #[instrument(skip(self))]
    pub async fn load(&self, user_id: &str) -> AppResult<UserEntitlement> {
        self.mirror
            .refresh(self.repo.as_ref(), user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn start_trial(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<UserEntitlement> {
        let current = self.load(user_id).await?;
        if !can_start_trial(Some(&current)) {
            return Err(AppError::TrialUnavailable);
        }

        let ends_at = now + self.trial_length;
        let started = self
            .repo
            .start_trial(user_id, ends_at, now)
            .await?
            .ok_or(AppError::TrialUnavailable)?;

        tracing::info!(user_id, trial_ends_at = %ends_at, "trial started");
        self.mirror.remember(&started);
        Ok(started)
    }

    /// Decide access for an interactive request.
    ///
    /// Reads the store first; if that read fails, falls back to the mirror's
    /// last snapshot rather than blocking the user.
    #[instrument(skip(self))]
    pub async fn check_access(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<AccessCheck> {
        let (entitlement, from_snapshot) = match self.mirror.refresh(self.repo.as_ref(), user_id).await {
            Ok(found) => (found, false),
            Err(err) => {
                let snapshot = self.mirror.snapshot(user_id).ok_or(err)?;
                tracing::warn!(
                    user_id,
                    snapshot_age_ms = (now - snapshot.refreshed_at).num_milliseconds(),
                    "store read failed, deciding from mirrored snapshot"
                );
                (Some(snapshot.entitlement), true)
            }
        };

        let decision = self.policy.evaluate(entitlement.as_ref(), now);
        Ok(AccessCheck {
            decision,
            can_start_trial: can_start_trial(entitlement.as_ref()),
            entitlement,
            from_snapshot,
        })
    }

    /// Wait for a checkout to land after the buyer returns from the processor.
    ///
    /// Completes when the record is active and currently grants access, when
    /// `timeout` elapses, or when `cancel` fires (the caller went away).
    #[instrument(skip(self, cancel))]
    pub async fn await_activation(
        &self,
        user_id: &str,
        every: Duration,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> AppResult<Option<UserEntitlement>> {
        // fail fast for unknown users
        self.load(user_id).await?;

        let policy = self.policy.clone();
        let activated = move |e: &UserEntitlement| {
            e.subscription_status == SubscriptionStatus::Active && policy.evaluate(Some(e), Utc::now()).allowed
        };

        let poll = self
            .mirror
            .poll_until(self.repo.as_ref(), user_id, every, &cancel, activated);

        match tokio::time::timeout(timeout, poll).await {
            Ok(PollOutcome::Satisfied(entitlement)) => Ok(Some(entitlement)),
            Ok(PollOutcome::Cancelled) | Err(_) => Ok(None),
        }
    }
}
