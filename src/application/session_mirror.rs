//! Process-local mirror of entitlement records.
//!
//! The mirror is a read-through cache: it is only ever filled from values the
//! entitlement store returned, and nothing is written back through it. Entries
//! carry the instant they were read so callers can report how stale a fallback
//! snapshot is. The mirror is bounded by entry count and snapshot age.
//! Access rules live in `domain::entitlement_policy`, not here.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    app_error::AppResult, domain::entities::user_entitlement::UserEntitlement,
    use_cases::entitlement::EntitlementRepo,
};

#[derive(Debug, Clone)]
pub struct MirrorSnapshot {
    pub entitlement: UserEntitlement,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Satisfied(UserEntitlement),
    Cancelled,
}

/// Snapshots older than this are dropped and never used as a fallback.
pub const DEFAULT_MIRROR_MAX_AGE_SECS: i64 = 15 * 60;
pub const DEFAULT_MIRROR_MAX_ENTRIES: usize = 10_000;

pub struct SessionMirror {
    entries: RwLock<HashMap<String, MirrorSnapshot>>,
    max_entries: usize,
    max_age: chrono::Duration,
}

impl Default for SessionMirror {
    fn default() -> Self {
        Self::with_limits(
            DEFAULT_MIRROR_MAX_ENTRIES,
            chrono::Duration::seconds(DEFAULT_MIRROR_MAX_AGE_SECS),
        )
    }
}

impl SessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_entries: usize, max_age: chrono::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            max_age,
        }
    }

    pub fn snapshot(&self, user_id: &str) -> Option<MirrorSnapshot> {
        self.snapshot_at(user_id, Utc::now())
    }

    fn snapshot_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<MirrorSnapshot> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(user_id).cloned())
            .filter(|snapshot| now - snapshot.refreshed_at < self.max_age)
    }

    /// Record a value the store just returned.
    pub fn remember(&self, entitlement: &UserEntitlement) {
        self.remember_at(entitlement, Utc::now());
    }

    /// Inserts, then drops expired snapshots and, over capacity, the least
    /// recently refreshed ones.
    fn remember_at(&self, entitlement: &UserEntitlement, now: DateTime<Utc>) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!("session mirror lock poisoned, skipping update");
            return;
        };
        entries.insert(
            entitlement.user_id.clone(),
            MirrorSnapshot {
                entitlement: entitlement.clone(),
                refreshed_at: now,
            },
        );

        entries.retain(|_, snapshot| now - snapshot.refreshed_at < self.max_age);

        if entries.len() > self.max_entries {
            let mut by_age: Vec<_> = entries
                .iter()
                .map(|(user_id, snapshot)| (user_id.clone(), snapshot.refreshed_at))
                .collect();
            by_age.sort_by_key(|(_, refreshed_at)| *refreshed_at);

            let excess = entries.len() - self.max_entries;
            for (user_id, _) in by_age.into_iter().take(excess) {
                entries.remove(&user_id);
            }
        }
    }

    pub fn forget(&self, user_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(user_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read from the store and update the mirror. A record that disappeared
    /// from the store is dropped from the mirror too.
    pub async fn refresh(
        &self,
        repo: &dyn EntitlementRepo,
        user_id: &str,
    ) -> AppResult<Option<UserEntitlement>> {
        let current = repo.get(user_id).await?;
        match &current {
            Some(entitlement) => self.remember(entitlement),
            None => self.forget(user_id),
        }
        Ok(current)
    }

    /// Re-read the record every `every` until `done` holds or `cancel` fires.
    ///
    /// Reads are sequential, so at most one is in flight. Failed reads are
    /// logged and retried on the next tick.
    pub async fn poll_until<F>(
        &self,
        repo: &dyn EntitlementRepo,
        user_id: &str,
        every: Duration,
        cancel: &CancellationToken,
        done: F,
    ) -> PollOutcome
    where
        F: Fn(&UserEntitlement) -> bool,
    {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = interval.tick() => {}
            }

            match self.refresh(repo, user_id).await {
                Ok(Some(entitlement)) if done(&entitlement) => {
                    return PollOutcome::Satisfied(entitlement);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(user_id, error = %err, "entitlement poll read failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::subscription_status::SubscriptionStatus;
    use crate::test_utils::{InMemoryEntitlementRepo, create_test_entitlement};

    fn record(user_id: &str) -> UserEntitlement {
        create_test_entitlement(|e| e.user_id = user_id.into())
    }

    #[test]
    fn test_expired_snapshots_are_dropped_on_remember() {
        let mirror = SessionMirror::with_limits(100, chrono::Duration::minutes(15));
        let now = Utc::now();

        mirror.remember_at(&record("old"), now - chrono::Duration::minutes(17));
        mirror.remember_at(&record("recent"), now - chrono::Duration::minutes(5));
        assert_eq!(mirror.len(), 2);

        mirror.remember_at(&record("fresh"), now);
        assert_eq!(mirror.len(), 2);
        assert!(mirror.snapshot_at("old", now).is_none());
        assert!(mirror.snapshot_at("recent", now).is_some());
        assert!(mirror.snapshot_at("fresh", now).is_some());
    }

    #[test]
    fn test_snapshot_past_max_age_is_not_served() {
        let mirror = SessionMirror::with_limits(100, chrono::Duration::minutes(15));
        let now = Utc::now();
        mirror.remember_at(&record("u1"), now);

        assert!(mirror.snapshot_at("u1", now + chrono::Duration::minutes(14)).is_some());
        assert!(mirror.snapshot_at("u1", now + chrono::Duration::minutes(15)).is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recently_refreshed() {
        let mirror = SessionMirror::with_limits(2, chrono::Duration::hours(1));
        let now = Utc::now();

        mirror.remember_at(&record("a"), now - chrono::Duration::seconds(30));
        mirror.remember_at(&record("b"), now - chrono::Duration::seconds(20));
        // refreshing "a" makes "b" the oldest
        mirror.remember_at(&record("a"), now - chrono::Duration::seconds(10));
        mirror.remember_at(&record("c"), now);

        assert_eq!(mirror.len(), 2);
        assert!(mirror.snapshot_at("a", now).is_some());
        assert!(mirror.snapshot_at("b", now).is_none());
        assert!(mirror.snapshot_at("c", now).is_some());
    }

    #[tokio::test]
    async fn test_refresh_fills_and_clears_the_mirror() {
        let repo = InMemoryEntitlementRepo::with_records(vec![create_test_entitlement(|e| {
            e.user_id = "u1".into();
        })]);
        let mirror = SessionMirror::new();

        let found = mirror.refresh(&repo, "u1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(mirror.snapshot("u1").unwrap().entitlement.user_id, "u1");

        repo.remove("u1");
        assert!(mirror.refresh(&repo, "u1").await.unwrap().is_none());
        assert!(mirror.snapshot("u1").is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let repo = InMemoryEntitlementRepo::with_records(vec![create_test_entitlement(|e| {
            e.user_id = "u1".into();
            e.subscription_status = SubscriptionStatus::Trial;
        })]);
        let mirror = SessionMirror::new();
        mirror.refresh(&repo, "u1").await.unwrap();

        repo.fail_reads(true);
        assert!(mirror.refresh(&repo, "u1").await.is_err());
        assert_eq!(
            mirror.snapshot("u1").unwrap().entitlement.subscription_status,
            SubscriptionStatus::Trial
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_once_condition_is_observed() {
        let repo = std::sync::Arc::new(InMemoryEntitlementRepo::with_records(vec![
            create_test_entitlement(|e| e.user_id = "u1".into()),
        ]));
        let mirror = SessionMirror::new();
        let cancel = CancellationToken::new();

        let writer = repo.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            writer.set_status("u1", SubscriptionStatus::Active);
        });

        let outcome = mirror
            .poll_until(repo.as_ref(), "u1", Duration::from_secs(3), &cancel, |e| {
                e.subscription_status == SubscriptionStatus::Active
            })
            .await;

        match outcome {
            PollOutcome::Satisfied(e) => assert_eq!(e.subscription_status, SubscriptionStatus::Active),
            other => panic!("unexpected outcome: {:?}", other),
        }
        // the mirror saw the committed value
        assert_eq!(
            mirror.snapshot("u1").unwrap().entitlement.subscription_status,
            SubscriptionStatus::Active
        );
        // reads at t=0, 3, 6, 9
        assert_eq!(repo.read_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_when_cancelled() {
        let repo = InMemoryEntitlementRepo::with_records(vec![create_test_entitlement(|e| {
            e.user_id = "u1".into();
        })]);
        let mirror = SessionMirror::new();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let outcome = mirror
            .poll_until(&repo, "u1", Duration::from_secs(3), &cancel, |_| false)
            .await;
        assert_eq!(outcome, PollOutcome::Cancelled);
    }
}
