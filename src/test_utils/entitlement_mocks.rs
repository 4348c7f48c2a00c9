//! In-memory entitlement store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        subscription_status::SubscriptionStatus,
        user_entitlement::{EntitlementUpdate, NewUserEntitlement, UserEntitlement, WriteOutcome},
    },
    use_cases::entitlement::EntitlementRepo,
};

/// In-memory implementation of `EntitlementRepo` with the same conditional
/// write rules as the Postgres adapter, plus failure switches.
#[derive(Default)]
pub struct InMemoryEntitlementRepo {
    pub records: Mutex<HashMap<String, UserEntitlement>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryEntitlementRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<UserEntitlement>) -> Self {
        let map = records.into_iter().map(|e| (e.user_id.clone(), e)).collect();
        Self {
            records: Mutex::new(map),
            ..Self::default()
        }
    }

    /// Direct read for assertions; not counted.
    pub fn get_sync(&self, user_id: &str) -> Option<UserEntitlement> {
        self.records.lock().unwrap().get(user_id).cloned()
    }

    pub fn remove(&self, user_id: &str) {
        self.records.lock().unwrap().remove(user_id);
    }

    /// Simulates another writer committing a status.
    pub fn set_status(&self, user_id: &str, status: SubscriptionStatus) {
        if let Some(e) = self.records.lock().unwrap().get_mut(user_id) {
            e.subscription_status = status;
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Writes that changed a record.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writes(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepo for InMemoryEntitlementRepo {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserEntitlement>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated read failure".into()));
        }
        Ok(self.get_sync(user_id))
    }

    async fn create(&self, input: &NewUserEntitlement, now: DateTime<Utc>) -> AppResult<UserEntitlement> {
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&input.user_id) {
            return Ok(existing.clone());
        }

        let record = UserEntitlement {
            user_id: input.user_id.clone(),
            email: input.email.clone(),
            full_name: input.full_name.clone(),
            address: input.address.clone(),
            whatsapp: input.whatsapp.clone(),
            subscription_status: SubscriptionStatus::None,
            trial_ends_at: None,
            access_until: None,
            preapproval_id: None,
            payment_id: None,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        };
        records.insert(record.user_id.clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn start_trial(
        &self,
        user_id: &str,
        trial_ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserEntitlement>> {
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(user_id) else {
            return Ok(None);
        };
        if record.subscription_status != SubscriptionStatus::None || record.trial_used() {
            return Ok(None);
        }

        record.subscription_status = SubscriptionStatus::Trial;
        record.trial_ends_at = Some(trial_ends_at);
        record.updated_at = now;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(record.clone()))
    }

    async fn apply_update(&self, user_id: &str, update: &EntitlementUpdate) -> AppResult<WriteOutcome> {
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(user_id) else {
            return Ok(WriteOutcome::UnknownUser);
        };
        if !update.supersedes(record) {
            return Ok(WriteOutcome::Stale);
        }

        update.apply_to(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(WriteOutcome::Applied)
    }
}
