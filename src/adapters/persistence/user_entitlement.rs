use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::user_entitlement::{
        AccessWindow, EntitlementUpdate, NewUserEntitlement, UserEntitlement, WriteOutcome,
    },
    use_cases::entitlement::EntitlementRepo,
};

fn row_to_entitlement(row: &sqlx::postgres::PgRow) -> UserEntitlement {
    UserEntitlement {
        user_id: row.get("user_id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        address: row.get("address"),
        whatsapp: row.get("whatsapp"),
        subscription_status: row.get("subscription_status"),
        trial_ends_at: row.get("trial_ends_at"),
        access_until: row.get("access_until"),
        preapproval_id: row.get("preapproval_id"),
        payment_id: row.get("payment_id"),
        last_event_at: row.get("last_event_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    user_id, email, full_name, address, whatsapp, subscription_status,
    trial_ends_at, access_until, preapproval_id, payment_id, last_event_at,
    created_at, updated_at
"#;

#[async_trait]
impl EntitlementRepo for PostgresPersistence {
    async fn get(&self, user_id: &str) -> AppResult<Option<UserEntitlement>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_entitlements WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_entitlement))
    }

    async fn create(&self, input: &NewUserEntitlement, now: DateTime<Utc>) -> AppResult<UserEntitlement> {
        // a repeated signup keeps the stored record as is
        sqlx::query(
            r#"
            INSERT INTO user_entitlements
                (user_id, email, full_name, address, whatsapp, subscription_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'none', $6, $6)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&input.user_id)
        .bind(&input.email)
        .bind(&input.full_name)
        .bind(&input.address)
        .bind(&input.whatsapp)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM user_entitlements WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(&input.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_entitlement(&row))
    }

    async fn start_trial(
        &self,
        user_id: &str,
        trial_ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserEntitlement>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE user_entitlements
            SET subscription_status = 'trial', trial_ends_at = $2, updated_at = $3
            WHERE user_id = $1 AND subscription_status = 'none' AND trial_ends_at IS NULL
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(trial_ends_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_entitlement))
    }

    async fn apply_update(&self, user_id: &str, update: &EntitlementUpdate) -> AppResult<WriteOutcome> {
        let (clear_access, access_until) = match update.access_until {
            AccessWindow::Keep => (false, None),
            AccessWindow::Until(until) => (false, Some(until)),
            AccessWindow::Clear => (true, None),
        };

        // Single statement: the ordering check and the write cannot interleave
        // with another notification for the same user.
        let result = sqlx::query(
            r#"
            UPDATE user_entitlements
            SET subscription_status = $2,
                preapproval_id = COALESCE($3, preapproval_id),
                payment_id = COALESCE($4, payment_id),
                access_until = CASE WHEN $5 THEN NULL ELSE COALESCE($6, access_until) END,
                last_event_at = $7,
                updated_at = $8
            WHERE user_id = $1
              AND (last_event_at IS NULL OR last_event_at <= $7)
            "#,
        )
        .bind(user_id)
        .bind(update.subscription_status)
        .bind(&update.preapproval_id)
        .bind(&update.payment_id)
        .bind(clear_access)
        .bind(access_until)
        .bind(update.event_at)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() > 0 {
            return Ok(WriteOutcome::Applied);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_entitlements WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(if exists {
            WriteOutcome::Stale
        } else {
            WriteOutcome::UnknownUser
        })
    }
}
