//! # Loyalty Account Repository
//!
//! One row per customer holding the current points balance and lifetime
//! totals. Order settlement goes through [`LoyaltyLedgerRepository`]; this
//! repository only reads balances and applies manual credits.
//!
//! [`LoyaltyLedgerRepository`]: crate::repository::ledger::LoyaltyLedgerRepository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A customer's points account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub user_id: String,
    pub points_balance: i64,
    pub lifetime_earned: i64,
    pub lifetime_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for loyalty balances.
#[derive(Debug, Clone)]
pub struct LoyaltyAccountRepository {
    pool: SqlitePool,
}

impl LoyaltyAccountRepository {
    /// Creates a new LoyaltyAccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyAccountRepository { pool }
    }

    /// Gets an account by user ID.
    pub async fn get(&self, user_id: &str) -> DbResult<Option<LoyaltyAccount>> {
        let account = sqlx::query_as::<_, LoyaltyAccount>(
            r#"
            SELECT
                user_id, points_balance, lifetime_earned, lifetime_used,
                created_at, updated_at
            FROM loyalty_accounts
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Current balance snapshot; customers without an account have zero.
    pub async fn get_balance(&self, user_id: &str) -> DbResult<i64> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT points_balance FROM loyalty_accounts WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance.unwrap_or(0))
    }

    /// Creates an empty account if none exists and returns it.
    pub async fn ensure(&self, user_id: &str) -> DbResult<LoyaltyAccount> {
        if user_id.trim().is_empty() {
            return Err(DbError::InvalidInput("user_id is required".to_string()));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO loyalty_accounts (
                user_id, points_balance, lifetime_earned, lifetime_used,
                created_at, updated_at
            ) VALUES (?1, 0, 0, 0, ?2, ?2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("LoyaltyAccount", user_id))
    }

    /// Adds points outside of an order (welcome bonus, support goodwill).
    ///
    /// ## Returns
    /// The new balance.
    pub async fn credit(&self, user_id: &str, points: i64) -> DbResult<i64> {
        if points <= 0 {
            return Err(DbError::InvalidInput(format!(
                "credit must be positive, got {points}"
            )));
        }
        if user_id.trim().is_empty() {
            return Err(DbError::InvalidInput("user_id is required".to_string()));
        }

        debug!(user_id = %user_id, points, "Crediting loyalty points");

        let now = Utc::now();
        let balance: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loyalty_accounts (
                user_id, points_balance, lifetime_earned, lifetime_used,
                created_at, updated_at
            ) VALUES (?1, ?2, ?2, 0, ?3, ?3)
            ON CONFLICT (user_id) DO UPDATE SET
                points_balance = points_balance + excluded.points_balance,
                lifetime_earned = lifetime_earned + excluded.lifetime_earned,
                updated_at = excluded.updated_at
            RETURNING points_balance
            "#,
        )
        .bind(user_id)
        .bind(points)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Number of accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loyalty_accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
