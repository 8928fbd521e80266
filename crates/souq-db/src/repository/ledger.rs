//! # Loyalty Ledger Repository
//!
//! Settles loyalty transactions against customer balances.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE                     ← queues behind other settlements  │
//! │    ensure account row exists                                           │
//! │    UPDATE balance = balance - used + earned                            │
//! │      WHERE balance >= used           ← no row? another order won       │
//! │      RETURNING balance                                                 │
//! │    INSERT transaction (current_balance = new balance)                  │
//! │      UNIQUE (user_id, order_id)      ← order already settled           │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine computed the deltas from a balance snapshot; the conditional
//! update re-checks that snapshot inside the write, so two checkouts racing
//! on the same balance cannot both spend it.

use chrono::{DateTime, Utc};
use souq_core::{LoyaltyTransaction, TransactionType};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::WriteTransaction;

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    user_id: String,
    order_id: String,
    transaction_type: TransactionType,
    points_used: i64,
    points_earned: i64,
    current_balance: i64,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for LoyaltyTransaction {
    fn from(row: TransactionRow) -> Self {
        LoyaltyTransaction {
            user_id: row.user_id,
            order_id: row.order_id,
            points_used: row.points_used,
            points_earned: row.points_earned,
            current_balance: Some(row.current_balance),
            transaction_type: row.transaction_type,
            timestamp: row.created_at,
        }
    }
}

/// Repository for the loyalty transaction log.
#[derive(Debug, Clone)]
pub struct LoyaltyLedgerRepository {
    pool: SqlitePool,
}

impl LoyaltyLedgerRepository {
    /// Creates a new LoyaltyLedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyLedgerRepository { pool }
    }

    /// Applies a transaction's point deltas and records it.
    ///
    /// ## Returns
    /// The transaction with `current_balance` set to the balance after
    /// settlement.
    ///
    /// ## Errors
    /// - `InsufficientPoints` if the balance no longer covers `points_used`
    /// - `UniqueViolation` if this order was already settled for the user
    /// - `InvalidInput` for negative point counts or empty IDs
    ///
    /// Nothing is written when an error is returned.
    pub async fn settle(&self, transaction: &LoyaltyTransaction) -> DbResult<LoyaltyTransaction> {
        validate_transaction(transaction)?;

        debug!(
            user_id = %transaction.user_id,
            order_id = %transaction.order_id,
            kind = %transaction.transaction_type,
            points_used = transaction.points_used,
            points_earned = transaction.points_earned,
            "Settling loyalty transaction"
        );

        let mut write = WriteTransaction::begin(&self.pool).await?;
        let outcome = apply_settlement(write.conn()?, transaction).await;

        match outcome {
            Ok(current_balance) => {
                write.commit().await?;
                Ok(LoyaltyTransaction {
                    current_balance: Some(current_balance),
                    ..transaction.clone()
                })
            }
            Err(err) => {
                write.rollback().await;
                Err(err)
            }
        }
    }

    /// Most recent transactions for a user, newest first.
    pub async fn history(&self, user_id: &str, limit: i64) -> DbResult<Vec<LoyaltyTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                user_id, order_id, transaction_type,
                points_used, points_earned, current_balance, created_at
            FROM loyalty_transactions
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LoyaltyTransaction::from).collect())
    }

    /// The settled transaction for one order, if any.
    pub async fn get_for_order(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> DbResult<Option<LoyaltyTransaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                user_id, order_id, transaction_type,
                points_used, points_earned, current_balance, created_at
            FROM loyalty_transactions
            WHERE user_id = ?1 AND order_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LoyaltyTransaction::from))
    }
}

/// Runs inside the caller's write transaction; returns the new balance.
async fn apply_settlement(
    conn: &mut SqliteConnection,
    transaction: &LoyaltyTransaction,
) -> DbResult<i64> {
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
    .bind(&transaction.user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE loyalty_accounts SET
            points_balance = points_balance - ?2 + ?3,
            lifetime_used = lifetime_used + ?2,
            lifetime_earned = lifetime_earned + ?3,
            updated_at = ?4
        WHERE user_id = ?1 AND points_balance >= ?2
        RETURNING points_balance
        "#,
    )
    .bind(&transaction.user_id)
    .bind(transaction.points_used)
    .bind(transaction.points_earned)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(current_balance) = new_balance else {
        let available: i64 =
            sqlx::query_scalar("SELECT points_balance FROM loyalty_accounts WHERE user_id = ?1")
                .bind(&transaction.user_id)
                .fetch_one(&mut *conn)
                .await?;

        warn!(
            user_id = %transaction.user_id,
            order_id = %transaction.order_id,
            required = transaction.points_used,
            available,
            "Balance changed before settlement"
        );

        return Err(DbError::InsufficientPoints {
            user_id: transaction.user_id.clone(),
            required: transaction.points_used,
            available,
        });
    };

    sqlx::query(
        r#"
        INSERT INTO loyalty_transactions (
            id, user_id, order_id, transaction_type,
            points_used, points_earned, current_balance, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&transaction.user_id)
    .bind(&transaction.order_id)
    .bind(transaction.transaction_type)
    .bind(transaction.points_used)
    .bind(transaction.points_earned)
    .bind(current_balance)
    .bind(transaction.timestamp)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("order_id", transaction.order_id.as_str())
        }
        other => other,
    })?;

    Ok(current_balance)
}

fn validate_transaction(transaction: &LoyaltyTransaction) -> DbResult<()> {
    if transaction.user_id.trim().is_empty() {
        return Err(DbError::InvalidInput("user_id is required".to_string()));
    }
    if transaction.order_id.trim().is_empty() {
        return Err(DbError::InvalidInput("order_id is required".to_string()));
    }
    if transaction.points_used < 0 || transaction.points_earned < 0 {
        return Err(DbError::InvalidInput(
            "point counts must not be negative".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
