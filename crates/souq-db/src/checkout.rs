//! # Checkout
//!
//! Joins the engine to the ledger: read a balance snapshot, calculate,
//! then settle the resulting deltas atomically.
//!
//! ## User Workflow
//! ```text
//! Points slider ──► max_usable_points()   (slider upper bound)
//!      │
//!      ▼
//! "Preview"     ──► preview()             (no writes)
//!      │
//!      ▼
//! "Place order" ──► redeem()
//!                    ├── invalid  → DbError::Rejected(LoyaltyError)
//!                    ├── race     → DbError::InsufficientPoints
//!                    └── OK       → CheckoutOutcome { calculation, transaction }
//! ```

use serde::Serialize;
use souq_core::{
    LoyaltyCalculationRequest, LoyaltyCalculationResult, LoyaltyEngine, LoyaltyTransaction, Money,
};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// A settled checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub calculation: LoyaltyCalculationResult,
    /// Settled record; `current_balance` is the balance after this order.
    pub transaction: LoyaltyTransaction,
}

/// Checkout-time loyalty operations for one storefront.
#[derive(Debug, Clone)]
pub struct LoyaltyCheckout {
    db: Database,
    engine: LoyaltyEngine,
}

impl LoyaltyCheckout {
    pub fn new(db: Database, engine: LoyaltyEngine) -> Self {
        LoyaltyCheckout { db, engine }
    }

    pub fn engine(&self) -> &LoyaltyEngine {
        &self.engine
    }

    /// Calculates against the user's stored balance without writing.
    ///
    /// The shipping fee follows the free-shipping threshold.
    pub async fn preview(
        &self,
        user_id: &str,
        subtotal: Money,
        points_to_use: i64,
        use_points_for_shipping: bool,
    ) -> DbResult<LoyaltyCalculationResult> {
        let balance = self.db.accounts().get_balance(user_id).await?;
        let shipping_fee = self.engine.config().shipping_fee_for(subtotal);

        let request = LoyaltyCalculationRequest::new(subtotal, balance)
            .points_to_use(points_to_use)
            .use_points_for_shipping(use_points_for_shipping)
            .shipping_fee(shipping_fee);

        Ok(self.engine.calculate(&request))
    }

    /// Upper bound for the storefront's points slider.
    pub async fn max_usable_points(&self, user_id: &str, subtotal: Money) -> DbResult<i64> {
        let balance = self.db.accounts().get_balance(user_id).await?;
        Ok(self.engine.get_max_usable_points(subtotal, balance))
    }

    /// Calculates and settles the loyalty side of an order.
    pub async fn redeem(
        &self,
        user_id: &str,
        order_id: &str,
        subtotal: Money,
        points_to_use: i64,
        use_points_for_shipping: bool,
    ) -> DbResult<CheckoutOutcome> {
        let calculation = self
            .preview(user_id, subtotal, points_to_use, use_points_for_shipping)
            .await?;

        if let Some(err) = &calculation.error {
            return Err(DbError::Rejected(err.clone()));
        }

        let pending = self
            .engine
            .create_loyalty_transaction(user_id, order_id, &calculation, None);
        let transaction = self.db.ledger().settle(&pending).await?;

        info!(
            user_id = %user_id,
            order_id = %order_id,
            kind = %transaction.transaction_type,
            points_used = transaction.points_used,
            points_earned = transaction.points_earned,
            final_amount = %calculation.final_amount,
            "Loyalty checkout settled"
        );

        Ok(CheckoutOutcome {
            calculation,
            transaction,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::{file_db, remove_file_db};
    use crate::DbConfig;
    use souq_core::{LoyaltyError, TransactionType};

    async fn checkout() -> LoyaltyCheckout {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        LoyaltyCheckout::new(db, LoyaltyEngine::default())
    }

    fn egp(pounds: i64) -> Money {
        Money::from_pounds(pounds)
    }

    #[tokio::test]
    async fn test_preview_uses_stored_balance() {
        let checkout = checkout().await;
        checkout.db.accounts().credit("user-1", 1500).await.unwrap();

        let result = checkout.preview("user-1", egp(250), 400, true).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.points_discount, egp(8));
        assert_eq!(result.final_shipping_fee, Money::zero());
        assert_eq!(result.final_amount, egp(242));

        // Preview writes nothing
        assert_eq!(checkout.db.accounts().get_balance("user-1").await.unwrap(), 1500);
    }

    #[tokio::test]
    async fn test_preview_applies_free_shipping_threshold() {
        let checkout = checkout().await;
        let result = checkout.preview("user-1", egp(500), 0, false).await.unwrap();
        assert_eq!(result.final_shipping_fee, Money::zero());
        assert_eq!(result.final_amount, egp(500));
    }

    #[tokio::test]
    async fn test_redeem_settles_balance() {
        let checkout = checkout().await;
        checkout.db.accounts().credit("user-1", 1500).await.unwrap();

        let outcome = checkout
            .redeem("user-1", "order-1", egp(250), 400, true)
            .await
            .unwrap();

        assert_eq!(outcome.calculation.total_points_used, 1400);
        assert_eq!(outcome.transaction.transaction_type, TransactionType::Shipping);
        // 1500 - 1400 + 250 earned
        assert_eq!(outcome.transaction.current_balance, Some(350));
        assert_eq!(checkout.db.accounts().get_balance("user-1").await.unwrap(), 350);
    }

    #[tokio::test]
    async fn test_redeem_rejects_invalid_request() {
        let checkout = checkout().await;

        let err = checkout
            .redeem("user-1", "order-1", egp(100), 200, false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Rejected(LoyaltyError::InsufficientBalance {
                required: 200,
                available: 0
            })
        ));
        assert!(checkout
            .db
            .ledger()
            .get_for_order("user-1", "order-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_preview_settles_after_balance_spent() {
        let checkout = checkout().await;
        checkout.db.accounts().credit("user-1", 1000).await.unwrap();

        // Both tabs preview against the same snapshot
        let a = checkout.preview("user-1", egp(200), 800, false).await.unwrap();
        let b = checkout.preview("user-1", egp(200), 800, false).await.unwrap();
        assert!(a.is_valid && b.is_valid);

        let engine = checkout.engine();
        let tx_a = engine.create_loyalty_transaction("user-1", "order-a", &a, None);
        let tx_b = engine.create_loyalty_transaction("user-1", "order-b", &b, None);

        let settled = checkout.db.ledger().settle(&tx_a).await.unwrap();
        assert_eq!(settled.current_balance, Some(1000 - 800 + 200));

        let err = checkout.db.ledger().settle(&tx_b).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientPoints { required: 800, available: 400, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_redemptions_spend_balance_once() {
        let (db, path) = file_db().await;
        let checkout = LoyaltyCheckout::new(db.clone(), LoyaltyEngine::default());
        db.accounts().credit("user-1", 1000).await.unwrap();

        let (a, b) = tokio::join!(
            checkout.redeem("user-1", "order-a", egp(200), 800, false),
            checkout.redeem("user-1", "order-b", egp(200), 800, false),
        );

        let (won, lost) = match (a, b) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            (a, b) => panic!("expected exactly one settlement, got {a:?} and {b:?}"),
        };

        assert_eq!(won.transaction.current_balance, Some(400));
        // Lost at settlement, or at preview if the winner committed first
        assert!(matches!(
            lost,
            DbError::InsufficientPoints {
                required: 800,
                available: 400,
                ..
            } | DbError::Rejected(LoyaltyError::InsufficientBalance {
                required: 800,
                available: 400
            })
        ));
        assert_eq!(db.accounts().get_balance("user-1").await.unwrap(), 400);
        assert_eq!(db.ledger().history("user-1", 10).await.unwrap().len(), 1);

        remove_file_db(db, path).await;
    }

    #[tokio::test]
    async fn test_max_usable_points_from_balance() {
        let checkout = checkout().await;
        checkout.db.accounts().credit("user-1", 50_000).await.unwrap();

        assert_eq!(checkout.max_usable_points("user-1", egp(1000)).await.unwrap(), 5000);
        assert_eq!(checkout.max_usable_points("user-2", egp(1000)).await.unwrap(), 0);
    }
}
