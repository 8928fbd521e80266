//! # Domain Types
//!
//! Value types passed between the storefront, the loyalty engine and the
//! points ledger. None of them are persisted by this crate.
//!
//! ## Type Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  LoyaltyCalculationRequest ──► LoyaltyEngine ──► LoyaltyCalculationResult│
//! │  (subtotal, points, balance)                     (discount, fees, points)│
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                   create_loyalty_transaction(...)       │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                    LoyaltyTransaction ──► souq-db       │
//! │                                    (current_balance filled by ledger)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::LoyaltyError;
use crate::money::Money;

// =============================================================================
// Calculation Request
// =============================================================================

/// A proposed redemption for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCalculationRequest {
    /// Order subtotal before shipping.
    pub subtotal: Money,

    /// Points the customer wants to spend on a discount.
    pub points_to_use: i64,

    /// Whether to spend points to waive shipping.
    pub use_points_for_shipping: bool,

    /// Balance snapshot supplied by the caller.
    pub current_user_points: i64,

    /// Shipping fee for this order; `None` uses the configured fee.
    #[serde(default)]
    pub shipping_fee: Option<Money>,
}

impl LoyaltyCalculationRequest {
    /// Request with no points spent.
    pub fn new(subtotal: Money, current_user_points: i64) -> Self {
        LoyaltyCalculationRequest {
            subtotal,
            points_to_use: 0,
            use_points_for_shipping: false,
            current_user_points,
            shipping_fee: None,
        }
    }

    pub fn points_to_use(mut self, points: i64) -> Self {
        self.points_to_use = points;
        self
    }

    pub fn use_points_for_shipping(mut self, enabled: bool) -> Self {
        self.use_points_for_shipping = enabled;
        self
    }

    pub fn shipping_fee(mut self, fee: Money) -> Self {
        self.shipping_fee = Some(fee);
        self
    }
}

// =============================================================================
// Calculation Result
// =============================================================================

/// Monetary figures of a calculation, kept together for receipts and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyBreakdown {
    pub subtotal: Money,
    /// Shipping fee before any waiver.
    pub shipping_fee: Money,
    pub points_discount: Money,
    /// Shipping waived by points (zero or the full fee).
    pub shipping_discount: Money,
    pub final_amount: Money,
}

/// Outcome of a loyalty calculation.
///
/// Callers must check `is_valid` before trusting any other field. An invalid
/// result carries the safe defaults: no discount, shipping unchanged, no
/// points earned or spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyCalculationResult {
    pub points_discount: Money,
    pub final_shipping_fee: Money,
    pub final_amount: Money,
    pub points_earned: i64,
    /// Discount points plus shipping points.
    pub total_points_used: i64,
    pub shipping_points_used: i64,
    pub is_valid: bool,
    #[ts(type = "{ code: string, message: string } | null")]
    pub error: Option<LoyaltyError>,
    pub breakdown: LoyaltyBreakdown,
}

impl LoyaltyCalculationResult {
    /// Points spent on the discount alone.
    #[inline]
    pub fn discount_points_used(&self) -> i64 {
        self.total_points_used - self.shipping_points_used
    }

    /// Net change this order makes to the customer's balance.
    #[inline]
    pub fn points_delta(&self) -> i64 {
        self.points_earned - self.total_points_used
    }

    /// Whether the shipping fee was waived with points.
    #[inline]
    pub fn shipping_waived(&self) -> bool {
        self.shipping_points_used > 0
    }
}

// =============================================================================
// Transaction Type
// =============================================================================

/// Kind of loyalty movement recorded for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Points earned, none spent.
    Earn,
    /// Points spent on a discount.
    Redeem,
    /// Points spent to waive shipping (possibly with a discount too).
    Shipping,
}

impl TransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Earn => "earn",
            TransactionType::Redeem => "redeem",
            TransactionType::Shipping => "shipping",
        }
    }

    /// Picks the type that describes a calculation result.
    pub fn infer(result: &LoyaltyCalculationResult) -> Self {
        if result.shipping_points_used > 0 {
            TransactionType::Shipping
        } else if result.total_points_used > 0 {
            TransactionType::Redeem
        } else {
            TransactionType::Earn
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earn" => Ok(TransactionType::Earn),
            "redeem" => Ok(TransactionType::Redeem),
            "shipping" => Ok(TransactionType::Shipping),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

// =============================================================================
// Loyalty Transaction
// =============================================================================

/// Audit record of the points an order moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTransaction {
    pub user_id: String,
    pub order_id: String,
    pub points_used: i64,
    pub points_earned: i64,
    /// Balance after this transaction; set by the ledger when settled.
    pub current_balance: Option<i64>,
    pub transaction_type: TransactionType,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl LoyaltyTransaction {
    /// Net change to the balance.
    #[inline]
    pub fn points_delta(&self) -> i64 {
        self.points_earned - self.points_used
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(total_used: i64, shipping_used: i64) -> LoyaltyCalculationResult {
        LoyaltyCalculationResult {
            points_discount: Money::zero(),
            final_shipping_fee: Money::zero(),
            final_amount: Money::zero(),
            points_earned: 100,
            total_points_used: total_used,
            shipping_points_used: shipping_used,
            is_valid: true,
            error: None,
            breakdown: LoyaltyBreakdown {
                subtotal: Money::zero(),
                shipping_fee: Money::zero(),
                points_discount: Money::zero(),
                shipping_discount: Money::zero(),
                final_amount: Money::zero(),
            },
        }
    }

    #[test]
    fn test_infer_transaction_type() {
        assert_eq!(TransactionType::infer(&result_with(0, 0)), TransactionType::Earn);
        assert_eq!(TransactionType::infer(&result_with(400, 0)), TransactionType::Redeem);
        assert_eq!(
            TransactionType::infer(&result_with(1400, 1000)),
            TransactionType::Shipping
        );
    }

    #[test]
    fn test_transaction_type_round_trips_as_str() {
        for kind in [
            TransactionType::Earn,
            TransactionType::Redeem,
            TransactionType::Shipping,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionType>(), Ok(kind));
        }
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_result_helpers() {
        let result = result_with(1400, 1000);
        assert_eq!(result.discount_points_used(), 400);
        assert_eq!(result.points_delta(), 100 - 1400);
        assert!(result.shipping_waived());
    }

    #[test]
    fn test_request_deserializes_without_shipping_fee() {
        let request: LoyaltyCalculationRequest = serde_json::from_str(
            r#"{"subtotal":50000,"pointsToUse":400,"usePointsForShipping":true,"currentUserPoints":1500}"#,
        )
        .unwrap();
        assert_eq!(request.subtotal, Money::from_pounds(500));
        assert_eq!(request.shipping_fee, None);
        assert!(request.use_points_for_shipping);
    }

    #[test]
    fn test_request_builder() {
        let request = LoyaltyCalculationRequest::new(Money::from_pounds(100), 5000)
            .points_to_use(200)
            .use_points_for_shipping(true)
            .shipping_fee(Money::from_pounds(15));
        assert_eq!(request.points_to_use, 200);
        assert_eq!(request.shipping_fee, Some(Money::from_pounds(15)));
    }

    #[test]
    fn test_transaction_serializes_lowercase_type() {
        let tx = LoyaltyTransaction {
            user_id: "u1".to_string(),
            order_id: "o1".to_string(),
            points_used: 400,
            points_earned: 500,
            current_balance: None,
            transaction_type: TransactionType::Redeem,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transactionType"], "redeem");
        assert_eq!(json["pointsUsed"], 400);
        assert_eq!(tx.points_delta(), 100);
    }
}
