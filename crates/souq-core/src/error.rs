//! # Error Types
//!
//! Domain-specific error types for souq-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  souq-core errors (this file)                                          │
//! │  ├── LoyaltyError  - Redemption rejected by a business rule            │
//! │  └── ConfigError   - Invalid loyalty program configuration             │
//! │                                                                         │
//! │  souq-db errors (separate crate)                                       │
//! │  └── DbError       - Ledger failures, wraps LoyaltyError as Rejected   │
//! │                                                                         │
//! │  Flow: LoyaltyError → result.error (preview) | DbError (settle)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `LoyaltyError` is data, not a failure of the engine: the calculation
//! still returns a full result with `is_valid = false` and this error
//! attached. Only the ledger turns it into an `Err`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

// =============================================================================
// Loyalty Error
// =============================================================================

/// A redemption request that breaks one of the loyalty rules.
///
/// Checked in declaration order; the first failing rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoyaltyError {
    /// Subtotal is zero or negative.
    #[error("order amount must be greater than zero")]
    InvalidAmount,

    /// Requested points are negative.
    #[error("points used cannot be negative")]
    NegativePoints,

    /// Requested points are not a whole number of redemption steps.
    ///
    /// ## User Workflow
    /// ```text
    /// Points slider: 150
    ///      │
    ///      ▼
    /// NotMultipleOfMinimum { minimum: 200 }
    ///      │
    ///      ▼
    /// UI shows: "points must be a multiple of 200"
    /// ```
    #[error("points must be a multiple of {minimum}")]
    NotMultipleOfMinimum { minimum: i64 },

    /// Discount points plus free-shipping points exceed the balance.
    #[error("insufficient points: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Discount would exceed the allowed share of the subtotal.
    #[error("points discount cannot exceed {max_percentage}% of the order amount")]
    DiscountCapExceeded { max_percentage: u32 },
}

impl LoyaltyError {
    /// Stable machine-readable code for the storefront.
    pub fn code(&self) -> &'static str {
        match self {
            LoyaltyError::InvalidAmount => "INVALID_AMOUNT",
            LoyaltyError::NegativePoints | LoyaltyError::NotMultipleOfMinimum { .. } => {
                "INVALID_POINTS_VALUE"
            }
            LoyaltyError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LoyaltyError::DiscountCapExceeded { .. } => "DISCOUNT_CAP_EXCEEDED",
        }
    }
}

/// Serialized as `{ "code": "...", "message": "..." }` so the storefront can
/// branch on `code` and show `message` directly.
impl Serialize for LoyaltyError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LoyaltyError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

// =============================================================================
// Config Error
// =============================================================================

/// Loyalty program configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable is set but does not parse.
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    /// Value parses but breaks a program rule.
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn out_of_range(field: &str, reason: &str) -> Self {
        ConfigError::OutOfRange {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LoyaltyError::InsufficientBalance {
            required: 200,
            available: 150,
        };
        assert_eq!(err.to_string(), "insufficient points: need 200, have 150");

        let err = LoyaltyError::NotMultipleOfMinimum { minimum: 200 };
        assert_eq!(err.to_string(), "points must be a multiple of 200");

        let err = LoyaltyError::DiscountCapExceeded { max_percentage: 10 };
        assert_eq!(
            err.to_string(),
            "points discount cannot exceed 10% of the order amount"
        );
    }

    #[test]
    fn test_codes_group_points_errors() {
        assert_eq!(LoyaltyError::NegativePoints.code(), "INVALID_POINTS_VALUE");
        assert_eq!(
            LoyaltyError::NotMultipleOfMinimum { minimum: 200 }.code(),
            "INVALID_POINTS_VALUE"
        );
        assert_eq!(LoyaltyError::InvalidAmount.code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_serializes_code_and_message() {
        let json = serde_json::to_value(LoyaltyError::InvalidAmount).unwrap();
        assert_eq!(json["code"], "INVALID_AMOUNT");
        assert_eq!(json["message"], "order amount must be greater than zero");
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::out_of_range("max_points_percentage", "must be at most 100");
        assert_eq!(
            err.to_string(),
            "max_points_percentage is out of range: must be at most 100"
        );
    }
}
