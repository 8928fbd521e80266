//! # Validation Module
//!
//! Redemption rules checked before any discount is applied.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront                                                   │
//! │  └── Points slider bounded by get_max_usable_points()                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── validate_inputs(): amount, sign, step, balance, cap               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine shipping check                                        │
//! │  └── Re-checks balance against the points actually charged             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Ledger (souq-db)                                             │
//! │  └── Conditional UPDATE ... WHERE points_balance >= used               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::config::LoyaltyConfig;
use crate::error::LoyaltyError;
use crate::loyalty::{discount_for_points, exceeds_discount_cap};
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, LoyaltyError>;

/// Checks a redemption request against the loyalty rules.
///
/// ## Rules (first failure wins)
/// 1. Subtotal must be positive
/// 2. Points must not be negative
/// 3. Non-zero points must be a multiple of `min_points_use`
/// 4. Points (plus shipping cost, if requested) must fit the balance
/// 5. The implied discount must fit under the percentage cap
///
/// ## Example
/// ```rust
/// use souq_core::config::LoyaltyConfig;
/// use souq_core::money::Money;
/// use souq_core::validation::validate_inputs;
///
/// let config = LoyaltyConfig::default();
/// assert!(validate_inputs(&config, Money::from_pounds(500), 400, 1500, true).is_ok());
/// assert!(validate_inputs(&config, Money::from_pounds(500), 150, 1500, false).is_err());
/// ```
pub fn validate_inputs(
    config: &LoyaltyConfig,
    subtotal: Money,
    points_to_use: i64,
    current_user_points: i64,
    use_points_for_shipping: bool,
) -> ValidationResult<()> {
    let outcome = check_rules(
        config,
        subtotal,
        points_to_use,
        current_user_points,
        use_points_for_shipping,
    );

    if let Err(ref err) = outcome {
        debug!(
            code = err.code(),
            subtotal = %subtotal,
            points_to_use,
            current_user_points,
            use_points_for_shipping,
            "Redemption rejected"
        );
    }

    outcome
}

fn check_rules(
    config: &LoyaltyConfig,
    subtotal: Money,
    points_to_use: i64,
    current_user_points: i64,
    use_points_for_shipping: bool,
) -> ValidationResult<()> {
    if !subtotal.is_positive() {
        return Err(LoyaltyError::InvalidAmount);
    }

    if points_to_use < 0 {
        return Err(LoyaltyError::NegativePoints);
    }

    if points_to_use > 0 && points_to_use.checked_rem(config.min_points_use) != Some(0) {
        return Err(LoyaltyError::NotMultipleOfMinimum {
            minimum: config.min_points_use,
        });
    }

    let shipping_points = if use_points_for_shipping {
        config.shipping_points_cost
    } else {
        0
    };
    // A sum past i64::MAX is more than any balance can hold
    match points_to_use.checked_add(shipping_points) {
        Some(required) if required <= current_user_points => {}
        required => {
            return Err(LoyaltyError::InsufficientBalance {
                required: required.unwrap_or(i64::MAX),
                available: current_user_points,
            });
        }
    }

    let requested_discount = discount_for_points(config, points_to_use);
    if exceeds_discount_cap(config, subtotal, requested_discount) {
        return Err(LoyaltyError::DiscountCapExceeded {
            max_percentage: config.max_points_percentage,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(subtotal: i64, points: i64, balance: i64, shipping: bool) -> ValidationResult<()> {
        validate_inputs(
            &LoyaltyConfig::default(),
            Money::from_pounds(subtotal),
            points,
            balance,
            shipping,
        )
    }

    #[test]
    fn test_accepts_valid_request() {
        assert!(validate(500, 400, 1500, true).is_ok());
        assert!(validate(500, 0, 0, false).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_subtotal() {
        assert_eq!(validate(0, 0, 100, false), Err(LoyaltyError::InvalidAmount));
        assert_eq!(validate(-10, 0, 100, false), Err(LoyaltyError::InvalidAmount));
    }

    #[test]
    fn test_rejects_negative_points() {
        assert_eq!(validate(100, -200, 1000, false), Err(LoyaltyError::NegativePoints));
    }

    #[test]
    fn test_rejects_points_off_the_step() {
        assert_eq!(
            validate(10000, 150, 10000, false),
            Err(LoyaltyError::NotMultipleOfMinimum { minimum: 200 })
        );
        assert_eq!(
            validate(10000, 250, 10000, false),
            Err(LoyaltyError::NotMultipleOfMinimum { minimum: 200 })
        );
    }

    #[test]
    fn test_balance_includes_shipping_cost() {
        assert_eq!(
            validate(100, 200, 150, false),
            Err(LoyaltyError::InsufficientBalance {
                required: 200,
                available: 150
            })
        );
        assert_eq!(
            validate(500, 400, 1399, true),
            Err(LoyaltyError::InsufficientBalance {
                required: 1400,
                available: 1399
            })
        );
        assert!(validate(500, 400, 1400, true).is_ok());
    }

    #[test]
    fn test_rejects_discount_over_cap() {
        // 400 points = 8 EGP, 10% of 50 EGP = 5 EGP
        assert_eq!(
            validate(50, 400, 1000, false),
            Err(LoyaltyError::DiscountCapExceeded { max_percentage: 10 })
        );
        // Exactly on the cap: 40 EGP subtotal allows 4 EGP
        assert!(validate(40, 200, 1000, false).is_ok());
    }

    #[test]
    fn test_huge_points_with_shipping_is_insufficient() {
        // 9_223_372_036_854_775_800 is a multiple of 200; adding shipping overflows
        let points = 9_223_372_036_854_775_800;
        assert_eq!(
            validate(100, points, 5000, true),
            Err(LoyaltyError::InsufficientBalance {
                required: i64::MAX,
                available: 5000
            })
        );
        assert_eq!(
            validate(100, points, i64::MAX, true),
            Err(LoyaltyError::InsufficientBalance {
                required: i64::MAX,
                available: i64::MAX
            })
        );
    }

    #[test]
    fn test_huge_points_exceed_cap() {
        let config = LoyaltyConfig::default();
        assert_eq!(
            validate_inputs(
                &config,
                Money::from_piasters(i64::MAX / 2),
                9_223_372_036_854_775_800,
                i64::MAX,
                false
            ),
            Err(LoyaltyError::DiscountCapExceeded { max_percentage: 10 })
        );
    }

    #[test]
    fn test_zero_step_config_rejects_instead_of_panicking() {
        let config = LoyaltyConfig {
            min_points_use: 0,
            ..LoyaltyConfig::default()
        };
        assert_eq!(
            validate_inputs(&config, Money::from_pounds(100), 200, 1000, false),
            Err(LoyaltyError::NotMultipleOfMinimum { minimum: 0 })
        );
        assert!(validate_inputs(&config, Money::from_pounds(100), 0, 1000, false).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        // Off-step and insufficient: the step rule is checked first
        assert_eq!(
            validate(100, 150, 0, false),
            Err(LoyaltyError::NotMultipleOfMinimum { minimum: 200 })
        );
        // Insufficient and over cap: balance is checked first
        assert!(matches!(
            validate(10, 2000, 0, false),
            Err(LoyaltyError::InsufficientBalance { .. })
        ));
    }
}
