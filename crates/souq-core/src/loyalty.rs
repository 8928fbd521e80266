//! # Loyalty Engine
//!
//! Turns a proposed redemption into a validated checkout breakdown.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_inputs ──✗──► rejected result (no discount, fee unchanged)   │
//! │       │ ✓                                                               │
//! │       ▼                                                                 │
//! │  raw discount = floor(points / 200) × 4 EGP                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  final discount = min(raw, 10% of subtotal)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  points charged = re-derived from the FINAL discount                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  shipping waiver if balance ≥ points charged + 1000                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  final amount = max(0, subtotal + shipping − discount)                 │
//! │  points earned = floor(subtotal) × 1                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation is a pure function of its arguments and the engine's
//! immutable config, so one engine can serve any number of concurrent
//! checkouts. Applying the resulting point deltas to a stored balance is the
//! ledger's job (`souq-db`).

use chrono::Utc;
use tracing::{debug, info};

use crate::config::LoyaltyConfig;
use crate::error::{ConfigError, LoyaltyError};
use crate::money::{saturate, Money, PIASTERS_PER_POUND};
use crate::types::{
    LoyaltyBreakdown, LoyaltyCalculationRequest, LoyaltyCalculationResult, LoyaltyTransaction,
    TransactionType,
};
use crate::validation::validate_inputs;

// =============================================================================
// Shared Rules
// =============================================================================
// Validation and calculation both price points through these helpers so the
// two can never disagree about what a discount is worth.

/// Discount unlocked by `points`: whole ratio groups only.
///
/// Zero for a config with no usable ratio.
pub fn discount_for_points(config: &LoyaltyConfig, points: i64) -> Money {
    if points <= 0 || config.points_to_currency_ratio <= 0 {
        return Money::zero();
    }
    config.discount_per_ratio * (points / config.points_to_currency_ratio)
}

/// Largest discount allowed on `subtotal`, floored to a piaster.
pub fn max_allowed_discount(config: &LoyaltyConfig, subtotal: Money) -> Money {
    subtotal.percentage_floor(config.max_points_percentage)
}

/// Whether `discount` is above the percentage cap for `subtotal`.
pub fn exceeds_discount_cap(config: &LoyaltyConfig, subtotal: Money, discount: Money) -> bool {
    discount.exceeds_percentage_of(subtotal, config.max_points_percentage)
}

/// Points charged for an applied discount (floor).
fn points_for_applied_discount(config: &LoyaltyConfig, discount: Money) -> i64 {
    if !discount.is_positive() {
        return 0;
    }
    let scaled = discount.piasters() as i128 * config.points_to_currency_ratio as i128;
    saturate(scaled / config.discount_per_ratio.piasters() as i128)
}

/// Points earned on the gross subtotal, whole pounds only.
fn points_earned_for(config: &LoyaltyConfig, subtotal: Money) -> i64 {
    let scaled = subtotal.piasters() as i128 * config.points_per_currency_unit as i128;
    saturate(scaled.div_euclid(PIASTERS_PER_POUND as i128))
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless loyalty calculator.
///
/// Only holds validated configs, so its divisions never see a zero.
/// `Default` uses the built-in program rules.
#[derive(Debug, Clone, Default)]
pub struct LoyaltyEngine {
    config: LoyaltyConfig,
}

impl LoyaltyEngine {
    /// Creates an engine after checking `config`.
    ///
    /// ## Errors
    /// `ConfigError::OutOfRange` when a ratio, step or fee is unusable,
    /// e.g. `min_points_use` of zero.
    pub fn new(config: LoyaltyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            ratio = config.points_to_currency_ratio,
            discount_per_ratio = %config.discount_per_ratio,
            shipping_points_cost = config.shipping_points_cost,
            max_points_percentage = config.max_points_percentage,
            "Loyalty engine initialized"
        );
        Ok(LoyaltyEngine { config })
    }

    pub fn config(&self) -> &LoyaltyConfig {
        &self.config
    }

    /// Checks a redemption without computing anything else.
    ///
    /// See [`validate_inputs`] for the rule order.
    pub fn validate_inputs(
        &self,
        subtotal: Money,
        points_to_use: i64,
        current_user_points: i64,
        use_points_for_shipping: bool,
    ) -> Result<(), LoyaltyError> {
        validate_inputs(
            &self.config,
            subtotal,
            points_to_use,
            current_user_points,
            use_points_for_shipping,
        )
    }

    /// Computes the checkout breakdown for a redemption.
    ///
    /// `shipping_fee` of `None` uses the configured fee. Rule violations are
    /// reported through `is_valid` / `error`; this never panics on them.
    ///
    /// ## Example
    /// ```rust
    /// use souq_core::{LoyaltyEngine, Money};
    ///
    /// let engine = LoyaltyEngine::default();
    /// let result = engine.calculate_loyalty_points(
    ///     Money::from_pounds(500),
    ///     400,
    ///     true,
    ///     1500,
    ///     Some(Money::from_pounds(20)),
    /// );
    ///
    /// assert!(result.is_valid);
    /// assert_eq!(result.points_discount, Money::from_pounds(8));
    /// assert_eq!(result.final_shipping_fee, Money::zero());
    /// assert_eq!(result.final_amount, Money::from_pounds(492));
    /// assert_eq!(result.total_points_used, 1400);
    /// ```
    pub fn calculate_loyalty_points(
        &self,
        subtotal: Money,
        points_to_use: i64,
        use_points_for_shipping: bool,
        current_user_points: i64,
        shipping_fee: Option<Money>,
    ) -> LoyaltyCalculationResult {
        self.calculate(&LoyaltyCalculationRequest {
            subtotal,
            points_to_use,
            use_points_for_shipping,
            current_user_points,
            shipping_fee,
        })
    }

    /// Same as [`calculate_loyalty_points`](Self::calculate_loyalty_points),
    /// taking a request value.
    pub fn calculate(&self, request: &LoyaltyCalculationRequest) -> LoyaltyCalculationResult {
        let config = &self.config;
        let subtotal = request.subtotal;
        let shipping_fee = request.shipping_fee.unwrap_or(config.shipping_fee);

        if let Err(err) = self.validate_inputs(
            subtotal,
            request.points_to_use,
            request.current_user_points,
            request.use_points_for_shipping,
        ) {
            return rejected(subtotal, shipping_fee, err);
        }

        let raw_discount = discount_for_points(config, request.points_to_use);
        let final_discount = raw_discount.min(max_allowed_discount(config, subtotal));

        // Charge only for the discount actually applied
        let actual_points_used = points_for_applied_discount(config, final_discount);

        let waive_shipping = request.use_points_for_shipping
            && request.current_user_points
                >= actual_points_used.saturating_add(config.shipping_points_cost);
        let (final_shipping_fee, shipping_points_used) = if waive_shipping {
            (Money::zero(), config.shipping_points_cost)
        } else {
            (shipping_fee, 0)
        };

        if request.use_points_for_shipping && !waive_shipping {
            debug!(
                current_user_points = request.current_user_points,
                actual_points_used, "Shipping waiver declined"
            );
        }

        let final_amount = (subtotal + final_shipping_fee - final_discount).clamp_non_negative();
        let points_earned = points_earned_for(config, subtotal);
        let total_points_used = actual_points_used.saturating_add(shipping_points_used);

        debug!(
            subtotal = %subtotal,
            discount = %final_discount,
            final_amount = %final_amount,
            points_earned,
            total_points_used,
            "Loyalty calculation complete"
        );

        LoyaltyCalculationResult {
            points_discount: final_discount,
            final_shipping_fee,
            final_amount,
            points_earned,
            total_points_used,
            shipping_points_used,
            is_valid: true,
            error: None,
            breakdown: LoyaltyBreakdown {
                subtotal,
                shipping_fee,
                points_discount: final_discount,
                shipping_discount: shipping_fee - final_shipping_fee,
                final_amount,
            },
        }
    }

    /// Discount value of `points`: `floor(points / ratio) × discount_per_ratio`.
    ///
    /// ## Example
    /// ```rust
    /// use souq_core::{LoyaltyEngine, Money};
    ///
    /// let engine = LoyaltyEngine::default();
    /// assert_eq!(engine.convert_points_to_egp(399), Money::from_pounds(4));
    /// assert_eq!(engine.convert_points_to_egp(400), Money::from_pounds(8));
    /// ```
    pub fn convert_points_to_egp(&self, points: i64) -> Money {
        discount_for_points(&self.config, points)
    }

    /// Points needed to unlock at least `discount`, rounding up to whole
    /// ratio groups.
    ///
    /// Not an exact inverse of [`convert_points_to_egp`](Self::convert_points_to_egp):
    /// a discount that is not a multiple of `discount_per_ratio` round-trips
    /// to the next multiple above it, never below.
    pub fn calculate_points_needed_for_discount(&self, discount: Money) -> i64 {
        if !discount.is_positive() {
            return 0;
        }
        discount
            .units_ceil(self.config.discount_per_ratio)
            .saturating_mul(self.config.points_to_currency_ratio)
    }

    /// Whether the points left after a discount still cover free shipping.
    pub fn can_use_shipping_points(&self, user_points: i64, points_used_for_discount: i64) -> bool {
        user_points.saturating_sub(points_used_for_discount) >= self.config.shipping_points_cost
    }

    /// Largest discount spend to offer on `subtotal`: the smaller of the
    /// points covering the percentage cap (rounded up to whole groups) and
    /// the balance rounded down to the redemption step.
    pub fn get_max_usable_points(&self, subtotal: Money, user_points: i64) -> i64 {
        let config = &self.config;

        let by_discount = if subtotal.is_positive() {
            // ceil(subtotal × pct / 100 / discount_per_ratio), done exactly
            let numerator = subtotal.piasters() as i128 * config.max_points_percentage as i128;
            let denominator = 100 * config.discount_per_ratio.piasters() as i128;
            let groups = (numerator + denominator - 1) / denominator;
            saturate(groups * config.points_to_currency_ratio as i128)
        } else {
            0
        };

        let by_balance = user_points.max(0) / config.min_points_use * config.min_points_use;

        by_discount.min(by_balance)
    }

    /// Builds the audit record for a calculation. Nothing is persisted.
    ///
    /// `transaction_type` of `None` is inferred from the result: shipping
    /// points spent → `Shipping`, any points spent → `Redeem`, else `Earn`.
    pub fn create_loyalty_transaction(
        &self,
        user_id: impl Into<String>,
        order_id: impl Into<String>,
        result: &LoyaltyCalculationResult,
        transaction_type: Option<TransactionType>,
    ) -> LoyaltyTransaction {
        LoyaltyTransaction {
            user_id: user_id.into(),
            order_id: order_id.into(),
            points_used: result.total_points_used,
            points_earned: result.points_earned,
            current_balance: None,
            transaction_type: transaction_type.unwrap_or_else(|| TransactionType::infer(result)),
            timestamp: Utc::now(),
        }
    }
}

/// Safe default for a rejected request.
fn rejected(subtotal: Money, shipping_fee: Money, err: LoyaltyError) -> LoyaltyCalculationResult {
    let final_amount = (subtotal + shipping_fee).clamp_non_negative();

    LoyaltyCalculationResult {
        points_discount: Money::zero(),
        final_shipping_fee: shipping_fee,
        final_amount,
        points_earned: 0,
        total_points_used: 0,
        shipping_points_used: 0,
        is_valid: false,
        error: Some(err),
        breakdown: LoyaltyBreakdown {
            subtotal,
            shipping_fee,
            points_discount: Money::zero(),
            shipping_discount: Money::zero(),
            final_amount,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
