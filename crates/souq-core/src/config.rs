//! # Loyalty Program Configuration
//!
//! Process-wide loyalty constants, immutable after startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SOUQ_LOYALTY_*`)
//! 2. Defaults (this file)
//!
//! Money variables are given in piasters, e.g.
//! `SOUQ_LOYALTY_SHIPPING_FEE=2000` for 20 EGP.

use serde::{Deserialize, Serialize};
use std::env;
use ts_rs::TS;

use crate::error::ConfigError;
use crate::money::Money;

/// Loyalty program rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    /// Points earned per whole pound of subtotal.
    pub points_per_currency_unit: i64,

    /// Points that make up one ratio group.
    pub points_to_currency_ratio: i64,

    /// Discount granted per full ratio group.
    pub discount_per_ratio: Money,

    /// Flat point cost to waive shipping.
    pub shipping_points_cost: i64,

    /// Spendable points must be a multiple of this.
    pub min_points_use: i64,

    /// Subtotal above which shipping is free without points.
    pub free_shipping_threshold: Money,

    /// Shipping fee charged when not waived.
    pub shipping_fee: Money,

    /// Ceiling on the points discount as a percentage of the subtotal.
    pub max_points_percentage: u32,
}

impl Default for LoyaltyConfig {
    /// ## Default Values
    /// - 1 point per EGP spent
    /// - 200 points = 4 EGP off, spent in steps of 200
    /// - 1000 points waive the 20 EGP shipping fee
    /// - Free shipping above 300 EGP
    /// - Discount capped at 10% of the subtotal
    fn default() -> Self {
        LoyaltyConfig {
            points_per_currency_unit: 1,
            points_to_currency_ratio: 200,
            discount_per_ratio: Money::from_pounds(4),
            shipping_points_cost: 1000,
            min_points_use: 200,
            free_shipping_threshold: Money::from_pounds(300),
            shipping_fee: Money::from_pounds(20),
            max_points_percentage: 10,
        }
    }
}

impl LoyaltyConfig {
    /// Loads configuration from `SOUQ_LOYALTY_*` environment variables.
    ///
    /// Unset variables keep their default. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LoyaltyConfig::default();

        let config = LoyaltyConfig {
            points_per_currency_unit: parse_var(
                &lookup,
                "SOUQ_LOYALTY_POINTS_PER_CURRENCY_UNIT",
                defaults.points_per_currency_unit,
            )?,
            points_to_currency_ratio: parse_var(
                &lookup,
                "SOUQ_LOYALTY_POINTS_TO_CURRENCY_RATIO",
                defaults.points_to_currency_ratio,
            )?,
            discount_per_ratio: Money::from_piasters(parse_var(
                &lookup,
                "SOUQ_LOYALTY_DISCOUNT_PER_RATIO",
                defaults.discount_per_ratio.piasters(),
            )?),
            shipping_points_cost: parse_var(
                &lookup,
                "SOUQ_LOYALTY_SHIPPING_POINTS_COST",
                defaults.shipping_points_cost,
            )?,
            min_points_use: parse_var(
                &lookup,
                "SOUQ_LOYALTY_MIN_POINTS_USE",
                defaults.min_points_use,
            )?,
            free_shipping_threshold: Money::from_piasters(parse_var(
                &lookup,
                "SOUQ_LOYALTY_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold.piasters(),
            )?),
            shipping_fee: Money::from_piasters(parse_var(
                &lookup,
                "SOUQ_LOYALTY_SHIPPING_FEE",
                defaults.shipping_fee.piasters(),
            )?),
            max_points_percentage: parse_var(
                &lookup,
                "SOUQ_LOYALTY_MAX_POINTS_PERCENTAGE",
                defaults.max_points_percentage,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the rules the engine's arithmetic depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points_per_currency_unit < 0 {
            return Err(ConfigError::out_of_range(
                "points_per_currency_unit",
                "must not be negative",
            ));
        }
        if self.points_to_currency_ratio <= 0 {
            return Err(ConfigError::out_of_range(
                "points_to_currency_ratio",
                "must be positive",
            ));
        }
        if !self.discount_per_ratio.is_positive() {
            return Err(ConfigError::out_of_range(
                "discount_per_ratio",
                "must be positive",
            ));
        }
        if self.shipping_points_cost < 0 {
            return Err(ConfigError::out_of_range(
                "shipping_points_cost",
                "must not be negative",
            ));
        }
        if self.min_points_use <= 0 {
            return Err(ConfigError::out_of_range("min_points_use", "must be positive"));
        }
        if self.shipping_fee.is_negative() {
            return Err(ConfigError::out_of_range("shipping_fee", "must not be negative"));
        }
        if self.max_points_percentage > 100 {
            return Err(ConfigError::out_of_range(
                "max_points_percentage",
                "must be at most 100",
            ));
        }
        Ok(())
    }

    /// Shipping fee a checkout should pass to the engine for `subtotal`.
    ///
    /// Orders strictly above the free-shipping threshold ship for free
    /// regardless of points.
    pub fn shipping_fee_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_threshold {
            Money::zero()
        } else {
            self.shipping_fee
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoyaltyConfig::default();
        assert_eq!(config.points_to_currency_ratio, 200);
        assert_eq!(config.discount_per_ratio, Money::from_pounds(4));
        assert_eq!(config.shipping_points_cost, 1000);
        assert_eq!(config.shipping_fee, Money::from_pounds(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_without_overrides_is_default() {
        let config = LoyaltyConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, LoyaltyConfig::default());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = LoyaltyConfig::from_lookup(lookup_from(&[
            ("SOUQ_LOYALTY_SHIPPING_FEE", "2500"),
            ("SOUQ_LOYALTY_MAX_POINTS_PERCENTAGE", " 15 "),
        ]))
        .unwrap();
        assert_eq!(config.shipping_fee, Money::from_pounds(25));
        assert_eq!(config.max_points_percentage, 15);
        assert_eq!(config.min_points_use, 200);
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = LoyaltyConfig::from_lookup(lookup_from(&[(
            "SOUQ_LOYALTY_MIN_POINTS_USE",
            "two hundred",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "SOUQ_LOYALTY_MIN_POINTS_USE"));
    }

    #[test]
    fn test_validate_rejects_zero_ratio() {
        let config = LoyaltyConfig {
            points_to_currency_ratio: 0,
            ..LoyaltyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "points_to_currency_ratio"
        ));
    }

    #[test]
    fn test_validate_rejects_percentage_over_100() {
        let err = LoyaltyConfig::from_lookup(lookup_from(&[(
            "SOUQ_LOYALTY_MAX_POINTS_PERCENTAGE",
            "101",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_shipping_fee_for_threshold() {
        let config = LoyaltyConfig::default();
        assert_eq!(config.shipping_fee_for(Money::from_pounds(100)), Money::from_pounds(20));
        // Threshold itself still pays shipping
        assert_eq!(config.shipping_fee_for(Money::from_pounds(300)), Money::from_pounds(20));
        assert_eq!(config.shipping_fee_for(Money::from_piasters(30001)), Money::zero());
    }
}
