//! # souq-core: Loyalty Rules for the Souq Storefront
//!
//! Points earning, redemption validation and checkout breakdowns as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Souq Checkout Flow                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront (RTL)                             │   │
//! │  │    Cart ──► Points slider ──► Preview ──► Place order           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ souq-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  config   │  │ validation│  │  loyalty  │  │   │
//! │  │   │   Money   │  │  Loyalty  │  │   rules   │  │  Engine   │  │   │
//! │  │   │ piasters  │  │  Config   │  │  checks   │  │  Result   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    souq-db (Points Ledger)                      │   │
//! │  │         balances, transaction log, atomic settlement            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type in integer piasters
//! - [`config`] - Loyalty program constants
//! - [`error`] - Rule violations and config errors
//! - [`validation`] - Redemption rule checks
//! - [`loyalty`] - The calculation engine
//! - [`types`] - Requests, results and transaction records
//!
//! ## Example Usage
//!
//! ```rust
//! use souq_core::{LoyaltyEngine, Money};
//!
//! let engine = LoyaltyEngine::default();
//!
//! // 50 EGP order, spend 200 points for 4 EGP off
//! let result = engine.calculate_loyalty_points(Money::from_pounds(50), 200, false, 1000, None);
//!
//! assert!(result.is_valid);
//! assert_eq!(result.final_amount, Money::from_pounds(66)); // 50 + 20 shipping - 4
//! assert_eq!(result.points_earned, 50);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::LoyaltyConfig;
pub use error::{ConfigError, LoyaltyError};
pub use loyalty::LoyaltyEngine;
pub use money::Money;
pub use types::*;
