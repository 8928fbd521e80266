//! # souq-db: Points Ledger for Souq Loyalty
//!
//! Stores loyalty balances and the per-order transaction log in SQLite, and
//! applies the point deltas computed by `souq-core` atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Souq Loyalty Data Flow                           │
//! │                                                                         │
//! │  Checkout handler                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     souq-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ LoyaltyCheckout│──►│  Repositories │    │  Migrations  │  │   │
//! │  │   │ (checkout.rs) │    │ AccountRepo   │    │  (embedded)  │  │   │
//! │  │   │ engine + db   │    │ LedgerRepo    │    │ 001_loyalty  │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        Database (pool.rs)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use souq_core::{LoyaltyConfig, LoyaltyEngine, Money};
//! use souq_db::{Database, DbConfig, LoyaltyCheckout};
//!
//! let db = Database::new(DbConfig::new("loyalty.db")).await?;
//! let checkout = LoyaltyCheckout::new(db, LoyaltyEngine::new(LoyaltyConfig::from_env()?)?);
//!
//! let outcome = checkout
//!     .redeem("user-1", "order-42", Money::from_pounds(250), 400, true)
//!     .await?;
//! println!("new balance: {:?}", outcome.transaction.current_balance);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutOutcome, LoyaltyCheckout};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::{LoyaltyAccount, LoyaltyAccountRepository};
pub use repository::ledger::LoyaltyLedgerRepository;
