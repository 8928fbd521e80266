//! # Repository Module
//!
//! Database repositories for the points ledger.
//!
//! ## Available Repositories
//!
//! - [`LoyaltyAccountRepository`] - Balances and manual credits
//! - [`LoyaltyLedgerRepository`] - Atomic settlement and transaction history
//!
//! [`LoyaltyAccountRepository`]: account::LoyaltyAccountRepository
//! [`LoyaltyLedgerRepository`]: ledger::LoyaltyLedgerRepository

pub mod account;
pub mod ledger;
