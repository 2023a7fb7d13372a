//! Trichain Treasury Module
//!
//! Ledger accessor used by the monetary keeper (mint, burn, transfer and
//! vesting primitives on the native coin), fee collection statistics and
//! treasury inflow accounting.

pub mod bank;
pub mod fee_collector;
pub mod treasury;

pub use bank::{BankCall, BankError, BankLedger, InMemoryBank, MockBank};
pub use fee_collector::{FeeBurnStats, FeeTotals};
pub use treasury::{InflowCause, TreasuryState};
