//! Trichain core types shared by the storage, treasury and economics crates.

pub mod address;
pub mod amount;
pub mod burn_source;
pub mod chain;
pub mod vesting;

pub use address::*;
pub use amount::*;
pub use burn_source::*;
pub use chain::*;
pub use vesting::*;
