//! Fee collection accounting for the treasury
//!
//! Fees accumulate in the fee-collector module account during a block. At the
//! end of the block they are swept: one share is burned and the rest goes to
//! the treasury. `FeeTotals` is the persisted running tally of those sweeps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trichain_types::{ratio_of, Amount, Ratio};

/// Running fee totals across all swept blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTotals {
    pub collected: Amount,
    pub burned: Amount,
    pub to_treasury: Amount,
    pub blocks_with_fees: u64,
    pub last_block: u64,
    pub highest_block_fees: Amount,
    pub lowest_block_fees: Amount,
}

impl FeeTotals {
    /// Record one end-of-block sweep. Blocks without fees are not counted.
    pub fn record_sweep(&mut self, height: u64, collected: Amount, burned: Amount, to_treasury: Amount) {
        if collected == 0 {
            debug!(target: "treasury", "Block {}: No fees to sweep", height);
            return;
        }
        self.collected = self.collected.saturating_add(collected);
        self.burned = self.burned.saturating_add(burned);
        self.to_treasury = self.to_treasury.saturating_add(to_treasury);
        self.lowest_block_fees = if self.blocks_with_fees == 0 {
            collected
        } else {
            self.lowest_block_fees.min(collected)
        };
        self.highest_block_fees = self.highest_block_fees.max(collected);
        self.blocks_with_fees += 1;
        self.last_block = height;

        info!(
            target: "treasury",
            "Block {}: Swept {} fees ({} burned, {} to treasury)",
            height,
            collected,
            burned,
            to_treasury
        );
    }

    /// Summary statistics, reported alongside the ratio currently in force.
    pub fn stats(&self, current_burn_ratio: Ratio) -> FeeBurnStats {
        let average_per_block = if self.blocks_with_fees > 0 {
            self.collected / self.blocks_with_fees as u128
        } else {
            0
        };
        FeeBurnStats {
            total_collected: self.collected,
            total_burned: self.burned,
            total_to_treasury: self.to_treasury,
            blocks_with_fees: self.blocks_with_fees,
            average_per_block,
            highest_block: self.highest_block_fees,
            lowest_block: self.lowest_block_fees,
            realized_burn_ratio: ratio_of(self.burned, self.collected).unwrap_or(Decimal::ZERO),
            current_burn_ratio,
            last_block: self.last_block,
        }
    }
}

/// Fee burn statistics for monitoring and analytics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBurnStats {
    pub total_collected: Amount,
    pub total_burned: Amount,
    pub total_to_treasury: Amount,
    pub blocks_with_fees: u64,
    pub average_per_block: Amount,
    pub highest_block: Amount,
    pub lowest_block: Amount,
    /// Burned share of all fees swept so far.
    pub realized_burn_ratio: Ratio,
    pub current_burn_ratio: Ratio,
    pub last_block: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_totals_report_zero() {
        let stats = FeeTotals::default().stats(Decimal::new(8, 1));
        assert_eq!(stats.total_collected, 0);
        assert_eq!(stats.average_per_block, 0);
        assert_eq!(stats.realized_burn_ratio, Decimal::ZERO);
        assert_eq!(stats.current_burn_ratio, Decimal::new(8, 1));
    }

    #[test]
    fn sweeps_accumulate_statistics() {
        let mut totals = FeeTotals::default();
        totals.record_sweep(1, 1_000, 800, 200);
        totals.record_sweep(2, 0, 0, 0);
        totals.record_sweep(3, 2_000, 1_600, 400);
        totals.record_sweep(4, 500, 400, 100);

        let stats = totals.stats(Decimal::new(8, 1));
        assert_eq!(stats.total_collected, 3_500);
        assert_eq!(stats.total_burned, 2_800);
        assert_eq!(stats.total_to_treasury, 700);
        assert_eq!(stats.blocks_with_fees, 3);
        assert_eq!(stats.average_per_block, 1_166);
        assert_eq!(stats.highest_block, 2_000);
        assert_eq!(stats.lowest_block, 500);
        assert_eq!(stats.realized_burn_ratio, Decimal::new(8, 1));
        assert_eq!(stats.last_block, 4);
    }
}
