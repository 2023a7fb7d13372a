//! Read-only queries over the committed monetary state.

use crate::adaptive::{effective_burn_ratio, select_target, BurnTelemetry, BurnTrigger};
use crate::distribution::{split_emission, EmissionSplitResult};
use crate::errors::Result;
use crate::keeper::MonetaryKeeper;
use crate::mint::{block_provisions, epoch_provisions};
use crate::params::{EmissionSplit, MonetaryParams};
use crate::records::{BurnRecord, EmissionTotals, PendingPacket};
use crate::state::SupplyAudit;
use serde::{Deserialize, Serialize};
use trichain_storage::KvStore;
use trichain_treasury::{BankLedger, FeeBurnStats};
use trichain_types::{
    mul_div_floor, mul_ratio_floor, ratio_of, Address, Amount, BurnSource, ChainId, Ratio,
    BLOCKS_PER_YEAR,
};

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 1_000;
pub const DEFAULT_PROJECTION_YEARS: u32 = 5;
pub const MAX_PROJECTION_YEARS: u32 = 10;

fn page_limit(limit: Option<usize>) -> usize {
    limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyMetrics {
    pub supply_cap: Amount,
    pub current_supply: Amount,
    pub total_minted: Amount,
    pub total_burned: Amount,
    pub remaining_headroom: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflationMetrics {
    pub inflation_rate: Ratio,
    pub min_inflation_rate: Ratio,
    pub max_inflation_rate: Ratio,
    pub annual_provisions: Amount,
    pub block_provisions: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionAllocation {
    pub split: EmissionSplit,
    pub reward_stream_interval: u64,
    /// Split of the provisions minted at the next epoch boundary.
    pub next_epoch: EmissionSplitResult,
    pub totals: EmissionTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnPage {
    pub records: Vec<BurnRecord>,
    /// Pass as `start_after` to fetch the next page.
    pub next: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredBurns {
    /// Running aggregate for the filter, independent of paging.
    pub total_burned: Amount,
    pub page: BurnPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryStatus {
    pub address: Address,
    pub balance: Amount,
    pub initial_balance: Amount,
    pub inflation_inflows: Amount,
    pub burn_redirect_inflows: Amount,
    pub fee_inflows: Amount,
    pub refund_inflows: Amount,
    pub total_inflows: Amount,
    /// Treasury balance as a share of current supply.
    pub share_of_supply: Option<Ratio>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub year: u32,
    pub minted: Amount,
    pub burned: Amount,
    pub supply: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyProjection {
    pub supply_cap: Amount,
    pub starting_supply: Amount,
    pub inflation_rate: Ratio,
    /// Yearly burn extrapolated from the burn rate observed so far.
    pub annual_burn_estimate: Amount,
    pub points: Vec<ProjectionPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMetrics {
    pub chain_id: ChainId,
    pub channel_id: Option<String>,
    pub active: bool,
    pub total_burns: Amount,
    pub total_rewards_sent: Amount,
    pub last_sync_height: u64,
    pub pending_packets: usize,
    pub pending_amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveBurnSnapshot {
    pub enabled: bool,
    pub emergency_override: bool,
    /// Ratio applied to fees right now.
    pub current_ratio: Ratio,
    pub last_trigger: Option<BurnTrigger>,
    /// Target the controller would pick from the latest telemetry.
    pub target_ratio: Ratio,
    pub target_trigger: BurnTrigger,
    pub min_burn_ratio: Ratio,
    pub default_burn_ratio: Ratio,
    pub max_burn_ratio: Ratio,
    pub smoothing_window_blocks: u64,
    pub congestion: Ratio,
    pub treasury_ratio: Option<Ratio>,
    pub tx_per_day_estimate: u64,
    pub tx_per_day_target: u64,
}

impl<S: KvStore, B: BankLedger> MonetaryKeeper<S, B> {
    pub fn params(&self) -> Result<MonetaryParams> {
        self.state().params()
    }

    pub fn supply_metrics(&self) -> Result<SupplyMetrics> {
        let params = self.params()?;
        Ok(SupplyMetrics {
            supply_cap: params.supply_cap,
            current_supply: params.current_supply,
            total_minted: params.total_minted,
            total_burned: params.total_burned,
            remaining_headroom: params.remaining_headroom(),
        })
    }

    pub fn inflation_metrics(&self) -> Result<InflationMetrics> {
        let params = self.params()?;
        let provisions = block_provisions(&params)?;
        Ok(InflationMetrics {
            inflation_rate: params.inflation_rate,
            min_inflation_rate: params.min_inflation_rate,
            max_inflation_rate: params.max_inflation_rate,
            annual_provisions: provisions.annual,
            block_provisions: provisions.per_block,
        })
    }

    pub fn emission_allocation(&self) -> Result<EmissionAllocation> {
        let params = self.params()?;
        let next = epoch_provisions(&params)?;
        Ok(EmissionAllocation {
            split: params.emission_split,
            reward_stream_interval: params.reward_stream_interval,
            next_epoch: split_emission(next, &params.emission_split)?,
            totals: self.state().emission_totals()?,
        })
    }

    /// Burn records in id order, starting after `start_after`.
    pub fn burn_history(&self, start_after: Option<u64>, limit: Option<usize>) -> Result<BurnPage> {
        let limit = page_limit(limit);
        let records = self.state().burn_records(start_after, Some(limit))?;
        let next = if records.len() == limit {
            records.last().map(|r| r.id)
        } else {
            None
        };
        Ok(BurnPage { records, next })
    }

    pub fn burns_by_source(
        &self,
        source: BurnSource,
        start_after: Option<u64>,
        limit: Option<usize>,
    ) -> Result<FilteredBurns> {
        Ok(FilteredBurns {
            total_burned: self.state().burned_by_source(source)?,
            page: self.filtered_burns(start_after, limit, |r| r.source == source)?,
        })
    }

    pub fn burns_by_chain(
        &self,
        chain: &ChainId,
        start_after: Option<u64>,
        limit: Option<usize>,
    ) -> Result<FilteredBurns> {
        Ok(FilteredBurns {
            total_burned: self.state().burned_by_chain(chain)?,
            page: self.filtered_burns(start_after, limit, |r| &r.chain_id == chain)?,
        })
    }

    /// Running burn totals of every source.
    pub fn burn_totals_by_source(&self) -> Result<Vec<(BurnSource, Amount)>> {
        let state = self.state();
        BurnSource::ALL
            .into_iter()
            .map(|source| Ok((source, state.burned_by_source(source)?)))
            .collect()
    }

    fn filtered_burns(
        &self,
        start_after: Option<u64>,
        limit: Option<usize>,
        keep: impl Fn(&BurnRecord) -> bool,
    ) -> Result<BurnPage> {
        let limit = page_limit(limit);
        let state = self.state();
        let mut records = Vec::with_capacity(limit);
        let mut cursor = start_after;
        'scan: loop {
            let batch = state.burn_records(cursor, Some(MAX_PAGE_LIMIT))?;
            let exhausted = batch.len() < MAX_PAGE_LIMIT;
            for record in batch {
                cursor = Some(record.id);
                if keep(&record) {
                    records.push(record);
                    if records.len() == limit {
                        break 'scan;
                    }
                }
            }
            if exhausted {
                break;
            }
        }
        let next = if records.len() == limit {
            records.last().map(|r| r.id)
        } else {
            None
        };
        Ok(BurnPage { records, next })
    }

    pub fn treasury_status(&self) -> Result<TreasuryStatus> {
        let treasury = self.state().treasury()?;
        let balance = self.bank().balance(&treasury.address);
        let supply = self.state().supply()?;
        Ok(TreasuryStatus {
            address: treasury.address,
            balance,
            initial_balance: treasury.initial_balance,
            inflation_inflows: treasury.inflation_inflows,
            burn_redirect_inflows: treasury.burn_redirect_inflows,
            fee_inflows: treasury.fee_inflows,
            refund_inflows: treasury.refund_inflows,
            total_inflows: treasury.total_inflows(),
            share_of_supply: ratio_of(balance, supply.current_supply),
        })
    }

    /// Project supply over `years` (default 5, at most 10) at the current
    /// inflation rate and the burn rate observed so far.
    pub fn supply_projection(&self, years: Option<u32>) -> Result<SupplyProjection> {
        let years = match years {
            None | Some(0) => DEFAULT_PROJECTION_YEARS,
            Some(y) => y.min(MAX_PROJECTION_YEARS),
        };
        let params = self.params()?;
        let height = self
            .state()
            .last_telemetry()?
            .map(|t| t.height)
            .unwrap_or(0);
        let annual_burn_estimate = if height == 0 {
            0
        } else {
            mul_div_floor(params.total_burned, BLOCKS_PER_YEAR as u128, height as u128)
                .unwrap_or(Amount::MAX)
        };

        let mut supply = params.current_supply.min(params.supply_cap);
        let mut points = Vec::with_capacity(years as usize);
        for year in 1..=years {
            let minted = mul_ratio_floor(supply, params.inflation_rate)?
                .min(params.supply_cap.saturating_sub(supply));
            let burned = annual_burn_estimate.min(supply + minted);
            supply = (supply + minted - burned).min(params.supply_cap);
            points.push(ProjectionPoint {
                year,
                minted,
                burned,
                supply,
            });
        }
        Ok(SupplyProjection {
            supply_cap: params.supply_cap,
            starting_supply: params.current_supply,
            inflation_rate: params.inflation_rate,
            annual_burn_estimate,
            points,
        })
    }

    pub fn chain_metrics(&self) -> Result<Vec<ChainMetrics>> {
        let state = self.state();
        let pending = state.pending_packets()?;
        state
            .chain_states()?
            .into_iter()
            .map(|chain| {
                let (count, amount) = pending
                    .iter()
                    .filter(|p| p.dest_chain == chain.chain_id)
                    .fold((0usize, 0u128), |(n, sum), p| (n + 1, sum.saturating_add(p.amount)));
                Ok(ChainMetrics {
                    chain_id: chain.chain_id,
                    channel_id: chain.channel_id,
                    active: chain.active,
                    total_burns: chain.total_burns,
                    total_rewards_sent: chain.total_rewards_sent,
                    last_sync_height: chain.last_sync_height,
                    pending_packets: count,
                    pending_amount: amount,
                })
            })
            .collect()
    }

    pub fn fee_burn_stats(&self) -> Result<FeeBurnStats> {
        let params = self.params()?;
        Ok(self.state().fee_totals()?.stats(effective_burn_ratio(&params)))
    }

    /// Controller inputs from the last recorded block and the live balances.
    pub fn burn_telemetry(&self) -> Result<BurnTelemetry> {
        let state = self.state();
        let block = state.last_telemetry()?.unwrap_or_default();
        let treasury_balance = match state.stored_params()? {
            Some(_) => self.bank().balance(&state.treasury()?.address),
            None => 0,
        };
        Ok(BurnTelemetry {
            block_gas_used: block.gas_used,
            block_gas_limit: block.gas_limit,
            treasury_balance,
            current_supply: state.supply()?.current_supply,
            tx_per_day_estimate: state.tx_per_day_estimate()?,
        })
    }

    pub fn adaptive_burn_snapshot(&self) -> Result<AdaptiveBurnSnapshot> {
        let params = self.params()?;
        let telemetry = self.burn_telemetry()?;
        let decision = select_target(&params, &telemetry);
        let ab = &params.adaptive_burn;
        Ok(AdaptiveBurnSnapshot {
            enabled: ab.enabled,
            emergency_override: ab.emergency_override,
            current_ratio: effective_burn_ratio(&params),
            last_trigger: ab.last_trigger,
            target_ratio: decision.target,
            target_trigger: decision.trigger,
            min_burn_ratio: ab.min_burn_ratio,
            default_burn_ratio: ab.default_burn_ratio,
            max_burn_ratio: ab.max_burn_ratio,
            smoothing_window_blocks: ab.smoothing_window_blocks,
            congestion: telemetry.congestion(),
            treasury_ratio: telemetry.treasury_ratio(),
            tx_per_day_estimate: telemetry.tx_per_day_estimate,
            tx_per_day_target: ab.tx_per_day_target,
        })
    }

    pub fn audit(&self) -> Result<SupplyAudit> {
        self.state().audit()
    }

    pub fn pending_packets(&self) -> Result<Vec<PendingPacket>> {
        self.state().pending_packets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limit_defaults_and_caps() {
        assert_eq!(page_limit(None), DEFAULT_PAGE_LIMIT);
        assert_eq!(page_limit(Some(0)), DEFAULT_PAGE_LIMIT);
        assert_eq!(page_limit(Some(7)), 7);
        assert_eq!(page_limit(Some(50_000)), MAX_PAGE_LIMIT);
    }
}
