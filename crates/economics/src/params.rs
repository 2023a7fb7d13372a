//! Monetary policy parameters and their validation.
//!
//! The parameter record is a single governance-controlled document. Its
//! supply snapshot fields mirror the live counters and are refreshed from
//! them on every read and write.

use crate::adaptive::BurnTrigger;
use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trichain_types::{
    protocol_max_inflation, Amount, BurnSource, Ratio, BASE_UNITS_PER_TRI, PROTOCOL_MAX_SUPPLY,
};

const DAY_SECS: u64 = 24 * 60 * 60;
pub const MAX_VOTING_PERIOD_SECS: u64 = 30 * DAY_SECS;
pub const MAX_PARAM_CHANGE_DELAY_SECS: u64 = 7 * DAY_SECS;
pub const MAX_REWARD_STREAM_INTERVAL: u64 = 10_000;
pub const MIN_SMOOTHING_WINDOW: u64 = 10;
pub const MAX_SMOOTHING_WINDOW: u64 = 1_000;

fn pct(value: i64) -> Ratio {
    Decimal::new(value, 2)
}

fn in_range(value: Ratio, lo: Ratio, hi: Ratio) -> bool {
    value >= lo && value <= hi
}

fn check_unit(field: &str, value: Ratio) -> Result<()> {
    check_range(field, value, Decimal::ZERO, Decimal::ONE)
}

fn check_range(field: &str, value: Ratio, lo: Ratio, hi: Ratio) -> Result<()> {
    if in_range(value, lo, hi) {
        Ok(())
    } else {
        Err(MonetaryError::validation(
            field,
            format!("{value} outside [{lo}, {hi}]"),
        ))
    }
}

/// Partition of each epoch's emission across the four constituencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSplit {
    pub staking: Ratio,
    pub poc: Ratio,
    pub sequencer: Ratio,
    pub treasury: Ratio,
}

impl Default for EmissionSplit {
    fn default() -> Self {
        Self {
            staking: pct(50),
            poc: pct(20),
            sequencer: pct(15),
            treasury: pct(15),
        }
    }
}

impl EmissionSplit {
    pub fn sum(&self) -> Ratio {
        self.staking + self.poc + self.sequencer + self.treasury
    }
}

/// Share of a usage charge burned, per originating module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRates {
    pub tx_fees: Ratio,
    pub poc_usage: Ratio,
    pub sequencer_gas: Ratio,
    pub storage_rent: Ratio,
    pub bridge_toll: Ratio,
    pub slashing: Ratio,
}

impl Default for BurnRates {
    fn default() -> Self {
        Self {
            tx_fees: pct(20),
            poc_usage: pct(10),
            sequencer_gas: pct(15),
            storage_rent: pct(5),
            bridge_toll: pct(10),
            slashing: pct(50),
        }
    }
}

impl BurnRates {
    pub fn rate(&self, source: BurnSource) -> Ratio {
        match source {
            BurnSource::TxFees => self.tx_fees,
            BurnSource::PocUsage => self.poc_usage,
            BurnSource::SequencerGas => self.sequencer_gas,
            BurnSource::StorageRent => self.storage_rent,
            BurnSource::BridgeToll => self.bridge_toll,
            BurnSource::Slashing => self.slashing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBurnParams {
    pub enabled: bool,
    pub burn_ratio: Ratio,
    pub treasury_ratio: Ratio,
}

impl Default for FeeBurnParams {
    fn default() -> Self {
        Self {
            enabled: true,
            burn_ratio: pct(80),
            treasury_ratio: pct(20),
        }
    }
}

/// Conversion of peer-chain gas units into native fee units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConversion {
    pub poc_ratio: Ratio,
    pub sequencer_ratio: Ratio,
}

impl Default for GasConversion {
    fn default() -> Self {
        Self {
            poc_ratio: pct(50),
            sequencer_ratio: pct(80),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    pub voting_period_secs: u64,
    pub param_change_delay_secs: u64,
    pub min_deposit: Amount,
    pub quorum: Ratio,
    pub pass_threshold: Ratio,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_period_secs: 7 * DAY_SECS,
            param_change_delay_secs: DAY_SECS,
            min_deposit: 10_000 * BASE_UNITS_PER_TRI,
            quorum: Decimal::new(334, 3),
            pass_threshold: pct(50),
        }
    }
}

/// Adaptive burn controller settings plus its persisted runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveBurnParams {
    pub enabled: bool,
    pub min_burn_ratio: Ratio,
    pub default_burn_ratio: Ratio,
    pub max_burn_ratio: Ratio,
    pub congestion_threshold: Ratio,
    pub tx_per_day_target: u64,
    pub treasury_floor_pct: Ratio,
    pub smoothing_window_blocks: u64,
    #[serde(default)]
    pub last_applied_ratio: Option<Ratio>,
    #[serde(default)]
    pub last_trigger: Option<BurnTrigger>,
    #[serde(default)]
    pub emergency_override: bool,
}

impl Default for AdaptiveBurnParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_burn_ratio: pct(70),
            default_burn_ratio: pct(80),
            max_burn_ratio: pct(95),
            congestion_threshold: pct(75),
            tx_per_day_target: 100_000,
            treasury_floor_pct: pct(5),
            smoothing_window_blocks: 100,
            last_applied_ratio: None,
            last_trigger: None,
            emergency_override: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetaryParams {
    pub supply_cap: Amount,
    #[serde(default)]
    pub current_supply: Amount,
    #[serde(default)]
    pub total_minted: Amount,
    #[serde(default)]
    pub total_burned: Amount,
    pub inflation_rate: Ratio,
    pub min_inflation_rate: Ratio,
    pub max_inflation_rate: Ratio,
    pub emission_split: EmissionSplit,
    pub burn_rates: BurnRates,
    pub treasury_redirect_ratio: Ratio,
    pub fee_burn: FeeBurnParams,
    pub gas_conversion: GasConversion,
    pub poc_alpha: Ratio,
    /// Blocks between two emission epochs.
    pub reward_stream_interval: u64,
    pub governance: GovernanceParams,
    pub adaptive_burn: AdaptiveBurnParams,
}

impl Default for MonetaryParams {
    fn default() -> Self {
        Self {
            supply_cap: 1_000_000_000 * BASE_UNITS_PER_TRI,
            current_supply: 0,
            total_minted: 0,
            total_burned: 0,
            inflation_rate: pct(7),
            min_inflation_rate: pct(2),
            max_inflation_rate: pct(10),
            emission_split: EmissionSplit::default(),
            burn_rates: BurnRates::default(),
            treasury_redirect_ratio: pct(10),
            fee_burn: FeeBurnParams::default(),
            gas_conversion: GasConversion::default(),
            poc_alpha: pct(50),
            reward_stream_interval: 100,
            governance: GovernanceParams::default(),
            adaptive_burn: AdaptiveBurnParams::default(),
        }
    }
}

impl MonetaryParams {
    pub fn burn_rate(&self, source: BurnSource) -> Ratio {
        self.burn_rates.rate(source)
    }

    /// Fee burn ratio used when the adaptive controller is off or overridden.
    pub fn static_fee_burn_ratio(&self) -> Ratio {
        if self.fee_burn.enabled {
            self.fee_burn.burn_ratio
        } else {
            Decimal::ZERO
        }
    }

    pub fn remaining_headroom(&self) -> Amount {
        self.supply_cap.saturating_sub(self.current_supply)
    }

    /// Check every bound. The first violation is returned.
    pub fn validate(&self) -> Result<()> {
        self.validate_supply()?;
        self.validate_inflation()?;
        self.validate_emission_split()?;
        self.validate_burns()?;
        self.validate_governance()?;
        if self.adaptive_burn.enabled {
            self.validate_adaptive()?;
        }
        Ok(())
    }

    fn validate_supply(&self) -> Result<()> {
        if self.supply_cap == 0 {
            return Err(MonetaryError::validation("supply_cap", "must be positive"));
        }
        if self.supply_cap > PROTOCOL_MAX_SUPPLY {
            return Err(MonetaryError::validation(
                "supply_cap",
                format!("exceeds protocol ceiling {PROTOCOL_MAX_SUPPLY}"),
            ));
        }
        if self.current_supply > self.supply_cap {
            return Err(MonetaryError::validation(
                "current_supply",
                format!("{} exceeds cap {}", self.current_supply, self.supply_cap),
            ));
        }
        if self.total_minted < self.total_burned {
            return Err(MonetaryError::validation(
                "total_burned",
                "cannot exceed total_minted",
            ));
        }
        if self.current_supply != self.total_minted - self.total_burned {
            return Err(MonetaryError::validation(
                "current_supply",
                "must equal total_minted - total_burned",
            ));
        }
        Ok(())
    }

    fn validate_inflation(&self) -> Result<()> {
        if self.min_inflation_rate.is_sign_negative() {
            return Err(MonetaryError::validation(
                "min_inflation_rate",
                "must not be negative",
            ));
        }
        if self.max_inflation_rate > protocol_max_inflation() {
            return Err(MonetaryError::validation(
                "max_inflation_rate",
                format!("exceeds protocol ceiling {}", protocol_max_inflation()),
            ));
        }
        if self.min_inflation_rate >= self.max_inflation_rate {
            return Err(MonetaryError::validation(
                "min_inflation_rate",
                "must be below max_inflation_rate",
            ));
        }
        check_range(
            "inflation_rate",
            self.inflation_rate,
            self.min_inflation_rate,
            self.max_inflation_rate,
        )
    }

    fn validate_emission_split(&self) -> Result<()> {
        let split = &self.emission_split;
        check_unit("emission_split.staking", split.staking)?;
        check_unit("emission_split.poc", split.poc)?;
        check_unit("emission_split.sequencer", split.sequencer)?;
        check_unit("emission_split.treasury", split.treasury)?;
        if split.sum() != Decimal::ONE {
            return Err(MonetaryError::validation(
                "emission_split",
                format!("splits sum to {}, expected 1", split.sum()),
            ));
        }
        Ok(())
    }

    fn validate_burns(&self) -> Result<()> {
        for source in BurnSource::ALL {
            check_range(
                &format!("burn_rates.{}", source.label()),
                self.burn_rate(source),
                Decimal::ZERO,
                pct(50),
            )?;
        }
        check_range(
            "treasury_redirect_ratio",
            self.treasury_redirect_ratio,
            Decimal::ZERO,
            pct(20),
        )?;
        if self.fee_burn.enabled {
            check_unit("fee_burn.burn_ratio", self.fee_burn.burn_ratio)?;
            check_unit("fee_burn.treasury_ratio", self.fee_burn.treasury_ratio)?;
            if self.fee_burn.burn_ratio + self.fee_burn.treasury_ratio != Decimal::ONE {
                return Err(MonetaryError::validation(
                    "fee_burn",
                    "burn_ratio + treasury_ratio must equal 1",
                ));
            }
        }
        check_unit("gas_conversion.poc_ratio", self.gas_conversion.poc_ratio)?;
        check_unit(
            "gas_conversion.sequencer_ratio",
            self.gas_conversion.sequencer_ratio,
        )?;
        check_unit("poc_alpha", self.poc_alpha)
    }

    fn validate_governance(&self) -> Result<()> {
        if self.reward_stream_interval == 0 || self.reward_stream_interval > MAX_REWARD_STREAM_INTERVAL
        {
            return Err(MonetaryError::validation(
                "reward_stream_interval",
                format!("must be in (0, {MAX_REWARD_STREAM_INTERVAL}] blocks"),
            ));
        }
        let gov = &self.governance;
        if gov.min_deposit == 0 {
            return Err(MonetaryError::validation(
                "governance.min_deposit",
                "must be positive",
            ));
        }
        for (field, value) in [
            ("governance.quorum", gov.quorum),
            ("governance.pass_threshold", gov.pass_threshold),
        ] {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                return Err(MonetaryError::validation(field, "must be strictly between 0 and 1"));
            }
        }
        if gov.voting_period_secs == 0 || gov.voting_period_secs > MAX_VOTING_PERIOD_SECS {
            return Err(MonetaryError::validation(
                "governance.voting_period_secs",
                "must be in (0, 30 days]",
            ));
        }
        if gov.param_change_delay_secs == 0
            || gov.param_change_delay_secs > MAX_PARAM_CHANGE_DELAY_SECS
        {
            return Err(MonetaryError::validation(
                "governance.param_change_delay_secs",
                "must be in (0, 7 days]",
            ));
        }
        Ok(())
    }

    fn validate_adaptive(&self) -> Result<()> {
        let ab = &self.adaptive_burn;
        check_range("adaptive_burn.min_burn_ratio", ab.min_burn_ratio, pct(70), Decimal::ONE)?;
        check_range("adaptive_burn.max_burn_ratio", ab.max_burn_ratio, pct(70), pct(95))?;
        if !(ab.min_burn_ratio <= ab.default_burn_ratio && ab.default_burn_ratio <= ab.max_burn_ratio)
        {
            return Err(MonetaryError::validation(
                "adaptive_burn.default_burn_ratio",
                "must satisfy min <= default <= max",
            ));
        }
        check_range(
            "adaptive_burn.congestion_threshold",
            ab.congestion_threshold,
            pct(50),
            Decimal::ONE,
        )?;
        if ab.tx_per_day_target == 0 {
            return Err(MonetaryError::validation(
                "adaptive_burn.tx_per_day_target",
                "must be positive",
            ));
        }
        check_range(
            "adaptive_burn.treasury_floor_pct",
            ab.treasury_floor_pct,
            Decimal::ZERO,
            pct(20),
        )?;
        if !(MIN_SMOOTHING_WINDOW..=MAX_SMOOTHING_WINDOW).contains(&ab.smoothing_window_blocks) {
            return Err(MonetaryError::validation(
                "adaptive_burn.smoothing_window_blocks",
                format!("must be in [{MIN_SMOOTHING_WINDOW}, {MAX_SMOOTHING_WINDOW}]"),
            ));
        }
        if let Some(last) = ab.last_applied_ratio {
            check_range(
                "adaptive_burn.last_applied_ratio",
                last,
                ab.min_burn_ratio,
                ab.max_burn_ratio,
            )?;
        }
        Ok(())
    }
}

impl KeeperTx<'_> {
    /// Replace the parameter record.
    ///
    /// The supply snapshot is always taken from the live counters. Adaptive
    /// runtime state left unset in `new` is carried over from the stored
    /// record, clamped into the new bounds.
    pub fn set_params(&mut self, new: MonetaryParams, height: Option<u64>) -> Result<MonetaryParams> {
        let stored = self.state.stored_params()?;
        if let Some(stored) = &stored {
            if stored.supply_cap != 0 && new.supply_cap != stored.supply_cap {
                warn!(
                    target: "monetary",
                    stored = %stored.supply_cap,
                    requested = %new.supply_cap,
                    "rejected supply cap change"
                );
                return Err(MonetaryError::ParamsImmutable);
            }
        }

        let supply = self.state.supply()?;
        let mut params = MonetaryParams {
            current_supply: supply.current_supply,
            total_minted: supply.total_minted,
            total_burned: supply.total_burned,
            ..new
        };
        if let Some(stored) = &stored {
            let ab = &mut params.adaptive_burn;
            if ab.last_applied_ratio.is_none() {
                ab.last_applied_ratio = stored
                    .adaptive_burn
                    .last_applied_ratio
                    .map(|r| r.max(ab.min_burn_ratio).min(ab.max_burn_ratio));
            }
            if ab.last_trigger.is_none() {
                ab.last_trigger = stored.adaptive_burn.last_trigger;
            }
        }
        params.validate()?;

        self.state.put_params(&params)?;
        info!(target: "monetary", ?height, "monetary parameters updated");
        self.emit(MonetaryEvent::ParamsUpdated { height });
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: MonetaryError) -> String {
        match err {
            MonetaryError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        MonetaryParams::default().validate().unwrap();
    }

    #[test]
    fn split_must_sum_to_one() {
        let mut params = MonetaryParams::default();
        params.emission_split.treasury = pct(5);
        assert_eq!(field_of(params.validate().unwrap_err()), "emission_split");
        params.emission_split.treasury = pct(25);
        assert_eq!(field_of(params.validate().unwrap_err()), "emission_split");
    }

    #[test]
    fn burn_rate_bounds_name_the_source() {
        let mut params = MonetaryParams::default();
        params.burn_rates.storage_rent = pct(51);
        assert_eq!(
            field_of(params.validate().unwrap_err()),
            "burn_rates.storage_rent"
        );
    }

    #[test]
    fn supply_snapshot_must_conserve() {
        let mut params = MonetaryParams::default();
        params.total_minted = 100;
        params.total_burned = 10;
        params.current_supply = 95;
        assert_eq!(field_of(params.validate().unwrap_err()), "current_supply");
        params.current_supply = 90;
        params.validate().unwrap();
    }

    #[test]
    fn inflation_bounds() {
        let mut params = MonetaryParams::default();
        params.inflation_rate = pct(11);
        assert_eq!(field_of(params.validate().unwrap_err()), "inflation_rate");

        let mut params = MonetaryParams::default();
        params.max_inflation_rate = pct(21);
        assert_eq!(
            field_of(params.validate().unwrap_err()),
            "max_inflation_rate"
        );
    }

    #[test]
    fn adaptive_bounds_only_checked_when_enabled() {
        let mut params = MonetaryParams::default();
        params.adaptive_burn.smoothing_window_blocks = 5;
        assert_eq!(
            field_of(params.validate().unwrap_err()),
            "adaptive_burn.smoothing_window_blocks"
        );
        params.adaptive_burn.enabled = false;
        params.validate().unwrap();
    }

    #[test]
    fn last_applied_ratio_must_sit_inside_bounds() {
        let mut params = MonetaryParams::default();
        params.adaptive_burn.last_applied_ratio = Some(pct(96));
        assert_eq!(
            field_of(params.validate().unwrap_err()),
            "adaptive_burn.last_applied_ratio"
        );
    }

    #[test]
    fn fee_burn_split_checked_only_when_enabled() {
        let mut params = MonetaryParams::default();
        params.fee_burn.treasury_ratio = pct(30);
        assert_eq!(field_of(params.validate().unwrap_err()), "fee_burn");
        params.fee_burn.enabled = false;
        params.validate().unwrap();
        assert_eq!(params.static_fee_burn_ratio(), Decimal::ZERO);
    }

    #[test]
    fn governance_bounds() {
        let mut params = MonetaryParams::default();
        params.governance.quorum = Decimal::ONE;
        assert_eq!(field_of(params.validate().unwrap_err()), "governance.quorum");

        let mut params = MonetaryParams::default();
        params.reward_stream_interval = 10_001;
        assert_eq!(
            field_of(params.validate().unwrap_err()),
            "reward_stream_interval"
        );
    }

    #[test]
    fn serde_roundtrip_keeps_exact_ratios() {
        let params = MonetaryParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: MonetaryParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.emission_split.sum(), Decimal::ONE);
    }
}
