//! Adaptive burn controller.
//!
//! Once per block a priority-ordered rule set picks a target fee-burn ratio
//! from network telemetry. The target is smoothed exponentially with
//! `alpha = 1 / smoothing_window_blocks` and persisted in the parameter
//! record together with the trigger that selected it.

use crate::errors::Result;
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::params::MonetaryParams;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use trichain_types::{ratio_of, Amount, Ratio, RATIO_DECIMAL_PLACES};

/// Rule that selected the current burn ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnTrigger {
    EmergencyOverride,
    AdaptiveDisabled,
    TreasuryProtection,
    CongestionControl,
    AdoptionIncentive,
    Normal,
}

impl BurnTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            BurnTrigger::EmergencyOverride => "emergency_override",
            BurnTrigger::AdaptiveDisabled => "adaptive_disabled",
            BurnTrigger::TreasuryProtection => "treasury_protection",
            BurnTrigger::CongestionControl => "congestion_control",
            BurnTrigger::AdoptionIncentive => "adoption_incentive",
            BurnTrigger::Normal => "normal",
        }
    }
}

impl fmt::Display for BurnTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of the controller for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnTelemetry {
    pub block_gas_used: u64,
    pub block_gas_limit: u64,
    pub treasury_balance: Amount,
    pub current_supply: Amount,
    pub tx_per_day_estimate: u64,
}

impl BurnTelemetry {
    /// Gas utilisation of the block; zero when the limit is unknown.
    pub fn congestion(&self) -> Ratio {
        ratio_of(self.block_gas_used as u128, self.block_gas_limit as u128).unwrap_or(Decimal::ZERO)
    }

    /// Treasury balance as a share of supply; `None` with zero supply.
    pub fn treasury_ratio(&self) -> Option<Ratio> {
        ratio_of(self.treasury_balance, self.current_supply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnDecision {
    pub target: Ratio,
    pub trigger: BurnTrigger,
}

/// Pick the target ratio. Pure; the first matching rule wins.
pub fn select_target(params: &MonetaryParams, telemetry: &BurnTelemetry) -> BurnDecision {
    let ab = &params.adaptive_burn;
    let decide = |target, trigger| BurnDecision { target, trigger };

    if ab.emergency_override {
        return decide(params.static_fee_burn_ratio(), BurnTrigger::EmergencyOverride);
    }
    if !ab.enabled {
        return decide(params.static_fee_burn_ratio(), BurnTrigger::AdaptiveDisabled);
    }
    if let Some(treasury_ratio) = telemetry.treasury_ratio() {
        if treasury_ratio < ab.treasury_floor_pct {
            return decide(ab.min_burn_ratio, BurnTrigger::TreasuryProtection);
        }
    }
    if telemetry.block_gas_limit > 0 && telemetry.congestion() >= ab.congestion_threshold {
        return decide(ab.max_burn_ratio, BurnTrigger::CongestionControl);
    }
    if telemetry.tx_per_day_estimate < ab.tx_per_day_target {
        return decide(ab.min_burn_ratio, BurnTrigger::AdoptionIncentive);
    }
    decide(ab.default_burn_ratio, BurnTrigger::Normal)
}

/// `current × (1 − α) + target × α` with `α = 1 / window`, rounded.
///
/// Without a prior value or with a window of at most one block the target is
/// returned as is.
pub fn smooth(current: Option<Ratio>, target: Ratio, window_blocks: u64) -> Ratio {
    match current {
        Some(current) if window_blocks > 1 => {
            let alpha = Decimal::ONE / Decimal::from(window_blocks);
            (current * (Decimal::ONE - alpha) + target * alpha).round_dp(RATIO_DECIMAL_PLACES)
        }
        _ => target,
    }
}

/// Fee burn ratio in force right now.
pub fn effective_burn_ratio(params: &MonetaryParams) -> Ratio {
    let ab = &params.adaptive_burn;
    if ab.emergency_override || !ab.enabled {
        return params.static_fee_burn_ratio();
    }
    ab.last_applied_ratio.unwrap_or(ab.default_burn_ratio)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveBurnUpdate {
    pub target: Ratio,
    pub ratio: Ratio,
    pub trigger: BurnTrigger,
    pub changed: bool,
}

impl KeeperTx<'_> {
    /// Recompute, smooth and persist the adaptive burn ratio.
    pub fn update_adaptive_burn(
        &mut self,
        telemetry: &BurnTelemetry,
        height: u64,
    ) -> Result<AdaptiveBurnUpdate> {
        let mut params = self.state.params()?;
        let decision = select_target(&params, telemetry);
        let previous = params.adaptive_burn.last_applied_ratio;
        // While overridden or disabled the static ratio applies and the
        // smoothed state is parked, so it resumes where it left off.
        let parked = matches!(
            decision.trigger,
            BurnTrigger::EmergencyOverride | BurnTrigger::AdaptiveDisabled
        );
        let (ratio, applied) = if parked {
            (decision.target, previous)
        } else {
            let ratio = smooth(
                previous,
                decision.target,
                params.adaptive_burn.smoothing_window_blocks,
            );
            (ratio, Some(ratio))
        };
        let changed = applied != previous
            || params.adaptive_burn.last_trigger != Some(decision.trigger);

        if changed {
            params.adaptive_burn.last_applied_ratio = applied;
            params.adaptive_burn.last_trigger = Some(decision.trigger);
            self.state.put_params(&params)?;
            info!(
                target: "adaptive_burn",
                height,
                target_ratio = %decision.target,
                %ratio,
                trigger = %decision.trigger,
                "adaptive burn ratio updated"
            );
            self.emit(MonetaryEvent::AdaptiveBurnRatioUpdated {
                previous,
                ratio,
                trigger: decision.trigger,
                height,
            });
        } else {
            debug!(target: "adaptive_burn", height, %ratio, "burn ratio unchanged");
        }
        Ok(AdaptiveBurnUpdate {
            target: decision.target,
            ratio,
            trigger: decision.trigger,
            changed,
        })
    }
}
