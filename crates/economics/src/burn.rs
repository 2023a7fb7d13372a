//! Burn engine.
//!
//! A burn moves the full amount into the burn escrow, transfers the treasury
//! redirect out of it, and destroys the rest last. The redirect truncates
//! toward zero and its residue stays in the destroyed leg, so
//! `burned + to_treasury == amount` always holds. Supply counters, the burn
//! record and the aggregates are written only after every ledger leg
//! succeeded; any failure reverses the legs already applied.

use crate::adaptive::effective_burn_ratio;
use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::records::BurnRecord;
use crate::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trichain_treasury::InflowCause;
use trichain_types::{
    module_address, mul_ratio_floor, Address, Amount, BurnSource, ChainId, BURN_ESCROW_MODULE,
    FEE_COLLECTOR_MODULE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOutcome {
    pub burn_id: u64,
    pub burned: Amount,
    pub to_treasury: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSweep {
    pub burn_id: u64,
    pub collected: Amount,
    pub burned: Amount,
    pub to_treasury: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageChargeOutcome {
    pub charge: Amount,
    pub to_fee_collector: Amount,
    pub burn: Option<BurnOutcome>,
}

/// Split of a burn amount into its destroyed and redirected legs.
pub fn split_burn(amount: Amount, redirect_ratio: rust_decimal::Decimal) -> Result<(Amount, Amount)> {
    let to_treasury = mul_ratio_floor(amount, redirect_ratio)?;
    Ok((amount - to_treasury, to_treasury))
}

impl KeeperTx<'_> {
    pub fn burn(
        &mut self,
        burner: &Address,
        amount: Amount,
        source: BurnSource,
        origin_chain: &ChainId,
        ctx: &BlockContext,
    ) -> Result<BurnOutcome> {
        if amount == 0 {
            return Err(MonetaryError::InvalidAmount);
        }
        let params = self.state.params()?;
        let (burned, to_treasury) = split_burn(amount, params.treasury_redirect_ratio)?;

        let available = self.bank().spendable_balance(burner, ctx.time_unix);
        if available < amount {
            return Err(MonetaryError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if params.current_supply < burned {
            return Err(MonetaryError::InsufficientSupply {
                requested: burned,
                current: params.current_supply,
            });
        }
        let mut treasury = self.state.treasury()?;

        let escrow = module_address(BURN_ESCROW_MODULE);
        self.send(burner, &escrow, amount, ctx.time_unix)?;
        self.send(&escrow, &treasury.address, to_treasury, ctx.time_unix)?;
        self.burn_coins(BURN_ESCROW_MODULE, burned)?;

        self.state.add_burned(burned)?;
        self.state.add_burn_aggregates(source, origin_chain, burned)?;
        treasury.record_inflow(InflowCause::BurnRedirect, to_treasury);
        self.state.put_treasury(&treasury)?;

        let burn_id = self.state.next_burn_id()?;
        self.state.put_burn_record(&BurnRecord {
            id: burn_id,
            amount,
            burner: burner.to_string(),
            source,
            chain_id: origin_chain.clone(),
            block_height: ctx.height,
            tx_hash: ctx.tx_ref.clone(),
            timestamp: ctx.timestamp(),
            treasury_portion: to_treasury,
        })?;

        info!(
            target: "burn",
            burn_id,
            %burner,
            %source,
            chain = %origin_chain,
            %burned,
            %to_treasury,
            "burned tokens"
        );
        self.emit(MonetaryEvent::Burn {
            burn_id,
            burner: *burner,
            source,
            chain_id: origin_chain.clone(),
            burned,
            to_treasury,
            height: ctx.height,
        });
        Ok(BurnOutcome {
            burn_id,
            burned,
            to_treasury,
        })
    }

    /// Charge `charge` to `payer`: the source's burn-rate share is burned and
    /// the rest is paid into the fee collector.
    pub fn apply_usage_charge(
        &mut self,
        payer: &Address,
        charge: Amount,
        source: BurnSource,
        ctx: &BlockContext,
    ) -> Result<UsageChargeOutcome> {
        if charge == 0 {
            return Err(MonetaryError::InvalidAmount);
        }
        let params = self.state.params()?;
        let burn_part = mul_ratio_floor(charge, params.burn_rate(source))?;
        let to_fee_collector = charge - burn_part;

        let available = self.bank().spendable_balance(payer, ctx.time_unix);
        if available < charge {
            return Err(MonetaryError::InsufficientBalance {
                required: charge,
                available,
            });
        }

        self.send(
            payer,
            &module_address(FEE_COLLECTOR_MODULE),
            to_fee_collector,
            ctx.time_unix,
        )?;
        let local = self.config.chain_id.clone();
        let burn = if burn_part > 0 {
            Some(self.burn(payer, burn_part, source, &local, ctx)?)
        } else {
            None
        };
        debug!(target: "burn", %payer, %source, %charge, %burn_part, "usage charge applied");
        Ok(UsageChargeOutcome {
            charge,
            to_fee_collector,
            burn,
        })
    }

    /// Split the fees collected this block with the effective burn ratio.
    ///
    /// Returns `None` when the fee collector is empty.
    pub fn sweep_fees(&mut self, ctx: &BlockContext) -> Result<Option<FeeSweep>> {
        let collector = module_address(FEE_COLLECTOR_MODULE);
        let collected = self.bank().balance(&collector);
        if collected == 0 {
            return Ok(None);
        }
        let params = self.state.params()?;
        let ratio = effective_burn_ratio(&params);
        let burned = mul_ratio_floor(collected, ratio)?;
        let to_treasury = collected - burned;
        if params.current_supply < burned {
            return Err(MonetaryError::InsufficientSupply {
                requested: burned,
                current: params.current_supply,
            });
        }
        let mut treasury = self.state.treasury()?;

        self.send(&collector, &treasury.address, to_treasury, ctx.time_unix)?;
        self.burn_coins(FEE_COLLECTOR_MODULE, burned)?;

        let local = self.config.chain_id.clone();
        self.state.add_burned(burned)?;
        self.state
            .add_burn_aggregates(BurnSource::TxFees, &local, burned)?;
        treasury.record_inflow(InflowCause::FeeShare, to_treasury);
        self.state.put_treasury(&treasury)?;

        let mut totals = self.state.fee_totals()?;
        totals.record_sweep(ctx.height, collected, burned, to_treasury);
        self.state.put_fee_totals(&totals)?;

        let burn_id = self.state.next_burn_id()?;
        self.state.put_burn_record(&BurnRecord {
            id: burn_id,
            amount: collected,
            burner: collector.to_string(),
            source: BurnSource::TxFees,
            chain_id: local,
            block_height: ctx.height,
            tx_hash: None,
            timestamp: ctx.timestamp(),
            treasury_portion: to_treasury,
        })?;

        self.emit(MonetaryEvent::FeesSwept {
            collected,
            burned,
            to_treasury,
            height: ctx.height,
        });
        Ok(Some(FeeSweep {
            burn_id,
            collected,
            burned,
            to_treasury,
        }))
    }
}
