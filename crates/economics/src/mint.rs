//! Mint engine: capped minting and inflation provisions.

use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::params::MonetaryParams;
use crate::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::info;
use trichain_types::{mul_ratio_floor, Address, Amount, BLOCKS_PER_YEAR, MONETARY_MODULE};

/// Inflation provisions at the current supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provisions {
    pub annual: Amount,
    pub per_block: Amount,
}

/// `annual = inflation_rate × current_supply`, `per_block = annual / BLOCKS_PER_YEAR`.
pub fn block_provisions(params: &MonetaryParams) -> Result<Provisions> {
    let annual = mul_ratio_floor(params.current_supply, params.inflation_rate)?;
    Ok(Provisions {
        annual,
        per_block: annual / BLOCKS_PER_YEAR as u128,
    })
}

/// Provisions for one emission epoch, clamped to the cap headroom.
pub fn epoch_provisions(params: &MonetaryParams) -> Result<Amount> {
    let per_block = block_provisions(params)?.per_block;
    let epoch = per_block
        .checked_mul(params.reward_stream_interval as u128)
        .ok_or_else(|| MonetaryError::overflow("epoch provisions"))?;
    Ok(epoch.min(params.remaining_headroom()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    pub amount: Amount,
    pub remaining_headroom: Amount,
}

impl KeeperTx<'_> {
    /// Mint `amount` and credit it to `recipient`.
    pub fn mint(
        &mut self,
        amount: Amount,
        recipient: &Address,
        reason: &str,
        ctx: &BlockContext,
    ) -> Result<MintOutcome> {
        let remaining_headroom = self.mint_to_module(amount)?;
        // A failed credit reverses the module mint through the journal.
        self.send_from_module(MONETARY_MODULE, recipient, amount, ctx.time_unix)?;

        info!(
            target: "mint",
            %amount,
            %recipient,
            reason,
            %remaining_headroom,
            "minted tokens"
        );
        self.emit(MonetaryEvent::Mint {
            amount,
            recipient: *recipient,
            reason: reason.to_string(),
            remaining_headroom,
            height: ctx.height,
        });
        Ok(MintOutcome {
            amount,
            remaining_headroom,
        })
    }

    /// Mint into the monetary module account and update the counters.
    /// Returns the headroom left under the cap.
    pub(crate) fn mint_to_module(&mut self, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(MonetaryError::InvalidAmount);
        }
        let params = self.state.params()?;
        let remaining = params.remaining_headroom();
        if amount > remaining {
            return Err(MonetaryError::SupplyCapExceeded {
                requested: amount,
                remaining,
            });
        }
        self.mint_coins(MONETARY_MODULE, amount)?;
        let supply = self.state.add_minted(amount)?;
        Ok(params.supply_cap.saturating_sub(supply.current_supply))
    }
}
