//! Command entry points.
//!
//! Each command runs as one atomic step: it either commits every store write
//! and ledger call it made, or none of them. Authority-gated commands compare
//! the caller against the configured governance authority first.

use crate::burn::{BurnOutcome, UsageChargeOutcome};
use crate::crosschain::{BurnReport, PacketAck, ReportOutcome};
use crate::distribution::{DistributionOutcome, RewardRecipient};
use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::genesis::GenesisState;
use crate::keeper::{KeeperTx, MonetaryKeeper};
use crate::mint::MintOutcome;
use crate::params::MonetaryParams;
use crate::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trichain_storage::KvStore;
use trichain_treasury::BankLedger;
use trichain_types::{Address, Amount, BurnSource, ChainId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBurnTokens {
    pub burner: Address,
    pub amount: Amount,
    pub source: BurnSource,
    /// Chain the burn is attributed to; the local chain when absent.
    #[serde(default)]
    pub chain_id: Option<ChainId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMintTokens {
    pub authority: String,
    pub amount: Amount,
    pub recipient: Address,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDistributeRewards {
    pub authority: String,
    pub total: Amount,
    pub recipients: Vec<RewardRecipient>,
}

pub type MsgReportBurn = BurnReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: String,
    pub params: MonetaryParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetTreasuryAddress {
    pub authority: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgApplyUsageCharge {
    pub payer: Address,
    pub charge: Amount,
    pub source: BurnSource,
}

impl KeeperTx<'_> {
    pub(crate) fn ensure_authority(&self, caller: &str) -> Result<()> {
        if caller != self.config.authority {
            warn!(target: "monetary", %caller, "unauthorized command");
            return Err(MonetaryError::Unauthorized {
                expected: self.config.authority.clone(),
                got: caller.to_string(),
            });
        }
        Ok(())
    }

    pub fn set_treasury_address(&mut self, address: Address) -> Result<()> {
        let mut treasury = self.state.treasury()?;
        let previous = treasury.address;
        if previous == address {
            return Ok(());
        }
        treasury.address = address;
        self.state.put_treasury(&treasury)?;
        info!(target: "treasury", %previous, %address, "treasury address changed");
        self.emit(MonetaryEvent::TreasuryAddressChanged { previous, address });
        Ok(())
    }
}

impl<S: KvStore, B: BankLedger> MonetaryKeeper<S, B> {
    pub fn burn_tokens(&mut self, msg: &MsgBurnTokens, ctx: &BlockContext) -> Result<BurnOutcome> {
        let origin = msg
            .chain_id
            .clone()
            .unwrap_or_else(|| self.config().chain_id.clone());
        self.transact(|tx| tx.burn(&msg.burner, msg.amount, msg.source, &origin, ctx))
    }

    pub fn mint_tokens(&mut self, msg: &MsgMintTokens, ctx: &BlockContext) -> Result<MintOutcome> {
        self.transact(|tx| {
            tx.ensure_authority(&msg.authority)?;
            tx.mint(msg.amount, &msg.recipient, &msg.reason, ctx)
        })
    }

    pub fn distribute_rewards(
        &mut self,
        msg: &MsgDistributeRewards,
        ctx: &BlockContext,
    ) -> Result<DistributionOutcome> {
        self.transact(|tx| {
            tx.ensure_authority(&msg.authority)?;
            tx.distribute(msg.total, &msg.recipients, ctx)
        })
    }

    pub fn report_burn(&mut self, msg: &MsgReportBurn, ctx: &BlockContext) -> Result<ReportOutcome> {
        self.transact(|tx| tx.on_recv_burn_report(msg, ctx))
    }

    pub fn update_params(
        &mut self,
        msg: &MsgUpdateParams,
        ctx: Option<&BlockContext>,
    ) -> Result<MonetaryParams> {
        self.transact(|tx| {
            tx.ensure_authority(&msg.authority)?;
            tx.set_params(msg.params.clone(), ctx.map(|c| c.height))
        })
    }

    pub fn set_treasury_address(&mut self, msg: &MsgSetTreasuryAddress) -> Result<()> {
        self.transact(|tx| {
            tx.ensure_authority(&msg.authority)?;
            tx.set_treasury_address(msg.address)
        })
    }

    pub fn apply_usage_charge(
        &mut self,
        msg: &MsgApplyUsageCharge,
        ctx: &BlockContext,
    ) -> Result<UsageChargeOutcome> {
        self.transact(|tx| tx.apply_usage_charge(&msg.payer, msg.charge, msg.source, ctx))
    }

    /// Settle a reward packet. Returns false for unknown or settled sequences.
    pub fn acknowledge_packet(&mut self, ack: &PacketAck, ctx: &BlockContext) -> Result<bool> {
        self.transact(|tx| tx.on_packet_ack(ack, ctx))
    }

    pub fn init_genesis(&mut self, genesis: &GenesisState) -> Result<()> {
        self.transact(|tx| tx.apply_genesis(genesis))
    }

    pub fn export_genesis(&self) -> Result<GenesisState> {
        self.state().export_genesis()
    }
}
