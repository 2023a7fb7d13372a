//! Emission distributor.
//!
//! Each epoch's provisions are minted into the monetary module account,
//! split four ways and paid out. Local legs are credited directly; legs for
//! a peer chain are moved into the cross-chain escrow and sent as reward
//! packets that stay pending until acknowledged.

use crate::config::ChainRole;
use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::mint::epoch_provisions;
use crate::params::EmissionSplit;
use crate::records::{EmissionRecord, PendingPacket};
use crate::crosschain::RewardPacket;
use crate::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trichain_treasury::InflowCause;
use trichain_types::{
    module_address, mul_ratio_floor, Address, Amount, ChainId, CROSSCHAIN_ESCROW_MODULE,
    MONETARY_MODULE, STAKING_REWARDS_MODULE,
};

/// One payout of a distribution. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecipient {
    /// Local address, or the receiving account on the destination chain.
    pub recipient: String,
    pub amount: Amount,
    /// Destination chain; `None` pays out locally.
    #[serde(default)]
    pub chain_id: Option<ChainId>,
    /// Channel override; the chain's provisioned channel is used otherwise.
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl RewardRecipient {
    pub fn local(address: &Address, amount: Amount) -> Self {
        Self {
            recipient: address.to_string(),
            amount,
            chain_id: None,
            channel_id: None,
        }
    }

    pub fn remote(receiver: impl Into<String>, amount: Amount, chain_id: ChainId) -> Self {
        Self {
            recipient: receiver.into(),
            amount,
            chain_id: Some(chain_id),
            channel_id: None,
        }
    }
}

/// Four-way split of an emission amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSplitResult {
    pub staking: Amount,
    pub poc: Amount,
    pub sequencer: Amount,
    /// Treasury leg, truncation remainder included.
    pub treasury: Amount,
    /// Base units lost to truncation of the four legs, flushed into `treasury`.
    pub remainder: Amount,
}

impl EmissionSplitResult {
    pub fn total(&self) -> Amount {
        self.staking + self.poc + self.sequencer + self.treasury
    }
}

/// Split `total` with truncated legs; the remainder goes to the treasury leg.
pub fn split_emission(total: Amount, split: &EmissionSplit) -> Result<EmissionSplitResult> {
    let staking = mul_ratio_floor(total, split.staking)?;
    let poc = mul_ratio_floor(total, split.poc)?;
    let sequencer = mul_ratio_floor(total, split.sequencer)?;
    let treasury = mul_ratio_floor(total, split.treasury)?;
    let assigned = staking + poc + sequencer + treasury;
    let remainder = total
        .checked_sub(assigned)
        .ok_or_else(|| MonetaryError::validation("emission_split", "legs exceed total"))?;
    Ok(EmissionSplitResult {
        staking,
        poc,
        sequencer,
        treasury: treasury + remainder,
        remainder,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionOutcome {
    pub emission_id: u64,
    pub total: Amount,
    pub local_distributed: Amount,
    pub ibc_distributed: Amount,
    /// Legs held back because the destination channel is not provisioned or
    /// the packet could not be sent; the coins stay in the monetary module.
    pub skipped: Amount,
    pub packets_sent: u32,
}

enum Leg {
    Local(Address),
    Remote { chain: ChainId, channel: String },
    Unprovisioned(ChainId),
}

impl KeeperTx<'_> {
    /// Turn a split into recipients: staking pool, the two peer chains and
    /// the treasury. Zero legs are omitted. A role without a configured peer,
    /// or whose peer chain is unknown or inactive, has its leg folded into
    /// the treasury.
    pub fn split_recipients(&self, split: &EmissionSplitResult) -> Result<Vec<RewardRecipient>> {
        let treasury = self.state.treasury()?;
        let mut to_treasury = split.treasury;
        let mut out = Vec::with_capacity(4);

        if split.staking > 0 {
            out.push(RewardRecipient::local(
                &module_address(STAKING_REWARDS_MODULE),
                split.staking,
            ));
        }
        for (role, amount) in [(ChainRole::Poc, split.poc), (ChainRole::Sequencer, split.sequencer)] {
            if amount == 0 {
                continue;
            }
            let Some(peer) = self.config.peer_for_role(role) else {
                warn!(target: "distribution", %role, %amount, "no peer chain for role; leg goes to treasury");
                to_treasury += amount;
                continue;
            };
            let active = self
                .state
                .chain_state(&peer.chain_id)?
                .is_some_and(|state| state.active);
            if !active {
                warn!(
                    target: "distribution",
                    %role,
                    chain = %peer.chain_id,
                    %amount,
                    "peer chain unknown or inactive; leg goes to treasury"
                );
                to_treasury += amount;
                continue;
            }
            let receiver = peer
                .reward_receiver
                .clone()
                .unwrap_or_else(|| format!("{role}_rewards"));
            out.push(RewardRecipient::remote(receiver, amount, peer.chain_id.clone()));
        }
        if to_treasury > 0 {
            out.push(RewardRecipient::local(&treasury.address, to_treasury));
        }
        Ok(out)
    }

    /// Pay `recipients` out of the monetary module within a budget of `total`.
    ///
    /// Everything is validated before the first transfer: the budget, every
    /// local address, every destination chain and the module balance.
    pub fn distribute(
        &mut self,
        total: Amount,
        recipients: &[RewardRecipient],
        ctx: &BlockContext,
    ) -> Result<DistributionOutcome> {
        let requested = recipients.iter().try_fold(0u128, |acc, r| {
            acc.checked_add(r.amount)
                .ok_or_else(|| MonetaryError::overflow("recipient total"))
        })?;
        if requested > total {
            return Err(MonetaryError::EmissionBudgetExceeded {
                requested,
                budget: total,
            });
        }

        let mut legs = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if recipient.amount == 0 {
                return Err(MonetaryError::InvalidAmount);
            }
            legs.push(self.resolve_leg(recipient)?);
        }

        let available = self.bank().module_balance(MONETARY_MODULE);
        if available < requested {
            return Err(MonetaryError::InsufficientBalance {
                required: requested,
                available,
            });
        }

        let mut treasury = self.state.treasury()?;
        let mut outcome = DistributionOutcome {
            total,
            ..DistributionOutcome::default()
        };
        for (recipient, leg) in recipients.iter().zip(legs) {
            let amount = recipient.amount;
            match leg {
                Leg::Local(address) => {
                    self.send_from_module(MONETARY_MODULE, &address, amount, ctx.time_unix)?;
                    if address == treasury.address {
                        treasury.record_inflow(InflowCause::Inflation, amount);
                    }
                    outcome.local_distributed += amount;
                }
                Leg::Remote { chain, channel } => {
                    if self.send_reward_packet(&recipient.recipient, amount, chain, channel, ctx)? {
                        outcome.ibc_distributed += amount;
                        outcome.packets_sent += 1;
                    } else {
                        outcome.skipped += amount;
                    }
                }
                Leg::Unprovisioned(chain) => {
                    warn!(
                        target: "distribution",
                        chain = %chain,
                        %amount,
                        "channel not provisioned; skipping reward leg"
                    );
                    outcome.skipped += amount;
                }
            }
        }
        self.state.put_treasury(&treasury)?;

        outcome.emission_id = self.state.next_emission_id()?;
        let record = EmissionRecord {
            id: outcome.emission_id,
            block_height: ctx.height,
            total,
            local_distributed: outcome.local_distributed,
            ibc_distributed: outcome.ibc_distributed,
            skipped: outcome.skipped,
            packets_sent: outcome.packets_sent,
            timestamp: ctx.timestamp(),
        };
        self.state.put_emission_record(&record)?;
        let mut totals = self.state.emission_totals()?;
        totals.record(&record);
        self.state.put_emission_totals(&totals)?;

        info!(
            target: "distribution",
            emission_id = outcome.emission_id,
            %total,
            local = %outcome.local_distributed,
            ibc = %outcome.ibc_distributed,
            skipped = %outcome.skipped,
            packets = outcome.packets_sent,
            "rewards distributed"
        );
        self.emit(MonetaryEvent::RewardsDistributed {
            emission_id: outcome.emission_id,
            total,
            local_distributed: outcome.local_distributed,
            ibc_distributed: outcome.ibc_distributed,
            skipped: outcome.skipped,
            packets_sent: outcome.packets_sent,
            height: ctx.height,
        });
        Ok(outcome)
    }

    /// Mint this epoch's provisions and distribute them.
    ///
    /// Returns `None` when the provisions are zero.
    pub fn run_emission_epoch(&mut self, ctx: &BlockContext) -> Result<Option<DistributionOutcome>> {
        let params = self.state.params()?;
        let amount = epoch_provisions(&params)?;
        if amount == 0 {
            debug!(target: "distribution", height = ctx.height, "no provisions this epoch");
            return Ok(None);
        }
        let remaining_headroom = self.mint_to_module(amount)?;
        self.emit(MonetaryEvent::Mint {
            amount,
            recipient: module_address(MONETARY_MODULE),
            reason: "epoch_provisions".to_string(),
            remaining_headroom,
            height: ctx.height,
        });

        let split = split_emission(amount, &params.emission_split)?;
        if split.remainder > 0 {
            debug!(target: "distribution", remainder = %split.remainder, "split remainder flushed to treasury");
        }
        let recipients = self.split_recipients(&split)?;
        self.distribute(amount, &recipients, ctx).map(Some)
    }

    fn resolve_leg(&self, recipient: &RewardRecipient) -> Result<Leg> {
        let chain = match &recipient.chain_id {
            Some(chain) if *chain != self.config.chain_id => chain,
            _ => {
                let address = recipient
                    .recipient
                    .parse::<Address>()
                    .map_err(|e| MonetaryError::InvalidAddress(format!("{}: {e}", recipient.recipient)))?;
                return Ok(Leg::Local(address));
            }
        };
        if recipient.recipient.trim().is_empty() {
            return Err(MonetaryError::InvalidAddress("empty remote receiver".into()));
        }
        let state = match self.state.chain_state(chain)? {
            Some(state) if state.active => state,
            _ => return Err(MonetaryError::InvalidChannel(chain.clone())),
        };
        match recipient.channel_id.clone().or(state.channel_id) {
            Some(channel) => Ok(Leg::Remote {
                chain: chain.clone(),
                channel,
            }),
            None => Ok(Leg::Unprovisioned(chain.clone())),
        }
    }

    /// Escrow `amount` and hand a reward packet to the channel module.
    /// Returns false when the send failed; the escrow is then returned.
    fn send_reward_packet(
        &mut self,
        receiver: &str,
        amount: Amount,
        chain: ChainId,
        channel: String,
        ctx: &BlockContext,
    ) -> Result<bool> {
        let escrow = module_address(CROSSCHAIN_ESCROW_MODULE);
        self.send_from_module(MONETARY_MODULE, &escrow, amount, ctx.time_unix)?;

        let sequence = self.state.next_packet_sequence()?;
        let timeout_height = ctx.height.saturating_add(self.config.packet_timeout_blocks);
        let packet = RewardPacket {
            sequence,
            source_chain: self.config.chain_id.clone(),
            dest_chain: chain.clone(),
            channel_id: channel.clone(),
            receiver: receiver.to_string(),
            amount,
            timeout_height,
        };
        if let Err(reason) = self.packets.send_packet(&packet) {
            warn!(
                target: "distribution",
                chain = %chain,
                %channel,
                %amount,
                %reason,
                "reward packet send failed; leg skipped"
            );
            self.send(&escrow, &module_address(MONETARY_MODULE), amount, ctx.time_unix)?;
            return Ok(false);
        }

        self.state.put_pending_packet(&PendingPacket {
            sequence,
            dest_chain: chain.clone(),
            channel_id: channel.clone(),
            receiver: receiver.to_string(),
            amount,
            sent_height: ctx.height,
            timeout_height,
        })?;
        if let Some(mut state) = self.state.chain_state(&chain)? {
            state.total_rewards_sent = state
                .total_rewards_sent
                .checked_add(amount)
                .ok_or_else(|| MonetaryError::overflow("chain rewards sent"))?;
            self.state.put_chain_state(&state)?;
        }
        debug!(target: "crosschain", sequence, chain = %chain, %amount, "reward packet sent");
        self.emit(MonetaryEvent::RewardPacketSent {
            sequence,
            chain_id: chain,
            channel_id: channel,
            amount,
            timeout_height,
        });
        Ok(true)
    }
}
