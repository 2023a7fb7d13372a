//! Typed events emitted by state changes; drained by the host after each block.

use crate::adaptive::BurnTrigger;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trichain_types::{Address, Amount, BurnSource, ChainId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonetaryEvent {
    Mint {
        amount: Amount,
        recipient: Address,
        reason: String,
        remaining_headroom: Amount,
        height: u64,
    },
    Burn {
        burn_id: u64,
        burner: Address,
        source: BurnSource,
        chain_id: ChainId,
        burned: Amount,
        to_treasury: Amount,
        height: u64,
    },
    BurnReportReconciled {
        burn_id: u64,
        chain_id: ChainId,
        tx_hash: String,
        source: BurnSource,
        amount: Amount,
    },
    RewardsDistributed {
        emission_id: u64,
        total: Amount,
        local_distributed: Amount,
        ibc_distributed: Amount,
        skipped: Amount,
        packets_sent: u32,
        height: u64,
    },
    RewardPacketSent {
        sequence: u64,
        chain_id: ChainId,
        channel_id: String,
        amount: Amount,
        timeout_height: u64,
    },
    PacketAcknowledged {
        sequence: u64,
        chain_id: ChainId,
    },
    PacketRefunded {
        sequence: u64,
        chain_id: ChainId,
        amount: Amount,
        reason: String,
    },
    AdaptiveBurnRatioUpdated {
        previous: Option<Decimal>,
        ratio: Decimal,
        trigger: BurnTrigger,
        height: u64,
    },
    ParamsUpdated {
        height: Option<u64>,
    },
    TreasuryAddressChanged {
        previous: Address,
        address: Address,
    },
    FeesSwept {
        collected: Amount,
        burned: Amount,
        to_treasury: Amount,
        height: u64,
    },
    GenesisApplied {
        current_supply: Amount,
        allocations: usize,
    },
}

/// Buffer of committed events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<MonetaryEvent>,
}

impl EventLog {
    pub fn extend(&mut self, events: impl IntoIterator<Item = MonetaryEvent>) {
        self.events.extend(events);
    }

    pub fn events(&self) -> &[MonetaryEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<MonetaryEvent> {
        std::mem::take(&mut self.events)
    }
}
