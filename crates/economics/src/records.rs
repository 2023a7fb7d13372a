//! Persisted records of the monetary store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trichain_types::{Amount, BurnSource, ChainId};

/// Immutable audit record of one burn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub id: u64,
    /// Amount charged to the burner: destroyed plus redirected.
    pub amount: Amount,
    /// Burner account; peer-chain accounts are kept in their own encoding.
    pub burner: String,
    pub source: BurnSource,
    pub chain_id: ChainId,
    pub block_height: u64,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub treasury_portion: Amount,
}

impl BurnRecord {
    /// Amount actually removed from supply.
    pub fn burned(&self) -> Amount {
        self.amount.saturating_sub(self.treasury_portion)
    }
}

/// Outcome of one reward distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub id: u64,
    pub block_height: u64,
    pub total: Amount,
    pub local_distributed: Amount,
    pub ibc_distributed: Amount,
    pub skipped: Amount,
    pub packets_sent: u32,
    pub timestamp: DateTime<Utc>,
}

/// Cumulative distribution totals across all epochs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionTotals {
    pub epochs: u64,
    pub total: Amount,
    pub local_distributed: Amount,
    pub ibc_distributed: Amount,
    pub skipped: Amount,
    pub last_height: u64,
}

impl EmissionTotals {
    pub fn record(&mut self, record: &EmissionRecord) {
        self.epochs += 1;
        self.total = self.total.saturating_add(record.total);
        self.local_distributed = self
            .local_distributed
            .saturating_add(record.local_distributed);
        self.ibc_distributed = self.ibc_distributed.saturating_add(record.ibc_distributed);
        self.skipped = self.skipped.saturating_add(record.skipped);
        self.last_height = self.last_height.max(record.block_height);
    }
}

/// Per-peer-chain reconciliation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub chain_id: ChainId,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub total_burns: Amount,
    #[serde(default)]
    pub total_rewards_sent: Amount,
    pub active: bool,
    #[serde(default)]
    pub last_sync_height: u64,
}

impl ChainState {
    pub fn new(chain_id: ChainId, channel_id: Option<String>, active: bool) -> Self {
        Self {
            chain_id,
            channel_id,
            total_burns: 0,
            total_rewards_sent: 0,
            active,
            last_sync_height: 0,
        }
    }
}

/// Reward packet awaiting acknowledgement from a peer chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPacket {
    pub sequence: u64,
    pub dest_chain: ChainId,
    pub channel_id: String,
    pub receiver: String,
    pub amount: Amount,
    pub sent_height: u64,
    pub timeout_height: u64,
}

/// Inbound burn report already applied, keyed by origin chain and tx hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedReport {
    pub chain_id: ChainId,
    pub tx_hash: String,
    pub burn_id: u64,
}

/// Cursor state of the transaction-volume ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxVolumeMeta {
    pub capacity: u64,
    pub cursor: u64,
    pub filled: u64,
    pub sum: u128,
    pub last_height: u64,
}

/// The three supply counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyCounters {
    pub current_supply: Amount,
    pub total_minted: Amount,
    pub total_burned: Amount,
}

impl SupplyCounters {
    pub fn is_conserved(&self) -> bool {
        self.total_minted.checked_sub(self.total_burned) == Some(self.current_supply)
    }
}
