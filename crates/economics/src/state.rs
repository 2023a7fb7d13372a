//! Parameter & invariant store.
//!
//! Typed access to every record the keeper persists. All reads and writes of
//! the supply counters go through here, which is where conservation is
//! checked.

use crate::errors::{MonetaryError, Result};
use crate::params::MonetaryParams;
use crate::records::{
    BurnRecord, ChainState, EmissionRecord, EmissionTotals, PendingPacket, ProcessedReport,
    SupplyCounters, TxVolumeMeta,
};
use crate::context::BlockTelemetry;
use serde::{Deserialize, Serialize};
use tracing::error;
use trichain_storage::keys::{self, sequence_of};
use trichain_storage::{get_json, get_u128, get_u64, put_json, put_u128, put_u64, KvStore};
use trichain_treasury::{FeeTotals, TreasuryState};
use trichain_types::{Amount, BurnSource, ChainId};

/// Result of [`MonetaryState::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyAudit {
    pub counters: SupplyCounters,
    pub conserved: bool,
    pub within_cap: bool,
    pub burned_by_source_total: Amount,
    pub burn_records_total: Amount,
    /// Per-source aggregates add up to the burn records.
    pub aggregates_consistent: bool,
    pub burn_records: u64,
}

pub struct MonetaryState<'a> {
    store: &'a dyn KvStore,
}

impl<'a> MonetaryState<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    // ---------------------------------------------------------------------
    // Parameters and counters
    // ---------------------------------------------------------------------

    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.store.get(keys::PARAMS_KEY)?.is_some())
    }

    /// Stored parameter record, without refreshing the supply snapshot.
    pub fn stored_params(&self) -> Result<Option<MonetaryParams>> {
        Ok(get_json(self.store, keys::PARAMS_KEY)?)
    }

    /// Current parameters with the supply snapshot taken from the live counters.
    pub fn params(&self) -> Result<MonetaryParams> {
        let mut params = self.stored_params()?.unwrap_or_default();
        let supply = self.supply()?;
        params.current_supply = supply.current_supply;
        params.total_minted = supply.total_minted;
        params.total_burned = supply.total_burned;
        Ok(params)
    }

    pub fn put_params(&self, params: &MonetaryParams) -> Result<()> {
        put_json(self.store, keys::PARAMS_KEY, params)?;
        Ok(())
    }

    pub fn supply(&self) -> Result<SupplyCounters> {
        Ok(SupplyCounters {
            current_supply: get_u128(self.store, keys::CURRENT_SUPPLY_KEY)?,
            total_minted: get_u128(self.store, keys::TOTAL_MINTED_KEY)?,
            total_burned: get_u128(self.store, keys::TOTAL_BURNED_KEY)?,
        })
    }

    /// Write the counters; refuses any state that breaks conservation.
    pub fn put_supply(&self, supply: &SupplyCounters) -> Result<()> {
        if !supply.is_conserved() {
            error!(
                target: "monetary",
                current = %supply.current_supply,
                minted = %supply.total_minted,
                burned = %supply.total_burned,
                "refusing to persist non-conserving supply"
            );
            return Err(MonetaryError::ConservationViolation {
                current: supply.current_supply,
                minted: supply.total_minted,
                burned: supply.total_burned,
            });
        }
        put_u128(self.store, keys::CURRENT_SUPPLY_KEY, supply.current_supply)?;
        put_u128(self.store, keys::TOTAL_MINTED_KEY, supply.total_minted)?;
        put_u128(self.store, keys::TOTAL_BURNED_KEY, supply.total_burned)?;
        Ok(())
    }

    /// Record `amount` of new supply.
    pub fn add_minted(&self, amount: Amount) -> Result<SupplyCounters> {
        let mut supply = self.supply()?;
        supply.current_supply = supply
            .current_supply
            .checked_add(amount)
            .ok_or_else(|| MonetaryError::overflow("current supply"))?;
        supply.total_minted = supply
            .total_minted
            .checked_add(amount)
            .ok_or_else(|| MonetaryError::overflow("total minted"))?;
        self.put_supply(&supply)?;
        Ok(supply)
    }

    /// Record `amount` of destroyed supply.
    pub fn add_burned(&self, amount: Amount) -> Result<SupplyCounters> {
        let mut supply = self.supply()?;
        supply.current_supply = supply.current_supply.checked_sub(amount).ok_or(
            MonetaryError::InsufficientSupply {
                requested: amount,
                current: supply.current_supply,
            },
        )?;
        supply.total_burned = supply
            .total_burned
            .checked_add(amount)
            .ok_or_else(|| MonetaryError::overflow("total burned"))?;
        self.put_supply(&supply)?;
        Ok(supply)
    }

    // ---------------------------------------------------------------------
    // Burn aggregates and records
    // ---------------------------------------------------------------------

    pub fn burned_by_source(&self, source: BurnSource) -> Result<Amount> {
        Ok(get_u128(self.store, &keys::burn_by_source_key(source))?)
    }

    pub fn burned_by_chain(&self, chain: &ChainId) -> Result<Amount> {
        Ok(get_u128(self.store, &keys::burn_by_chain_key(chain))?)
    }

    pub fn add_burn_aggregates(
        &self,
        source: BurnSource,
        chain: &ChainId,
        amount: Amount,
    ) -> Result<()> {
        let by_source = self
            .burned_by_source(source)?
            .checked_add(amount)
            .ok_or_else(|| MonetaryError::overflow("burn by source"))?;
        let by_chain = self
            .burned_by_chain(chain)?
            .checked_add(amount)
            .ok_or_else(|| MonetaryError::overflow("burn by chain"))?;
        put_u128(self.store, &keys::burn_by_source_key(source), by_source)?;
        put_u128(self.store, &keys::burn_by_chain_key(chain), by_chain)?;
        Ok(())
    }

    /// Chains with a recorded burn aggregate, in key order.
    pub fn burned_by_chains(&self) -> Result<Vec<(ChainId, Amount)>> {
        let mut out = Vec::new();
        for (key, value) in self.store.prefix_scan(&[keys::BURN_BY_CHAIN_PREFIX])? {
            let raw = String::from_utf8(key[1..].to_vec()).ok();
            match raw.and_then(|s| ChainId::new(s).ok()) {
                Some(chain) => out.push((chain, keys::decode_u128(&key, &value)?)),
                None => {
                    return Err(trichain_storage::StorageError::corrupted(&key, "bad chain id").into())
                }
            }
        }
        Ok(out)
    }

    /// Hand out the next burn identifier. Identifiers start at 1.
    pub fn next_burn_id(&self) -> Result<u64> {
        self.next_sequence(keys::NEXT_BURN_ID_KEY)
    }

    pub fn next_emission_id(&self) -> Result<u64> {
        self.next_sequence(keys::NEXT_EMISSION_ID_KEY)
    }

    pub fn next_packet_sequence(&self) -> Result<u64> {
        self.next_sequence(keys::NEXT_PACKET_SEQ_KEY)
    }

    fn next_sequence(&self, key: &[u8]) -> Result<u64> {
        let id = get_u64(self.store, key)?.max(1);
        let next = id
            .checked_add(1)
            .ok_or_else(|| MonetaryError::overflow("sequence counter"))?;
        put_u64(self.store, key, next)?;
        Ok(id)
    }

    /// Make sure future identifiers start above `id`.
    pub fn bump_sequence_past(&self, key: &[u8], id: u64) -> Result<()> {
        let current = get_u64(self.store, key)?;
        if id >= current {
            let next = id
                .checked_add(1)
                .ok_or_else(|| MonetaryError::overflow("sequence counter"))?;
            put_u64(self.store, key, next)?;
        }
        Ok(())
    }

    pub fn put_burn_record(&self, record: &BurnRecord) -> Result<()> {
        put_json(self.store, &keys::burn_record_key(record.id), record)?;
        Ok(())
    }

    pub fn burn_record(&self, id: u64) -> Result<Option<BurnRecord>> {
        Ok(get_json(self.store, &keys::burn_record_key(id))?)
    }

    /// Burn records with id greater than `after`, ascending, at most `limit`.
    pub fn burn_records(&self, after: Option<u64>, limit: Option<usize>) -> Result<Vec<BurnRecord>> {
        self.records_page(keys::BURN_RECORD_PREFIX, after, limit, keys::burn_record_key)
    }

    pub fn put_emission_record(&self, record: &EmissionRecord) -> Result<()> {
        put_json(self.store, &keys::emission_record_key(record.id), record)?;
        Ok(())
    }

    pub fn emission_records(
        &self,
        after: Option<u64>,
        limit: Option<usize>,
    ) -> Result<Vec<EmissionRecord>> {
        self.records_page(
            keys::EMISSION_RECORD_PREFIX,
            after,
            limit,
            keys::emission_record_key,
        )
    }

    fn records_page<T: serde::de::DeserializeOwned>(
        &self,
        prefix: u8,
        after: Option<u64>,
        limit: Option<usize>,
        key_of: fn(u64) -> Vec<u8>,
    ) -> Result<Vec<T>> {
        let start = match after {
            Some(u64::MAX) => return Ok(Vec::new()),
            Some(id) => Some(key_of(id + 1)),
            None => None,
        };
        self.store
            .scan(&[prefix], start.as_deref(), limit)?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(MonetaryError::from))
            .collect()
    }

    pub fn emission_totals(&self) -> Result<EmissionTotals> {
        Ok(get_json(self.store, keys::EMISSION_TOTALS_KEY)?.unwrap_or_default())
    }

    pub fn put_emission_totals(&self, totals: &EmissionTotals) -> Result<()> {
        put_json(self.store, keys::EMISSION_TOTALS_KEY, totals)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Treasury and fees
    // ---------------------------------------------------------------------

    pub fn treasury(&self) -> Result<TreasuryState> {
        get_json(self.store, keys::TREASURY_STATE_KEY)?
            .ok_or_else(|| MonetaryError::InvalidAddress("treasury address is not configured".into()))
    }

    pub fn put_treasury(&self, treasury: &TreasuryState) -> Result<()> {
        put_json(self.store, keys::TREASURY_STATE_KEY, treasury)?;
        Ok(())
    }

    pub fn fee_totals(&self) -> Result<FeeTotals> {
        Ok(get_json(self.store, keys::FEE_TOTALS_KEY)?.unwrap_or_default())
    }

    pub fn put_fee_totals(&self, totals: &FeeTotals) -> Result<()> {
        put_json(self.store, keys::FEE_TOTALS_KEY, totals)?;
        Ok(())
    }

    pub fn last_telemetry(&self) -> Result<Option<BlockTelemetry>> {
        Ok(get_json(self.store, keys::LAST_TELEMETRY_KEY)?)
    }

    pub fn put_last_telemetry(&self, telemetry: &BlockTelemetry) -> Result<()> {
        put_json(self.store, keys::LAST_TELEMETRY_KEY, telemetry)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cross-chain state
    // ---------------------------------------------------------------------

    pub fn chain_state(&self, chain: &ChainId) -> Result<Option<ChainState>> {
        Ok(get_json(self.store, &keys::chain_state_key(chain))?)
    }

    pub fn put_chain_state(&self, state: &ChainState) -> Result<()> {
        put_json(self.store, &keys::chain_state_key(&state.chain_id), state)?;
        Ok(())
    }

    pub fn chain_states(&self) -> Result<Vec<ChainState>> {
        self.store
            .prefix_scan(&[keys::CHAIN_STATE_PREFIX])?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(MonetaryError::from))
            .collect()
    }

    pub fn processed_report(&self, chain: &ChainId, tx_hash: &str) -> Result<Option<ProcessedReport>> {
        Ok(get_json(self.store, &keys::processed_report_key(chain, tx_hash))?)
    }

    pub fn put_processed_report(&self, report: &ProcessedReport) -> Result<()> {
        put_json(
            self.store,
            &keys::processed_report_key(&report.chain_id, &report.tx_hash),
            report,
        )?;
        Ok(())
    }

    pub fn processed_reports(&self) -> Result<Vec<ProcessedReport>> {
        self.store
            .prefix_scan(&[keys::PROCESSED_REPORT_PREFIX])?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(MonetaryError::from))
            .collect()
    }

    pub fn pending_packet(&self, sequence: u64) -> Result<Option<PendingPacket>> {
        Ok(get_json(self.store, &keys::pending_packet_key(sequence))?)
    }

    pub fn put_pending_packet(&self, packet: &PendingPacket) -> Result<()> {
        put_json(self.store, &keys::pending_packet_key(packet.sequence), packet)?;
        Ok(())
    }

    pub fn remove_pending_packet(&self, sequence: u64) -> Result<()> {
        self.store.delete(&keys::pending_packet_key(sequence))?;
        Ok(())
    }

    /// All pending packets in sequence order.
    pub fn pending_packets(&self) -> Result<Vec<PendingPacket>> {
        self.store
            .prefix_scan(&[keys::PENDING_PACKET_PREFIX])?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(MonetaryError::from))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Transaction-volume ring
    // ---------------------------------------------------------------------

    pub fn tx_volume_meta(&self) -> Result<Option<TxVolumeMeta>> {
        Ok(get_json(self.store, keys::TX_VOLUME_META_KEY)?)
    }

    pub fn put_tx_volume_meta(&self, meta: &TxVolumeMeta) -> Result<()> {
        put_json(self.store, keys::TX_VOLUME_META_KEY, meta)?;
        Ok(())
    }

    pub fn tx_volume_slot(&self, slot: u64) -> Result<u64> {
        Ok(get_u64(self.store, &keys::tx_volume_slot_key(slot))?)
    }

    pub fn put_tx_volume_slot(&self, slot: u64, count: u64) -> Result<()> {
        put_u64(self.store, &keys::tx_volume_slot_key(slot), count)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Audit
    // ---------------------------------------------------------------------

    /// Recompute aggregates from the records and check the standing invariants.
    pub fn audit(&self) -> Result<SupplyAudit> {
        let counters = self.supply()?;
        let cap = self.stored_params()?.map(|p| p.supply_cap).unwrap_or(0);

        let mut burned_by_source_total: Amount = 0;
        for source in BurnSource::ALL {
            burned_by_source_total = burned_by_source_total.saturating_add(self.burned_by_source(source)?);
        }

        let mut burn_records_total: Amount = 0;
        let mut burn_records = 0u64;
        for (key, value) in self.store.prefix_scan(&[keys::BURN_RECORD_PREFIX])? {
            let record: BurnRecord = serde_json::from_slice(&value)?;
            if sequence_of(&key) != Some(record.id) {
                return Err(trichain_storage::StorageError::corrupted(&key, "record id mismatch").into());
            }
            burn_records_total = burn_records_total.saturating_add(record.burned());
            burn_records += 1;
        }

        Ok(SupplyAudit {
            conserved: counters.is_conserved(),
            within_cap: cap == 0 || counters.current_supply <= cap,
            burned_by_source_total,
            burn_records_total,
            aggregates_consistent: burned_by_source_total == burn_records_total,
            burn_records,
            counters,
        })
    }
}
