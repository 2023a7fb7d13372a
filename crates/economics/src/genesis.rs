//! Genesis import and export.
//!
//! The genesis document is validated as a whole before anything is written.
//! Allocations are minted through the monetary module account and credited
//! to their owners, vested ones behind a vesting window.

use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::params::MonetaryParams;
use crate::records::{
    BurnRecord, ChainState, EmissionRecord, EmissionTotals, PendingPacket, ProcessedReport,
    SupplyCounters,
};
use crate::state::MonetaryState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};
use trichain_storage::keys;
use trichain_treasury::{FeeTotals, TreasuryState};
use trichain_types::{Address, Amount, VestingSchedule, VestingWindow, MONETARY_MODULE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub address: Address,
    pub amount: Amount,
    /// Free-form label such as "team", "foundation" or "community".
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub vesting: bool,
    #[serde(default)]
    pub schedule: Option<VestingSchedule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: MonetaryParams,
    pub current_supply: Amount,
    pub total_minted: Amount,
    #[serde(default)]
    pub total_burned: Amount,
    #[serde(default)]
    pub allocations: Vec<GenesisAllocation>,
    pub treasury: TreasuryState,
    #[serde(default)]
    pub burn_records: Vec<BurnRecord>,
    #[serde(default)]
    pub emission_records: Vec<EmissionRecord>,
    /// Peer chains; taken from the runtime configuration when empty.
    #[serde(default)]
    pub chain_states: Vec<ChainState>,
    #[serde(default)]
    pub processed_reports: Vec<ProcessedReport>,
    #[serde(default)]
    pub pending_packets: Vec<PendingPacket>,
    #[serde(default)]
    pub fee_totals: FeeTotals,
    /// Unix time used as the default vesting start.
    #[serde(default)]
    pub genesis_time: i64,
}

fn invalid(reason: impl Into<String>) -> MonetaryError {
    MonetaryError::InvalidGenesis(reason.into())
}

impl GenesisState {
    /// Genesis with default parameters where `allocations` make up the whole supply.
    pub fn with_allocations(
        treasury: Address,
        allocations: Vec<GenesisAllocation>,
        genesis_time: i64,
    ) -> Self {
        let supply = allocations
            .iter()
            .fold(0u128, |acc, a| acc.saturating_add(a.amount));
        Self {
            params: MonetaryParams::default(),
            current_supply: supply,
            total_minted: supply,
            total_burned: 0,
            allocations,
            treasury: TreasuryState::new(treasury, 0),
            burn_records: Vec::new(),
            emission_records: Vec::new(),
            chain_states: Vec::new(),
            processed_reports: Vec::new(),
            pending_packets: Vec::new(),
            fee_totals: FeeTotals::default(),
            genesis_time,
        }
    }

    pub fn counters(&self) -> SupplyCounters {
        SupplyCounters {
            current_supply: self.current_supply,
            total_minted: self.total_minted,
            total_burned: self.total_burned,
        }
    }

    /// Parameters with the supply snapshot set to the declared counters.
    pub fn resolved_params(&self) -> MonetaryParams {
        MonetaryParams {
            current_supply: self.current_supply,
            total_minted: self.total_minted,
            total_burned: self.total_burned,
            ..self.params.clone()
        }
    }

    /// Check the document without touching any state.
    pub fn validate(&self) -> Result<()> {
        let counters = self.counters();
        if !counters.is_conserved() {
            return Err(invalid(format!(
                "current supply {} != minted {} - burned {}",
                self.current_supply, self.total_minted, self.total_burned
            )));
        }
        self.resolved_params().validate()?;
        self.validate_allocations()?;

        let mut burn_ids = HashSet::new();
        for record in &self.burn_records {
            if record.id == 0 || !burn_ids.insert(record.id) {
                return Err(invalid(format!("burn record id {} is zero or repeated", record.id)));
            }
            if record.treasury_portion > record.amount {
                return Err(invalid(format!(
                    "burn record {} redirects more than its amount",
                    record.id
                )));
            }
        }
        let mut emission_ids = HashSet::new();
        for record in &self.emission_records {
            if record.id == 0 || !emission_ids.insert(record.id) {
                return Err(invalid(format!("emission record id {} is zero or repeated", record.id)));
            }
        }
        let mut chains = HashSet::new();
        for chain in &self.chain_states {
            if !chains.insert(&chain.chain_id) {
                return Err(invalid(format!("chain {} listed twice", chain.chain_id)));
            }
        }
        let mut reports = HashSet::new();
        for report in &self.processed_reports {
            if !reports.insert((&report.chain_id, &report.tx_hash)) {
                return Err(invalid(format!(
                    "burn report {}/{} listed twice",
                    report.chain_id, report.tx_hash
                )));
            }
        }
        let mut sequences = HashSet::new();
        for packet in &self.pending_packets {
            if packet.sequence == 0 || !sequences.insert(packet.sequence) {
                return Err(invalid(format!(
                    "packet sequence {} is zero or repeated",
                    packet.sequence
                )));
            }
        }
        Ok(())
    }

    fn validate_allocations(&self) -> Result<()> {
        if self.allocations.is_empty() {
            return Ok(());
        }
        let mut seen = HashSet::with_capacity(self.allocations.len());
        let mut sum: Amount = 0;
        for allocation in &self.allocations {
            if allocation.amount == 0 {
                return Err(invalid(format!("allocation to {} is zero", allocation.address)));
            }
            if !seen.insert(allocation.address) {
                return Err(invalid(format!("address {} allocated twice", allocation.address)));
            }
            if allocation.vesting {
                let schedule = allocation.schedule.as_ref().ok_or_else(|| {
                    invalid(format!("vested allocation to {} has no schedule", allocation.address))
                })?;
                VestingWindow::from_schedule(allocation.amount, schedule, self.genesis_time)
                    .map_err(|e| invalid(format!("schedule for {}: {e}", allocation.address)))?;
            }
            sum = sum
                .checked_add(allocation.amount)
                .ok_or_else(|| invalid("allocation total overflows"))?;
        }
        if sum != self.current_supply {
            return Err(invalid(format!(
                "allocations sum to {sum}, declared supply is {}",
                self.current_supply
            )));
        }
        Ok(())
    }
}

impl KeeperTx<'_> {
    /// Load a genesis document into an empty store.
    pub fn apply_genesis(&mut self, genesis: &GenesisState) -> Result<()> {
        if self.state.is_initialized()? {
            return Err(invalid("monetary state is already initialized"));
        }
        genesis.validate()?;

        self.state.put_params(&genesis.resolved_params())?;
        self.state.put_supply(&genesis.counters())?;
        self.state.put_treasury(&genesis.treasury)?;
        self.state.put_fee_totals(&genesis.fee_totals)?;

        for record in &genesis.burn_records {
            self.state.put_burn_record(record)?;
            self.state
                .add_burn_aggregates(record.source, &record.chain_id, record.burned())?;
            self.state.bump_sequence_past(keys::NEXT_BURN_ID_KEY, record.id)?;
        }
        let mut totals = EmissionTotals::default();
        for record in &genesis.emission_records {
            self.state.put_emission_record(record)?;
            totals.record(record);
            self.state.bump_sequence_past(keys::NEXT_EMISSION_ID_KEY, record.id)?;
        }
        self.state.put_emission_totals(&totals)?;

        if genesis.chain_states.is_empty() {
            for peer in &self.config.peers {
                self.state.put_chain_state(&ChainState::new(
                    peer.chain_id.clone(),
                    peer.channel_id.clone(),
                    peer.active,
                ))?;
            }
        } else {
            for chain in &genesis.chain_states {
                self.state.put_chain_state(chain)?;
            }
        }
        for report in &genesis.processed_reports {
            self.state.put_processed_report(report)?;
        }
        for packet in &genesis.pending_packets {
            self.state.put_pending_packet(packet)?;
            self.state.bump_sequence_past(keys::NEXT_PACKET_SEQ_KEY, packet.sequence)?;
        }

        for allocation in &genesis.allocations {
            self.mint_coins(MONETARY_MODULE, allocation.amount)?;
            self.send_from_module(
                MONETARY_MODULE,
                &allocation.address,
                allocation.amount,
                genesis.genesis_time,
            )?;
            if let (true, Some(schedule)) = (allocation.vesting, allocation.schedule.as_ref()) {
                let window =
                    VestingWindow::from_schedule(allocation.amount, schedule, genesis.genesis_time)
                        .map_err(|e| invalid(e.to_string()))?;
                self.create_vesting_account(&allocation.address, window)?;
                debug!(
                    target: "genesis",
                    address = %allocation.address,
                    amount = %allocation.amount,
                    start = window.start,
                    end = window.end,
                    "vesting account created"
                );
            }
        }

        info!(
            target: "genesis",
            current_supply = %genesis.current_supply,
            allocations = genesis.allocations.len(),
            burn_records = genesis.burn_records.len(),
            "genesis applied"
        );
        self.emit(MonetaryEvent::GenesisApplied {
            current_supply: genesis.current_supply,
            allocations: genesis.allocations.len(),
        });
        Ok(())
    }
}

impl MonetaryState<'_> {
    /// Snapshot the store as a genesis document. Allocations are not part
    /// of the export since they are consumed at genesis.
    pub fn export_genesis(&self) -> Result<GenesisState> {
        let counters = self.supply()?;
        Ok(GenesisState {
            params: self.params()?,
            current_supply: counters.current_supply,
            total_minted: counters.total_minted,
            total_burned: counters.total_burned,
            allocations: Vec::new(),
            treasury: self.treasury()?,
            burn_records: self.burn_records(None, None)?,
            emission_records: self.emission_records(None, None)?,
            chain_states: self.chain_states()?,
            processed_reports: self.processed_reports()?,
            pending_packets: self.pending_packets()?,
            fee_totals: self.fee_totals()?,
            genesis_time: 0,
        })
    }
}
