//! Cross-chain reconciliation.
//!
//! Inbound: burn reports from peer chains are checked by an injected
//! [`ProofVerifier`] and applied exactly once per `(origin chain, tx hash)`.
//! Outbound: reward packets handed to the [`PacketSender`] stay pending until
//! the peer acknowledges them, reports an error, or the timeout height
//! passes. Errors and timeouts refund the escrowed reward to the treasury.

use crate::errors::{MonetaryError, Result};
use crate::events::MonetaryEvent;
use crate::keeper::KeeperTx;
use crate::records::{BurnRecord, ProcessedReport};
use crate::BlockContext;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use trichain_treasury::InflowCause;
use trichain_types::{Amount, BurnSource, ChainId, CROSSCHAIN_ESCROW_MODULE};

/// Burn that happened on a peer chain, as relayed to this chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnReport {
    pub amount: Amount,
    pub source: BurnSource,
    pub chain_id: ChainId,
    pub block_height: u64,
    pub tx_hash: String,
    /// Burner account in the peer chain's own encoding.
    #[serde(default)]
    pub burner: Option<String>,
    pub proof: Vec<u8>,
}

/// Verifies the proof attached to an inbound burn report.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, report: &BurnReport) -> std::result::Result<(), String>;
}

/// Accepts any proof of at least `min_len` bytes.
#[derive(Debug, Clone, Copy)]
pub struct LengthCheckVerifier {
    min_len: usize,
}

impl LengthCheckVerifier {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl ProofVerifier for LengthCheckVerifier {
    fn verify(&self, report: &BurnReport) -> std::result::Result<(), String> {
        if report.proof.len() < self.min_len {
            return Err(format!(
                "proof is {} bytes, need at least {}",
                report.proof.len(),
                self.min_len
            ));
        }
        Ok(())
    }
}

/// Reward transfer sent to a peer chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPacket {
    pub sequence: u64,
    pub source_chain: ChainId,
    pub dest_chain: ChainId,
    pub channel_id: String,
    pub receiver: String,
    pub amount: Amount,
    pub timeout_height: u64,
}

/// The hosting chain's channel module.
pub trait PacketSender: Send + Sync {
    fn send_packet(&mut self, packet: &RewardPacket) -> std::result::Result<(), String>;
}

#[derive(Debug, Default)]
struct RecordingInner {
    sent: Vec<RewardPacket>,
    failing_channels: HashSet<String>,
}

/// In-memory packet sender. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacketSender {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingPacketSender {
    pub fn sent(&self) -> Vec<RewardPacket> {
        self.inner.lock().sent.clone()
    }

    /// Make every send on `channel_id` fail.
    pub fn fail_channel(&self, channel_id: impl Into<String>) {
        self.inner.lock().failing_channels.insert(channel_id.into());
    }
}

impl PacketSender for RecordingPacketSender {
    fn send_packet(&mut self, packet: &RewardPacket) -> std::result::Result<(), String> {
        let mut inner = self.inner.lock();
        if inner.failing_channels.contains(&packet.channel_id) {
            return Err(format!("channel {} is closed", packet.channel_id));
        }
        inner.sent.push(packet.clone());
        Ok(())
    }
}

/// Delivery outcome of a reward packet reported by the channel module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PacketAck {
    Success { sequence: u64 },
    Error { sequence: u64, reason: String },
    Timeout { sequence: u64 },
}

impl PacketAck {
    pub fn sequence(&self) -> u64 {
        match self {
            PacketAck::Success { sequence }
            | PacketAck::Error { sequence, .. }
            | PacketAck::Timeout { sequence } => *sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    /// False when the report had already been applied.
    pub applied: bool,
    pub burn_id: u64,
}

impl KeeperTx<'_> {
    /// Apply an inbound burn report once.
    pub fn on_recv_burn_report(
        &mut self,
        report: &BurnReport,
        ctx: &BlockContext,
    ) -> Result<ReportOutcome> {
        if report.proof.is_empty() {
            return Err(MonetaryError::InvalidProof("proof is empty".into()));
        }
        if report.amount == 0 {
            return Err(MonetaryError::InvalidAmount);
        }
        if report.tx_hash.trim().is_empty() {
            return Err(MonetaryError::validation("tx_hash", "must not be empty"));
        }
        let mut chain = match self.state.chain_state(&report.chain_id)? {
            Some(chain) if chain.active => chain,
            _ => return Err(MonetaryError::InvalidChannel(report.chain_id.clone())),
        };
        self.verifier
            .verify(report)
            .map_err(MonetaryError::InvalidProof)?;

        if let Some(done) = self.state.processed_report(&report.chain_id, &report.tx_hash)? {
            debug!(
                target: "crosschain",
                chain = %report.chain_id,
                tx_hash = %report.tx_hash,
                burn_id = done.burn_id,
                "burn report already applied"
            );
            return Ok(ReportOutcome {
                applied: false,
                burn_id: done.burn_id,
            });
        }

        self.state.add_burned(report.amount)?;
        self.state
            .add_burn_aggregates(report.source, &report.chain_id, report.amount)?;

        chain.total_burns = chain
            .total_burns
            .checked_add(report.amount)
            .ok_or_else(|| MonetaryError::overflow("chain burns"))?;
        chain.last_sync_height = chain.last_sync_height.max(report.block_height);
        self.state.put_chain_state(&chain)?;

        let burn_id = self.state.next_burn_id()?;
        self.state.put_burn_record(&BurnRecord {
            id: burn_id,
            amount: report.amount,
            burner: report
                .burner
                .clone()
                .unwrap_or_else(|| format!("{}:unknown", report.chain_id)),
            source: report.source,
            chain_id: report.chain_id.clone(),
            block_height: report.block_height,
            tx_hash: Some(report.tx_hash.clone()),
            timestamp: ctx.timestamp(),
            treasury_portion: 0,
        })?;
        self.state.put_processed_report(&ProcessedReport {
            chain_id: report.chain_id.clone(),
            tx_hash: report.tx_hash.clone(),
            burn_id,
        })?;

        info!(
            target: "crosschain",
            chain = %report.chain_id,
            source = %report.source,
            amount = %report.amount,
            burn_id,
            "reconciled peer-chain burn"
        );
        self.emit(MonetaryEvent::BurnReportReconciled {
            burn_id,
            chain_id: report.chain_id.clone(),
            tx_hash: report.tx_hash.clone(),
            source: report.source,
            amount: report.amount,
        });
        Ok(ReportOutcome {
            applied: true,
            burn_id,
        })
    }

    /// Settle one pending packet. Returns false for unknown or settled sequences.
    pub fn on_packet_ack(&mut self, ack: &PacketAck, ctx: &BlockContext) -> Result<bool> {
        let sequence = ack.sequence();
        let Some(packet) = self.state.pending_packet(sequence)? else {
            debug!(target: "crosschain", sequence, "ack for unknown or settled packet");
            return Ok(false);
        };
        match ack {
            PacketAck::Success { .. } => {
                self.state.remove_pending_packet(sequence)?;
                debug!(target: "crosschain", sequence, chain = %packet.dest_chain, "packet acknowledged");
                self.emit(MonetaryEvent::PacketAcknowledged {
                    sequence,
                    chain_id: packet.dest_chain,
                });
            }
            PacketAck::Error { reason, .. } => {
                self.refund_packet(sequence, reason.clone(), ctx)?;
            }
            PacketAck::Timeout { .. } => {
                self.refund_packet(sequence, "timeout".into(), ctx)?;
            }
        }
        Ok(true)
    }

    fn refund_packet(&mut self, sequence: u64, reason: String, ctx: &BlockContext) -> Result<()> {
        let packet = self
            .state
            .pending_packet(sequence)?
            .ok_or(MonetaryError::UnknownPacket(sequence))?;
        let mut treasury = self.state.treasury()?;
        self.send_from_module(
            CROSSCHAIN_ESCROW_MODULE,
            &treasury.address,
            packet.amount,
            ctx.time_unix,
        )?;
        treasury.record_inflow(InflowCause::Refund, packet.amount);
        self.state.put_treasury(&treasury)?;

        if let Some(mut chain) = self.state.chain_state(&packet.dest_chain)? {
            chain.total_rewards_sent = chain.total_rewards_sent.saturating_sub(packet.amount);
            self.state.put_chain_state(&chain)?;
        }
        self.state.remove_pending_packet(sequence)?;

        warn!(
            target: "crosschain",
            sequence,
            chain = %packet.dest_chain,
            amount = %packet.amount,
            %reason,
            "reward packet refunded to treasury"
        );
        self.emit(MonetaryEvent::PacketRefunded {
            sequence,
            chain_id: packet.dest_chain,
            amount: packet.amount,
            reason,
        });
        Ok(())
    }
}
