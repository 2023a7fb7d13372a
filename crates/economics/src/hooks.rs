//! Per-block hooks.
//!
//! Hook steps never fail the block. Each step runs as its own atomic step;
//! a failing step is logged, rolled back and skipped while the others run.

use crate::adaptive::AdaptiveBurnUpdate;
use crate::burn::FeeSweep;
use crate::context::BlockTelemetry;
use crate::crosschain::PacketAck;
use crate::distribution::DistributionOutcome;
use crate::errors::MonetaryError;
use crate::keeper::MonetaryKeeper;
use crate::BlockContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use trichain_storage::KvStore;
use trichain_treasury::BankLedger;

/// What the end-block hook did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndBlockReport {
    pub height: u64,
    pub fee_sweep: Option<FeeSweep>,
    pub tx_per_day_estimate: u64,
    pub acks_processed: u32,
    pub packets_timed_out: u32,
    pub emission: Option<DistributionOutcome>,
    /// Steps that failed and were skipped, with their error.
    pub failed_steps: Vec<(String, String)>,
}

impl EndBlockReport {
    fn failed(&mut self, step: &str, height: u64, err: MonetaryError) {
        error!(target: "monetary", step, height, error = %err, "end-block step failed; continuing");
        self.failed_steps.push((step.to_string(), err.to_string()));
    }
}

impl<S: KvStore, B: BankLedger> MonetaryKeeper<S, B> {
    /// Recompute the adaptive burn ratio from the previous block's telemetry.
    ///
    /// On failure the previous ratio stays in force and `None` is returned.
    pub fn begin_block(&mut self, ctx: &BlockContext) -> Option<AdaptiveBurnUpdate> {
        match self.is_initialized() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(target: "adaptive_burn", height = ctx.height, error = %err, "state unreadable; keeping previous ratio");
                return None;
            }
        }
        let result = match self.burn_telemetry() {
            Ok(telemetry) => self.transact(|tx| tx.update_adaptive_burn(&telemetry, ctx.height)),
            Err(err) => Err(err),
        };
        match result {
            Ok(update) => Some(update),
            Err(err) => {
                warn!(
                    target: "adaptive_burn",
                    height = ctx.height,
                    error = %err,
                    "adaptive burn update failed; keeping previous ratio"
                );
                None
            }
        }
    }

    /// Fee sweep, transaction statistics, packet acknowledgements and
    /// timeouts, then the emission epoch when `height` is on an epoch boundary.
    pub fn end_block(
        &mut self,
        ctx: &BlockContext,
        telemetry: &BlockTelemetry,
        acks: &[PacketAck],
    ) -> EndBlockReport {
        let mut report = EndBlockReport {
            height: ctx.height,
            ..EndBlockReport::default()
        };
        match self.is_initialized() {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "monetary", height = ctx.height, "not initialized; skipping end block");
                return report;
            }
            Err(err) => {
                report.failed("load_state", ctx.height, err);
                return report;
            }
        }

        match self.transact(|tx| tx.sweep_fees(ctx)) {
            Ok(sweep) => report.fee_sweep = sweep,
            Err(err) => report.failed("fee_sweep", ctx.height, err),
        }

        let block = BlockTelemetry {
            height: ctx.height,
            ..*telemetry
        };
        let recorded = self.transact(|tx| {
            let meta = tx.record_block_txs(ctx.height, block.tx_count)?;
            tx.state.put_last_telemetry(&block)?;
            Ok(meta.per_day_estimate())
        });
        match recorded {
            Ok(estimate) => report.tx_per_day_estimate = estimate,
            Err(err) => report.failed("tx_volume", ctx.height, err),
        }

        for ack in acks {
            match self.transact(|tx| tx.on_packet_ack(ack, ctx)) {
                Ok(true) => report.acks_processed += 1,
                Ok(false) => {}
                Err(err) => report.failed("packet_ack", ctx.height, err),
            }
        }

        // One step per expired packet.
        match self.pending_packets() {
            Ok(pending) => {
                let expired = pending.into_iter().filter(|p| p.timeout_height <= ctx.height);
                for packet in expired {
                    let timeout = PacketAck::Timeout {
                        sequence: packet.sequence,
                    };
                    match self.transact(|tx| tx.on_packet_ack(&timeout, ctx)) {
                        Ok(true) => report.packets_timed_out += 1,
                        Ok(false) => {}
                        Err(err) => report.failed("packet_timeout", ctx.height, err),
                    }
                }
            }
            Err(err) => report.failed("packet_timeouts", ctx.height, err),
        }

        let interval = match self.params() {
            Ok(params) => params.reward_stream_interval,
            Err(err) => {
                report.failed("load_params", ctx.height, err);
                return report;
            }
        };
        if ctx.height > 0 && interval > 0 && ctx.height % interval == 0 {
            match self.transact(|tx| tx.run_emission_epoch(ctx)) {
                Ok(outcome) => report.emission = outcome,
                Err(err) => report.failed("emission_epoch", ctx.height, err),
            }
        }
        report
    }
}
