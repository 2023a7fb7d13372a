//! Rolling transaction-volume estimate.
//!
//! A persisted ring of per-block transaction counts with a running sum. The
//! per-day estimate is the mean block count scaled to `BLOCKS_PER_DAY`.

use crate::errors::{MonetaryError, Result};
use crate::keeper::KeeperTx;
use crate::records::TxVolumeMeta;
use crate::state::MonetaryState;
use tracing::{debug, info};
use trichain_types::BLOCKS_PER_DAY;

impl TxVolumeMeta {
    fn empty(capacity: u64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Mean transactions per block scaled to one day; zero without samples.
    pub fn per_day_estimate(&self) -> u64 {
        if self.filled == 0 {
            return 0;
        }
        let estimate = self.sum.saturating_mul(BLOCKS_PER_DAY as u128) / self.filled as u128;
        u64::try_from(estimate).unwrap_or(u64::MAX)
    }
}

impl MonetaryState<'_> {
    pub fn tx_per_day_estimate(&self) -> Result<u64> {
        Ok(self
            .tx_volume_meta()?
            .map(|meta| meta.per_day_estimate())
            .unwrap_or(0))
    }
}

impl KeeperTx<'_> {
    /// Push the transaction count of block `height` into the ring.
    ///
    /// Heights at or below the last recorded one are ignored. A changed ring
    /// size restarts the window.
    pub fn record_block_txs(&mut self, height: u64, tx_count: u64) -> Result<TxVolumeMeta> {
        let capacity = self.config.tx_volume_window_blocks;
        if capacity == 0 {
            return Err(MonetaryError::validation(
                "tx_volume_window_blocks",
                "must be positive",
            ));
        }
        let mut meta = match self.state.tx_volume_meta()? {
            Some(meta) if meta.capacity == capacity => meta,
            Some(meta) => {
                info!(
                    target: "monetary",
                    from = meta.capacity,
                    to = capacity,
                    "tx volume window resized; restarting estimate"
                );
                TxVolumeMeta::empty(capacity)
            }
            None => TxVolumeMeta::empty(capacity),
        };
        if meta.filled > 0 && height <= meta.last_height {
            debug!(target: "monetary", height, last = meta.last_height, "block already recorded");
            return Ok(meta);
        }

        let slot = meta.cursor;
        if meta.filled == meta.capacity {
            let evicted = self.state.tx_volume_slot(slot)?;
            meta.sum = meta.sum.saturating_sub(evicted as u128);
        } else {
            meta.filled += 1;
        }
        meta.sum = meta.sum.saturating_add(tx_count as u128);
        self.state.put_tx_volume_slot(slot, tx_count)?;
        meta.cursor = (slot + 1) % meta.capacity;
        meta.last_height = height;
        self.state.put_tx_volume_meta(&meta)?;
        Ok(meta)
    }
}
