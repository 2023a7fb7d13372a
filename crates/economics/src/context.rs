use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Block being executed when a command or hook runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    /// Block time, unix seconds.
    pub time_unix: i64,
    /// Hash of the transaction being executed, if any.
    #[serde(default)]
    pub tx_ref: Option<String>,
}

impl BlockContext {
    pub fn new(height: u64, time_unix: i64) -> Self {
        Self {
            height,
            time_unix,
            tx_ref: None,
        }
    }

    pub fn with_tx(mut self, tx_ref: impl Into<String>) -> Self {
        self.tx_ref = Some(tx_ref.into());
        self
    }

    /// Block time as a timestamp; out-of-range times map to the unix epoch.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.time_unix, 0).unwrap_or_default()
    }
}

/// Execution telemetry of one finished block, fed to the end-block hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTelemetry {
    pub height: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub tx_count: u64,
}
