//! Trichain Monetary Policy
//!
//! State machine behind the native coin's supply:
//! - Capped minting and per-epoch inflation provisions
//! - Burns with a treasury redirect and fee sweeping
//! - An adaptive controller for the fee burn ratio
//! - Four-way emission split across staking, the PoC chain, the sequencer
//!   chain and the treasury
//! - Cross-chain burn reconciliation and reward packet lifecycle
//! - Genesis allocations with vesting
//!
//! [`MonetaryKeeper`] is the entry point: commands in [`msgs`], queries in
//! [`query`] and the per-block hooks in [`hooks`].

pub mod adaptive;
pub mod burn;
pub mod config;
pub mod context;
pub mod crosschain;
pub mod distribution;
pub mod errors;
pub mod events;
pub mod genesis;
pub mod hooks;
pub mod keeper;
pub mod mint;
pub mod msgs;
pub mod params;
pub mod query;
pub mod records;
pub mod state;
pub mod tx_volume;

pub use adaptive::{
    effective_burn_ratio, select_target, smooth, AdaptiveBurnUpdate, BurnDecision, BurnTelemetry,
    BurnTrigger,
};
pub use burn::{split_burn, BurnOutcome, FeeSweep, UsageChargeOutcome};
pub use config::{ChainRole, ConfigError, LogFormat, MonetaryConfig, PeerChainConfig};
pub use context::{BlockContext, BlockTelemetry};
pub use crosschain::{
    BurnReport, LengthCheckVerifier, PacketAck, PacketSender, ProofVerifier,
    RecordingPacketSender, ReportOutcome, RewardPacket,
};
pub use distribution::{split_emission, DistributionOutcome, EmissionSplitResult, RewardRecipient};
pub use errors::{MonetaryError, Result};
pub use events::{EventLog, MonetaryEvent};
pub use genesis::{GenesisAllocation, GenesisState};
pub use hooks::EndBlockReport;
pub use keeper::{KeeperTx, MonetaryKeeper};
pub use mint::{block_provisions, epoch_provisions, MintOutcome, Provisions};
pub use msgs::{
    MsgApplyUsageCharge, MsgBurnTokens, MsgDistributeRewards, MsgMintTokens, MsgReportBurn,
    MsgSetTreasuryAddress, MsgUpdateParams,
};
pub use params::{
    AdaptiveBurnParams, BurnRates, EmissionSplit, FeeBurnParams, GasConversion, GovernanceParams,
    MonetaryParams,
};
pub use query::{
    AdaptiveBurnSnapshot, BurnPage, ChainMetrics, EmissionAllocation, FilteredBurns,
    InflationMetrics, ProjectionPoint, SupplyMetrics, SupplyProjection, TreasuryStatus,
};
pub use records::{
    BurnRecord, ChainState, EmissionRecord, EmissionTotals, PendingPacket, ProcessedReport,
    SupplyCounters, TxVolumeMeta,
};
pub use state::{MonetaryState, SupplyAudit};

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
