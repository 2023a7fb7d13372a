//! Deterministic block simulator for the monetary policy.
//!
//! Drives a keeper through `--blocks` blocks of synthetic traffic generated
//! from `--seed`: fee-paying transactions, usage charges, congestion spikes
//! and a relayer acknowledging reward packets. Prints a JSON report with the
//! final supply, treasury, adaptive burn state and a supply projection.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trichain_economics::{
    AdaptiveBurnSnapshot, BlockContext, BlockTelemetry, EmissionTotals, GenesisAllocation,
    GenesisState, LogFormat, MonetaryConfig, MonetaryKeeper, MsgApplyUsageCharge, PacketAck,
    SupplyAudit, SupplyMetrics, SupplyProjection, TreasuryStatus,
};
use trichain_storage::{KvStore, MemoryStore, SledStore};
use trichain_treasury::{BankLedger, FeeBurnStats, InMemoryBank};
use trichain_types::{
    module_address, Address, Amount, BurnSource, VestingSchedule, BASE_UNITS_PER_TRI,
    BLOCK_INTERVAL_SECS, FEE_COLLECTOR_MODULE, SECONDS_PER_YEAR,
};

const GAS_LIMIT: u64 = 30_000_000;
const GAS_PER_TX: u64 = 21_000;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Node configuration file (TOML, YAML or JSON). TRICHAIN_* variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Genesis document (JSON). A built-in allocation is used when omitted.
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Persist state to a sled database at this path instead of memory.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Number of blocks to simulate
    #[arg(long, default_value_t = 2_000)]
    blocks: u64,

    /// Seed of the traffic generator
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Maximum transactions per block
    #[arg(long, default_value_t = 40)]
    max_txs: u64,

    /// Fee paid per transaction, in base units
    #[arg(long, default_value_t = 50_000)]
    fee_per_tx: u128,

    /// Probability that a block is fully congested
    #[arg(long, default_value_t = 0.1)]
    spike_rate: f64,

    /// Blocks a reward packet waits before the relayer acknowledges it
    #[arg(long, default_value_t = 3)]
    ack_delay: u64,

    /// Years covered by the final supply projection
    #[arg(long)]
    years: Option<u32>,

    /// Unix time of the genesis block
    #[arg(long, default_value_t = 1_700_000_000)]
    genesis_time: i64,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    blocks: u64,
    seed: u64,
    events: BTreeMap<String, u64>,
    failed_steps: u64,
    supply: SupplyMetrics,
    treasury: TreasuryStatus,
    adaptive_burn: AdaptiveBurnSnapshot,
    fee_burn: FeeBurnStats,
    emissions: EmissionTotals,
    audit: SupplyAudit,
    projection: SupplyProjection,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = MonetaryConfig::load(args.config.as_deref()).context("load configuration")?;
    init_logging(&config);

    let genesis = match &args.genesis {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read genesis {}", path.display()))?;
            serde_json::from_str(&raw).context("parse genesis document")?
        }
        None => default_genesis(args.genesis_time),
    };

    let report = match &args.store {
        Some(path) => {
            let store = SledStore::new(path)
                .with_context(|| format!("open store {}", path.display()))?;
            let (keeper, report) = simulate(store, config, &genesis, &args)?;
            keeper.store().flush().context("flush store")?;
            report
        }
        None => simulate(MemoryStore::new(), config, &genesis, &args)?.1,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_logging(config: &MonetaryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so stdout carries only the report.
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}

fn users() -> Address {
    Address::from_label("sim-users")
}

fn default_genesis(genesis_time: i64) -> GenesisState {
    let tri = |n: Amount| n * BASE_UNITS_PER_TRI;
    let allocation = |label: &str, amount: Amount| GenesisAllocation {
        address: Address::from_label(label),
        amount,
        category: label.to_string(),
        vesting: false,
        schedule: None,
    };
    let foundation = GenesisAllocation {
        vesting: true,
        schedule: Some(VestingSchedule {
            cliff_secs: SECONDS_PER_YEAR / 4,
            duration_secs: SECONDS_PER_YEAR,
            linear: true,
            start_time: None,
        }),
        ..allocation("sim-foundation", tri(40_000_000))
    };
    GenesisState::with_allocations(
        Address::from_label("sim-treasury"),
        vec![
            allocation("sim-users", tri(500_000_000)),
            allocation("sim-treasury", tri(60_000_000)),
            foundation,
        ],
        genesis_time,
    )
}

fn simulate<S: KvStore>(
    store: S,
    config: MonetaryConfig,
    genesis: &GenesisState,
    args: &Args,
) -> Result<(MonetaryKeeper<S, InMemoryBank>, SimulationReport)> {
    let mut keeper = MonetaryKeeper::new(store, InMemoryBank::new(), config);
    if keeper.is_initialized()? {
        bail!("store already holds monetary state; point --store at an empty path");
    }
    keeper.init_genesis(genesis).context("apply genesis")?;
    keeper.drain_events();
    info!(
        target: "policy_sim",
        blocks = args.blocks,
        seed = args.seed,
        supply = %genesis.current_supply,
        "starting simulation"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut events: BTreeMap<String, u64> = BTreeMap::new();
    let mut failed_steps = 0u64;
    let collector = module_address(FEE_COLLECTOR_MODULE);

    for height in 1..=args.blocks {
        let ctx = BlockContext::new(
            height,
            genesis.genesis_time + (height * BLOCK_INTERVAL_SECS) as i64,
        );
        keeper.begin_block(&ctx);

        let tx_count = rng.gen_range(0..=args.max_txs);
        let gas_used = if rng.gen_bool(args.spike_rate) {
            GAS_LIMIT
        } else {
            (tx_count * GAS_PER_TX * rng.gen_range(1..=20)).min(GAS_LIMIT)
        };

        let fees = args.fee_per_tx * tx_count as u128;
        if fees > 0 {
            if let Err(err) = keeper
                .bank_mut()
                .send_coins(&users(), &collector, fees, ctx.time_unix)
            {
                warn!(target: "policy_sim", height, error = %err, "fee deposit failed");
            }
        }
        if rng.gen_bool(0.2) {
            let source = if rng.gen_bool(0.5) {
                BurnSource::PocUsage
            } else {
                BurnSource::SequencerGas
            };
            let charge = MsgApplyUsageCharge {
                payer: users(),
                charge: args.fee_per_tx * rng.gen_range(1..=10),
                source,
            };
            if let Err(err) = keeper.apply_usage_charge(&charge, &ctx) {
                warn!(target: "policy_sim", height, error = %err, "usage charge failed");
            }
        }

        let acks = relay_acks(&keeper, &mut rng, height, args.ack_delay)?;
        let telemetry = BlockTelemetry {
            height,
            gas_used,
            gas_limit: GAS_LIMIT,
            tx_count,
        };
        let report = keeper.end_block(&ctx, &telemetry, &acks);
        failed_steps += report.failed_steps.len() as u64;
        if let Some(emission) = &report.emission {
            debug!(
                target: "policy_sim",
                height,
                total = %emission.total,
                packets = emission.packets_sent,
                "emission epoch"
            );
        }

        for event in keeper.drain_events() {
            let value = serde_json::to_value(&event)?;
            let kind = value["type"].as_str().unwrap_or("unknown").to_string();
            *events.entry(kind).or_default() += 1;
        }
    }

    let report = SimulationReport {
        blocks: args.blocks,
        seed: args.seed,
        events,
        failed_steps,
        supply: keeper.supply_metrics()?,
        treasury: keeper.treasury_status()?,
        adaptive_burn: keeper.adaptive_burn_snapshot()?,
        fee_burn: keeper.fee_burn_stats()?,
        emissions: keeper.emission_allocation()?.totals,
        audit: keeper.audit()?,
        projection: keeper.supply_projection(args.years)?,
    };
    if !report.audit.conserved || !report.audit.aggregates_consistent {
        warn!(target: "policy_sim", audit = ?report.audit, "supply audit failed");
    }
    info!(
        target: "policy_sim",
        supply = %report.supply.current_supply,
        burned = %report.supply.total_burned,
        ratio = %report.adaptive_burn.current_ratio,
        "simulation finished"
    );
    Ok((keeper, report))
}

/// Acknowledge packets older than `ack_delay` blocks; one in ten is rejected.
fn relay_acks<S: KvStore>(
    keeper: &MonetaryKeeper<S, InMemoryBank>,
    rng: &mut StdRng,
    height: u64,
    ack_delay: u64,
) -> Result<Vec<PacketAck>> {
    Ok(keeper
        .pending_packets()?
        .into_iter()
        .filter(|p| p.sent_height + ack_delay <= height)
        .map(|p| {
            if rng.gen_bool(0.9) {
                PacketAck::Success {
                    sequence: p.sequence,
                }
            } else {
                PacketAck::Error {
                    sequence: p.sequence,
                    reason: "receiver rejected transfer".into(),
                }
            }
        })
        .collect())
}
