mod common;

use common::*;
use tempfile::TempDir;
use trichain_economics::{
    BlockContext, BurnReport, GenesisAllocation, GenesisState, MonetaryConfig, MonetaryError,
    MonetaryEvent, MonetaryKeeper, MsgBurnTokens,
};
use trichain_storage::{MemoryStore, SledStore};
use trichain_treasury::{BankLedger, InMemoryBank};
use trichain_types::{BurnSource, ChainId, VestingSchedule};

const TOTAL_GENESIS: u128 = 375_000_000_000_000;

fn vested(label: &str, amount: u128, duration_secs: u64, linear: bool) -> GenesisAllocation {
    GenesisAllocation {
        vesting: true,
        schedule: Some(VestingSchedule {
            cliff_secs: 0,
            duration_secs,
            linear,
            start_time: None,
        }),
        ..allocation(label, amount)
    }
}

fn at(time_unix: i64) -> BlockContext {
    BlockContext::new(1, time_unix)
}

fn burn(label: &str, amount: u128) -> MsgBurnTokens {
    MsgBurnTokens {
        burner: addr(label),
        amount,
        source: BurnSource::StorageRent,
        chain_id: None,
    }
}

#[test]
fn genesis_allocations_must_match_supply_exactly() {
    let doc = genesis(&[("team", 75_000_000_000_000), ("community", 300_000_000_000_000)]);
    assert_eq!(doc.current_supply, TOTAL_GENESIS);

    for delta in [-1i128, 1] {
        let mut bad = doc.clone();
        bad.current_supply = (TOTAL_GENESIS as i128 + delta) as u128;
        bad.total_minted = bad.current_supply;
        let mut keeper = MonetaryKeeper::new(
            MemoryStore::new(),
            InMemoryBank::new(),
            MonetaryConfig::default(),
        );
        assert!(matches!(
            keeper.init_genesis(&bad),
            Err(MonetaryError::InvalidGenesis(_))
        ));
        assert!(!keeper.is_initialized().unwrap());
        assert_eq!(keeper.bank().total_supply(), 0);
    }

    let mut keeper = MonetaryKeeper::new(
        MemoryStore::new(),
        InMemoryBank::new(),
        MonetaryConfig::default(),
    );
    keeper.init_genesis(&doc).unwrap();
    assert_eq!(keeper.bank().total_supply(), TOTAL_GENESIS);
    assert_eq!(keeper.bank().balance(&addr("community")), 300_000_000_000_000);
    let supply = keeper.supply_metrics().unwrap();
    assert_eq!((supply.current_supply, supply.total_minted), (TOTAL_GENESIS, TOTAL_GENESIS));
    assert_eq!(
        keeper.drain_events(),
        vec![MonetaryEvent::GenesisApplied {
            current_supply: TOTAL_GENESIS,
            allocations: 2
        }]
    );
    // Peer chains come from the node configuration.
    assert_eq!(keeper.chain_metrics().unwrap().len(), 2);
}

#[test]
fn genesis_applies_only_once() {
    let mut keeper = keeper(&[("alice", 1_000)]);
    assert!(matches!(
        keeper.init_genesis(&genesis(&[("bob", 1_000)])),
        Err(MonetaryError::InvalidGenesis(_))
    ));
    assert_eq!(keeper.bank().balance(&addr("bob")), 0);
    assert_eq!(keeper.supply_metrics().unwrap().current_supply, 1_000);
}

#[test]
fn linear_vesting_unlocks_between_start_and_end() {
    let doc = GenesisState::with_allocations(
        treasury(),
        vec![vested("team", 1_000_000, 1_000, true), allocation("alice", 5_000)],
        GENESIS_TIME,
    );
    let mut keeper = keeper_with(InMemoryBank::new(), MonetaryConfig::default(), &doc);
    let team = addr("team");

    let window = *keeper.bank().vesting_window(&team).unwrap();
    assert_eq!((window.start, window.end), (GENESIS_TIME, GENESIS_TIME + 1_000));
    assert_eq!(keeper.bank().balance(&team), 1_000_000);
    assert_eq!(keeper.bank().spendable_balance(&team, GENESIS_TIME), 0);
    assert_eq!(keeper.bank().spendable_balance(&team, GENESIS_TIME + 500), 500_000);
    assert_eq!(keeper.bank().spendable_balance(&team, GENESIS_TIME + 1_000), 1_000_000);

    assert!(matches!(
        keeper.burn_tokens(&burn("team", 1), &at(GENESIS_TIME)),
        Err(MonetaryError::InsufficientBalance { available: 0, .. })
    ));
    assert!(keeper
        .burn_tokens(&burn("team", 500_001), &at(GENESIS_TIME + 500))
        .is_err());
    keeper
        .burn_tokens(&burn("team", 500_000), &at(GENESIS_TIME + 500))
        .unwrap();
    assert_eq!(keeper.bank().balance(&team), 500_000);
}

#[test]
fn milestone_vesting_releases_at_end() {
    let doc = GenesisState::with_allocations(
        treasury(),
        vec![vested("advisor", 10_000, 600, false)],
        GENESIS_TIME,
    );
    let keeper = keeper_with(InMemoryBank::new(), MonetaryConfig::default(), &doc);
    let advisor = addr("advisor");
    assert_eq!(keeper.bank().spendable_balance(&advisor, GENESIS_TIME + 300), 0);
    assert_eq!(keeper.bank().spendable_balance(&advisor, GENESIS_TIME + 599), 0);
    assert_eq!(keeper.bank().spendable_balance(&advisor, GENESIS_TIME + 600), 10_000);
}

#[test]
fn vesting_without_schedule_rejected() {
    let mut doc = genesis(&[("team", 1_000)]);
    doc.allocations[0].vesting = true;
    let mut keeper = MonetaryKeeper::new(
        MemoryStore::new(),
        InMemoryBank::new(),
        MonetaryConfig::default(),
    );
    assert!(matches!(
        keeper.init_genesis(&doc),
        Err(MonetaryError::InvalidGenesis(_))
    ));
}

#[test]
fn exported_state_restores_into_fresh_store() {
    let mut keeper = keeper(&[("alice", 1_000 * TRI), ("treasury", 100 * TRI)]);
    keeper.burn_tokens(&burn("alice", 10 * TRI), &ctx(1)).unwrap();
    keeper.burn_tokens(&burn("alice", 20 * TRI), &ctx(2)).unwrap();
    let report = BurnReport {
        amount: 3 * TRI,
        source: BurnSource::SequencerGas,
        chain_id: ChainId::sequencer(),
        block_height: 9,
        tx_hash: "0x99".into(),
        burner: None,
        proof: vec![1; 32],
    };
    keeper.report_burn(&report, &ctx(3)).unwrap();

    let exported = keeper.export_genesis().unwrap();
    assert!(exported.allocations.is_empty());
    assert_eq!(exported.burn_records.len(), 3);
    let json = serde_json::to_string_pretty(&exported).unwrap();
    let parsed: GenesisState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, exported);

    let mut restored = MonetaryKeeper::new(
        MemoryStore::new(),
        keeper.bank().clone(),
        MonetaryConfig::default(),
    );
    restored.init_genesis(&parsed).unwrap();
    assert_eq!(restored.supply_metrics().unwrap(), keeper.supply_metrics().unwrap());
    assert_eq!(restored.params().unwrap(), keeper.params().unwrap());
    assert_eq!(
        restored.burn_history(None, None).unwrap(),
        keeper.burn_history(None, None).unwrap()
    );
    assert_eq!(
        restored.burn_totals_by_source().unwrap(),
        keeper.burn_totals_by_source().unwrap()
    );
    assert_eq!(restored.treasury_status().unwrap(), keeper.treasury_status().unwrap());
    assert!(restored.audit().unwrap().aggregates_consistent);

    // Identifiers and report dedup carry over.
    assert!(!restored.report_burn(&report, &ctx(4)).unwrap().applied);
    let next = restored.burn_tokens(&burn("alice", TRI), &ctx(4)).unwrap();
    assert_eq!(next.burn_id, 4);
}

#[test]
fn sled_backed_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let doc = genesis(&[("alice", 1_000 * TRI)]);
    let bank = {
        let store = SledStore::new(dir.path()).unwrap();
        let mut keeper = MonetaryKeeper::new(store, InMemoryBank::new(), MonetaryConfig::default());
        keeper.init_genesis(&doc).unwrap();
        keeper.burn_tokens(&burn("alice", 50 * TRI), &ctx(1)).unwrap();
        keeper.store().flush().unwrap();
        keeper.bank().clone()
    };

    let store = SledStore::new(dir.path()).unwrap();
    let mut keeper = MonetaryKeeper::new(store, bank, MonetaryConfig::default());
    assert!(keeper.is_initialized().unwrap());
    let supply = keeper.supply_metrics().unwrap();
    assert_eq!(supply.total_burned, 45 * TRI);
    assert_eq!(supply.current_supply, 955 * TRI);
    assert_eq!(keeper.burn_history(None, None).unwrap().records.len(), 1);
    assert!(matches!(
        keeper.init_genesis(&doc),
        Err(MonetaryError::InvalidGenesis(_))
    ));
}
