mod common;

use common::*;
use proptest::prelude::*;
use trichain_economics::{
    BlockTelemetry, MonetaryConfig, MonetaryError, MonetaryEvent, MsgApplyUsageCharge,
    MsgBurnTokens, MsgMintTokens, MsgSetTreasuryAddress,
};
use trichain_treasury::{BankCall, BankLedger, MockBank};
use trichain_types::{
    module_address, BurnSource, ChainId, BURN_ESCROW_MODULE, FEE_COLLECTOR_MODULE,
    MONETARY_MODULE,
};

fn burn_msg(label: &str, amount: u128) -> MsgBurnTokens {
    MsgBurnTokens {
        burner: addr(label),
        amount,
        source: BurnSource::TxFees,
        chain_id: None,
    }
}

fn mint_msg(amount: u128, recipient: &str) -> MsgMintTokens {
    MsgMintTokens {
        authority: authority(),
        amount,
        recipient: addr(recipient),
        reason: "grant".into(),
    }
}

#[test]
fn burn_redirects_ten_percent_to_treasury() {
    let mut keeper = keeper(&[("alice", 5_000_000_000), ("treasury", 1_000_000_000)]);
    let before = keeper.supply_metrics().unwrap();

    let outcome = keeper
        .burn_tokens(&burn_msg("alice", 1_000_000_000), &ctx(1).with_tx("0xfeed"))
        .unwrap();
    assert_eq!(outcome.to_treasury, 100_000_000);
    assert_eq!(outcome.burned, 900_000_000);

    let after = keeper.supply_metrics().unwrap();
    assert_eq!(after.current_supply, before.current_supply - 900_000_000);
    assert_eq!(after.total_burned, 900_000_000);
    assert_eq!(keeper.bank().total_supply(), after.current_supply);
    assert_eq!(keeper.bank().balance(&addr("alice")), 4_000_000_000);
    assert_eq!(keeper.bank().balance(&treasury()), 1_100_000_000);
    assert_eq!(keeper.bank().module_balance(BURN_ESCROW_MODULE), 0);

    let record = keeper.state().burn_record(outcome.burn_id).unwrap().unwrap();
    assert_eq!(record.amount, 1_000_000_000);
    assert_eq!(record.treasury_portion, 100_000_000);
    assert_eq!(record.chain_id, ChainId::main());
    assert_eq!(record.tx_hash.as_deref(), Some("0xfeed"));
    assert_eq!(
        keeper.state().burned_by_source(BurnSource::TxFees).unwrap(),
        900_000_000
    );
    assert_eq!(keeper.treasury_status().unwrap().burn_redirect_inflows, 100_000_000);

    let audit = keeper.audit().unwrap();
    assert!(audit.conserved && audit.within_cap && audit.aggregates_consistent);

    let events = keeper.drain_events();
    assert!(matches!(
        events.as_slice(),
        [MonetaryEvent::Burn { burned: 900_000_000, to_treasury: 100_000_000, .. }]
    ));
}

#[test]
fn burn_rejects_zero_and_overdraft() {
    let mut keeper = keeper(&[("alice", 1_000)]);
    assert!(matches!(
        keeper.burn_tokens(&burn_msg("alice", 0), &ctx(1)),
        Err(MonetaryError::InvalidAmount)
    ));
    assert!(matches!(
        keeper.burn_tokens(&burn_msg("alice", 1_001), &ctx(1)),
        Err(MonetaryError::InsufficientBalance {
            required: 1_001,
            available: 1_000
        })
    ));
    assert_eq!(keeper.supply_metrics().unwrap().total_burned, 0);
    assert!(keeper.events().is_empty());
}

#[test]
fn burn_attributed_to_peer_chain() {
    let mut keeper = keeper(&[("alice", 10_000)]);
    let msg = MsgBurnTokens {
        source: BurnSource::BridgeToll,
        chain_id: Some(ChainId::poc()),
        ..burn_msg("alice", 1_000)
    };
    keeper.burn_tokens(&msg, &ctx(3)).unwrap();

    let by_chain = keeper.burns_by_chain(&ChainId::poc(), None, None).unwrap();
    assert_eq!(by_chain.total_burned, 900);
    assert_eq!(by_chain.page.records.len(), 1);
    let by_source = keeper.burns_by_source(BurnSource::BridgeToll, None, None).unwrap();
    assert_eq!(by_source.total_burned, 900);
    assert!(keeper
        .burns_by_chain(&ChainId::main(), None, None)
        .unwrap()
        .page
        .records
        .is_empty());
}

#[test]
fn failed_treasury_leg_restores_burner() {
    let mut bank = MockBank::new();
    bank.fail_sends_to(treasury());
    let mut keeper = keeper_with(bank, MonetaryConfig::default(), &genesis(&[("alice", 10_000)]));

    let err = keeper.burn_tokens(&burn_msg("alice", 5_000), &ctx(1)).unwrap_err();
    assert!(matches!(err, MonetaryError::Ledger(_)));
    assert_eq!(keeper.bank().balance(&addr("alice")), 10_000);
    assert_eq!(keeper.bank().module_balance(BURN_ESCROW_MODULE), 0);
    assert_eq!(keeper.supply_metrics().unwrap().total_burned, 0);
    assert!(keeper.burn_history(None, None).unwrap().records.is_empty());

    // The failed attempt did not consume a burn id.
    keeper.bank_mut().clear_failures();
    let outcome = keeper.burn_tokens(&burn_msg("alice", 5_000), &ctx(2)).unwrap();
    assert_eq!(outcome.burn_id, 1);
}

#[test]
fn failed_destroy_leg_reverses_redirect() {
    let mut bank = MockBank::new();
    bank.fail_burns(true);
    let mut keeper = keeper_with(
        bank,
        MonetaryConfig::default(),
        &genesis(&[("alice", 10_000), ("treasury", 500)]),
    );

    assert!(keeper.burn_tokens(&burn_msg("alice", 2_000), &ctx(1)).is_err());
    assert_eq!(keeper.bank().balance(&addr("alice")), 10_000);
    assert_eq!(keeper.bank().balance(&treasury()), 500);
    assert_eq!(keeper.bank().total_supply(), 10_500);
    assert_eq!(keeper.treasury_status().unwrap().burn_redirect_inflows, 0);
    assert_eq!(keeper.audit().unwrap().burn_records, 0);
}

#[test]
fn mint_credits_recipient_within_cap() {
    let mut keeper = keeper(&[("alice", 1_000 * TRI)]);
    let outcome = keeper.mint_tokens(&mint_msg(250 * TRI, "bob"), &ctx(1)).unwrap();

    let supply = keeper.supply_metrics().unwrap();
    assert_eq!(supply.current_supply, 1_250 * TRI);
    assert_eq!(supply.total_minted, 1_250 * TRI);
    assert_eq!(outcome.remaining_headroom, supply.remaining_headroom);
    assert_eq!(keeper.bank().balance(&addr("bob")), 250 * TRI);
    assert_eq!(keeper.bank().module_balance(MONETARY_MODULE), 0);
}

#[test]
fn mint_past_cap_rejected() {
    let mut keeper = keeper(&[("alice", 1_000 * TRI)]);
    let headroom = keeper.supply_metrics().unwrap().remaining_headroom;

    let err = keeper
        .mint_tokens(&mint_msg(headroom + 1, "bob"), &ctx(1))
        .unwrap_err();
    assert!(matches!(
        err,
        MonetaryError::SupplyCapExceeded { requested, remaining } if requested == headroom + 1 && remaining == headroom
    ));

    keeper.mint_tokens(&mint_msg(headroom, "bob"), &ctx(2)).unwrap();
    let supply = keeper.supply_metrics().unwrap();
    assert_eq!(supply.current_supply, supply.supply_cap);
    assert_eq!(supply.remaining_headroom, 0);
    assert!(keeper.mint_tokens(&mint_msg(1, "bob"), &ctx(3)).is_err());
}

#[test]
fn mint_requires_authority() {
    let mut keeper = keeper(&[("alice", 1_000)]);
    let msg = MsgMintTokens {
        authority: addr("mallory").to_string(),
        ..mint_msg(10, "mallory")
    };
    assert!(matches!(
        keeper.mint_tokens(&msg, &ctx(1)),
        Err(MonetaryError::Unauthorized { .. })
    ));
    assert_eq!(keeper.supply_metrics().unwrap().total_minted, 1_000);
}

#[test]
fn failed_credit_reverses_module_mint() {
    let mut bank = MockBank::new();
    bank.fail_sends_to(addr("bob"));
    let mut keeper = keeper_with(bank, MonetaryConfig::default(), &genesis(&[("alice", 1_000)]));
    keeper.bank_mut().clear_calls();

    assert!(keeper.mint_tokens(&mint_msg(400, "bob"), &ctx(1)).is_err());
    assert_eq!(keeper.bank().total_supply(), 1_000);
    assert_eq!(keeper.bank().module_balance(MONETARY_MODULE), 0);
    assert_eq!(keeper.supply_metrics().unwrap().total_minted, 1_000);
    assert_eq!(
        keeper.bank().calls().last(),
        Some(&BankCall::Burn {
            module: MONETARY_MODULE.to_string(),
            amount: 400
        })
    );
}

#[test]
fn usage_charge_burns_source_share_and_collects_rest() {
    let mut keeper = keeper(&[("alice", 10_000), ("treasury", 1_000)]);
    let outcome = keeper
        .apply_usage_charge(
            &MsgApplyUsageCharge {
                payer: addr("alice"),
                charge: 1_000,
                source: BurnSource::PocUsage,
            },
            &ctx(1),
        )
        .unwrap();
    assert_eq!(outcome.to_fee_collector, 900);
    let burn = outcome.burn.unwrap();
    assert_eq!((burn.burned, burn.to_treasury), (90, 10));
    assert_eq!(keeper.bank().module_balance(FEE_COLLECTOR_MODULE), 900);
    assert_eq!(keeper.bank().balance(&addr("alice")), 9_000);

    // The collected fees are split at the end of the block.
    let report = keeper.end_block(&ctx(1), &BlockTelemetry::default(), &[]);
    let sweep = report.fee_sweep.unwrap();
    assert_eq!((sweep.collected, sweep.burned, sweep.to_treasury), (900, 720, 180));
    assert_eq!(keeper.bank().module_balance(FEE_COLLECTOR_MODULE), 0);

    let supply = keeper.supply_metrics().unwrap();
    assert_eq!(supply.total_burned, 90 + 720);
    assert_eq!(keeper.bank().total_supply(), supply.current_supply);
    let status = keeper.treasury_status().unwrap();
    assert_eq!(status.fee_inflows, 180);
    assert_eq!(status.burn_redirect_inflows, 10);
    assert_eq!(status.balance, 1_000 + 190);
    assert!(keeper.audit().unwrap().aggregates_consistent);
}

#[test]
fn treasury_address_change_redirects_future_burns() {
    let mut keeper = keeper(&[("alice", 10_000)]);
    let new_treasury = addr("treasury-2");
    keeper
        .set_treasury_address(&MsgSetTreasuryAddress {
            authority: authority(),
            address: new_treasury,
        })
        .unwrap();
    keeper.burn_tokens(&burn_msg("alice", 1_000), &ctx(1)).unwrap();

    assert_eq!(keeper.treasury_status().unwrap().address, new_treasury);
    assert_eq!(keeper.bank().balance(&new_treasury), 100);
    assert_eq!(keeper.bank().balance(&treasury()), 0);
    assert!(keeper
        .drain_events()
        .iter()
        .any(|e| matches!(e, MonetaryEvent::TreasuryAddressChanged { .. })));
}

#[test]
fn burn_history_pages_in_id_order() {
    let mut keeper = keeper(&[("alice", 10_000)]);
    for h in 1..=5 {
        keeper.burn_tokens(&burn_msg("alice", 100), &ctx(h)).unwrap();
    }
    let first = keeper.burn_history(None, Some(2)).unwrap();
    assert_eq!(first.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(first.next, Some(2));
    let second = keeper.burn_history(first.next, Some(10)).unwrap();
    assert_eq!(second.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4, 5]);
    assert_eq!(second.next, None);
}

#[derive(Debug, Clone)]
enum Op {
    Mint(u128),
    Burn(u128),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u128..1_000_000).prop_map(Op::Mint),
        (1u128..2_000_000).prop_map(Op::Burn),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn supply_conserved_across_mints_and_burns(ops in proptest::collection::vec(op(), 1..24)) {
        let mut keeper = keeper(&[("alice", 1_000_000), ("bob", 1_000_000)]);
        for (i, op) in ops.iter().enumerate() {
            let at = ctx(i as u64 + 1);
            let _ = match op {
                Op::Mint(amount) => keeper.mint_tokens(&mint_msg(*amount, "alice"), &at).map(|_| ()),
                Op::Burn(amount) => keeper.burn_tokens(&burn_msg("alice", *amount), &at).map(|_| ()),
            };
            let audit = keeper.audit().unwrap();
            prop_assert!(audit.conserved);
            prop_assert!(audit.aggregates_consistent);
            prop_assert_eq!(keeper.bank().total_supply(), audit.counters.current_supply);
            prop_assert_eq!(keeper.bank().module_balance(BURN_ESCROW_MODULE), 0);
        }
    }

    #[test]
    fn burn_legs_add_up(amount in 1u128..10_000_000_000u128) {
        let mut keeper = keeper(&[("alice", 10_000_000_000)]);
        let treasury_before = keeper.bank().balance(&treasury());
        let outcome = keeper.burn_tokens(&burn_msg("alice", amount), &ctx(1)).unwrap();
        prop_assert_eq!(outcome.burned + outcome.to_treasury, amount);
        prop_assert_eq!(outcome.to_treasury, amount / 10);
        prop_assert_eq!(
            keeper.bank().balance(&treasury()) - treasury_before,
            outcome.to_treasury
        );
        prop_assert_eq!(keeper.bank().balance(&module_address(BURN_ESCROW_MODULE)), 0);
    }
}
