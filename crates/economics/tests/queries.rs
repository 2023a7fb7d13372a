mod common;

use common::*;
use rust_decimal::Decimal;
use trichain_economics::{BlockTelemetry, MsgBurnTokens};
use trichain_types::{BurnSource, BLOCKS_PER_YEAR};

#[test]
fn projection_defaults_to_five_years_and_caps_at_ten() {
    let keeper = keeper(&[("alice", 1_000 * TRI)]);
    assert_eq!(keeper.supply_projection(None).unwrap().points.len(), 5);
    assert_eq!(keeper.supply_projection(Some(0)).unwrap().points.len(), 5);
    assert_eq!(keeper.supply_projection(Some(3)).unwrap().points.len(), 3);
    assert_eq!(keeper.supply_projection(Some(40)).unwrap().points.len(), 10);

    let projection = keeper.supply_projection(Some(2)).unwrap();
    assert_eq!(projection.annual_burn_estimate, 0);
    assert_eq!(projection.points[0].minted, 70 * TRI);
    assert_eq!(projection.points[0].supply, 1_070 * TRI);
    assert_eq!(projection.points[1].minted, 74_900_000);
}

#[test]
fn projection_extrapolates_observed_burn_rate() {
    let mut keeper = keeper(&[("alice", 1_000 * TRI)]);
    let msg = MsgBurnTokens {
        burner: addr("alice"),
        amount: 10 * TRI,
        source: BurnSource::TxFees,
        chain_id: None,
    };
    keeper.burn_tokens(&msg, &ctx(1)).unwrap();
    let block = BlockTelemetry {
        height: 0,
        gas_used: 0,
        gas_limit: 0,
        tx_count: 0,
    };
    keeper.end_block(&ctx(BLOCKS_PER_YEAR / 2), &block, &[]);

    // 9 TRI burned over half a year.
    let projection = keeper.supply_projection(Some(1)).unwrap();
    assert_eq!(projection.annual_burn_estimate, 18 * TRI);
    let point = projection.points[0];
    assert_eq!(point.supply, projection.starting_supply + point.minted - 18 * TRI);
}

#[test]
fn inflation_and_allocation_follow_params() {
    let keeper = keeper(&[("alice", 525_600_000 * TRI)]);
    let inflation = keeper.inflation_metrics().unwrap();
    assert_eq!(inflation.inflation_rate, Decimal::new(7, 2));
    assert_eq!(inflation.block_provisions, 7 * TRI);

    let allocation = keeper.emission_allocation().unwrap();
    assert_eq!(allocation.reward_stream_interval, 100);
    assert_eq!(allocation.next_epoch.total(), 700 * TRI);
    assert_eq!(allocation.next_epoch.staking, 350 * TRI);
    assert_eq!(allocation.totals.epochs, 0);
}

#[test]
fn burn_totals_cover_every_source() {
    let mut keeper = keeper(&[("alice", 10_000)]);
    for (source, amount) in [(BurnSource::Slashing, 1_000), (BurnSource::StorageRent, 500)] {
        let msg = MsgBurnTokens {
            burner: addr("alice"),
            amount,
            source,
            chain_id: None,
        };
        keeper.burn_tokens(&msg, &ctx(1)).unwrap();
    }
    let totals = keeper.burn_totals_by_source().unwrap();
    assert_eq!(totals.len(), BurnSource::ALL.len());
    assert!(totals.contains(&(BurnSource::Slashing, 900)));
    assert!(totals.contains(&(BurnSource::StorageRent, 450)));
    assert!(totals.contains(&(BurnSource::TxFees, 0)));
}
