use proptest::prelude::*;
use trichain_treasury::{BankLedger, FeeTotals, InMemoryBank, InflowCause, TreasuryState};
use trichain_types::{
    module_address, mul_ratio_floor, Address, Ratio, FEE_COLLECTOR_MODULE,
};

fn sweep(
    bank: &mut InMemoryBank,
    treasury: &mut TreasuryState,
    totals: &mut FeeTotals,
    height: u64,
    burn_ratio: Ratio,
) {
    let collector = module_address(FEE_COLLECTOR_MODULE);
    let collected = bank.balance(&collector);
    let burned = mul_ratio_floor(collected, burn_ratio).unwrap();
    let to_treasury = collected - burned;
    bank.burn_coins(FEE_COLLECTOR_MODULE, burned).unwrap();
    bank.send_coins(&collector, &treasury.address, to_treasury, 0)
        .unwrap();
    treasury.record_inflow(InflowCause::FeeShare, to_treasury);
    totals.record_sweep(height, collected, burned, to_treasury);
}

#[test]
fn fee_sweep_splits_between_burn_and_treasury() {
    let mut bank = InMemoryBank::new();
    let mut treasury = TreasuryState::new(Address::from_label("treasury"), 0);
    let mut totals = FeeTotals::default();
    let ratio = Ratio::new(8, 1);

    bank.fund(module_address(FEE_COLLECTOR_MODULE), 1_001);
    sweep(&mut bank, &mut treasury, &mut totals, 10, ratio);

    assert_eq!(bank.total_supply(), 201);
    assert_eq!(bank.balance(&treasury.address), 201);
    assert_eq!(treasury.inflows(InflowCause::FeeShare), 201);
    assert_eq!(totals.burned + totals.to_treasury, totals.collected);
}

proptest! {
    #[test]
    fn sweeps_conserve_fees(fees in proptest::collection::vec(0u128..1_000_000_000, 1..20), pct in 0i64..=100) {
        let mut bank = InMemoryBank::new();
        let mut treasury = TreasuryState::new(Address::from_label("treasury"), 0);
        let mut totals = FeeTotals::default();
        let ratio = Ratio::new(pct, 2);
        for (height, fee) in fees.iter().enumerate() {
            bank.fund(module_address(FEE_COLLECTOR_MODULE), *fee);
            sweep(&mut bank, &mut treasury, &mut totals, height as u64, ratio);
        }
        let total: u128 = fees.iter().sum();
        prop_assert_eq!(totals.collected, total);
        prop_assert_eq!(totals.burned + totals.to_treasury, total);
        prop_assert_eq!(bank.total_supply(), totals.to_treasury);
    }
}
