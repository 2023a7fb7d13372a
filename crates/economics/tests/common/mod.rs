#![allow(dead_code)]

use trichain_economics::{
    BlockContext, GenesisAllocation, GenesisState, MonetaryConfig, MonetaryKeeper,
};
use trichain_storage::MemoryStore;
use trichain_treasury::{BankLedger, InMemoryBank};
use trichain_types::{Address, Amount, BASE_UNITS_PER_TRI};

pub const GENESIS_TIME: i64 = 1_700_000_000;
pub const TRI: Amount = BASE_UNITS_PER_TRI;

pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

pub fn treasury() -> Address {
    addr("treasury")
}

pub fn ctx(height: u64) -> BlockContext {
    BlockContext::new(height, GENESIS_TIME + height as i64 * 6)
}

pub fn allocation(label: &str, amount: Amount) -> GenesisAllocation {
    GenesisAllocation {
        address: addr(label),
        amount,
        category: "test".into(),
        vesting: false,
        schedule: None,
    }
}

/// Genesis where `allocations` make up the whole supply.
pub fn genesis(allocations: &[(&str, Amount)]) -> GenesisState {
    GenesisState::with_allocations(
        treasury(),
        allocations
            .iter()
            .map(|(label, amount)| allocation(label, *amount))
            .collect(),
        GENESIS_TIME,
    )
}

pub fn authority() -> String {
    MonetaryConfig::default().authority
}

pub fn keeper_with<B: BankLedger>(
    bank: B,
    config: MonetaryConfig,
    genesis: &GenesisState,
) -> MonetaryKeeper<MemoryStore, B> {
    let mut keeper = MonetaryKeeper::new(MemoryStore::new(), bank, config);
    keeper.init_genesis(genesis).expect("genesis");
    keeper.drain_events();
    keeper
}

/// Keeper with default config and an in-memory bank.
pub fn keeper(allocations: &[(&str, Amount)]) -> MonetaryKeeper<MemoryStore, InMemoryBank> {
    keeper_with(InMemoryBank::new(), MonetaryConfig::default(), &genesis(allocations))
}
