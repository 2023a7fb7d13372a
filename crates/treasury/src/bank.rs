//! Ledger accessor for the native coin
//!
//! The monetary keeper never stores balances itself. It mints into and burns
//! from module accounts and moves coins through this interface, so the
//! hosting chain can plug in its own bank while tests use the in-memory or
//! mock implementations below.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use trichain_types::{module_address, Address, Amount, VestingWindow};

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("insufficient funds for {address}: required {required}, available {available}")]
    InsufficientFunds {
        address: Address,
        required: Amount,
        available: Amount,
    },
    #[error("balance overflow for {0}")]
    Overflow(Address),
    #[error("vesting account already exists for {0}")]
    VestingAccountExists(Address),
    #[error("ledger rejected operation: {0}")]
    Rejected(String),
}

/// Interface for ledger operations.
pub trait BankLedger: Send + Sync {
    /// Full balance of an account, locked coins included.
    fn balance(&self, address: &Address) -> Amount;

    /// Balance that can be moved at unix time `now`.
    fn spendable_balance(&self, address: &Address, now: i64) -> Amount;

    /// Sum of all balances.
    fn total_supply(&self) -> Amount;

    /// Create coins in a module account.
    fn mint_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError>;

    /// Destroy coins held by a module account.
    fn burn_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError>;

    /// Move coins between any two accounts, respecting vesting locks at `now`.
    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: i64,
    ) -> Result<(), BankError>;

    /// Lock the balance of `address` behind a vesting window.
    fn create_vesting_account(
        &mut self,
        address: &Address,
        window: VestingWindow,
    ) -> Result<(), BankError>;

    fn module_balance(&self, module: &str) -> Amount {
        self.balance(&module_address(module))
    }
}

// -----------------------------------------------------------------------------
// In-memory implementation (simulations and tests)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    balances: HashMap<Address, Amount>,
    vesting: HashMap<Address, VestingWindow>,
    total_supply: Amount,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with coins that did not come through a module mint.
    pub fn fund(&mut self, address: Address, amount: Amount) {
        let entry = self.balances.entry(address).or_insert(0);
        *entry = entry.saturating_add(amount);
        self.total_supply = self.total_supply.saturating_add(amount);
    }

    pub fn vesting_window(&self, address: &Address) -> Option<&VestingWindow> {
        self.vesting.get(address)
    }

    pub fn balances(&self) -> &HashMap<Address, Amount> {
        &self.balances
    }

    fn debit(&mut self, address: &Address, amount: Amount, available: Amount) -> Result<(), BankError> {
        if available < amount {
            return Err(BankError::InsufficientFunds {
                address: *address,
                required: amount,
                available,
            });
        }
        let balance = self.balances.entry(*address).or_insert(0);
        *balance -= amount;
        Ok(())
    }

    fn credit(&mut self, address: &Address, amount: Amount) -> Result<(), BankError> {
        let balance = self.balances.entry(*address).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(BankError::Overflow(*address))?;
        Ok(())
    }
}

impl BankLedger for InMemoryBank {
    fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn spendable_balance(&self, address: &Address, now: i64) -> Amount {
        let balance = self.balance(address);
        let locked = self
            .vesting
            .get(address)
            .map(|w| w.locked_amount(now))
            .unwrap_or(0);
        balance.saturating_sub(locked)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn mint_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError> {
        let address = module_address(module);
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(BankError::Overflow(address))?;
        self.credit(&address, amount)?;
        self.total_supply = supply;
        debug!(target: "treasury", module, amount, "minted coins");
        Ok(())
    }

    fn burn_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError> {
        let address = module_address(module);
        let available = self.balance(&address);
        self.debit(&address, amount, available)?;
        self.total_supply = self.total_supply.saturating_sub(amount);
        debug!(target: "treasury", module, amount, "burned coins");
        Ok(())
    }

    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: i64,
    ) -> Result<(), BankError> {
        if self.balance(to).checked_add(amount).is_none() {
            return Err(BankError::Overflow(*to));
        }
        let available = self.spendable_balance(from, now);
        self.debit(from, amount, available)?;
        self.credit(to, amount)
    }

    fn create_vesting_account(
        &mut self,
        address: &Address,
        window: VestingWindow,
    ) -> Result<(), BankError> {
        if self.vesting.contains_key(address) {
            return Err(BankError::VestingAccountExists(*address));
        }
        self.vesting.insert(*address, window);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Mock ledger (call recording and failure injection)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankCall {
    Mint {
        module: String,
        amount: Amount,
    },
    Burn {
        module: String,
        amount: Amount,
    },
    Send {
        from: Address,
        to: Address,
        amount: Amount,
    },
    CreateVesting {
        address: Address,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MockBank {
    inner: InMemoryBank,
    calls: Vec<BankCall>,
    fail_sends_to: HashSet<Address>,
    fail_burns: bool,
    fail_mints: bool,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&mut self, address: Address, amount: Amount) {
        self.inner.fund(address, amount);
    }

    pub fn inner(&self) -> &InMemoryBank {
        &self.inner
    }

    pub fn calls(&self) -> &[BankCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Make every transfer credited to `address` fail.
    pub fn fail_sends_to(&mut self, address: Address) {
        self.fail_sends_to.insert(address);
    }

    pub fn fail_burns(&mut self, fail: bool) {
        self.fail_burns = fail;
    }

    pub fn fail_mints(&mut self, fail: bool) {
        self.fail_mints = fail;
    }

    pub fn clear_failures(&mut self) {
        self.fail_sends_to.clear();
        self.fail_burns = false;
        self.fail_mints = false;
    }
}

impl BankLedger for MockBank {
    fn balance(&self, address: &Address) -> Amount {
        self.inner.balance(address)
    }

    fn spendable_balance(&self, address: &Address, now: i64) -> Amount {
        self.inner.spendable_balance(address, now)
    }

    fn total_supply(&self) -> Amount {
        self.inner.total_supply()
    }

    fn mint_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError> {
        self.calls.push(BankCall::Mint {
            module: module.to_string(),
            amount,
        });
        if self.fail_mints {
            return Err(BankError::Rejected(format!("mint into {module} disabled")));
        }
        self.inner.mint_coins(module, amount)
    }

    fn burn_coins(&mut self, module: &str, amount: Amount) -> Result<(), BankError> {
        self.calls.push(BankCall::Burn {
            module: module.to_string(),
            amount,
        });
        if self.fail_burns {
            return Err(BankError::Rejected(format!("burn from {module} disabled")));
        }
        self.inner.burn_coins(module, amount)
    }

    fn send_coins(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: i64,
    ) -> Result<(), BankError> {
        self.calls.push(BankCall::Send {
            from: *from,
            to: *to,
            amount,
        });
        if self.fail_sends_to.contains(to) {
            return Err(BankError::Rejected(format!("transfer to {to} disabled")));
        }
        self.inner.send_coins(from, to, amount, now)
    }

    fn create_vesting_account(
        &mut self,
        address: &Address,
        window: VestingWindow,
    ) -> Result<(), BankError> {
        self.calls.push(BankCall::CreateVesting { address: *address });
        self.inner.create_vesting_account(address, window)
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use trichain_types::{BURN_ESCROW_MODULE, MONETARY_MODULE};

    #[test]
    fn mint_send_burn_track_supply() {
        let mut bank = InMemoryBank::new();
        let alice = Address::from_label("alice");
        bank.mint_coins(MONETARY_MODULE, 1_000).unwrap();
        assert_eq!(bank.total_supply(), 1_000);

        bank.send_coins(&module_address(MONETARY_MODULE), &alice, 400, 0)
            .unwrap();
        assert_eq!(bank.balance(&alice), 400);
        assert_eq!(bank.module_balance(MONETARY_MODULE), 600);

        bank.burn_coins(MONETARY_MODULE, 600).unwrap();
        assert_eq!(bank.total_supply(), 400);
    }

    #[test]
    fn insufficient_funds_leaves_balances() {
        let mut bank = InMemoryBank::new();
        let alice = Address::from_label("alice");
        bank.fund(alice, 100);
        let err = bank
            .send_coins(&alice, &module_address(BURN_ESCROW_MODULE), 101, 0)
            .unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientFunds {
                address: alice,
                required: 101,
                available: 100
            }
        );
        assert_eq!(bank.balance(&alice), 100);
        assert!(bank.burn_coins(BURN_ESCROW_MODULE, 1).is_err());
    }

    #[test]
    fn vesting_locks_spendable_balance() {
        let mut bank = InMemoryBank::new();
        let bob = Address::from_label("bob");
        bank.fund(bob, 1_000);
        let window = VestingWindow {
            original: 1_000,
            start: 0,
            end: 100,
            linear: true,
        };
        bank.create_vesting_account(&bob, window).unwrap();
        assert_eq!(bank.spendable_balance(&bob, 0), 0);
        assert_eq!(bank.spendable_balance(&bob, 25), 250);
        assert_eq!(bank.spendable_balance(&bob, 100), 1_000);
        assert!(bank
            .send_coins(&bob, &Address::from_label("carol"), 300, 25)
            .is_err());
        assert_eq!(
            bank.create_vesting_account(&bob, window),
            Err(BankError::VestingAccountExists(bob))
        );
    }

    #[test]
    fn mock_records_calls_and_injects_failures() {
        let mut bank = MockBank::new();
        let treasury = Address::from_label("treasury");
        bank.mint_coins(MONETARY_MODULE, 50).unwrap();
        bank.fail_sends_to(treasury);
        assert!(bank
            .send_coins(&module_address(MONETARY_MODULE), &treasury, 10, 0)
            .is_err());
        bank.fail_burns(true);
        assert!(bank.burn_coins(MONETARY_MODULE, 10).is_err());
        assert_eq!(bank.calls().len(), 3);
        assert_eq!(bank.module_balance(MONETARY_MODULE), 50);

        bank.clear_failures();
        bank.clear_calls();
        bank.burn_coins(MONETARY_MODULE, 10).unwrap();
        assert_eq!(
            bank.calls(),
            &[BankCall::Burn {
                module: MONETARY_MODULE.to_string(),
                amount: 10
            }]
        );
    }
}
