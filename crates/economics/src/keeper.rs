//! The monetary keeper and its transactional execution scope.
//!
//! Every command and every hook step runs inside [`MonetaryKeeper::transact`]:
//! store writes go to a [`StagedStore`] overlay and ledger calls are
//! journaled. On success the overlay is committed as one batch; on failure it
//! is discarded and the journaled ledger calls are reversed, so a failed step
//! leaves both the store and the ledger as they were.

use crate::config::MonetaryConfig;
use crate::crosschain::{LengthCheckVerifier, PacketSender, ProofVerifier, RecordingPacketSender};
use crate::errors::Result;
use crate::events::{EventLog, MonetaryEvent};
use crate::state::MonetaryState;
use tracing::{error, warn};
use trichain_storage::{KvStore, StagedStore};
use trichain_treasury::BankLedger;
use trichain_types::{module_address, Address, Amount, VestingWindow};

/// Ledger call performed inside a transaction, kept for reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LedgerOp {
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
        now: i64,
    },
    Mint {
        module: &'static str,
        amount: Amount,
    },
    Burn {
        module: &'static str,
        amount: Amount,
    },
}

pub struct MonetaryKeeper<S: KvStore, B: BankLedger> {
    store: S,
    bank: B,
    config: MonetaryConfig,
    verifier: Box<dyn ProofVerifier>,
    packets: Box<dyn PacketSender>,
    events: EventLog,
}

impl<S: KvStore, B: BankLedger> MonetaryKeeper<S, B> {
    /// Keeper with the length-check proof verifier and a recording packet sender.
    pub fn new(store: S, bank: B, config: MonetaryConfig) -> Self {
        let verifier = Box::new(LengthCheckVerifier::new(config.min_proof_len));
        Self {
            store,
            bank,
            config,
            verifier,
            packets: Box::new(RecordingPacketSender::default()),
            events: EventLog::default(),
        }
    }

    pub fn with_verifier(mut self, verifier: Box<dyn ProofVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_packet_sender(mut self, packets: Box<dyn PacketSender>) -> Self {
        self.packets = packets;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Direct ledger access for the host (fee deposits, test setup).
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn config(&self) -> &MonetaryConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<MonetaryEvent> {
        self.events.drain()
    }

    /// Read-only view of the committed state.
    pub fn state(&self) -> MonetaryState<'_> {
        MonetaryState::new(&self.store)
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.state().is_initialized()
    }

    /// Run `f` atomically against the store and the ledger.
    pub(crate) fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut KeeperTx<'_>) -> Result<T>,
    ) -> Result<T> {
        let staged = StagedStore::new(&self.store);
        let mut tx = KeeperTx {
            state: MonetaryState::new(&staged),
            bank: &mut self.bank,
            config: &self.config,
            verifier: self.verifier.as_ref(),
            packets: self.packets.as_mut(),
            events: Vec::new(),
            journal: Vec::new(),
        };
        let result = f(&mut tx);
        let KeeperTx {
            events, journal, ..
        } = tx;

        match result {
            Ok(value) => match staged.commit() {
                Ok(_) => {
                    self.events.extend(events);
                    Ok(value)
                }
                Err(err) => {
                    error!(target: "monetary", error = %err, "commit failed; reversing ledger calls");
                    rollback(&mut self.bank, journal);
                    Err(err.into())
                }
            },
            Err(err) => {
                if !journal.is_empty() {
                    warn!(
                        target: "monetary",
                        error = %err,
                        calls = journal.len(),
                        "operation failed; reversing ledger calls"
                    );
                }
                rollback(&mut self.bank, journal);
                Err(err)
            }
        }
    }
}

/// Reverse journaled ledger calls, newest first.
fn rollback(bank: &mut dyn BankLedger, journal: Vec<LedgerOp>) {
    for op in journal.into_iter().rev() {
        let outcome = match &op {
            LedgerOp::Transfer {
                from,
                to,
                amount,
                now,
            } => bank.send_coins(to, from, *amount, *now),
            LedgerOp::Mint { module, amount } => bank.burn_coins(module, *amount),
            LedgerOp::Burn { module, amount } => bank.mint_coins(module, *amount),
        };
        if let Err(err) = outcome {
            error!(target: "monetary", ?op, error = %err, "failed to reverse ledger call");
        }
    }
}

/// Execution scope handed to engine code by [`MonetaryKeeper::transact`].
pub struct KeeperTx<'a> {
    pub(crate) state: MonetaryState<'a>,
    bank: &'a mut dyn BankLedger,
    pub(crate) config: &'a MonetaryConfig,
    pub(crate) verifier: &'a dyn ProofVerifier,
    pub(crate) packets: &'a mut dyn PacketSender,
    events: Vec<MonetaryEvent>,
    journal: Vec<LedgerOp>,
}

impl KeeperTx<'_> {
    pub(crate) fn bank(&self) -> &dyn BankLedger {
        &*self.bank
    }

    pub(crate) fn emit(&mut self, event: MonetaryEvent) {
        self.events.push(event);
    }

    pub(crate) fn send(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: i64,
    ) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        self.bank.send_coins(from, to, amount, now)?;
        self.journal.push(LedgerOp::Transfer {
            from: *from,
            to: *to,
            amount,
            now,
        });
        Ok(())
    }

    pub(crate) fn send_from_module(
        &mut self,
        module: &'static str,
        to: &Address,
        amount: Amount,
        now: i64,
    ) -> Result<()> {
        self.send(&module_address(module), to, amount, now)
    }

    pub(crate) fn mint_coins(&mut self, module: &'static str, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank.mint_coins(module, amount)?;
        self.journal.push(LedgerOp::Mint { module, amount });
        Ok(())
    }

    pub(crate) fn burn_coins(&mut self, module: &'static str, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank.burn_coins(module, amount)?;
        self.journal.push(LedgerOp::Burn { module, amount });
        Ok(())
    }

    pub(crate) fn create_vesting_account(
        &mut self,
        address: &Address,
        window: VestingWindow,
    ) -> Result<()> {
        self.bank.create_vesting_account(address, window)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MonetaryError;
    use trichain_storage::MemoryStore;
    use trichain_treasury::InMemoryBank;
    use trichain_types::{BURN_ESCROW_MODULE, MONETARY_MODULE};

    fn keeper() -> MonetaryKeeper<MemoryStore, InMemoryBank> {
        MonetaryKeeper::new(MemoryStore::new(), InMemoryBank::new(), MonetaryConfig::default())
    }

    #[test]
    fn failed_transaction_discards_store_and_reverses_ledger() {
        let mut keeper = keeper();
        let alice = Address::from_label("alice");
        let result: Result<()> = keeper.transact(|tx| {
            tx.mint_coins(MONETARY_MODULE, 500)?;
            tx.send_from_module(MONETARY_MODULE, &alice, 200, 0)?;
            tx.state.add_minted(500)?;
            assert_eq!(tx.journal_len(), 2);
            Err(MonetaryError::InvalidAmount)
        });
        assert!(matches!(result, Err(MonetaryError::InvalidAmount)));
        assert_eq!(keeper.bank().total_supply(), 0);
        assert_eq!(keeper.bank().balance(&alice), 0);
        assert_eq!(keeper.state().supply().unwrap().current_supply, 0);
    }

    #[test]
    fn successful_transaction_commits_and_emits() {
        let mut keeper = keeper();
        keeper
            .transact(|tx| {
                tx.mint_coins(BURN_ESCROW_MODULE, 10)?;
                tx.state.add_minted(10)?;
                tx.emit(MonetaryEvent::ParamsUpdated { height: None });
                Ok(())
            })
            .unwrap();
        assert_eq!(keeper.state().supply().unwrap().total_minted, 10);
        assert_eq!(keeper.bank().module_balance(BURN_ESCROW_MODULE), 10);
        assert_eq!(keeper.drain_events().len(), 1);
        assert!(keeper.events().is_empty());
    }
}
