//! Treasury state: address and cumulative inflows by cause.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use trichain_types::{Address, Amount};

/// Why coins flowed into the treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflowCause {
    /// Treasury leg of an emission split.
    Inflation,
    /// Share of a burn redirected instead of destroyed.
    BurnRedirect,
    /// Non-burned share of swept transaction fees.
    FeeShare,
    /// Reward packet that failed or timed out on the peer chain.
    Refund,
}

impl fmt::Display for InflowCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InflowCause::Inflation => "inflation",
            InflowCause::BurnRedirect => "burn_redirect",
            InflowCause::FeeShare => "fee_share",
            InflowCause::Refund => "refund",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryState {
    pub address: Address,
    /// Balance declared at genesis. Informational only.
    #[serde(default)]
    pub initial_balance: Amount,
    #[serde(default)]
    pub inflation_inflows: Amount,
    #[serde(default)]
    pub burn_redirect_inflows: Amount,
    #[serde(default)]
    pub fee_inflows: Amount,
    #[serde(default)]
    pub refund_inflows: Amount,
}

impl TreasuryState {
    pub fn new(address: Address, initial_balance: Amount) -> Self {
        Self {
            address,
            initial_balance,
            inflation_inflows: 0,
            burn_redirect_inflows: 0,
            fee_inflows: 0,
            refund_inflows: 0,
        }
    }

    pub fn record_inflow(&mut self, cause: InflowCause, amount: Amount) {
        let slot = match cause {
            InflowCause::Inflation => &mut self.inflation_inflows,
            InflowCause::BurnRedirect => &mut self.burn_redirect_inflows,
            InflowCause::FeeShare => &mut self.fee_inflows,
            InflowCause::Refund => &mut self.refund_inflows,
        };
        *slot = slot.saturating_add(amount);
        debug!(target: "treasury", %cause, amount, "treasury inflow");
    }

    pub fn inflows(&self, cause: InflowCause) -> Amount {
        match cause {
            InflowCause::Inflation => self.inflation_inflows,
            InflowCause::BurnRedirect => self.burn_redirect_inflows,
            InflowCause::FeeShare => self.fee_inflows,
            InflowCause::Refund => self.refund_inflows,
        }
    }

    pub fn total_inflows(&self) -> Amount {
        self.inflation_inflows
            .saturating_add(self.burn_redirect_inflows)
            .saturating_add(self.fee_inflows)
            .saturating_add(self.refund_inflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflows_are_tagged_by_cause() {
        let mut state = TreasuryState::new(Address::from_label("treasury"), 5_000);
        state.record_inflow(InflowCause::BurnRedirect, 100);
        state.record_inflow(InflowCause::BurnRedirect, 50);
        state.record_inflow(InflowCause::Inflation, 7);
        state.record_inflow(InflowCause::Refund, 3);
        assert_eq!(state.inflows(InflowCause::BurnRedirect), 150);
        assert_eq!(state.inflows(InflowCause::FeeShare), 0);
        assert_eq!(state.total_inflows(), 160);
        assert_eq!(state.initial_balance, 5_000);
    }

    #[test]
    fn missing_inflow_fields_default_to_zero() {
        let addr = Address::from_label("treasury");
        let json = format!("{{\"address\":\"{addr}\"}}");
        let state: TreasuryState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, TreasuryState::new(addr, 0));
    }
}
