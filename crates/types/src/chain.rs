//! Chain identifiers for the three cooperating chains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a chain identifier in bytes.
pub const MAX_CHAIN_ID_LEN: usize = 64;

/// Default identifier of the main proof-of-stake chain.
pub const MAIN_CHAIN_ID: &str = "trichain-main-1";
/// Default identifier of the proof-of-contribution chain.
pub const POC_CHAIN_ID: &str = "trichain-poc-1";
/// Default identifier of the sequencer chain.
pub const SEQUENCER_CHAIN_ID: &str = "trichain-seq-1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainIdError {
    #[error("chain id must not be empty")]
    Empty,
    #[error("chain id exceeds {MAX_CHAIN_ID_LEN} bytes")]
    TooLong,
    #[error("chain id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Validated chain identifier (ASCII alphanumerics, `-`, `_`, `.`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Result<Self, ChainIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ChainIdError::Empty);
        }
        if id.len() > MAX_CHAIN_ID_LEN {
            return Err(ChainIdError::TooLong);
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ChainIdError::InvalidChar(c));
        }
        Ok(Self(id))
    }

    pub fn main() -> Self {
        Self(MAIN_CHAIN_ID.to_string())
    }

    pub fn poc() -> Self {
        Self(POC_CHAIN_ID.to_string())
    }

    pub fn sequencer() -> Self {
        Self(SEQUENCER_CHAIN_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for ChainId {
    type Error = ChainIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ChainId::new(value)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
