use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a Trichain address string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 't'")]
    InvalidPrefix,
    #[error("address must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("address payload must be exactly 32 bytes")]
    InvalidPayloadLength,
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 32;
/// Expected string length of an encoded address (prefix + 64 hex chars).
pub const ADDRESS_STRING_LENGTH: usize = 1 + ADDRESS_BYTES * 2;

/// Encode a 32-byte account identifier into the human readable Trichain format.
///
/// The encoded address always begins with the character `t` followed by the
/// hexadecimal representation of the raw bytes.
pub fn encode_address(bytes: &[u8; ADDRESS_BYTES]) -> String {
    let mut encoded = String::with_capacity(ADDRESS_STRING_LENGTH);
    encoded.push('t');
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Attempt to decode a human readable Trichain address string into the raw bytes.
pub fn decode_address(address: &str) -> Result<[u8; ADDRESS_BYTES], AddressError> {
    if !address.starts_with('t') {
        return Err(AddressError::InvalidPrefix);
    }

    if address.len() != ADDRESS_STRING_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_STRING_LENGTH,
            actual: address.len(),
        });
    }

    let decoded = hex::decode(&address[1..])?;

    let bytes: [u8; ADDRESS_BYTES] = decoded
        .try_into()
        .map_err(|_| AddressError::InvalidPayloadLength)?;

    Ok(bytes)
}

/// Check whether the provided string is a valid Trichain address.
pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

/// Account address, serialised as its string form in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Deterministic address derived from an arbitrary label.
    ///
    /// `addr = BLAKE3("TRICHAIN_ACCOUNT" || label)`; used for fixtures and
    /// simulated accounts that have no key pair.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"TRICHAIN_ACCOUNT");
        hasher.update(label.as_bytes());
        Address(*hasher.finalize().as_bytes())
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        encode_address(&value.0)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_address(&value).map(Address)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_address(s).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_address(&self.0))
    }
}

/// Module account holding freshly minted coins before they are distributed.
pub const MONETARY_MODULE: &str = "monetary";
/// Module account used to stage burns before the burn leg is destroyed.
pub const BURN_ESCROW_MODULE: &str = "burn_escrow";
/// Module account where transaction fees accumulate during a block.
pub const FEE_COLLECTOR_MODULE: &str = "fee_collector";
/// Module account receiving the staking leg of each emission.
pub const STAKING_REWARDS_MODULE: &str = "staking_rewards";
/// Module account escrowing rewards sent to peer chains until acknowledged.
pub const CROSSCHAIN_ESCROW_MODULE: &str = "crosschain_escrow";
/// Governance module; its address is the default parameter-update authority.
pub const GOVERNANCE_MODULE: &str = "gov";

/// Derive the protocol-owned address of a module account.
///
/// `addr = BLAKE3("TRICHAIN_MODULE" || name)`. The address has no private key;
/// funds can only leave it through the owning module.
pub fn module_address(name: &str) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"TRICHAIN_MODULE");
    hasher.update(name.as_bytes());
    Address(*hasher.finalize().as_bytes())
}
