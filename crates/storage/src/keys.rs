//! Key layout of the monetary store.
//!
//! Singletons live under one-byte keys. Collections use a one-byte prefix
//! followed by a discriminator: a burn-source tag, a chain id, or a
//! big-endian sequence number so that prefix scans return ascending order.
//! Counters are 16-byte big-endian `u128`; records are JSON.

use crate::StorageError;
use trichain_types::{BurnSource, ChainId};

pub const PARAMS_KEY: &[u8] = &[0x01];
pub const CURRENT_SUPPLY_KEY: &[u8] = &[0x02];
pub const TOTAL_MINTED_KEY: &[u8] = &[0x03];
pub const TOTAL_BURNED_KEY: &[u8] = &[0x04];
pub const NEXT_BURN_ID_KEY: &[u8] = &[0x05];
pub const TREASURY_STATE_KEY: &[u8] = &[0x06];
pub const FEE_TOTALS_KEY: &[u8] = &[0x07];
pub const LAST_TELEMETRY_KEY: &[u8] = &[0x08];
pub const NEXT_EMISSION_ID_KEY: &[u8] = &[0x09];
pub const EMISSION_TOTALS_KEY: &[u8] = &[0x0A];
pub const NEXT_PACKET_SEQ_KEY: &[u8] = &[0x0B];
pub const TX_VOLUME_META_KEY: &[u8] = &[0x0C];

pub const BURN_BY_SOURCE_PREFIX: u8 = 0x10;
pub const BURN_BY_CHAIN_PREFIX: u8 = 0x11;
pub const CHAIN_STATE_PREFIX: u8 = 0x12;
pub const BURN_RECORD_PREFIX: u8 = 0x13;
pub const EMISSION_RECORD_PREFIX: u8 = 0x14;
pub const PROCESSED_REPORT_PREFIX: u8 = 0x15;
pub const PENDING_PACKET_PREFIX: u8 = 0x16;
pub const TX_VOLUME_SLOT_PREFIX: u8 = 0x17;

fn with_prefix(prefix: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + suffix.len());
    key.push(prefix);
    key.extend_from_slice(suffix);
    key
}

pub fn burn_by_source_key(source: BurnSource) -> Vec<u8> {
    vec![BURN_BY_SOURCE_PREFIX, source.tag()]
}

pub fn burn_by_chain_key(chain: &ChainId) -> Vec<u8> {
    with_prefix(BURN_BY_CHAIN_PREFIX, chain.as_bytes())
}

pub fn chain_state_key(chain: &ChainId) -> Vec<u8> {
    with_prefix(CHAIN_STATE_PREFIX, chain.as_bytes())
}

pub fn burn_record_key(id: u64) -> Vec<u8> {
    with_prefix(BURN_RECORD_PREFIX, &id.to_be_bytes())
}

pub fn emission_record_key(id: u64) -> Vec<u8> {
    with_prefix(EMISSION_RECORD_PREFIX, &id.to_be_bytes())
}

/// `0x15 | chain | 0x00 | tx_hash`. Chain ids never contain a NUL byte.
pub fn processed_report_key(chain: &ChainId, tx_hash: &str) -> Vec<u8> {
    let mut key = with_prefix(PROCESSED_REPORT_PREFIX, chain.as_bytes());
    key.push(0x00);
    key.extend_from_slice(tx_hash.as_bytes());
    key
}

pub fn pending_packet_key(seq: u64) -> Vec<u8> {
    with_prefix(PENDING_PACKET_PREFIX, &seq.to_be_bytes())
}

pub fn tx_volume_slot_key(slot: u64) -> Vec<u8> {
    with_prefix(TX_VOLUME_SLOT_PREFIX, &slot.to_be_bytes())
}

/// Sequence number encoded after the one-byte prefix of `key`.
pub fn sequence_of(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(1..9)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn encode_u128(value: u128) -> [u8; 16] {
    value.to_be_bytes()
}

pub fn decode_u128(key: &[u8], bytes: &[u8]) -> Result<u128, StorageError> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StorageError::corrupted(key, format!("expected 16 bytes, got {}", bytes.len())))?;
    Ok(u128::from_be_bytes(raw))
}

pub fn decode_u64(key: &[u8], bytes: &[u8]) -> Result<u64, StorageError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::corrupted(key, format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
