//! Runtime configuration of the monetary keeper.
//!
//! These settings are local to a node and never part of consensus state.
//! They are layered from built-in defaults, an optional config file and
//! `TRICHAIN_*` environment variables (nested keys separated by `__`).

use ::config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use trichain_types::{module_address, ChainId, BLOCKS_PER_DAY, GOVERNANCE_MODULE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Role a peer chain plays in the emission split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRole {
    Poc,
    Sequencer,
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainRole::Poc => "poc",
            ChainRole::Sequencer => "sequencer",
        })
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerChainConfig {
    pub role: ChainRole,
    pub chain_id: ChainId,
    /// Channel towards the peer; `None` until the channel is provisioned.
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Account on the peer chain receiving reward packets.
    #[serde(default)]
    pub reward_receiver: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetaryConfig {
    /// Address allowed to call authority-gated commands.
    pub authority: String,
    /// Identifier of the chain this keeper runs on.
    pub chain_id: ChainId,
    pub peers: Vec<PeerChainConfig>,
    /// Minimum accepted length of an inbound burn proof, in bytes.
    pub min_proof_len: usize,
    pub packet_timeout_blocks: u64,
    /// Number of blocks kept in the transaction-volume ring.
    pub tx_volume_window_blocks: u64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for MonetaryConfig {
    fn default() -> Self {
        Self {
            authority: module_address(GOVERNANCE_MODULE).to_string(),
            chain_id: ChainId::main(),
            peers: vec![
                PeerChainConfig {
                    role: ChainRole::Poc,
                    chain_id: ChainId::poc(),
                    channel_id: None,
                    active: true,
                    reward_receiver: None,
                },
                PeerChainConfig {
                    role: ChainRole::Sequencer,
                    chain_id: ChainId::sequencer(),
                    channel_id: None,
                    active: true,
                    reward_receiver: None,
                },
            ],
            min_proof_len: 32,
            packet_timeout_blocks: 1_000,
            tx_volume_window_blocks: BLOCKS_PER_DAY,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl MonetaryConfig {
    /// Load defaults, then the optional file, then `TRICHAIN_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(ConfigFile::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("TRICHAIN")
                .prefix_separator("_")
                .separator("__"),
        );
        let config: MonetaryConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authority.trim().is_empty() {
            return Err(ConfigError::Invalid("authority must not be empty".into()));
        }
        if self.tx_volume_window_blocks == 0 {
            return Err(ConfigError::Invalid(
                "tx_volume_window_blocks must be positive".into(),
            ));
        }
        if self.packet_timeout_blocks == 0 {
            return Err(ConfigError::Invalid(
                "packet_timeout_blocks must be positive".into(),
            ));
        }
        for (i, peer) in self.peers.iter().enumerate() {
            if peer.chain_id == self.chain_id {
                return Err(ConfigError::Invalid(format!(
                    "peer {} uses the local chain id",
                    peer.chain_id
                )));
            }
            if self.peers[..i].iter().any(|p| p.chain_id == peer.chain_id) {
                return Err(ConfigError::Invalid(format!(
                    "peer {} listed twice",
                    peer.chain_id
                )));
            }
            if self.peers[..i].iter().any(|p| p.role == peer.role) {
                return Err(ConfigError::Invalid(format!(
                    "more than one {} peer",
                    peer.role
                )));
            }
        }
        Ok(())
    }

    pub fn peer(&self, chain_id: &ChainId) -> Option<&PeerChainConfig> {
        self.peers.iter().find(|p| &p.chain_id == chain_id)
    }

    pub fn peer_for_role(&self, role: ChainRole) -> Option<&PeerChainConfig> {
        self.peers.iter().find(|p| p.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = MonetaryConfig::default();
        config.validate().unwrap();
        assert_eq!(config.peer_for_role(ChainRole::Poc).unwrap().chain_id, ChainId::poc());
        assert_eq!(config.tx_volume_window_blocks, BLOCKS_PER_DAY);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
min_proof_len = 64
packet_timeout_blocks = 50

[[peers]]
role = "poc"
chain_id = "poc-test"
channel_id = "channel-7"
"#
        )
        .unwrap();
        let config = MonetaryConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.min_proof_len, 64);
        assert_eq!(config.packet_timeout_blocks, 50);
        assert_eq!(config.peers.len(), 1);
        assert_eq!(config.peers[0].channel_id.as_deref(), Some("channel-7"));
        assert!(config.peers[0].active);
        assert_eq!(config.chain_id, ChainId::main());
    }

    #[test]
    fn duplicate_roles_rejected() {
        let mut config = MonetaryConfig::default();
        config.peers[1].role = ChainRole::Poc;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
