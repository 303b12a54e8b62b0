/// Network selection and contract addresses, persisted as JSON in the data
/// directory and overridable from the environment.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Result, StakingError};

pub const STAKING_CONTRACT_ENV: &str = "STAKING_CONTRACT_ADDRESS";
pub const REWARD_TOKEN_ENV: &str = "REWARD_TOKEN_ADDRESS";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Sepolia,
    #[default]
    Localhost,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11_155_111,
            Network::Localhost => 31_337,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Sepolia => write!(f, "sepolia"),
            Network::Localhost => write!(f, "localhost"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            "localhost" | "local" => Ok(Self::Localhost),
            other => Err(format!(
                "Unknown network: '{other}'. Use 'mainnet', 'sepolia', or 'localhost'."
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ContractConfig {
    pub network: Network,
    #[serde(default)]
    pub staking_contract: Option<Address>,
    #[serde(default)]
    pub reward_token: Option<Address>,
}

impl ContractConfig {
    /// The staking contract is mandatory for every write and most reads.
    pub fn require_staking_contract(&self) -> Result<Address> {
        self.staking_contract.ok_or_else(|| {
            StakingError::Config(format!(
                "Staking contract not configured. Set {STAKING_CONTRACT_ENV} or use --staking-contract."
            ))
        })
    }

    /// Overlay addresses found in the process environment.
    pub fn with_env(self) -> anyhow::Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay addresses from an arbitrary variable source. Empty values are
    /// treated as unset.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let read = |key: &str| -> anyhow::Result<Option<Address>> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(v) => Address::from_hex(&v)
                    .with_context(|| format!("Invalid {key}"))
                    .map(Some),
                None => Ok(None),
            }
        };
        if let Some(addr) = read(STAKING_CONTRACT_ENV)? {
            self.staking_contract = Some(addr);
        }
        if let Some(addr) = read(REWARD_TOKEN_ENV)? {
            self.reward_token = Some(addr);
        }
        Ok(self)
    }

    /// Load from a JSON file. A missing file yields the default config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

/// Reject config names containing path separators or traversal sequences.
pub fn validate_profile_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        bail!("Profile name cannot be empty.");
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("Invalid profile name '{name}'. Must not contain '/', '\\', or '..'.");
    }
    Ok(())
}

/// XDG-compliant data directory.
/// Linux: `~/.local/share/stake-console/`, macOS: `~/Library/Application Support/stake-console/`
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Cannot determine data directory")?
        .join("stake-console");
    Ok(dir)
}

/// Path of a named config profile inside the data directory.
pub fn profile_path(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    validate_profile_name(name)?;
    Ok(dir.join(format!("{name}.json")))
}
