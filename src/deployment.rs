//! Warp-route deployment file
//!
//! Lists the chains the relay drives, in transfer order:
//!
//! ```json
//! {
//!   "chains": [
//!     {
//!       "name": "goerli",
//!       "domain": 5,
//!       "rpc_url": "https://rpc.ankr.com/eth_goerli",
//!       "token": "0x07865c6e87b9f70255377e024ace6630c1eaa37f",
//!       "router": "0x5a616c69759b225964e391500798e5b299968395",
//!       "igp": "0x8f9c3888bfc8a5b25aae115a82ebbb2d5bbcd4a5",
//!       "mailbox": "0xcc737a94fecaec165abcf12ded095bb13f037685"
//!     }
//!   ]
//! }
//! ```

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use url::Url;

use crate::error::{RelayError, Result};

/// Contract addresses and RPC endpoint of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainDeployment {
    pub name: String,
    /// Hyperlane domain.
    pub domain: u32,
    pub rpc_url: Url,
    /// USDC
    pub token: Address,
    /// `CctpAdapter`
    pub router: Address,
    pub igp: Address,
    pub mailbox: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeploymentConfig {
    pub chains: Vec<ChainDeployment>,
}

impl DeploymentConfig {
    /// Parses and validates a deployment document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            chains = config.chains.len(),
            event = "deployment_loaded"
        );
        Ok(config)
    }

    /// Rejects empty deployments and repeated domains or names.
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(RelayError::InvalidConfig(
                "deployment lists no chains".to_string(),
            ));
        }

        let mut domains = HashSet::new();
        let mut names = HashSet::new();
        for chain in &self.chains {
            if !domains.insert(chain.domain) {
                return Err(RelayError::InvalidConfig(format!(
                    "domain {} listed twice",
                    chain.domain
                )));
            }
            if !names.insert(chain.name.as_str()) {
                return Err(RelayError::InvalidConfig(format!(
                    "chain {} listed twice",
                    chain.name
                )));
            }
        }
        Ok(())
    }

    pub fn chain(&self, domain: u32) -> Result<&ChainDeployment> {
        self.chains
            .iter()
            .find(|chain| chain.domain == domain)
            .ok_or(RelayError::UnknownDomain { domain })
    }
}
