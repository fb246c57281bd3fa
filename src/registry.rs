//! Hyperlane domain to off-chain endpoint resolution
//!
//! A [`DomainRegistry`] is built once at startup, either from the built-in
//! table or from a JSON file, and handed by reference to whatever needs it.
//! Lookups of domains missing from the table fail with
//! [`RelayError::UnknownDomain`].

use std::collections::BTreeMap;
use std::path::Path;

use alloy_chains::NamedChain;
use alloy_primitives::{hex, B256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{RelayError, Result};

/// Circle Iris API environment URLs
///
/// See <https://developers.circle.com/stablecoins/cctp-apis>
pub const IRIS_API: &str = "https://iris-api.circle.com";
pub const IRIS_API_SANDBOX: &str = "https://iris-api-sandbox.circle.com";

/// Attestation API path, joined to the Iris base URL.
pub const ATTESTATION_PATH: &str = "/v1/attestations/";

/// Base URL of a locally run graph-node; built-in indexer URLs live under it.
pub const LOCAL_GRAPH_NODE: &str = "http://localhost:8000/subgraphs/name/";

/// Circle CCTP domain identifiers
///
/// <https://developers.circle.com/stablecoins/supported-domains>
pub const ETHEREUM_CIRCLE_DOMAIN: u32 = 0;
pub const AVALANCHE_CIRCLE_DOMAIN: u32 = 1;
pub const OPTIMISM_CIRCLE_DOMAIN: u32 = 2;
pub const ARBITRUM_CIRCLE_DOMAIN: u32 = 3;
pub const BASE_CIRCLE_DOMAIN: u32 = 6;
pub const POLYGON_CIRCLE_DOMAIN: u32 = 7;

/// Chains the built-in table knows about, with their Circle domain. The
/// Hyperlane domain of each is its chain id.
const BUILTIN_CHAINS: &[(NamedChain, u32)] = &[
    // Testnets
    (NamedChain::Goerli, ETHEREUM_CIRCLE_DOMAIN),
    (NamedChain::AvalancheFuji, AVALANCHE_CIRCLE_DOMAIN),
    (NamedChain::ArbitrumGoerli, ARBITRUM_CIRCLE_DOMAIN),
    (NamedChain::Sepolia, ETHEREUM_CIRCLE_DOMAIN),
    (NamedChain::ArbitrumSepolia, ARBITRUM_CIRCLE_DOMAIN),
    (NamedChain::BaseSepolia, BASE_CIRCLE_DOMAIN),
    (NamedChain::OptimismSepolia, OPTIMISM_CIRCLE_DOMAIN),
    // Mainnets
    (NamedChain::Mainnet, ETHEREUM_CIRCLE_DOMAIN),
    (NamedChain::Avalanche, AVALANCHE_CIRCLE_DOMAIN),
    (NamedChain::Optimism, OPTIMISM_CIRCLE_DOMAIN),
    (NamedChain::Arbitrum, ARBITRUM_CIRCLE_DOMAIN),
    (NamedChain::Base, BASE_CIRCLE_DOMAIN),
    (NamedChain::Polygon, POLYGON_CIRCLE_DOMAIN),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTier {
    Testnet,
    Mainnet,
}

impl NetworkTier {
    /// Iris attestation endpoint for this tier.
    pub fn attestation_api(&self) -> Result<Url> {
        let base = match self {
            NetworkTier::Testnet => IRIS_API_SANDBOX,
            NetworkTier::Mainnet => IRIS_API,
        };
        Ok(Url::parse(base)?.join(ATTESTATION_PATH)?)
    }
}

/// Off-chain endpoints serving one Hyperlane domain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainEndpoints {
    pub domain: u32,
    pub name: String,
    pub tier: NetworkTier,
    pub circle_domain: u32,
    pub attestation_api: Url,
    pub indexer: Url,
}

impl DomainEndpoints {
    /// `{attestation_api}/0x{hash}`
    pub fn attestation_url(&self, message_hash: B256) -> Result<Url> {
        let base = self.attestation_api.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/{}",
            hex::encode_prefixed(message_hash)
        ))?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRegistry {
    entries: BTreeMap<u32, DomainEndpoints>,
}

impl DomainRegistry {
    /// Registry covering the built-in testnet and mainnet chains. Indexer
    /// URLs point at a local graph-node under `cctp-<chain>`.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::default();

        for (chain, circle_domain) in BUILTIN_CHAINS {
            let tier = if chain.is_testnet() {
                NetworkTier::Testnet
            } else {
                NetworkTier::Mainnet
            };
            let domain = *chain as u64 as u32;
            let indexer = Url::parse(LOCAL_GRAPH_NODE)?.join(&format!("cctp-{chain}"))?;

            registry.insert(DomainEndpoints {
                domain,
                name: chain.to_string(),
                tier,
                circle_domain: *circle_domain,
                attestation_api: tier.attestation_api()?,
                indexer,
            })?;
        }

        debug!(domains = registry.entries.len(), event = "builtin_registry_loaded");
        Ok(registry)
    }

    /// Parses a JSON array of [`DomainEndpoints`].
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<DomainEndpoints> = serde_json::from_str(json)?;
        let mut registry = Self::default();
        for entry in entries {
            registry.insert(entry)?;
        }
        Ok(registry)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let registry = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            domains = registry.entries.len(),
            event = "registry_loaded"
        );
        Ok(registry)
    }

    /// Adds an entry. Duplicate domains and endpoints without a host are
    /// configuration errors.
    pub fn insert(&mut self, entry: DomainEndpoints) -> Result<()> {
        for (label, url) in [("attestation_api", &entry.attestation_api), ("indexer", &entry.indexer)] {
            if url.host_str().is_none_or(str::is_empty) {
                return Err(RelayError::InvalidConfig(format!(
                    "domain {} has no {label} host",
                    entry.domain
                )));
            }
        }

        if self.entries.contains_key(&entry.domain) {
            return Err(RelayError::InvalidConfig(format!(
                "domain {} configured twice",
                entry.domain
            )));
        }

        self.entries.insert(entry.domain, entry);
        Ok(())
    }

    /// Replaces the indexer URL of a known domain.
    pub fn with_indexer(mut self, domain: u32, indexer: Url) -> Result<Self> {
        let entry = self
            .entries
            .get_mut(&domain)
            .ok_or(RelayError::UnknownDomain { domain })?;
        entry.indexer = indexer;
        Ok(self)
    }

    pub fn resolve(&self, domain: u32) -> Result<&DomainEndpoints> {
        self.entries
            .get(&domain)
            .ok_or(RelayError::UnknownDomain { domain })
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainEndpoints> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(5, NetworkTier::Testnet, ETHEREUM_CIRCLE_DOMAIN)]
    #[case(43113, NetworkTier::Testnet, AVALANCHE_CIRCLE_DOMAIN)]
    #[case(421613, NetworkTier::Testnet, ARBITRUM_CIRCLE_DOMAIN)]
    #[case(11155111, NetworkTier::Testnet, ETHEREUM_CIRCLE_DOMAIN)]
    #[case(1, NetworkTier::Mainnet, ETHEREUM_CIRCLE_DOMAIN)]
    #[case(8453, NetworkTier::Mainnet, BASE_CIRCLE_DOMAIN)]
    #[case(137, NetworkTier::Mainnet, POLYGON_CIRCLE_DOMAIN)]
    fn test_builtin_domains_resolve(
        #[case] domain: u32,
        #[case] tier: NetworkTier,
        #[case] circle_domain: u32,
    ) {
        let registry = DomainRegistry::builtin().unwrap();
        let endpoints = registry.resolve(domain).unwrap();

        assert_eq!(endpoints.domain, domain);
        assert_eq!(endpoints.tier, tier);
        assert_eq!(endpoints.circle_domain, circle_domain);
        assert!(!endpoints.attestation_api.as_str().is_empty());
        assert!(!endpoints.indexer.as_str().is_empty());
    }

    #[test]
    fn test_every_builtin_domain_has_endpoints() {
        let registry = DomainRegistry::builtin().unwrap();
        assert_eq!(registry.len(), BUILTIN_CHAINS.len());

        for endpoints in registry.domains() {
            assert!(endpoints.attestation_api.host_str().is_some());
            assert!(endpoints.indexer.host_str().is_some());
        }
    }

    #[test]
    fn test_unknown_domain() {
        let registry = DomainRegistry::builtin().unwrap();
        assert!(matches!(
            registry.resolve(999_999),
            Err(RelayError::UnknownDomain { domain: 999_999 })
        ));
    }

    #[test]
    fn test_testnet_attestation_url() {
        let registry = DomainRegistry::builtin().unwrap();
        let url = registry
            .resolve(5)
            .unwrap()
            .attestation_url(B256::repeat_byte(0xab))
            .unwrap();

        insta::assert_snapshot!(url.as_str(), @"https://iris-api-sandbox.circle.com/v1/attestations/0xabababababababababababababababababababababababababababababababab");
    }

    #[test]
    fn test_mainnet_attestation_url() {
        let registry = DomainRegistry::builtin().unwrap();
        let url = registry
            .resolve(42161)
            .unwrap()
            .attestation_url(B256::ZERO)
            .unwrap();

        insta::assert_snapshot!(url.as_str(), @"https://iris-api.circle.com/v1/attestations/0x0000000000000000000000000000000000000000000000000000000000000000");
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {
                "domain": 5,
                "name": "goerli",
                "tier": "testnet",
                "circle_domain": 0,
                "attestation_api": "https://iris-api-sandbox.circle.com/v1/attestations",
                "indexer": "https://indexer.internal/subgraphs/name/cctp-goerli"
            }
        ]"#;
        let registry = DomainRegistry::from_json(json).unwrap();
        let endpoints = registry.resolve(5).unwrap();

        assert_eq!(endpoints.name, "goerli");
        assert_eq!(
            endpoints.attestation_url(B256::ZERO).unwrap().as_str(),
            "https://iris-api-sandbox.circle.com/v1/attestations/0x0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert!(registry.resolve(43113).is_err());
    }

    #[test]
    fn test_from_json_rejects_empty_url() {
        let json = r#"[
            {
                "domain": 5,
                "name": "goerli",
                "tier": "testnet",
                "circle_domain": 0,
                "attestation_api": "",
                "indexer": "https://indexer.internal/graphql"
            }
        ]"#;
        assert!(DomainRegistry::from_json(json).is_err());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = DomainRegistry::builtin().unwrap();
        let goerli = registry.resolve(5).unwrap().clone();

        assert!(matches!(
            registry.insert(goerli),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_with_indexer_override() {
        let indexer = Url::parse("https://indexer.internal/graphql").unwrap();
        let registry = DomainRegistry::builtin()
            .unwrap()
            .with_indexer(43113, indexer.clone())
            .unwrap();

        assert_eq!(registry.resolve(43113).unwrap().indexer, indexer);
        assert!(DomainRegistry::builtin()
            .unwrap()
            .with_indexer(12, indexer)
            .is_err());
    }
}
