//! `cctp-relay`: attestation server and warp-route operations

use alloy_network::{Ethereum, EthereumWallet};
use alloy_primitives::{hex, Address, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use permissionless_cctp::providers::{
    AlloyRouterChain, GraphQlIndexer, IrisAttestationProvider, TokioClock,
};
use permissionless_cctp::{
    server, AmountPolicy, AttestationOutcome, AttestationResolver, DeploymentConfig,
    DomainRegistry, PollingConfig, RelayError, Result, TransferOrchestrator,
};

#[derive(Parser, Debug)]
#[command(name = "cctp-relay", version, about)]
struct Cli {
    /// Signing key, 32 bytes of hex.
    #[arg(long, env = "RELAY_PRIVATE_KEY", global = true, hide_env_values = true)]
    key: Option<String>,

    /// Deployment file listing the warp-route chains.
    #[arg(long, global = true, default_value = "deployment.json")]
    config: PathBuf,

    /// Domain registry file; the built-in registry is used when absent.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `POST /api/attestations`.
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Resolve the attestation for one Hyperlane message.
    Attest {
        /// Hex-encoded Hyperlane message.
        #[arg(long)]
        data: String,
        /// Poll until the attestation is complete.
        #[arg(long)]
        wait: bool,
    },
    /// Send USDC from every chain to every other chain and wait for delivery.
    TransferTest {
        /// Amount in USDC base units.
        #[arg(long, default_value_t = 1000)]
        amount: u64,
        #[arg(long, value_enum, default_value_t = PolicyKind::Distribution)]
        policy: PolicyKind,
    },
    /// Align every adapter's Hyperlane to Circle domain table.
    ConfigureDomains,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyKind {
    Uniform,
    Distribution,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, event = "command_failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { bind } => {
            let resolver = resolver(cli.registry.as_deref())?;
            server::serve(bind, server::router(Arc::new(resolver))).await
        }
        Command::Attest { ref data, wait } => {
            attest(resolver(cli.registry.as_deref())?, data, wait).await
        }
        Command::TransferTest { amount, policy } => {
            let policy = match policy {
                PolicyKind::Uniform => AmountPolicy::Uniform(U256::from(amount)),
                PolicyKind::Distribution => AmountPolicy::Distribution(U256::from(amount)),
            };
            let orchestrator = orchestrator(&cli)?;
            let summary = orchestrator.run(policy).await?;
            info!(
                batches = summary.batches.len(),
                delivered = summary.delivered(),
                event = "transfer_test_complete"
            );
            println!("{} message(s) delivered", summary.delivered());
            Ok(())
        }
        Command::ConfigureDomains => {
            let registry = registry(cli.registry.as_deref())?;
            let writes = orchestrator(&cli)?.sync_domain_mappings(&registry).await?;
            println!("{writes} domain mapping(s) updated");
            Ok(())
        }
    }
}

type Resolver = AttestationResolver<GraphQlIndexer, IrisAttestationProvider, TokioClock>;

fn registry(path: Option<&Path>) -> Result<DomainRegistry> {
    match path {
        Some(path) => DomainRegistry::from_path(path),
        None => DomainRegistry::builtin(),
    }
}

fn resolver(registry_path: Option<&Path>) -> Result<Resolver> {
    Ok(AttestationResolver::builder()
        .registry(registry(registry_path)?)
        .indexer(GraphQlIndexer::new()?)
        .attestation_provider(IrisAttestationProvider::new()?)
        .clock(TokioClock::new())
        .build())
}

async fn attest(resolver: Resolver, data: &str, wait: bool) -> Result<()> {
    if wait {
        let message = resolver.codec().decode(data)?;
        let resolved = resolver
            .resolve_with_retry(&message, PollingConfig::default())
            .await?;
        println!("{}", hex::encode_prefixed(&resolved.payload));
        return Ok(());
    }

    match resolver.resolve_hex(data).await? {
        AttestationOutcome::Complete(resolved) => {
            println!("{}", hex::encode_prefixed(&resolved.payload));
        }
        AttestationOutcome::NotYetAvailable { body, .. } => {
            println!("not yet attested: {body}");
        }
    }
    Ok(())
}

/// Parses a 32-byte hex key, with or without `0x`.
fn parse_key(key: &str) -> Result<B256> {
    let digits = key.strip_prefix("0x").unwrap_or(key);
    if digits.len() != 64 {
        return Err(RelayError::InvalidConfig(
            "--key must be 32 bytes of hex".to_string(),
        ));
    }
    Ok(B256::from_str(digits)?)
}

fn orchestrator(cli: &Cli) -> Result<TransferOrchestrator<AlloyRouterChain<DynProvider<Ethereum>>>> {
    let key = cli.key.as_deref().ok_or_else(|| {
        RelayError::InvalidConfig("--key or RELAY_PRIVATE_KEY is required".to_string())
    })?;
    let signer = PrivateKeySigner::from_bytes(&parse_key(key)?)
        .map_err(|e| RelayError::InvalidConfig(format!("invalid key: {e}")))?;
    let address: Address = signer.address();
    let wallet = EthereumWallet::from(signer);

    let deployment = DeploymentConfig::from_path(&cli.config)?;
    let chains = deployment
        .chains
        .iter()
        .map(|chain| {
            let provider = ProviderBuilder::new()
                .wallet(wallet.clone())
                .connect_http(chain.rpc_url.clone())
                .erased();
            AlloyRouterChain::builder()
                .name(chain.name.clone())
                .domain(chain.domain)
                .provider(provider)
                .signer(address)
                .token(chain.token)
                .router(chain.router)
                .igp(chain.igp)
                .mailbox(chain.mailbox)
                .build()
        })
        .collect();

    info!(signer = %address, chains = deployment.chains.len(), event = "chains_configured");
    Ok(TransferOrchestrator::builder()
        .chains(chains)
        .signer(address)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_accepts_prefixed_and_bare() {
        let bare = "11".repeat(32);
        assert_eq!(parse_key(&bare).unwrap(), B256::repeat_byte(0x11));
        assert_eq!(
            parse_key(&format!("0x{bare}")).unwrap(),
            B256::repeat_byte(0x11)
        );
    }

    #[test]
    fn test_parse_key_rejects_wrong_length() {
        assert!(matches!(
            parse_key("0x1234"),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_cli_parses_transfer_test() {
        let cli = Cli::try_parse_from([
            "cctp-relay",
            "--config",
            "goerli-fuji.json",
            "transfer-test",
            "--amount",
            "5000",
            "--policy",
            "uniform",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Command::TransferTest {
                amount: 5000,
                policy: PolicyKind::Uniform
            }
        ));
        assert_eq!(cli.config, PathBuf::from("goerli-fuji.json"));
    }
}
