//! # permissionless-cctp
//!
//! Off-chain relay for USDC transfers that ride Circle's Cross-Chain Transfer
//! Protocol (CCTP) underneath a Hyperlane warp route.
//!
//! A `CctpAdapter` router burns USDC through CCTP and dispatches a Hyperlane
//! message carrying the burn's CCTP nonce. The destination ISM can only
//! verify that message once it is handed Circle's attestation, which this
//! crate resolves: nonce → native CCTP message (indexer) → keccak256 →
//! attestation (Iris API).
//!
//! ## Resolving an attestation
//!
//! ```rust,no_run
//! use permissionless_cctp::providers::{GraphQlIndexer, IrisAttestationProvider, TokioClock};
//! use permissionless_cctp::{AttestationOutcome, AttestationResolver, DomainRegistry, RelayError};
//!
//! # async fn example(raw_message: &str) -> Result<(), RelayError> {
//! let resolver = AttestationResolver::builder()
//!     .registry(DomainRegistry::builtin()?)
//!     .indexer(GraphQlIndexer::new()?)
//!     .attestation_provider(IrisAttestationProvider::new()?)
//!     .clock(TokioClock::new())
//!     .build();
//!
//! match resolver.resolve_hex(raw_message).await? {
//!     AttestationOutcome::Complete(resolved) => println!("{:?}", resolved.payload),
//!     AttestationOutcome::NotYetAvailable { body, .. } => println!("pending: {body}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Public API
//!
//! - [`MessageCodec`] and [`BridgeMessage`]: the Hyperlane envelope
//! - [`DomainRegistry`]: per-domain attestation and indexer endpoints
//! - [`AttestationResolver`]: indexer lookup plus attestation query, once or with retry
//! - [`DeliveryWatcher`]: waits for dispatched messages to be processed
//! - [`TransferOrchestrator`]: pairwise transfer test and domain-table sync
//! - [`server`]: the `POST /api/attestations` router
//! - [`RelayError`] and [`Result`]

pub mod config;
pub mod contracts;
pub mod deployment;
mod error;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod testing;
pub mod traits;
pub mod watcher;

// Public module for callers who need custom instrumentation
pub mod spans;

pub use config::{DeliveryConfig, PollingConfig};
pub use deployment::{ChainDeployment, DeploymentConfig};
pub use error::{RelayError, Result};
pub use orchestrator::{
    AmountPolicy, BatchSummary, TransferOrchestrator, TransferSummary, MIN_TRANSFER_AMOUNT,
};
pub use protocol::{
    AttestationReply, AttestationResponse, AttestationStatus, BridgeMessage, LayoutTable,
    MessageCodec, MessageLayout, NativeBridgeNonce,
};
pub use registry::{DomainEndpoints, DomainRegistry, NetworkTier};
pub use resolver::{
    AttestationOutcome, AttestationResolver, NativeMessage, ResolvedAttestation,
    RATE_LIMIT_BACKOFF,
};
pub use watcher::{DeliveryReport, DeliveryWatcher, InFlightTransfer};
