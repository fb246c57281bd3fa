//! Trait seams between the relay logic and the outside world.
//!
//! The resolver, watcher and orchestrator are written against these traits;
//! [`crate::providers`] holds the production implementations and
//! [`crate::testing`] the in-memory fakes used by the test suite.

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use url::Url;

use crate::error::Result;
use crate::protocol::{AttestationReply, BridgeMessage, NativeBridgeNonce};
use crate::registry::DomainEndpoints;
use crate::watcher::InFlightTransfer;

/// Looks up the native CCTP message for a nonce.
///
/// # Test Scenarios
///
/// - Nonce not indexed yet (`Ok(None)`)
/// - Indexer unreachable or returning GraphQL errors
#[async_trait]
pub trait IndexerProvider: Send + Sync {
    /// Returns the first `MessageSent` record carrying `nonce`, if any.
    async fn message_by_nonce(&self, indexer: &Url, nonce: NativeBridgeNonce)
        -> Result<Option<Bytes>>;
}

/// Fetches attestation state for a CCTP message hash.
///
/// Implementations return [`AttestationReply::NotFound`] for a 404 and an
/// error for every other non-success HTTP status.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn get_attestation(
        &self,
        endpoints: &DomainEndpoints,
        message_hash: B256,
    ) -> Result<AttestationReply>;
}

/// Reports whether a dispatched message has been processed on its
/// destination chain.
#[async_trait]
pub trait DeliveryChecker: Send + Sync {
    async fn is_delivered(&self, transfer: &InFlightTransfer) -> Result<bool>;
}

/// One chain running a `CctpAdapter` warp route.
///
/// All transaction-sending methods sign with the chain client's own signer
/// and wait for the receipt before returning.
#[async_trait]
pub trait RouterChain: Send + Sync {
    /// Human-readable chain name, used in logs and errors.
    fn name(&self) -> &str;

    /// Hyperlane domain of the chain.
    fn domain(&self) -> u32;

    /// USDC balance of `owner`.
    async fn token_balance(&self, owner: Address) -> Result<U256>;

    /// Approves the adapter to pull `amount` USDC from the signer.
    async fn approve_router(&self, amount: U256) -> Result<TxHash>;

    /// Native fee the interchain gas paymaster charges for a message to
    /// `destination`.
    async fn quote_gas_payment(&self, destination: u32) -> Result<U256>;

    /// Calls `transferRemote` and returns the message the Mailbox dispatched.
    async fn transfer_remote(
        &self,
        destination: u32,
        recipient: B256,
        amount: U256,
        gas_payment: U256,
    ) -> Result<BridgeMessage>;

    /// Whether the Mailbox on this chain has processed `message_id`.
    async fn is_delivered(&self, message_id: B256) -> Result<bool>;

    /// The adapter's Circle domain for a Hyperlane domain (0 when unset).
    async fn circle_domain(&self, hyperlane_domain: u32) -> Result<u32>;

    /// Writes a Hyperlane to Circle domain mapping into the adapter.
    async fn add_domain(&self, hyperlane_domain: u32, circle_domain: u32) -> Result<TxHash>;
}

/// Trait for time-based operations.
///
/// Lets tests run attestation polling loops without waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Asynchronously sleeps for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Returns the current instant in time.
    fn now(&self) -> Instant;
}
