//! Span helpers for relay operations
//!
//! Static span names under `cctp_relay.*` with structured attributes. The
//! resolver, watcher and orchestrator open these internally; they are public
//! for callers composing their own pipelines.
//!
//! # Example
//!
//! ```rust,no_run
//! use permissionless_cctp::spans;
//! use alloy_primitives::B256;
//!
//! let span = spans::resolve_attestation(&B256::ZERO, 5, 43113);
//! let _guard = span.enter();
//! ```

use alloy_primitives::{hex, B256, U256};
use tracing::Span;
use url::Url;

/// Resolution of one inbound Hyperlane message into a submission payload.
///
/// Children: cctp_relay.indexer_lookup, cctp_relay.get_attestation
#[inline]
pub fn resolve_attestation(message_id: &B256, origin_domain: u32, destination_domain: u32) -> Span {
    tracing::info_span!(
        "cctp_relay.resolve_attestation",
        message_id = %hex::encode(message_id),
        origin_domain = origin_domain,
        destination_domain = destination_domain,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Polling wrapper around attestation queries.
///
/// Children: cctp_relay.get_attestation (one per attempt)
#[inline]
pub fn resolve_attestation_with_retry(
    message_id: &B256,
    origin_domain: u32,
    max_attempts: u32,
    poll_interval_secs: u64,
) -> Span {
    tracing::info_span!(
        "cctp_relay.resolve_attestation_with_retry",
        message_id = %hex::encode(message_id),
        origin_domain = origin_domain,
        max_attempts = max_attempts,
        poll_interval_secs = poll_interval_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// GraphQL lookup of a native CCTP message by nonce.
#[inline]
pub fn indexer_lookup(indexer: &Url, nonce: u64) -> Span {
    tracing::debug_span!("cctp_relay.indexer_lookup", indexer = %indexer, nonce = nonce)
}

/// Single attestation API request.
#[inline]
pub fn get_attestation(message_hash: &B256, attempt: u32) -> Span {
    tracing::debug_span!(
        "cctp_relay.get_attestation",
        message_hash = %hex::encode(message_hash),
        attempt = attempt,
    )
}

/// Delivery wait for a batch of dispatched messages.
#[inline]
pub fn await_delivery(pending: usize, timeout_secs: u64, poll_delay_secs: u64) -> Span {
    tracing::info_span!(
        "cctp_relay.await_delivery",
        pending = pending,
        timeout_secs = timeout_secs,
        poll_delay_secs = poll_delay_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Fan-out of transfers from one source chain to every other chain.
///
/// Children: cctp_relay.transfer_remote, cctp_relay.await_delivery
#[inline]
pub fn transfer_batch(source_chain: &str, destinations: usize, amount: &U256) -> Span {
    tracing::info_span!(
        "cctp_relay.transfer_batch",
        source_chain = source_chain,
        destinations = destinations,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// One `transferRemote` call.
#[inline]
pub fn transfer_remote(source_chain: &str, destination_domain: u32, amount: &U256) -> Span {
    tracing::debug_span!(
        "cctp_relay.transfer_remote",
        source_chain = source_chain,
        destination_domain = destination_domain,
        amount = %amount,
    )
}

/// Reconciliation of one adapter's Hyperlane to Circle domain table.
#[inline]
pub fn sync_domain_mappings(chain: &str, domains: usize) -> Span {
    tracing::info_span!(
        "cctp_relay.sync_domain_mappings",
        chain = chain,
        domains = domains,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record error attributes on the current span.
///
/// - error.type: the error's display text up to the first colon
/// - error.message: the full display text
/// - error.source: the source error, when there is one
pub fn record_error<E: std::error::Error>(error: &E) {
    let current_span = tracing::Span::current();
    let message = error.to_string();
    current_span.record("error.type", message.split(':').next().unwrap_or("Unknown"));
    current_span.record("error.message", message.as_str());
    current_span.record("otel.status_code", "ERROR");

    if let Some(source) = error.source() {
        current_span.record("error.source", source.to_string());
    }
}

/// Record error attributes with an explicit type and optional context.
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = tracing::Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
