//! Attestation resolution for inbound Hyperlane messages
//!
//! A message dispatched by the `CctpAdapter` only carries the CCTP nonce of
//! the burn that funded it. Resolving it takes three hops:
//!
//! 1. the indexer of the origin chain maps the nonce to the native CCTP message,
//! 2. keccak256 of that message is the key Circle attests under,
//! 3. the Iris API returns the attestation once Circle has signed it.
//!
//! The result is the byte string the destination chain's ISM verifies: the
//! native message followed by the attestation without its type byte.

use alloy_primitives::{hex, keccak256, Bytes, B256};
use bon::Builder;
use std::time::Duration;
use tracing::{debug, error, info, Instrument};

use crate::config::PollingConfig;
use crate::error::{RelayError, Result};
use crate::protocol::{
    submission_payload, AttestationReply, AttestationStatus, BridgeMessage, MessageCodec,
    NativeBridgeNonce,
};
use crate::registry::{DomainEndpoints, DomainRegistry};
use crate::spans;
use crate::traits::{AttestationProvider, Clock, IndexerProvider};

/// Backoff after the attestation API answers 429.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// The native CCTP message behind a Hyperlane message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMessage {
    pub nonce: NativeBridgeNonce,
    pub message: Bytes,
    pub message_hash: B256,
    /// Endpoints of the origin domain.
    pub endpoints: DomainEndpoints,
}

/// A signed attestation joined with its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttestation {
    pub message_hash: B256,
    pub message: Bytes,
    pub attestation: Bytes,
    /// `message || attestation[1..]`
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttestationOutcome {
    Complete(ResolvedAttestation),
    /// Circle has not signed yet. `body` is the attestation service's JSON
    /// payload as received; `status` is `None` when the service answered 404.
    NotYetAvailable {
        status: Option<AttestationStatus>,
        body: serde_json::Value,
    },
}

#[derive(Builder)]
pub struct AttestationResolver<I, A, C> {
    registry: DomainRegistry,
    indexer: I,
    attestation_provider: A,
    clock: C,
    #[builder(default)]
    codec: MessageCodec,
}

impl<I, A, C> AttestationResolver<I, A, C>
where
    I: IndexerProvider,
    A: AttestationProvider,
    C: Clock,
{
    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    /// Decodes a hex envelope and resolves it.
    pub async fn resolve_hex(&self, raw: &str) -> Result<AttestationOutcome> {
        let message = self.codec.decode(raw)?;
        self.resolve(&message).await
    }

    /// Single pass: indexer lookup, then one attestation query.
    pub async fn resolve(&self, message: &BridgeMessage) -> Result<AttestationOutcome> {
        let span = spans::resolve_attestation(
            &message.id,
            message.origin_domain,
            message.destination_domain,
        );

        async {
            let result = self.resolve_once(message).await;
            if let Err(ref e) = result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn resolve_once(&self, message: &BridgeMessage) -> Result<AttestationOutcome> {
        let native = self.lookup_native_message(message).await?;
        self.query_attestation(&native)
            .instrument(spans::get_attestation(&native.message_hash, 1))
            .await
    }

    /// Finds the native CCTP message for `message` through the origin
    /// domain's indexer. Lookup failures are not retried.
    pub async fn lookup_native_message(&self, message: &BridgeMessage) -> Result<NativeMessage> {
        let nonce = self.codec.extract_nonce(message)?;
        let endpoints = self.registry.resolve(message.origin_domain)?;

        let lookup = self
            .indexer
            .message_by_nonce(&endpoints.indexer, nonce)
            .instrument(spans::indexer_lookup(&endpoints.indexer, nonce.as_u64()))
            .await;

        let native = match lookup {
            Ok(Some(native)) => native,
            Ok(None) => {
                error!(
                    nonce = %nonce,
                    indexer = %endpoints.indexer,
                    event = "indexer_record_missing"
                );
                return Err(RelayError::IndexerLookupFailed {
                    nonce: nonce.as_u64(),
                    reason: "no MessageSent record for nonce".to_string(),
                });
            }
            Err(e) => {
                error!(
                    nonce = %nonce,
                    indexer = %endpoints.indexer,
                    error = %e,
                    event = "indexer_lookup_failed"
                );
                return Err(RelayError::IndexerLookupFailed {
                    nonce: nonce.as_u64(),
                    reason: e.to_string(),
                });
            }
        };

        let message_hash = keccak256(&native);
        info!(
            nonce = %nonce,
            message_hash = %hex::encode(message_hash),
            message_length_bytes = native.len(),
            event = "native_message_found"
        );

        Ok(NativeMessage {
            nonce,
            message: native,
            message_hash,
            endpoints: endpoints.clone(),
        })
    }

    /// One attestation query for an already located native message.
    pub async fn query_attestation(&self, native: &NativeMessage) -> Result<AttestationOutcome> {
        let reply = self
            .attestation_provider
            .get_attestation(&native.endpoints, native.message_hash)
            .await?;

        match reply {
            AttestationReply::NotFound { raw } => {
                debug!(
                    message_hash = %hex::encode(native.message_hash),
                    event = "attestation_not_found"
                );
                Ok(AttestationOutcome::NotYetAvailable {
                    status: None,
                    body: raw,
                })
            }
            AttestationReply::Record { response, raw } => match response.status {
                AttestationStatus::Complete => {
                    let attestation = response.attestation.ok_or_else(|| {
                        spans::record_error_with_context(
                            "AttestationDataMissing",
                            "Attestation status is complete but attestation field is empty",
                            None,
                        );
                        error!(event = "attestation_data_missing");
                        RelayError::AttestationFailed {
                            reason: "Attestation missing".to_string(),
                        }
                    })?;

                    let payload = submission_payload(&native.message, &attestation);
                    info!(
                        message_hash = %hex::encode(native.message_hash),
                        attestation_length_bytes = attestation.len(),
                        payload_length_bytes = payload.len(),
                        event = "attestation_complete"
                    );

                    Ok(AttestationOutcome::Complete(ResolvedAttestation {
                        message_hash: native.message_hash,
                        message: native.message.clone(),
                        attestation,
                        payload,
                    }))
                }
                status => {
                    debug!(
                        message_hash = %hex::encode(native.message_hash),
                        status = ?status,
                        event = "attestation_pending"
                    );
                    Ok(AttestationOutcome::NotYetAvailable {
                        status: Some(status),
                        body: raw,
                    })
                }
            },
        }
    }

    /// Looks the native message up once, then polls the attestation API
    /// until it is complete, fails, or `polling` runs out of attempts.
    pub async fn resolve_with_retry(
        &self,
        message: &BridgeMessage,
        polling: PollingConfig,
    ) -> Result<ResolvedAttestation> {
        let span = spans::resolve_attestation_with_retry(
            &message.id,
            message.origin_domain,
            polling.max_attempts,
            polling.poll_interval_secs,
        );

        self.poll_attestation(message, polling).instrument(span).await
    }

    async fn poll_attestation(
        &self,
        message: &BridgeMessage,
        polling: PollingConfig,
    ) -> Result<ResolvedAttestation> {
        let native = self.lookup_native_message(message).await.inspect_err(|e| {
            spans::record_error(e);
        })?;

        info!(
            message_hash = %hex::encode(native.message_hash),
            max_attempts = polling.max_attempts,
            event = "attestation_polling_started"
        );

        for attempt in 1..=polling.max_attempts {
            let outcome = self
                .query_attestation(&native)
                .instrument(spans::get_attestation(&native.message_hash, attempt))
                .await;

            match outcome {
                Ok(AttestationOutcome::Complete(resolved)) => return Ok(resolved),
                Ok(AttestationOutcome::NotYetAvailable {
                    status: Some(AttestationStatus::Failed),
                    ..
                }) => {
                    spans::record_error_with_context(
                        "AttestationFailed",
                        "Circle API returned failed status for attestation",
                        Some(&format!("Attempt {}/{}", attempt, polling.max_attempts)),
                    );
                    error!(attempt = attempt, event = "attestation_failed");
                    return Err(RelayError::AttestationFailed {
                        reason: "Attestation failed".to_string(),
                    });
                }
                Ok(AttestationOutcome::NotYetAvailable { .. }) => {
                    self.clock.sleep(polling.poll_interval()).await;
                }
                Err(RelayError::AttestationQueryFailed {
                    status: Some(429), ..
                }) => {
                    debug!(
                        sleep_secs = RATE_LIMIT_BACKOFF.as_secs(),
                        event = "rate_limit_exceeded"
                    );
                    self.clock.sleep(RATE_LIMIT_BACKOFF).await;
                }
                Err(e) => {
                    spans::record_error(&e);
                    error!(error = %e, attempt = attempt, event = "attestation_request_failed");
                    return Err(e);
                }
            }
        }

        spans::record_error_with_context(
            "AttestationTimeout",
            &format!(
                "Attestation polling timed out after {} attempts",
                polling.max_attempts
            ),
            Some(&format!("Total duration: {} seconds", polling.total_timeout_secs())),
        );
        error!(
            total_duration_secs = polling.total_timeout_secs(),
            event = "attestation_timeout"
        );
        Err(RelayError::AttestationTimeout {
            attempts: polling.max_attempts,
        })
    }
}
