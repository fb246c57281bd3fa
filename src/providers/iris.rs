//! Circle Iris API attestation provider implementation.

use alloy_primitives::{hex, B256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, trace};

use crate::error::{RelayError, Result};
use crate::protocol::{AttestationReply, AttestationResponse};
use crate::registry::DomainEndpoints;
use crate::traits::AttestationProvider;

/// Upper bound on a single attestation request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Attestation provider backed by Circle's Iris API.
///
/// The base URL comes from the origin domain's [`DomainEndpoints`], so one
/// provider serves sandbox and production domains alike.
///
/// # Examples
///
/// ```rust,no_run
/// use permissionless_cctp::providers::IrisAttestationProvider;
/// use permissionless_cctp::traits::AttestationProvider;
/// use permissionless_cctp::DomainRegistry;
/// use alloy_primitives::B256;
///
/// # async fn example() -> Result<(), permissionless_cctp::RelayError> {
/// let registry = DomainRegistry::builtin()?;
/// let provider = IrisAttestationProvider::new()?;
/// let reply = provider.get_attestation(registry.resolve(5)?, B256::ZERO).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IrisAttestationProvider {
    client: Client,
}

impl IrisAttestationProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttestationProvider for IrisAttestationProvider {
    #[instrument(skip(self, endpoints), fields(domain = endpoints.domain, message_hash = %hex::encode(message_hash)))]
    async fn get_attestation(
        &self,
        endpoints: &DomainEndpoints,
        message_hash: B256,
    ) -> Result<AttestationReply> {
        let url = endpoints.attestation_url(message_hash)?;
        trace!(url = %url, "Requesting attestation from Iris API");

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!(error = %e, "Attestation request did not complete");
            RelayError::AttestationQueryFailed {
                status: None,
                body: e.to_string(),
            }
        })?;
        let status = response.status();
        trace!(status_code = %status, "Received response from Iris API");

        if status == StatusCode::NOT_FOUND {
            let raw = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or(serde_json::Value::Null);
            debug!("Attestation not found");
            return Ok(AttestationReply::NotFound { raw });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status_code = status.as_u16(), body = %body, "Attestation request rejected");
            return Err(RelayError::AttestationQueryFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::AttestationQueryFailed {
                status: None,
                body: e.to_string(),
            })?;
        let (raw, attestation) = parse_record(&body).map_err(|e| {
            debug!(error = %e, body = %body, "Unreadable attestation record");
            RelayError::AttestationQueryFailed {
                status: Some(status.as_u16()),
                body: body.clone(),
            }
        })?;
        debug!(status = ?attestation.status, "Attestation response parsed");

        Ok(AttestationReply::Record {
            response: attestation,
            raw,
        })
    }
}

fn parse_record(body: &str) -> serde_json::Result<(serde_json::Value, AttestationResponse)> {
    let raw: serde_json::Value = serde_json::from_str(body)?;
    let attestation = serde_json::from_value(raw.clone())?;
    Ok((raw, attestation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AttestationStatus;
    use crate::registry::NetworkTier;
    use rstest::rstest;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoints(server: &MockServer) -> DomainEndpoints {
        DomainEndpoints {
            domain: 5,
            name: "goerli".to_string(),
            tier: NetworkTier::Testnet,
            circle_domain: 0,
            attestation_api: Url::parse(&format!("{}/v1/attestations/", server.uri())).unwrap(),
            indexer: Url::parse(&server.uri()).unwrap(),
        }
    }

    fn hash_path(hash: B256) -> String {
        format!("/v1/attestations/{}", hex::encode_prefixed(hash))
    }

    #[tokio::test]
    async fn test_complete_record() {
        let server = MockServer::start().await;
        let hash = B256::repeat_byte(0xab);
        Mock::given(method("GET"))
            .and(path(hash_path(hash)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "complete",
                "attestation": "0x01aabb"
            })))
            .mount(&server)
            .await;

        let reply = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints(&server), hash)
            .await
            .unwrap();

        let AttestationReply::Record { response, raw } = reply else {
            panic!("expected a record, got {reply:?}");
        };
        assert_eq!(response.status, AttestationStatus::Complete);
        assert_eq!(response.attestation.unwrap().to_vec(), vec![0x01, 0xaa, 0xbb]);
        assert_eq!(raw["attestation"], "0x01aabb");
    }

    #[tokio::test]
    async fn test_not_found_keeps_body() {
        let server = MockServer::start().await;
        let hash = B256::repeat_byte(0x01);
        Mock::given(method("GET"))
            .and(path(hash_path(hash)))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Message hash not found"})),
            )
            .mount(&server)
            .await;

        let reply = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints(&server), hash)
            .await
            .unwrap();

        assert_eq!(
            reply,
            AttestationReply::NotFound {
                raw: json!({"error": "Message hash not found"})
            }
        );
    }

    #[tokio::test]
    async fn test_not_found_without_json_body() {
        let server = MockServer::start().await;
        let hash = B256::repeat_byte(0x02);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let reply = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints(&server), hash)
            .await
            .unwrap();

        assert_eq!(
            reply,
            AttestationReply::NotFound {
                raw: serde_json::Value::Null
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limit_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let result = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints(&server), B256::ZERO)
            .await;

        match result {
            Err(RelayError::AttestationQueryFailed { status, body }) => {
                assert_eq!(status, Some(429));
                assert_eq!(body, "slow down");
            }
            other => panic!("expected query failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_query_failure() {
        let endpoints = DomainEndpoints {
            domain: 5,
            name: "goerli".to_string(),
            tier: NetworkTier::Testnet,
            circle_domain: 0,
            attestation_api: Url::parse("http://127.0.0.1:1/v1/attestations/").unwrap(),
            indexer: Url::parse("http://127.0.0.1:1/").unwrap(),
        };

        let result = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints, B256::ZERO)
            .await;

        match result {
            Err(RelayError::AttestationQueryFailed { status, body }) => {
                assert_eq!(status, None);
                assert!(!body.is_empty());
            }
            other => panic!("expected query failure, got {other:?}"),
        }
    }

    #[rstest]
    #[case::not_json("not json")]
    #[case::wrong_shape(r#"{"status": 5}"#)]
    #[tokio::test]
    async fn test_unreadable_success_body_is_query_failure(#[case] payload: &str) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(payload))
            .mount(&server)
            .await;

        let result = IrisAttestationProvider::new()
            .unwrap()
            .get_attestation(&endpoints(&server), B256::ZERO)
            .await;

        match result {
            Err(RelayError::AttestationQueryFailed { status, body }) => {
                assert_eq!(status, Some(200));
                assert_eq!(body, payload);
            }
            other => panic!("expected query failure, got {other:?}"),
        }
    }
}
