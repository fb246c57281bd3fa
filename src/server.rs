//! HTTP surface of the relay
//!
//! `POST /api/attestations` takes a dispatched Hyperlane message and answers
//! with the payload the destination ISM verifies:
//!
//! | outcome                               | status                      | body                    |
//! |---------------------------------------|-----------------------------|-------------------------|
//! | attestation complete                  | 200                         | `{ "data": "0x…" }`     |
//! | not yet attested                      | 404                         | attestation API's JSON  |
//! | nonce not indexed                     | 404                         | `{ "error": … }`        |
//! | bad hex, version or domain            | 400                         | `{ "error": … }`        |
//! | attestation API failure               | upstream status, else 502   | `{ "error": … }`        |

use alloy_primitives::hex;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{RelayError, Result};
use crate::resolver::{AttestationOutcome, AttestationResolver};
use crate::traits::{AttestationProvider, Clock, IndexerProvider};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttestationRequest {
    /// Hex-encoded Hyperlane message.
    pub data: String,
    /// Address of the relayer asking, for logs only.
    #[serde(default)]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttestationData {
    /// `0x`-prefixed `message || attestation[1..]`.
    pub data: String,
}

/// A [`RelayError`] rendered as `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::MalformedMessage { .. }
            | RelayError::UnsupportedVersion { .. }
            | RelayError::UnknownDomain { .. }
            | RelayError::Hex(_) => StatusCode::BAD_REQUEST,
            RelayError::IndexerLookupFailed { .. } => StatusCode::NOT_FOUND,
            RelayError::AttestationQueryFailed { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            RelayError::Network(_) | RelayError::AttestationFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(error: RelayError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn router<I, A, C>(resolver: Arc<AttestationResolver<I, A, C>>) -> Router
where
    I: IndexerProvider + 'static,
    A: AttestationProvider + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/api/attestations", post(attestations::<I, A, C>))
        .with_state(resolver)
}

async fn attestations<I, A, C>(
    State(resolver): State<Arc<AttestationResolver<I, A, C>>>,
    Json(request): Json<AttestationRequest>,
) -> std::result::Result<Response, ApiError>
where
    I: IndexerProvider,
    A: AttestationProvider,
    C: Clock,
{
    let sender = request.sender.as_deref().unwrap_or("unknown");

    let outcome = resolver.resolve_hex(&request.data).await.map_err(|e| {
        warn!(sender = sender, error = %e, event = "attestation_request_failed");
        ApiError(e)
    })?;

    match outcome {
        AttestationOutcome::Complete(resolved) => {
            info!(
                sender = sender,
                message_hash = %hex::encode(resolved.message_hash),
                event = "attestation_served"
            );
            Ok(Json(AttestationData {
                data: hex::encode_prefixed(&resolved.payload),
            })
            .into_response())
        }
        AttestationOutcome::NotYetAvailable { status, body } => {
            info!(sender = sender, status = ?status, event = "attestation_not_ready");
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}

/// Serves `app` on `bind` until Ctrl-C.
pub async fn serve(bind: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind = %listener.local_addr()?, event = "server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, event = "shutdown_signal_failed");
            }
        })
        .await?;

    info!(event = "server_stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NativeBridgeNonce;
    use crate::registry::DomainRegistry;
    use crate::testing::{
        sample_native_message, FakeAttestationProvider, FakeClock, FakeIndexer,
        SAMPLE_HYPERLANE_MESSAGE,
    };
    use alloy_primitives::keccak256;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(indexer: FakeIndexer, attestations: FakeAttestationProvider) -> Router {
        let resolver = AttestationResolver::builder()
            .registry(DomainRegistry::builtin().unwrap())
            .indexer(indexer)
            .attestation_provider(attestations)
            .clock(FakeClock::new())
            .build();
        router(Arc::new(resolver))
    }

    fn indexed() -> FakeIndexer {
        let indexer = FakeIndexer::new();
        indexer.add_message(NativeBridgeNonce::new(0x3913e), sample_native_message());
        indexer
    }

    async fn post_message(app: Router, data: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/attestations")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "data": data, "sender": "0x9bf4aa106a74f5661500bd58499c6360f5350820" })
                    .to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_complete_attestation_returns_payload() {
        let attestations = FakeAttestationProvider::new();
        attestations.add_complete_response(keccak256(sample_native_message()), "0x01aabb");

        let (status, body) =
            post_message(app(indexed(), attestations), SAMPLE_HYPERLANE_MESSAGE).await;

        assert_eq!(status, StatusCode::OK);
        let mut expected = sample_native_message().to_vec();
        expected.extend_from_slice(&[0xaa, 0xbb]);
        assert_eq!(body["data"], hex::encode_prefixed(expected));
    }

    #[tokio::test]
    async fn test_not_attested_passes_upstream_body() {
        let (status, body) = post_message(
            app(indexed(), FakeAttestationProvider::new()),
            SAMPLE_HYPERLANE_MESSAGE,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Message hash not found" }));
    }

    #[tokio::test]
    async fn test_unindexed_nonce_is_not_found() {
        let (status, body) = post_message(
            app(FakeIndexer::new(), FakeAttestationProvider::new()),
            SAMPLE_HYPERLANE_MESSAGE,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("233790"));
    }

    #[tokio::test]
    async fn test_malformed_message_is_bad_request() {
        let (status, body) = post_message(
            app(indexed(), FakeAttestationProvider::new()),
            "0x00000068ba",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_origin_is_bad_request() {
        let mut raw = hex::decode(SAMPLE_HYPERLANE_MESSAGE).unwrap();
        raw[5..9].copy_from_slice(&77u32.to_be_bytes());

        let (status, _) = post_message(
            app(indexed(), FakeAttestationProvider::new()),
            &hex::encode(raw),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_status_is_forwarded() {
        let error = ApiError(RelayError::AttestationQueryFailed {
            status: Some(429),
            body: String::new(),
        });
        assert_eq!(error.status(), StatusCode::TOO_MANY_REQUESTS);

        let error = ApiError(RelayError::AttestationQueryFailed {
            status: None,
            body: String::new(),
        });
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unreadable_success_is_bad_gateway() {
        let error = ApiError(RelayError::AttestationQueryFailed {
            status: Some(200),
            body: "not json".to_string(),
        });
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
    }
}
