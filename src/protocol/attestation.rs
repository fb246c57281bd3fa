use alloy_primitives::{hex::FromHex, Bytes};
use serde::{Deserialize, Deserializer, Serialize};

/// Body of an Iris `GET /v1/attestations/{messageHash}` response.
///
/// Iris reports `"PENDING"` in the attestation field while a signature is not
/// ready; that, null, a missing field and the empty string all read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub status: AttestationStatus,
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub attestation: Option<Bytes>,
}

fn deserialize_optional_bytes_or_pending<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("pending") => Ok(None),
        Some(s) => Bytes::from_hex(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Represents the status of the attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Complete,
    Pending,
    PendingConfirmations,
    Failed,
    #[serde(other)]
    Unknown,
}

/// What the attestation service said about one message hash.
#[derive(Debug, Clone, PartialEq)]
pub enum AttestationReply {
    /// The service knows the hash. `raw` is the JSON body as received.
    Record {
        response: AttestationResponse,
        raw: serde_json::Value,
    },
    /// The service has not observed the hash yet (HTTP 404).
    NotFound { raw: serde_json::Value },
}

/// Builds the bytes submitted on the destination chain: the native CCTP
/// message followed by the attestation without its leading type byte.
pub fn submission_payload(message: &[u8], attestation: &[u8]) -> Bytes {
    let signature = attestation.get(1..).unwrap_or_default();
    let mut payload = Vec::with_capacity(message.len() + signature.len());
    payload.extend_from_slice(message);
    payload.extend_from_slice(signature);
    Bytes::from(payload)
}
