//! GraphQL request and response shapes for the CCTP `MessageSent` indexer.

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

use super::NativeBridgeNonce;

/// Selects every `MessageSent` record carrying a CCTP nonce.
pub const MESSAGE_BY_NONCE_QUERY: &str = "query MessageByNonce($nonce: BigInt!) { \
messageSents(where: { nonce: $nonce }) { message } }";

#[derive(Debug, Clone, Serialize)]
pub struct IndexerRequest {
    pub query: &'static str,
    pub variables: IndexerVariables,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexerVariables {
    /// Decimal string, as GraphQL `BigInt` scalars expect.
    pub nonce: String,
}

impl IndexerRequest {
    pub fn message_by_nonce(nonce: NativeBridgeNonce) -> Self {
        Self {
            query: MESSAGE_BY_NONCE_QUERY,
            variables: IndexerVariables {
                nonce: nonce.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerResponse {
    pub data: Option<IndexerData>,
    #[serde(default)]
    pub errors: Vec<IndexerError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerData {
    #[serde(default)]
    pub message_sents: Vec<MessageSentRecord>,
}

/// The raw CCTP message emitted by `MessageTransmitter.sendMessage`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSentRecord {
    pub message: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerError {
    pub message: String,
}

impl IndexerResponse {
    /// The first record's message, if any.
    pub fn first_message(self) -> Option<Bytes> {
        self.data?
            .message_sents
            .into_iter()
            .next()
            .map(|record| record.message)
    }
}
