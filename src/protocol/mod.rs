//! Wire formats: the Hyperlane envelope, Iris attestation responses and the
//! `MessageSent` indexer.

mod attestation;
mod indexer;
mod message;

pub use attestation::{submission_payload, AttestationReply, AttestationResponse, AttestationStatus};
pub use indexer::{
    IndexerData, IndexerError, IndexerRequest, IndexerResponse, IndexerVariables,
    MessageSentRecord, MESSAGE_BY_NONCE_QUERY,
};
pub use message::{BridgeMessage, LayoutTable, MessageCodec, MessageLayout, NativeBridgeNonce};
