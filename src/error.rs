use std::time::Duration;

use alloy_primitives::{B256, U256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("Unsupported message version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("Unknown domain: {domain}")]
    UnknownDomain { domain: u32 },

    #[error("Indexer lookup failed for nonce {nonce}: {reason}")]
    IndexerLookupFailed { nonce: u64, reason: String },

    #[error("Attestation query failed (status {status:?}): {body}")]
    AttestationQueryFailed { status: Option<u16>, body: String },

    #[error("Attestation failed: {reason}")]
    AttestationFailed { reason: String },

    #[error("Timeout waiting for attestation after {attempts} attempts")]
    AttestationTimeout { attempts: u32 },

    #[error("Insufficient funds on {chain}: balance {balance}, required {required}")]
    InsufficientFunds {
        chain: String,
        balance: U256,
        required: U256,
    },

    #[error("Timed out after {timeout:?} with {} message(s) still pending", pending.len())]
    TimedOut { timeout: Duration, pending: Vec<B256> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<alloy_contract::Error> for RelayError {
    fn from(error: alloy_contract::Error) -> Self {
        RelayError::ContractCall(error.to_string())
    }
}

impl From<url::ParseError> for RelayError {
    fn from(error: url::ParseError) -> Self {
        RelayError::InvalidUrl {
            reason: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
