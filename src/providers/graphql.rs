//! GraphQL indexer client for CCTP `MessageSent` records.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::error::{RelayError, Result};
use crate::protocol::{IndexerRequest, IndexerResponse, NativeBridgeNonce};
use crate::traits::IndexerProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Queries a graph-node subgraph indexing `MessageTransmitter.MessageSent`.
#[derive(Debug, Clone)]
pub struct GraphQlIndexer {
    client: Client,
}

impl GraphQlIndexer {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IndexerProvider for GraphQlIndexer {
    #[instrument(skip(self), fields(indexer = %indexer, nonce = %nonce))]
    async fn message_by_nonce(
        &self,
        indexer: &Url,
        nonce: NativeBridgeNonce,
    ) -> Result<Option<Bytes>> {
        trace!("Querying indexer for MessageSent record");

        let response = self
            .client
            .post(indexer.clone())
            .json(&IndexerRequest::message_by_nonce(nonce))
            .send()
            .await?
            .error_for_status()?;

        let body: IndexerResponse = response.json().await?;

        if !body.errors.is_empty() {
            let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(RelayError::Provider(format!(
                "indexer returned errors: {}",
                messages.join("; ")
            )));
        }

        let message = body.first_message();
        debug!(found = message.is_some(), "Indexer query complete");
        Ok(message)
    }
}
