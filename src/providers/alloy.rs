//! Alloy-backed warp-route chain client.

use alloy_network::Ethereum;
use alloy_primitives::{hex, Address, TxHash, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use bon::Builder;
use tracing::{debug, error, info, instrument};

use crate::contracts::cctp_adapter::CctpAdapterContract;
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::igp::InterchainGasPaymasterContract;
use crate::contracts::mailbox::{dispatched_message, find_dispatch_log, MailboxContract};
use crate::error::{RelayError, Result};
use crate::protocol::{BridgeMessage, MessageCodec};
use crate::spans;
use crate::traits::RouterChain;

/// One chain of the warp route, reached through an Alloy provider whose
/// wallet signs as `signer`.
///
/// # Examples
///
/// ```rust,no_run
/// use permissionless_cctp::providers::AlloyRouterChain;
/// use alloy_primitives::address;
/// use alloy_provider::ProviderBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
///
/// let goerli = AlloyRouterChain::builder()
///     .name("goerli".to_string())
///     .domain(5)
///     .provider(provider)
///     .signer(address!("9bf4aa106a74f5661500bd58499c6360f5350820"))
///     .token(address!("07865c6e87b9f70255377e024ace6630c1eaa37f"))
///     .router(address!("5a616c69759b225964e391500798e5b299968395"))
///     .igp(address!("8f9c3888bfc8a5b25aae115a82ebbb2d5bbcd4a5"))
///     .mailbox(address!("cc737a94fecaec165abcf12ded095bb13f037685"))
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Debug, Clone)]
pub struct AlloyRouterChain<P: Provider<Ethereum> + Clone> {
    name: String,
    domain: u32,
    provider: P,
    signer: Address,
    token: Address,
    router: Address,
    igp: Address,
    mailbox: Address,
    #[builder(default)]
    codec: MessageCodec,
}

impl<P: Provider<Ethereum> + Clone> AlloyRouterChain<P> {
    fn adapter(&self) -> CctpAdapterContract<P> {
        CctpAdapterContract::new(self.router, self.provider.clone())
    }

    /// Sends `tx` and waits for a successful receipt.
    async fn send_and_confirm(&self, tx: TransactionRequest, action: &str) -> Result<TransactionReceipt> {
        let pending_tx = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending_tx.tx_hash();

        info!(
            chain = %self.name,
            tx_hash = %tx_hash,
            action = action,
            event = "transaction_sent"
        );

        let receipt = pending_tx.get_receipt().await.map_err(|e| {
            error!(
                chain = %self.name,
                tx_hash = %tx_hash,
                error = %e,
                event = "transaction_receipt_retrieval_failed"
            );
            RelayError::TransactionFailed {
                reason: format!("{action} {tx_hash}: {e}"),
            }
        })?;

        if !receipt.status() {
            spans::record_error_with_context(
                "TransactionReverted",
                &format!("{action} reverted"),
                Some(&format!("Transaction: {tx_hash}")),
            );
            error!(chain = %self.name, tx_hash = %tx_hash, event = "transaction_reverted");
            return Err(RelayError::TransactionFailed {
                reason: format!("{action} {tx_hash} reverted"),
            });
        }

        debug!(
            chain = %self.name,
            tx_hash = %tx_hash,
            gas_used = receipt.gas_used,
            event = "transaction_confirmed"
        );
        Ok(receipt)
    }
}

#[async_trait]
impl<P> RouterChain for AlloyRouterChain<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> u32 {
        self.domain
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        Ok(Erc20Contract::new(self.token, self.provider.clone())
            .balance_of(owner)
            .await?)
    }

    async fn approve_router(&self, amount: U256) -> Result<TxHash> {
        let tx = Erc20Contract::new(self.token, self.provider.clone()).approve_transaction(
            self.signer,
            self.router,
            amount,
        );
        let receipt = self.send_and_confirm(tx, "approve").await?;
        Ok(receipt.transaction_hash)
    }

    async fn quote_gas_payment(&self, destination: u32) -> Result<U256> {
        let gas_amount = self.adapter().gas_amount().await?;
        Ok(InterchainGasPaymasterContract::new(self.igp, self.provider.clone())
            .quote_gas_payment(destination, gas_amount)
            .await?)
    }

    #[instrument(skip(self), fields(chain = %self.name))]
    async fn transfer_remote(
        &self,
        destination: u32,
        recipient: B256,
        amount: U256,
        gas_payment: U256,
    ) -> Result<BridgeMessage> {
        let tx = self.adapter().transfer_remote_transaction(
            self.signer,
            destination,
            recipient,
            amount,
            gas_payment,
        );
        let receipt = self.send_and_confirm(tx, "transferRemote").await?;

        let logs = receipt.inner.logs();
        let log = find_dispatch_log(logs, self.mailbox).ok_or_else(|| {
            spans::record_error_with_context(
                "DispatchEventNotFound",
                "Dispatch event not found in transaction logs",
                Some(&format!(
                    "Transaction contained {} logs but none matched the mailbox Dispatch signature",
                    logs.len()
                )),
            );
            error!(available_logs = logs.len(), event = "dispatch_event_not_found");
            RelayError::TransactionFailed {
                reason: "Dispatch event not found".to_string(),
            }
        })?;

        let message = self.codec.decode_bytes(&dispatched_message(log)?)?;
        info!(
            message_id = %hex::encode(message.id),
            nonce = message.nonce,
            destination_domain = message.destination_domain,
            event = "message_dispatched"
        );
        Ok(message)
    }

    async fn is_delivered(&self, message_id: B256) -> Result<bool> {
        Ok(MailboxContract::new(self.mailbox, self.provider.clone())
            .delivered(message_id)
            .await?)
    }

    async fn circle_domain(&self, hyperlane_domain: u32) -> Result<u32> {
        Ok(self.adapter().circle_domain(hyperlane_domain).await?)
    }

    async fn add_domain(&self, hyperlane_domain: u32, circle_domain: u32) -> Result<TxHash> {
        let tx = self
            .adapter()
            .add_domain_transaction(self.signer, hyperlane_domain, circle_domain);
        let receipt = self.send_and_confirm(tx, "addDomain").await?;
        Ok(receipt.transaction_hash)
    }
}
