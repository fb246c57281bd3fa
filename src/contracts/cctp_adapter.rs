//! Bindings for the `CctpAdapter` warp-route router
//!
//! The adapter burns USDC through CCTP and dispatches a Hyperlane message
//! carrying the CCTP nonce. Its owner maintains the table mapping Hyperlane
//! domains to Circle domains.

use alloy_network::Ethereum;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::{debug, info};

use CctpAdapter::CctpAdapterInstance;

pub struct CctpAdapterContract<P: Provider<Ethereum>> {
    instance: CctpAdapterInstance<P>,
}

impl<P: Provider<Ethereum>> CctpAdapterContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "cctp_adapter_contract_initialized"
        );
        Self {
            instance: CctpAdapterInstance::new(address, provider),
        }
    }

    /// Destination gas the adapter asks the paymaster to cover per message.
    pub async fn gas_amount(&self) -> Result<U256, alloy_contract::Error> {
        self.instance.gasAmount().call().await
    }

    /// Circle domain registered for `hyperlane_domain`; zero when unset.
    pub async fn circle_domain(&self, hyperlane_domain: u32) -> Result<u32, alloy_contract::Error> {
        self.instance
            .hyperlaneDomainToCircleDomain(hyperlane_domain)
            .call()
            .await
    }

    /// Unsigned `transferRemote` paying `gas_payment` wei to the paymaster.
    pub fn transfer_remote_transaction(
        &self,
        from: Address,
        destination: u32,
        recipient: B256,
        amount: U256,
        gas_payment: U256,
    ) -> TransactionRequest {
        info!(
            from = %from,
            destination_domain = destination,
            recipient = %recipient,
            amount = %amount,
            gas_payment = %gas_payment,
            contract_address = %self.instance.address(),
            event = "transfer_remote_transaction_created"
        );

        self.instance
            .transferRemote(destination, recipient, amount)
            .value(gas_payment)
            .from(from)
            .into_transaction_request()
    }

    /// Unsigned owner-only `addDomain(hyperlane_domain, circle_domain)`.
    pub fn add_domain_transaction(
        &self,
        from: Address,
        hyperlane_domain: u32,
        circle_domain: u32,
    ) -> TransactionRequest {
        info!(
            from = %from,
            hyperlane_domain = hyperlane_domain,
            circle_domain = circle_domain,
            contract_address = %self.instance.address(),
            event = "add_domain_transaction_created"
        );

        self.instance
            .addDomain(hyperlane_domain, circle_domain)
            .from(from)
            .into_transaction_request()
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract CctpAdapter {
        function transferRemote(uint32 _destination, bytes32 _recipient, uint256 _amount)
            external
            payable
            returns (bytes32 messageId);
        function gasAmount() external view returns (uint256);
        function hyperlaneDomainToCircleDomain(uint32 _hyperlaneDomain) external view returns (uint32);
        function addDomain(uint32 _hyperlaneDomain, uint32 _circleDomain) external;
    }
);
