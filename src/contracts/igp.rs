//! Interchain gas paymaster bindings

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use tracing::debug;

use InterchainGasPaymaster::InterchainGasPaymasterInstance;

pub struct InterchainGasPaymasterContract<P: Provider<Ethereum>> {
    instance: InterchainGasPaymasterInstance<P>,
}

impl<P: Provider<Ethereum>> InterchainGasPaymasterContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: InterchainGasPaymasterInstance::new(address, provider),
        }
    }

    /// Native-token fee for delivering `gas_amount` units of gas on
    /// `destination`.
    pub async fn quote_gas_payment(
        &self,
        destination: u32,
        gas_amount: U256,
    ) -> Result<U256, alloy_contract::Error> {
        let quote = self
            .instance
            .quoteGasPayment(destination, gas_amount)
            .call()
            .await?;

        debug!(
            destination_domain = destination,
            gas_amount = %gas_amount,
            quote = %quote,
            contract_address = %self.instance.address(),
            event = "gas_payment_quoted"
        );

        Ok(quote)
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract InterchainGasPaymaster {
        function quoteGasPayment(uint32 _destinationDomain, uint256 _gasAmount)
            external
            view
            returns (uint256);
    }
);
