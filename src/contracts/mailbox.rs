//! Hyperlane Mailbox bindings: delivery status and the `Dispatch` event

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::Provider;
use alloy_rpc_types::Log;
use alloy_sol_types::{sol, SolEvent};
use tracing::debug;

use Mailbox::MailboxInstance;

pub use Mailbox::Dispatch;

pub struct MailboxContract<P: Provider<Ethereum>> {
    instance: MailboxInstance<P>,
}

impl<P: Provider<Ethereum>> MailboxContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: MailboxInstance::new(address, provider),
        }
    }

    /// Whether the message with `message_id` has been processed here.
    pub async fn delivered(&self, message_id: B256) -> Result<bool, alloy_contract::Error> {
        let delivered = self.instance.delivered(message_id).call().await?;
        debug!(
            message_id = %message_id,
            delivered = delivered,
            contract_address = %self.instance.address(),
            event = "delivery_status_retrieved"
        );
        Ok(delivered)
    }
}

/// Returns the `Dispatch` log emitted by `mailbox` among `logs`.
pub fn find_dispatch_log(logs: &[Log], mailbox: Address) -> Option<&Log> {
    logs.iter().find(|log| {
        log.address() == mailbox
            && log
                .topics()
                .first()
                .is_some_and(|topic| *topic == Dispatch::SIGNATURE_HASH)
    })
}

/// Decodes the raw Hyperlane message out of a `Dispatch` log.
pub fn dispatched_message(log: &Log) -> Result<Bytes, alloy_sol_types::Error> {
    let (message,) = Dispatch::abi_decode_data(&log.data().data)?;
    Ok(message)
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Mailbox {
        event Dispatch(
            address indexed sender,
            uint32 indexed destination,
            bytes32 indexed recipient,
            bytes message
        );

        function delivered(bytes32 messageId) external view returns (bool);
    }
);
