//! Pairwise transfer test across a set of warp-route chains
//!
//! Every chain sends USDC to every other chain through its `CctpAdapter`,
//! one source chain at a time, and waits for each batch to be delivered
//! before moving to the next source.

use alloy_primitives::{hex, Address, TxHash, U256};
use async_trait::async_trait;
use bon::Builder;
use tracing::{error, info, Instrument};

use crate::config::DeliveryConfig;
use crate::error::{RelayError, Result};
use crate::registry::DomainRegistry;
use crate::spans;
use crate::traits::{DeliveryChecker, RouterChain};
use crate::watcher::{DeliveryReport, DeliveryWatcher, InFlightTransfer};

/// 0.001 USDC (6 decimals).
pub const MIN_TRANSFER_AMOUNT: U256 = U256::from_limbs([1_000, 0, 0, 0]);

/// How much each source chain sends to each destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPolicy {
    /// Every chain sends the same amount to every other chain.
    Uniform(U256),
    /// The first chain splits the total across the others, which forward an
    /// equal share of what they received to each of their peers.
    Distribution(U256),
}

impl Default for AmountPolicy {
    fn default() -> Self {
        AmountPolicy::Distribution(MIN_TRANSFER_AMOUNT)
    }
}

impl AmountPolicy {
    /// Amount chain `index` sends to each of the other `chains - 1` chains.
    pub fn per_destination(&self, index: usize, chains: usize) -> U256 {
        let peers = U256::from(chains.saturating_sub(1).max(1));
        match self {
            AmountPolicy::Uniform(amount) => *amount,
            AmountPolicy::Distribution(total) if index == 0 => *total / peers,
            AmountPolicy::Distribution(total) => *total / peers / peers,
        }
    }

    /// Balance chain `index` must hold before the run starts: everything it
    /// sends, with no credit for transfers it has yet to receive.
    pub fn required_upfront(&self, index: usize, chains: usize) -> U256 {
        self.per_destination(index, chains) * U256::from(chains.saturating_sub(1))
    }
}

/// One source chain's fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub source_chain: String,
    pub amount: U256,
    pub approval: TxHash,
    pub delivery: DeliveryReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub batches: Vec<BatchSummary>,
}

impl TransferSummary {
    pub fn delivered(&self) -> usize {
        self.batches.iter().map(|b| b.delivery.delivered.len()).sum()
    }
}

#[derive(Builder)]
pub struct TransferOrchestrator<C> {
    chains: Vec<C>,
    /// Owner of the USDC being moved; also the recipient on every chain.
    signer: Address,
    #[builder(default)]
    delivery: DeliveryConfig,
}

impl<C: RouterChain> TransferOrchestrator<C> {
    pub fn chains(&self) -> &[C] {
        &self.chains
    }

    /// Checks every chain holds what `policy` will make it send. Nothing is
    /// submitted if any chain falls short.
    pub async fn preflight(&self, policy: AmountPolicy) -> Result<()> {
        let n = self.chains.len();
        if n < 2 {
            return Err(RelayError::InvalidConfig(format!(
                "transfer test needs at least two chains, got {n}"
            )));
        }

        for (index, chain) in self.chains.iter().enumerate() {
            if policy.per_destination(index, n).is_zero() {
                return Err(RelayError::InvalidConfig(format!(
                    "transfer amount from {} rounds to zero",
                    chain.name()
                )));
            }

            let required = policy.required_upfront(index, n);
            let balance = chain.token_balance(self.signer).await?;
            if balance < required {
                error!(
                    chain = chain.name(),
                    balance = %balance,
                    required = %required,
                    event = "insufficient_funds"
                );
                return Err(RelayError::InsufficientFunds {
                    chain: chain.name().to_string(),
                    balance,
                    required,
                });
            }
            info!(
                chain = chain.name(),
                balance = %balance,
                required = %required,
                event = "balance_checked"
            );
        }

        Ok(())
    }

    /// Runs the whole test: pre-flight, then one batch per source chain.
    /// Stops at the first error, including a delivery timeout.
    pub async fn run(&self, policy: AmountPolicy) -> Result<TransferSummary> {
        self.preflight(policy).await?;

        let mut summary = TransferSummary::default();
        for index in 0..self.chains.len() {
            let batch = self.run_batch(index, policy).await?;
            summary.batches.push(batch);
        }

        info!(
            batches = summary.batches.len(),
            delivered = summary.delivered(),
            event = "transfer_test_complete"
        );
        Ok(summary)
    }

    async fn run_batch(&self, index: usize, policy: AmountPolicy) -> Result<BatchSummary> {
        let n = self.chains.len();
        let source = &self.chains[index];
        let amount = policy.per_destination(index, n);
        let span = spans::transfer_batch(source.name(), n - 1, &amount);

        async {
            let result = self.dispatch_and_confirm(source, amount).await;
            if let Err(ref e) = result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch_and_confirm(&self, source: &C, amount: U256) -> Result<BatchSummary> {
        let peers = U256::from(self.chains.len() - 1);
        let approval = source.approve_router(amount * peers).await?;
        info!(
            chain = source.name(),
            tx_hash = %approval,
            allowance = %(amount * peers),
            event = "router_approved"
        );

        let recipient = self.signer.into_word();
        let mut in_flight = Vec::with_capacity(self.chains.len() - 1);

        for destination in self.chains.iter().filter(|c| c.domain() != source.domain()) {
            let dispatched = async {
                let gas_payment = source.quote_gas_payment(destination.domain()).await?;
                source
                    .transfer_remote(destination.domain(), recipient, amount, gas_payment)
                    .await
            }
            .instrument(spans::transfer_remote(
                source.name(),
                destination.domain(),
                &amount,
            ))
            .await;
            let message = dispatched?;

            info!(
                origin_chain = source.name(),
                destination_chain = destination.name(),
                message_id = %hex::encode(message.id),
                amount = %amount,
                event = "transfer_dispatched"
            );
            in_flight.push(InFlightTransfer {
                message,
                origin_chain: source.name().to_string(),
                destination_chain: destination.name().to_string(),
            });
        }

        let delivery = DeliveryWatcher::new(ChainDelivery {
            chains: &self.chains,
        })
        .await_all_delivered(in_flight, self.delivery.poll_delay, self.delivery.timeout)
        .await?;

        Ok(BatchSummary {
            source_chain: source.name().to_string(),
            amount,
            approval,
            delivery,
        })
    }

    /// Brings every adapter's Hyperlane to Circle domain table in line with
    /// `registry` for the configured chains, writing only entries that
    /// differ. Returns the number of `addDomain` transactions sent.
    pub async fn sync_domain_mappings(&self, registry: &DomainRegistry) -> Result<usize> {
        let mut writes = 0;

        for chain in &self.chains {
            let span = spans::sync_domain_mappings(chain.name(), self.chains.len());
            let written = async {
                let mut written = 0;
                for peer in &self.chains {
                    let expected = registry.resolve(peer.domain())?.circle_domain;
                    let current = chain.circle_domain(peer.domain()).await?;
                    if current == expected {
                        continue;
                    }

                    let tx_hash = chain.add_domain(peer.domain(), expected).await?;
                    info!(
                        chain = chain.name(),
                        hyperlane_domain = peer.domain(),
                        circle_domain = expected,
                        previous = current,
                        tx_hash = %tx_hash,
                        event = "circle_domain_set"
                    );
                    written += 1;
                }
                Ok::<usize, RelayError>(written)
            }
            .instrument(span)
            .await?;
            writes += written;
        }

        Ok(writes)
    }
}

/// Routes delivery checks to the destination chain's Mailbox.
struct ChainDelivery<'a, C> {
    chains: &'a [C],
}

#[async_trait]
impl<'a, C: RouterChain> DeliveryChecker for ChainDelivery<'a, C> {
    async fn is_delivered(&self, transfer: &InFlightTransfer) -> Result<bool> {
        let domain = transfer.message.destination_domain;
        let chain = self
            .chains
            .iter()
            .find(|c| c.domain() == domain)
            .ok_or(RelayError::UnknownDomain { domain })?;
        chain.is_delivered(transfer.id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ChainCall, FakeRouterChain};
    use rstest::rstest;
    use std::time::Duration;

    fn signer() -> Address {
        Address::repeat_byte(0x57)
    }

    fn orchestrator(chains: Vec<FakeRouterChain>) -> TransferOrchestrator<FakeRouterChain> {
        TransferOrchestrator::builder()
            .chains(chains)
            .signer(signer())
            .delivery(
                DeliveryConfig::default()
                    .with_poll_delay(Duration::from_secs(5))
                    .with_timeout(Duration::from_secs(60)),
            )
            .build()
    }

    fn testnet_chains(balance: u64) -> Vec<FakeRouterChain> {
        vec![
            FakeRouterChain::new("goerli", 5).with_balance(U256::from(balance)),
            FakeRouterChain::new("fuji", 43113).with_balance(U256::from(balance)),
            FakeRouterChain::new("arbitrumgoerli", 421613).with_balance(U256::from(balance)),
        ]
    }

    #[rstest]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 0, 3, 500)]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 1, 3, 250)]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 2, 3, 250)]
    #[case(AmountPolicy::Uniform(U256::from(7)), 2, 3, 7)]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 0, 2, 1000)]
    fn test_per_destination(
        #[case] policy: AmountPolicy,
        #[case] index: usize,
        #[case] chains: usize,
        #[case] expected: u64,
    ) {
        assert_eq!(policy.per_destination(index, chains), U256::from(expected));
    }

    #[rstest]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 0, 1000)]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 1, 500)]
    #[case(AmountPolicy::Distribution(U256::from(1000)), 2, 500)]
    #[case(AmountPolicy::Uniform(U256::from(10)), 0, 20)]
    #[case(AmountPolicy::Uniform(U256::from(10)), 1, 20)]
    #[case(AmountPolicy::Uniform(U256::from(10)), 2, 20)]
    fn test_required_upfront(
        #[case] policy: AmountPolicy,
        #[case] index: usize,
        #[case] expected: u64,
    ) {
        assert_eq!(policy.required_upfront(index, 3), U256::from(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_funds_stops_before_any_transaction() {
        let chains = testnet_chains(999);
        let orchestrator = orchestrator(chains.clone());

        let result = orchestrator.run(AmountPolicy::default()).await;

        match result {
            Err(RelayError::InsufficientFunds { chain, balance, required }) => {
                assert_eq!(chain, "goerli");
                assert_eq!(balance, U256::from(999));
                assert_eq!(required, U256::from(1000));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        for chain in &chains {
            assert!(chain
                .calls()
                .iter()
                .all(|call| matches!(call, ChainCall::Balance(_))));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_chain_shortfall_is_not_covered_by_incoming_transfers() {
        let chains = vec![
            FakeRouterChain::new("goerli", 5).with_balance(U256::from(20)),
            FakeRouterChain::new("fuji", 43113).with_balance(U256::from(10)),
            FakeRouterChain::new("arbitrumgoerli", 421613).with_balance(U256::ZERO),
        ];
        let orchestrator = orchestrator(chains.clone());

        let result = orchestrator.run(AmountPolicy::Uniform(U256::from(10))).await;

        match result {
            Err(RelayError::InsufficientFunds { chain, required, .. }) => {
                assert_eq!(chain, "fuji");
                assert_eq!(required, U256::from(20));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        for chain in &chains {
            assert!(chain
                .calls()
                .iter()
                .all(|call| matches!(call, ChainCall::Balance(_))));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_chain_is_rejected() {
        let orchestrator = orchestrator(vec![FakeRouterChain::new("goerli", 5)]);
        assert!(matches!(
            orchestrator.run(AmountPolicy::default()).await,
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_share_is_rejected() {
        let orchestrator = orchestrator(testnet_chains(1_000_000));
        assert!(matches!(
            orchestrator.run(AmountPolicy::Distribution(U256::from(3))).await,
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_dispatches_every_pair() {
        let chains = testnet_chains(1_000_000);
        for chain in &chains {
            chain.deliver_after_checks(2);
        }
        let orchestrator = orchestrator(chains.clone());

        let summary = orchestrator.run(AmountPolicy::default()).await.unwrap();

        assert_eq!(summary.batches.len(), 3);
        assert_eq!(summary.delivered(), 6);
        assert_eq!(summary.batches[0].amount, U256::from(500));
        assert_eq!(summary.batches[1].amount, U256::from(250));

        let goerli_calls = chains[0].calls();
        assert_eq!(goerli_calls[1], ChainCall::Approve(U256::from(1000)));
        let transfers: Vec<_> = goerli_calls
            .iter()
            .filter_map(|call| match call {
                ChainCall::TransferRemote { destination, recipient, amount, .. } => {
                    Some((*destination, *recipient, *amount))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            transfers,
            vec![
                (43113, signer().into_word(), U256::from(500)),
                (421613, signer().into_word(), U256::from(500)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gas_quote_is_paid_as_value() {
        let chains = testnet_chains(1_000_000);
        chains[0].set_gas_quote(U256::from(42));
        let orchestrator = orchestrator(chains.clone());

        orchestrator.run(AmountPolicy::default()).await.unwrap();

        assert!(chains[0].calls().iter().any(|call| matches!(
            call,
            ChainCall::TransferRemote { gas_payment, .. } if *gas_payment == U256::from(42)
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undelivered_batch_times_out() {
        let chains = testnet_chains(1_000_000);
        chains[1].never_deliver();
        let orchestrator = orchestrator(chains.clone());

        let result = orchestrator.run(AmountPolicy::default()).await;

        match result {
            Err(RelayError::TimedOut { pending, .. }) => assert_eq!(pending.len(), 1),
            other => panic!("expected TimedOut, got {other:?}"),
        }
        // The second source chain never starts.
        assert!(!chains[1]
            .calls()
            .iter()
            .any(|call| matches!(call, ChainCall::Approve(_))));
    }

    #[tokio::test]
    async fn test_sync_domain_mappings_writes_only_differences() {
        let chains = testnet_chains(0);
        // Goerli's adapter already maps fuji correctly; Ethereum (0) reads as unset.
        chains[0].set_circle_domain(43113, 1);
        chains[1].set_circle_domain(421613, 9);
        let orchestrator = orchestrator(chains.clone());

        let writes = orchestrator
            .sync_domain_mappings(&DomainRegistry::builtin().unwrap())
            .await
            .unwrap();

        // goerli: arbitrum goerli; fuji: fuji, arbitrum goerli (wrong); arbitrum goerli: fuji, itself.
        assert_eq!(writes, 5);
        assert_eq!(chains[0].circle_domain_of(421613), Some(3));
        assert_eq!(chains[1].circle_domain_of(421613), Some(3));
        assert_eq!(chains[2].circle_domain_of(43113), Some(1));
    }

    #[tokio::test]
    async fn test_sync_domain_mappings_unknown_domain() {
        let chains = vec![FakeRouterChain::new("goerli", 5), FakeRouterChain::new("devnet", 31337)];
        let orchestrator = orchestrator(chains);

        assert!(matches!(
            orchestrator
                .sync_domain_mappings(&DomainRegistry::builtin().unwrap())
                .await,
            Err(RelayError::UnknownDomain { domain: 31337 })
        ));
    }
}
