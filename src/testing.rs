//! Fakes and fixtures for exercising the relay without chains or HTTP services
//!
//! Each fake shares its state behind `Arc<Mutex<..>>`, so a clone handed to
//! the code under test can still be inspected by the test afterwards.

use alloy_primitives::{hex, keccak256, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

use crate::error::{RelayError, Result};
use crate::protocol::{
    AttestationReply, AttestationResponse, AttestationStatus, BridgeMessage, MessageCodec,
    NativeBridgeNonce,
};
use crate::registry::DomainEndpoints;
use crate::traits::{AttestationProvider, Clock, DeliveryChecker, IndexerProvider, RouterChain};
use crate::watcher::InFlightTransfer;

/// A Hyperlane message dispatched by the Goerli `CctpAdapter` to Fuji,
/// carrying 0.01 USDC and CCTP nonce 233790.
pub const SAMPLE_HYPERLANE_MESSAGE: &str = "00000068BA000000050000000000000000000000009BF4AA106A74F5661500BD58499C6360F53508200000A86900000000000000000000000099E8AB1779B7BD9F96A9719A6178CF7E3C65BF010000000000000000000000005A616C69759B225964E391500798E5B2999683950000000000000000000000000000000000000000000000000000000000002710000000000000000000000000421ED2FB212ED93BC8E16538B0C870D2BD01791C000000000000000000000000000000000000000000000000000000000003913e00000000000000000000000000000000000000000000000000000000000000A000000000000000000000000000000000000000000000000000000000000000045553444300000000000000000000000000000000000000000000000000000000";

/// A CCTP v1 `MessageSent` payload for the burn behind
/// [`SAMPLE_HYPERLANE_MESSAGE`]: Ethereum (0) to Avalanche (1), nonce 233790.
pub fn sample_native_message() -> Bytes {
    let mut message = Vec::with_capacity(248);
    message.extend_from_slice(&0u32.to_be_bytes());
    message.extend_from_slice(&0u32.to_be_bytes());
    message.extend_from_slice(&1u32.to_be_bytes());
    message.extend_from_slice(&0x3913eu64.to_be_bytes());
    // Goerli and Fuji TokenMessenger, then an open destination caller.
    message.extend_from_slice(
        Address::from(hex!("d0c3da58f55358142b8d3e06c1c30c5c6114efe8"))
            .into_word()
            .as_slice(),
    );
    message.extend_from_slice(
        Address::from(hex!("eb08f243e5d3fcff26a9e38ae5520a669f4019d0"))
            .into_word()
            .as_slice(),
    );
    message.extend_from_slice(B256::ZERO.as_slice());
    // Burn message: version, burn token, mint recipient, amount, sender.
    message.extend_from_slice(&0u32.to_be_bytes());
    message.extend_from_slice(
        Address::from(hex!("07865c6e87b9f70255377e024ace6630c1eaa37f"))
            .into_word()
            .as_slice(),
    );
    message.extend_from_slice(
        Address::from(hex!("99e8ab1779b7bd9f96a9719a6178cf7e3c65bf01"))
            .into_word()
            .as_slice(),
    );
    message.extend_from_slice(&U256::from(10_000).to_be_bytes::<32>());
    message.extend_from_slice(
        Address::from(hex!("9bf4aa106a74f5661500bd58499c6360f5350820"))
            .into_word()
            .as_slice(),
    );
    Bytes::from(message)
}

/// An in-flight Goerli to Fuji transfer whose message ID is `seed` repeated.
pub fn sample_transfer(seed: u8) -> InFlightTransfer {
    InFlightTransfer {
        message: BridgeMessage {
            version: 0,
            nonce: seed as u32,
            origin_domain: 5,
            sender: B256::ZERO,
            destination_domain: 43113,
            recipient: B256::ZERO,
            id: B256::repeat_byte(seed),
            body: Bytes::new(),
        },
        origin_chain: "goerli".to_string(),
        destination_chain: "fuji".to_string(),
    }
}

// ============================================================================
// Fake Indexer
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct FakeIndexer {
    messages: Arc<Mutex<HashMap<NativeBridgeNonce, Bytes>>>,
    failures: Arc<Mutex<Vec<NativeBridgeNonce>>>,
    lookups: Arc<Mutex<Vec<(Url, NativeBridgeNonce)>>>,
}

impl FakeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `message` under `nonce`.
    pub fn add_message(&self, nonce: NativeBridgeNonce, message: Bytes) {
        self.messages.lock().unwrap().insert(nonce, message);
    }

    /// Make lookups of `nonce` fail as if the indexer were unreachable.
    pub fn add_failure(&self, nonce: NativeBridgeNonce) {
        self.failures.lock().unwrap().push(nonce);
    }

    /// Nonces looked up, in call order.
    pub fn lookups(&self) -> Vec<NativeBridgeNonce> {
        self.lookups.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    /// Indexer URLs queried, in call order.
    pub fn endpoints(&self) -> Vec<Url> {
        self.lookups
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl IndexerProvider for FakeIndexer {
    async fn message_by_nonce(
        &self,
        indexer: &Url,
        nonce: NativeBridgeNonce,
    ) -> Result<Option<Bytes>> {
        self.lookups.lock().unwrap().push((indexer.clone(), nonce));

        if self.failures.lock().unwrap().contains(&nonce) {
            return Err(RelayError::Provider("Simulated indexer outage".to_string()));
        }
        Ok(self.messages.lock().unwrap().get(&nonce).cloned())
    }
}

// ============================================================================
// Fake Attestation Provider
// ============================================================================

#[derive(Clone, Debug)]
enum FakeReply {
    Reply(AttestationReply),
    HttpError(u16),
}

/// Replays a configured sequence of replies per message hash; the last entry
/// repeats once the sequence is exhausted. Unknown hashes answer 404.
#[derive(Clone, Debug, Default)]
pub struct FakeAttestationProvider {
    responses: Arc<Mutex<HashMap<B256, Vec<FakeReply>>>>,
    call_counts: Arc<Mutex<HashMap<B256, usize>>>,
}

fn record(status: AttestationStatus, attestation: Option<&str>) -> AttestationReply {
    let raw = json!({ "status": status, "attestation": attestation.unwrap_or("PENDING") });
    AttestationReply::Record {
        response: AttestationResponse {
            status,
            attestation: attestation.map(|a| Bytes::from(hex::decode(a).unwrap())),
        },
        raw,
    }
}

impl FakeAttestationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response_sequence(&self, message_hash: B256, replies: Vec<AttestationReply>) {
        self.responses.lock().unwrap().insert(
            message_hash,
            replies.into_iter().map(FakeReply::Reply).collect(),
        );
    }

    pub fn add_complete_response(&self, message_hash: B256, attestation_hex: &str) {
        self.add_response_sequence(
            message_hash,
            vec![record(AttestationStatus::Complete, Some(attestation_hex))],
        );
    }

    pub fn add_failed_response(&self, message_hash: B256) {
        self.add_response_sequence(message_hash, vec![record(AttestationStatus::Failed, None)]);
    }

    pub fn add_always_pending(&self, message_hash: B256) {
        self.add_response_sequence(
            message_hash,
            vec![record(AttestationStatus::PendingConfirmations, None)],
        );
    }

    /// `pending` pending replies, then a complete one.
    pub fn add_pending_then_complete(
        &self,
        message_hash: B256,
        pending: usize,
        attestation_hex: &str,
    ) {
        let mut replies = vec![record(AttestationStatus::PendingConfirmations, None); pending];
        replies.push(record(AttestationStatus::Complete, Some(attestation_hex)));
        self.add_response_sequence(message_hash, replies);
    }

    /// One HTTP 429, then a complete reply.
    pub fn add_rate_limit_then_complete(&self, message_hash: B256, attestation_hex: &str) {
        self.responses.lock().unwrap().insert(
            message_hash,
            vec![
                FakeReply::HttpError(429),
                FakeReply::Reply(record(AttestationStatus::Complete, Some(attestation_hex))),
            ],
        );
    }

    pub fn call_count(&self, message_hash: B256) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(&message_hash)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn get_attestation(
        &self,
        _endpoints: &DomainEndpoints,
        message_hash: B256,
    ) -> Result<AttestationReply> {
        let responses = self.responses.lock().unwrap();
        let mut counts = self.call_counts.lock().unwrap();
        let index = counts.get(&message_hash).copied().unwrap_or(0);
        counts.insert(message_hash, index + 1);

        let Some(sequence) = responses.get(&message_hash) else {
            return Ok(AttestationReply::NotFound {
                raw: json!({ "error": "Message hash not found" }),
            });
        };

        match sequence.get(index).or(sequence.last()) {
            Some(FakeReply::Reply(reply)) => Ok(reply.clone()),
            Some(FakeReply::HttpError(status)) => Err(RelayError::AttestationQueryFailed {
                status: Some(*status),
                body: "Too Many Requests".to_string(),
            }),
            None => Ok(AttestationReply::NotFound {
                raw: json!({ "error": "Message hash not found" }),
            }),
        }
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that records sleeps and advances instantly.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *self.current_time.lock().unwrap() += duration;
    }

    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

// ============================================================================
// Fake Delivery Checker
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct FakeDeliveryChecker {
    deliver_on: Arc<Mutex<HashMap<B256, usize>>>,
    failing_checks: Arc<Mutex<HashMap<B256, usize>>>,
    checks: Arc<Mutex<HashMap<B256, usize>>>,
}

impl FakeDeliveryChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `id` delivered from its `check`-th check on. Unconfigured IDs
    /// are never delivered.
    pub fn deliver_on_check(&self, id: B256, check: usize) {
        self.deliver_on.lock().unwrap().insert(id, check);
    }

    /// Fail the first `count` checks of `id`.
    pub fn fail_checks(&self, id: B256, count: usize) {
        self.failing_checks.lock().unwrap().insert(id, count);
    }

    pub fn check_count(&self, id: B256) -> usize {
        self.checks.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DeliveryChecker for FakeDeliveryChecker {
    async fn is_delivered(&self, transfer: &InFlightTransfer) -> Result<bool> {
        let id = transfer.id();
        let check = {
            let mut checks = self.checks.lock().unwrap();
            let count = checks.entry(id).or_insert(0);
            *count += 1;
            *count
        };

        let failing = self.failing_checks.lock().unwrap().get(&id).copied().unwrap_or(0);
        if check <= failing {
            return Err(RelayError::Provider("Simulated RPC error".to_string()));
        }

        Ok(self
            .deliver_on
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|on| check >= *on))
    }
}

// ============================================================================
// Fake Router Chain
// ============================================================================

/// Calls made against a [`FakeRouterChain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainCall {
    Balance(Address),
    Approve(U256),
    QuoteGas(u32),
    TransferRemote {
        destination: u32,
        recipient: B256,
        amount: U256,
        gas_payment: U256,
    },
    IsDelivered(B256),
    CircleDomain(u32),
    AddDomain {
        hyperlane_domain: u32,
        circle_domain: u32,
    },
}

#[derive(Debug)]
struct ChainState {
    balance: U256,
    gas_quote: U256,
    /// `None` never delivers.
    deliver_after: Option<usize>,
    delivery_checks: HashMap<B256, usize>,
    circle_domains: HashMap<u32, u32>,
    next_nonce: u32,
    calls: Vec<ChainCall>,
}

/// An in-memory warp-route chain. Messages dispatched to it are reported
/// delivered on the first check unless configured otherwise.
#[derive(Clone, Debug)]
pub struct FakeRouterChain {
    name: String,
    domain: u32,
    state: Arc<Mutex<ChainState>>,
}

impl FakeRouterChain {
    pub fn new(name: &str, domain: u32) -> Self {
        Self {
            name: name.to_string(),
            domain,
            state: Arc::new(Mutex::new(ChainState {
                balance: U256::ZERO,
                gas_quote: U256::from(1_000_000_000u64),
                deliver_after: Some(1),
                delivery_checks: HashMap::new(),
                circle_domains: HashMap::new(),
                next_nonce: 0,
                calls: Vec::new(),
            })),
        }
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.state.lock().unwrap().balance = balance;
        self
    }

    pub fn set_gas_quote(&self, quote: U256) {
        self.state.lock().unwrap().gas_quote = quote;
    }

    /// Report messages delivered from their `checks`-th check on.
    pub fn deliver_after_checks(&self, checks: usize) {
        self.state.lock().unwrap().deliver_after = Some(checks);
    }

    pub fn never_deliver(&self) {
        self.state.lock().unwrap().deliver_after = None;
    }

    pub fn set_circle_domain(&self, hyperlane_domain: u32, circle_domain: u32) {
        self.state
            .lock()
            .unwrap()
            .circle_domains
            .insert(hyperlane_domain, circle_domain);
    }

    pub fn circle_domain_of(&self, hyperlane_domain: u32) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .circle_domains
            .get(&hyperlane_domain)
            .copied()
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn log(&self, call: ChainCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn fake_tx_hash(domain: u32, seq: usize) -> TxHash {
    keccak256([domain.to_be_bytes().as_slice(), &seq.to_be_bytes()].concat())
}

#[async_trait]
impl RouterChain for FakeRouterChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> u32 {
        self.domain
    }

    async fn token_balance(&self, owner: Address) -> Result<U256> {
        self.log(ChainCall::Balance(owner));
        Ok(self.state.lock().unwrap().balance)
    }

    async fn approve_router(&self, amount: U256) -> Result<TxHash> {
        self.log(ChainCall::Approve(amount));
        Ok(fake_tx_hash(self.domain, self.calls().len()))
    }

    async fn quote_gas_payment(&self, destination: u32) -> Result<U256> {
        self.log(ChainCall::QuoteGas(destination));
        Ok(self.state.lock().unwrap().gas_quote)
    }

    async fn transfer_remote(
        &self,
        destination: u32,
        recipient: B256,
        amount: U256,
        gas_payment: U256,
    ) -> Result<BridgeMessage> {
        self.log(ChainCall::TransferRemote {
            destination,
            recipient,
            amount,
            gas_payment,
        });

        let nonce = {
            let mut state = self.state.lock().unwrap();
            state.balance = state.balance.saturating_sub(amount);
            state.next_nonce += 1;
            state.next_nonce
        };

        let mut body = Vec::with_capacity(64);
        body.extend_from_slice(recipient.as_slice());
        body.extend_from_slice(&amount.to_be_bytes::<32>());

        let mut message = BridgeMessage {
            version: 3,
            nonce,
            origin_domain: self.domain,
            sender: Address::repeat_byte(0xad).into_word(),
            destination_domain: destination,
            recipient: Address::repeat_byte(0xad).into_word(),
            id: B256::ZERO,
            body: Bytes::from(body),
        };
        message.id = keccak256(MessageCodec::default().encode(&message)?);
        Ok(message)
    }

    async fn is_delivered(&self, message_id: B256) -> Result<bool> {
        self.log(ChainCall::IsDelivered(message_id));
        let mut state = self.state.lock().unwrap();
        let checks = state.delivery_checks.entry(message_id).or_insert(0);
        *checks += 1;
        let checks = *checks;
        Ok(state.deliver_after.is_some_and(|after| checks >= after))
    }

    async fn circle_domain(&self, hyperlane_domain: u32) -> Result<u32> {
        self.log(ChainCall::CircleDomain(hyperlane_domain));
        Ok(self.circle_domain_of(hyperlane_domain).unwrap_or(0))
    }

    async fn add_domain(&self, hyperlane_domain: u32, circle_domain: u32) -> Result<TxHash> {
        self.log(ChainCall::AddDomain {
            hyperlane_domain,
            circle_domain,
        });
        self.set_circle_domain(hyperlane_domain, circle_domain);
        Ok(fake_tx_hash(self.domain, self.calls().len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_native_message_carries_nonce() {
        let message = sample_native_message();
        assert_eq!(message.len(), 248);
        assert_eq!(&message[12..20], &0x3913eu64.to_be_bytes());
    }

    #[tokio::test]
    async fn test_fake_clock_tracks_sleep_calls() {
        let clock = FakeClock::new();
        let before = clock.now();

        clock.sleep(Duration::from_secs(60)).await;
        clock.sleep(Duration::from_secs(120)).await;

        assert_eq!(clock.sleep_count(), 2);
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(180));
        assert_eq!(clock.now() - before, Duration::from_secs(180));
    }

    #[tokio::test]
    async fn test_fake_attestation_sequence_repeats_last() {
        let provider = FakeAttestationProvider::new();
        let endpoints = crate::registry::DomainRegistry::builtin()
            .unwrap()
            .resolve(5)
            .unwrap()
            .clone();
        let hash = B256::repeat_byte(1);
        provider.add_pending_then_complete(hash, 1, "0x01ab");

        let first = provider.get_attestation(&endpoints, hash).await.unwrap();
        let second = provider.get_attestation(&endpoints, hash).await.unwrap();
        let third = provider.get_attestation(&endpoints, hash).await.unwrap();

        assert!(matches!(
            first,
            AttestationReply::Record { response: AttestationResponse { status: AttestationStatus::PendingConfirmations, .. }, .. }
        ));
        assert_eq!(second, third);
        assert_eq!(provider.call_count(hash), 3);
    }

    #[tokio::test]
    async fn test_fake_router_chain_dispatch_ids_are_unique() {
        let chain = FakeRouterChain::new("goerli", 5);
        let first = chain
            .transfer_remote(43113, B256::ZERO, U256::from(1), U256::ZERO)
            .await
            .unwrap();
        let second = chain
            .transfer_remote(43113, B256::ZERO, U256::from(1), U256::ZERO)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.origin_domain, 5);
        assert_eq!(second.nonce, 2);
    }
}
