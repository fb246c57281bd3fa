//! Hyperlane message envelope decoding
//!
//! The `CctpAdapter` dispatches a Hyperlane message whose body carries the
//! CCTP transfer (recipient, amount, burn token, CCTP nonce, token symbol).
//! The envelope layout is selected by its leading version byte through a
//! [`LayoutTable`], so a change of envelope or adapter body format is a
//! table entry rather than a code change.
//!
//! Reference: <https://docs.hyperlane.xyz/docs/reference/messaging/messaging-interface>

use std::fmt;

use alloy_primitives::{hex, keccak256, Address, Bytes, B256};

use crate::error::{RelayError, Result};

/// Byte offsets of one envelope version.
///
/// Domains and the Hyperlane nonce are 4-byte big-endian integers, sender and
/// recipient are 32-byte words (addresses left-padded with zeros).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLayout {
    pub version: u8,
    pub nonce_offset: usize,
    pub origin_offset: usize,
    pub sender_offset: usize,
    pub destination_offset: usize,
    pub recipient_offset: usize,
    /// Length of the header; the body starts here.
    pub header_len: usize,
    /// Offset of the 8-byte CCTP nonce, relative to the start of the body.
    pub body_nonce_offset: usize,
}

impl MessageLayout {
    /// Hyperlane envelope used by the CCTP adapter:
    ///
    /// - version: uint8 (1 byte)
    /// - nonce: uint32 (4 bytes)
    /// - origin: uint32 (4 bytes)
    /// - sender: bytes32 (32 bytes)
    /// - destination: uint32 (4 bytes)
    /// - recipient: bytes32 (32 bytes)
    /// - body: abi.encode(bytes32 recipient, uint256 amount, address token, uint64 nonce, string symbol)
    ///
    /// The CCTP nonce is the low 8 bytes of the fourth ABI word: 3 * 32 + 24 = 120.
    pub const fn hyperlane(version: u8) -> Self {
        Self {
            version,
            nonce_offset: 1,
            origin_offset: 5,
            sender_offset: 9,
            destination_offset: 41,
            recipient_offset: 45,
            header_len: 77,
            body_nonce_offset: 120,
        }
    }

    /// Every header field must lie within `header_len`, after the version byte.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("nonce", self.nonce_offset, 4),
            ("origin", self.origin_offset, 4),
            ("sender", self.sender_offset, 32),
            ("destination", self.destination_offset, 4),
            ("recipient", self.recipient_offset, 32),
        ];
        for (name, offset, len) in fields {
            let end = offset.checked_add(len).unwrap_or(usize::MAX);
            if offset == 0 || end > self.header_len {
                return Err(RelayError::InvalidConfig(format!(
                    "layout v{}: {name} field {offset}..{end} outside header of {} bytes",
                    self.version, self.header_len
                )));
            }
        }
        Ok(())
    }

    fn read_u32(&self, bytes: &[u8], offset: usize) -> u32 {
        u32::from_be_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }
}

/// Envelope layouts keyed by version byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    layouts: Vec<MessageLayout>,
}

impl Default for LayoutTable {
    /// Versions 0 and 3 of the Hyperlane envelope, both carrying the adapter body.
    fn default() -> Self {
        Self {
            layouts: vec![MessageLayout::hyperlane(0), MessageLayout::hyperlane(3)],
        }
    }
}

impl LayoutTable {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            layouts: Vec::new(),
        }
    }

    /// Adds a layout, replacing any existing entry for the same version.
    /// Fails with `InvalidConfig` when a header field ends past `header_len`.
    pub fn with_layout(mut self, layout: MessageLayout) -> Result<Self> {
        layout.validate()?;
        self.layouts.retain(|l| l.version != layout.version);
        self.layouts.push(layout);
        Ok(self)
    }

    /// Looks up the layout for a version byte.
    pub fn get(&self, version: u8) -> Result<&MessageLayout> {
        self.layouts
            .iter()
            .find(|l| l.version == version)
            .ok_or(RelayError::UnsupportedVersion { version })
    }
}

/// A decoded Hyperlane message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeMessage {
    pub version: u8,
    /// Mailbox nonce on the origin chain.
    pub nonce: u32,
    /// Domain that dispatched the message; registry and indexer lookups key on it.
    pub origin_domain: u32,
    pub sender: B256,
    pub destination_domain: u32,
    pub recipient: B256,
    /// keccak256 of the whole envelope, as computed by the Mailbox.
    pub id: B256,
    pub body: Bytes,
}

impl BridgeMessage {
    /// The 20-byte sender address.
    pub fn sender_address(&self) -> Address {
        Address::from_word(self.sender)
    }

    /// The 20-byte recipient address.
    pub fn recipient_address(&self) -> Address {
        Address::from_word(self.recipient)
    }
}

/// The CCTP nonce carried inside the adapter body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeBridgeNonce(u64);

impl NativeBridgeNonce {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Sixteen lowercase hex characters, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for NativeBridgeNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decodes envelopes and extracts the CCTP nonce.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    layouts: LayoutTable,
}

impl MessageCodec {
    pub fn new(layouts: LayoutTable) -> Self {
        Self { layouts }
    }

    /// Decodes a hex envelope, with or without `0x` prefix.
    pub fn decode(&self, raw: &str) -> Result<BridgeMessage> {
        let bytes = hex::decode(raw.trim()).map_err(|e| RelayError::MalformedMessage {
            reason: format!("invalid hex: {e}"),
        })?;
        self.decode_bytes(&bytes)
    }

    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<BridgeMessage> {
        let version = *bytes.first().ok_or_else(|| RelayError::MalformedMessage {
            reason: "empty message".to_string(),
        })?;
        let layout = self.layouts.get(version)?;

        if bytes.len() < layout.header_len {
            return Err(RelayError::MalformedMessage {
                reason: format!(
                    "message is {} bytes, header needs {}",
                    bytes.len(),
                    layout.header_len
                ),
            });
        }

        Ok(BridgeMessage {
            version,
            nonce: layout.read_u32(bytes, layout.nonce_offset),
            origin_domain: layout.read_u32(bytes, layout.origin_offset),
            sender: B256::from_slice(&bytes[layout.sender_offset..layout.sender_offset + 32]),
            destination_domain: layout.read_u32(bytes, layout.destination_offset),
            recipient: B256::from_slice(
                &bytes[layout.recipient_offset..layout.recipient_offset + 32],
            ),
            id: keccak256(bytes),
            body: Bytes::copy_from_slice(&bytes[layout.header_len..]),
        })
    }

    /// Re-serialises the envelope with the layout of its version.
    pub fn encode(&self, message: &BridgeMessage) -> Result<Bytes> {
        let layout = self.layouts.get(message.version)?;
        let mut bytes = vec![0u8; layout.header_len];

        bytes[0] = message.version;
        let mut put = |offset: usize, field: &[u8]| {
            bytes[offset..offset + field.len()].copy_from_slice(field);
        };
        put(layout.nonce_offset, &message.nonce.to_be_bytes());
        put(layout.origin_offset, &message.origin_domain.to_be_bytes());
        put(layout.sender_offset, message.sender.as_slice());
        put(layout.destination_offset, &message.destination_domain.to_be_bytes());
        put(layout.recipient_offset, message.recipient.as_slice());

        bytes.extend_from_slice(&message.body);
        Ok(Bytes::from(bytes))
    }

    /// Reads the CCTP nonce from the message body.
    pub fn extract_nonce(&self, message: &BridgeMessage) -> Result<NativeBridgeNonce> {
        let layout = self.layouts.get(message.version)?;
        let start = layout.body_nonce_offset;
        let window = message
            .body
            .get(start..start + 8)
            .ok_or_else(|| RelayError::MalformedMessage {
                reason: format!(
                    "body is {} bytes, nonce needs {}",
                    message.body.len(),
                    start + 8
                ),
            })?;

        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(window);
        Ok(NativeBridgeNonce(u64::from_be_bytes(nonce)))
    }
}
