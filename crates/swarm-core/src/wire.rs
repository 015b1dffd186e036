//! Peer-link frame format.
//!
//! Every message between two nodes is an 8-byte `FrameHeader` followed by a
//! JSON payload of `length` bytes. The header is `#[repr(C, packed)]` with
//! zerocopy derives, so it is read and written without any unsafe code.

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::node::NodeDetails;

// ── Header ────────────────────────────────────────────────────────────────────

/// Fixed header preceding every payload.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Frame format version. Currently 0x01.
    pub version: u8,
    /// Payload kind, see `FrameKind`.
    pub kind: u8,
    /// Reserved, must be zero.
    pub reserved: [u8; 2],
    /// Payload length in bytes, big-endian.
    pub length: U32<BigEndian>,
}

assert_eq_size!(FrameHeader, [u8; 8]);

impl FrameHeader {
    pub fn new(kind: FrameKind, length: usize) -> Result<Self, WireError> {
        if length > MAX_FRAME_PAYLOAD {
            return Err(WireError::PayloadTooLarge(length));
        }
        Ok(Self {
            version: FRAME_VERSION,
            kind: kind.into(),
            reserved: [0; 2],
            length: U32::new(length as u32),
        })
    }

    /// Parse and validate a header from its 8 wire bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        let header = Self::read_from_prefix(bytes).ok_or(WireError::Truncated(bytes.len()))?;
        if header.version != FRAME_VERSION {
            return Err(WireError::UnknownVersion(header.version));
        }
        FrameKind::try_from(header.kind)?;
        let len = header.payload_len();
        if len > MAX_FRAME_PAYLOAD {
            return Err(WireError::PayloadTooLarge(len));
        }
        Ok(header)
    }

    pub fn payload_len(&self) -> usize {
        self.length.get() as usize
    }
}

// ── Kinds ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// First frame on every link: the sender's own details.
    Hello = 0x01,
    /// Gossip: details of nodes the sender knows.
    PeerList = 0x02,
}

impl TryFrom<u8> for FrameKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(FrameKind::Hello),
            0x02 => Ok(FrameKind::PeerList),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(k: FrameKind) -> u8 {
        k as u8
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Decoded frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerMessage {
    Hello(NodeDetails),
    PeerList(Vec<NodeDetails>),
}

impl PeerMessage {
    pub fn kind(&self) -> FrameKind {
        match self {
            PeerMessage::Hello(_) => FrameKind::Hello,
            PeerMessage::PeerList(_) => FrameKind::PeerList,
        }
    }

    /// Encode to header + payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let payload = match self {
            PeerMessage::Hello(details) => serde_json::to_vec(details),
            PeerMessage::PeerList(peers) => serde_json::to_vec(peers),
        }
        .map_err(|e| WireError::Payload(e.to_string()))?;

        let header = FrameHeader::new(self.kind(), payload.len())?;
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decode a payload described by an already-validated header.
    pub fn decode(header: &FrameHeader, payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() != header.payload_len() {
            return Err(WireError::Truncated(payload.len()));
        }
        let bad = |e: serde_json::Error| WireError::Payload(e.to_string());
        match FrameKind::try_from(header.kind)? {
            FrameKind::Hello => serde_json::from_slice(payload).map(PeerMessage::Hello).map_err(bad),
            FrameKind::PeerList => serde_json::from_slice(payload)
                .map(PeerMessage::PeerList)
                .map_err(bad),
        }
    }
}

// ── Constants ─────────────────────────────────────────────────────────────────

/// Current frame format version.
pub const FRAME_VERSION: u8 = 0x01;

pub const FRAME_HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

/// Largest accepted payload (1 MiB).
pub const MAX_FRAME_PAYLOAD: usize = 1 << 20;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown frame kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("unknown frame version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("payload length {0} exceeds maximum {}", MAX_FRAME_PAYLOAD)]
    PayloadTooLarge(usize),

    #[error("frame truncated at {0} bytes")]
    Truncated(usize),

    #[error("malformed payload: {0}")]
    Payload(String),
}
