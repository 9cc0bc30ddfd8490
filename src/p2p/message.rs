use serde::{Deserialize, Serialize};

use crate::blockchain::Block;

/// Wire-level message tag. Serialized as the plain integer every
/// implementation of this protocol agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessageKind {
    /// Ask a peer for its single most recent block.
    QueryLatest = 0,
    /// Ask a peer for its full chain.
    QueryAll = 1,
    /// Carry a serialized chain: one block or the whole thing,
    /// depending on the query that triggered it.
    ResponseChain = 2,
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKind::QueryLatest),
            1 => Ok(MessageKind::QueryAll),
            2 => Ok(MessageKind::ResponseChain),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

/// One peer-protocol message: `{ "type": <int>, "data": <string|null> }`.
///
/// For RESPONSE_CHAIN, `data` holds the JSON-encoded block array as a
/// string (the chain is serialized independently of the envelope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Option<String>,
}

impl PeerMessage {
    pub fn query_latest() -> Self {
        Self {
            kind: MessageKind::QueryLatest,
            data: None,
        }
    }

    pub fn query_all() -> Self {
        Self {
            kind: MessageKind::QueryAll,
            data: None,
        }
    }

    pub fn response_chain(blocks: &[Block]) -> Self {
        Self {
            kind: MessageKind::ResponseChain,
            data: Some(serde_json::to_string(blocks).expect("blocks serialize")),
        }
    }
}
