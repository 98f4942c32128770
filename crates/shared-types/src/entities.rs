//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Transaction`, `IncomingTransaction`, `TransactionInput`
//! - **Drafts**: `DraftTransaction`, `DraftOutput`, `PaymailP4`
//! - **Proofs**: `MerkleProof`, `TransactionInfo`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EntityError;

/// Hex-encoded transaction id.
pub type TxId = String;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// Reference from a transaction input to the output it spends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Id of the transaction whose output is spent.
    pub previous_tx_id: TxId,
    /// Output index inside the parent transaction.
    pub output_index: u32,
}

impl TransactionInput {
    pub fn new(previous_tx_id: impl Into<TxId>, output_index: u32) -> Self {
        Self {
            previous_tx_id: previous_tx_id.into(),
            output_index,
        }
    }
}

/// A transaction recorded by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    /// Raw transaction, hex encoded.
    pub hex: String,
    pub inputs: Vec<TransactionInput>,
    /// Account that recorded the transaction.
    pub xpub_id: String,
    /// Accounts owning the spent inputs, in input order.
    pub xpub_in_ids: Vec<String>,
    /// Draft the transaction was built from, empty when externally created.
    pub draft_id: String,
    pub block_hash: String,
    pub block_height: u64,
    pub merkle_proof: Option<MerkleProof>,
}

impl Transaction {
    pub fn new(id: impl Into<TxId>, hex: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hex: hex.into(),
            ..Self::default()
        }
    }

    /// Ids of every parent referenced by the inputs, in input order.
    pub fn parent_ids(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.previous_tx_id.as_str())
    }

    /// First input-owning account, or `""` when inputs carry no owner.
    pub fn first_input_owner(&self) -> &str {
        self.xpub_in_ids.first().map(String::as_str).unwrap_or("")
    }

    pub fn has_draft(&self) -> bool {
        !self.draft_id.is_empty()
    }

    /// True once block data has been attached.
    pub fn is_mined(&self) -> bool {
        !self.block_hash.is_empty()
    }

    /// Attach confirmation data returned by a chain query.
    pub fn apply_chain_info(&mut self, info: &TransactionInfo) {
        self.block_hash = info.block_hash.clone();
        self.block_height = info.block_height;
        self.merkle_proof = info.merkle_proof.clone();
    }
}

/// A transaction seen by the engine but not yet recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncomingTransaction {
    pub id: TxId,
    pub hex: String,
    pub inputs: Vec<TransactionInput>,
}

impl IncomingTransaction {
    pub fn new(id: impl Into<TxId>, hex: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hex: hex.into(),
            inputs: Vec::new(),
        }
    }
}

// =============================================================================
// CLUSTER B: DRAFTS
// =============================================================================

/// How a paymail destination was resolved when the draft was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionType {
    /// Plain address resolution, nothing to notify.
    #[serde(rename = "basic_resolution")]
    Basic,
    /// Peer-to-peer: the finished transaction must be sent to the provider.
    #[serde(rename = "p2p")]
    P2p,
}

impl ResolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionType::Basic => "basic_resolution",
            ResolutionType::P2p => "p2p",
        }
    }
}

impl fmt::Display for ResolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionType {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic_resolution" => Ok(ResolutionType::Basic),
            "p2p" => Ok(ResolutionType::P2p),
            other => Err(EntityError::UnknownValue {
                kind: "resolution type",
                value: other.to_string(),
            }),
        }
    }
}

/// Paymail destination details stored on a draft output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymailP4 {
    pub alias: String,
    pub domain: String,
    /// Provider endpoint accepting finished transactions.
    pub receive_endpoint: String,
    /// Reference handed out by the provider during resolution.
    pub reference_id: String,
    pub resolution_type: ResolutionType,
}

impl PaymailP4 {
    pub fn address(&self) -> String {
        format!("{}@{}", self.alias, self.domain)
    }

    pub fn is_p2p(&self) -> bool {
        self.resolution_type == ResolutionType::P2p
    }
}

/// One output of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftOutput {
    pub to: String,
    pub satoshis: u64,
    pub paymail_p4: Option<PaymailP4>,
}

/// Unsigned transaction template the recorded transaction was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftTransaction {
    pub id: String,
    pub xpub_id: String,
    pub outputs: Vec<DraftOutput>,
}

impl DraftTransaction {
    /// Destinations that must be notified peer-to-peer, in output order.
    pub fn p2p_destinations(&self) -> impl Iterator<Item = &PaymailP4> {
        self.outputs
            .iter()
            .filter_map(|o| o.paymail_p4.as_ref())
            .filter(|p4| p4.is_p2p())
    }
}

// =============================================================================
// CLUSTER C: PROOFS
// =============================================================================

/// Merkle inclusion proof as returned by a chain provider.
///
/// `nodes[i]` is the sibling hash at level `i` (leaf level first).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    /// Transaction id (or full transaction) the proof is for.
    pub tx_or_id: String,
    /// Position of the transaction in the block's leaf row.
    pub index: u64,
    pub nodes: Vec<String>,
}

impl MerkleProof {
    pub fn new(tx_or_id: impl Into<String>, index: u64, nodes: Vec<String>) -> Self {
        Self {
            tx_or_id: tx_or_id.into(),
            index,
            nodes,
        }
    }

    /// Tree height covered by the proof.
    pub fn height(&self) -> usize {
        self.nodes.len()
    }

    /// Encode for storage as a text column.
    pub fn to_json(&self) -> Result<String, EntityError> {
        serde_json::to_string(self).map_err(|e| EntityError::InvalidMerkleProof(e.to_string()))
    }

    /// Decode a stored proof. An empty string decodes to `None`.
    pub fn from_json(raw: &str) -> Result<Option<Self>, EntityError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| EntityError::InvalidMerkleProof(e.to_string()))
    }
}

/// Confirmation data returned by a chain query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub id: TxId,
    pub block_hash: String,
    pub block_height: u64,
    pub merkle_proof: Option<MerkleProof>,
    /// Provider that answered the query.
    pub provider: String,
}
