//! Core entities for Dependency Ordering

use shared_types::{IncomingTransaction, Transaction, TxId};
use std::collections::HashMap;

/// Anything that has an id and spends outputs of other ids.
pub trait DependencyNode {
    fn node_id(&self) -> &str;

    /// Ids of the transactions whose outputs this node spends.
    fn parent_ids(&self) -> Vec<&str>;
}

impl DependencyNode for Transaction {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn parent_ids(&self) -> Vec<&str> {
        Transaction::parent_ids(self).collect()
    }
}

impl DependencyNode for IncomingTransaction {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn parent_ids(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .map(|i| i.previous_tx_id.as_str())
            .collect()
    }
}

/// In-batch dependency graph over node positions.
///
/// `parents[i]` lists the positions `i` spends from (one entry per input, so
/// a node spending two outputs of the same parent lists it twice).
/// `in_degree[p]` counts how many in-batch inputs spend from `p`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub ids: Vec<TxId>,
    pub parents: Vec<Vec<usize>>,
    pub in_degree: Vec<usize>,
    pub index: HashMap<TxId, usize>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of in-batch spend edges.
    pub fn edge_count(&self) -> usize {
        self.parents.iter().map(Vec::len).sum()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}
