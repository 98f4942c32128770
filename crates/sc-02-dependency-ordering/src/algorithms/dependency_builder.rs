//! Dependency Graph Builder
//!
//! Builds the in-batch spend graph from transaction inputs.

use crate::domain::entities::{DependencyGraph, DependencyNode};
use crate::domain::errors::OrderingError;
use std::collections::HashMap;

/// Build a dependency graph from a batch.
///
/// An edge child→parent exists for every input of `child` that spends an
/// output of `parent` where both are in the batch. Inputs referencing
/// transactions outside the batch are ignored.
pub fn build_dependency_graph<T: DependencyNode>(
    nodes: &[T],
) -> Result<DependencyGraph, OrderingError> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
    let mut ids = Vec::with_capacity(nodes.len());

    for (position, node) in nodes.iter().enumerate() {
        let id = node.node_id().to_string();
        if index.insert(id.clone(), position).is_some() {
            return Err(OrderingError::DuplicateTransaction(id));
        }
        ids.push(id);
    }

    let mut parents = vec![Vec::new(); nodes.len()];
    let mut in_degree = vec![0usize; nodes.len()];

    for (position, node) in nodes.iter().enumerate() {
        for parent_id in node.parent_ids() {
            let Some(&parent) = index.get(parent_id) else {
                continue;
            };
            parents[position].push(parent);
            in_degree[parent] += 1;
        }
    }

    Ok(DependencyGraph {
        ids,
        parents,
        in_degree,
        index,
    })
}
