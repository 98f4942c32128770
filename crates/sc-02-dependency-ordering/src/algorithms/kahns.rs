//! Kahn's Topological Sort Algorithm
//!
//! O(V + E). In-degree is counted on parents, so the queue starts from the
//! batch leaves (transactions nobody in the batch spends) and walks towards
//! the roots. Reversing the visit order yields ancestors first.

use crate::algorithms::dependency_builder::build_dependency_graph;
use crate::domain::entities::{DependencyGraph, DependencyNode};
use crate::domain::errors::OrderingError;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Perform Kahn's topological sort on a dependency graph.
///
/// Returns node positions, ancestors first. The queue is seeded in position
/// order so equal inputs always produce equal output.
pub fn kahns_topological_sort(graph: &DependencyGraph) -> Result<Vec<usize>, OrderingError> {
    if graph.is_empty() {
        return Ok(vec![]);
    }

    // 1. Copy in-degree (we'll modify it)
    let mut in_degree = graph.in_degree.clone();

    // 2. Seed with leaves, in position order
    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(position, _)| position)
        .collect();

    // 3. Walk from leaves towards roots
    let mut visited = Vec::with_capacity(graph.len());
    while let Some(node) = queue.pop_front() {
        visited.push(node);
        for &parent in &graph.parents[node] {
            let degree = &mut in_degree[parent];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                queue.push_back(parent);
            }
        }
    }

    // 4. Cycle detection: anything not visited sits on or behind a cycle
    if visited.len() < graph.len() {
        let unresolved: Vec<_> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(position, _)| graph.ids[position].clone())
            .collect();
        warn!(unresolved = unresolved.len(), "Dependency cycle in batch");
        return Err(OrderingError::CycleDetected { unresolved });
    }

    visited.reverse();
    Ok(visited)
}

/// Reorder `items` so every in-batch parent precedes its children.
pub fn sort_ancestors_first<T: DependencyNode>(items: Vec<T>) -> Result<Vec<T>, OrderingError> {
    let graph = build_dependency_graph(&items)?;
    let order = kahns_topological_sort(&graph)?;
    debug!(
        transactions = graph.len(),
        edges = graph.edge_count(),
        "Batch ordered ancestors first"
    );

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect())
}
