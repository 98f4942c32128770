//! Compound Merkle Path entity and its construction from a proof.

use serde::{Deserialize, Serialize};
use shared_types::{EntityError, MerkleProof};
use std::collections::BTreeMap;

use super::offsets::{offset_pair, parent_offset};

/// Hash to offset mapping for one tree level.
pub type PathLevel = BTreeMap<String, u64>;

/// Leaf-to-root sequence of per-level `hash -> offset` maps.
///
/// Derived from a proof on demand; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundMerklePath(Vec<PathLevel>);

impl CompoundMerklePath {
    /// Build the path for a single proof.
    ///
    /// When `tx_or_id` equals `nodes[0]` (a duplicated last leaf) level 0
    /// keeps one entry, holding the sibling offset.
    pub fn from_proof(proof: &MerkleProof) -> Self {
        let Some((first, rest)) = proof.nodes.split_first() else {
            return Self::default();
        };

        let mut levels = Vec::with_capacity(proof.nodes.len());
        let mut offset = proof.index;

        let mut leaf = PathLevel::new();
        leaf.insert(proof.tx_or_id.clone(), offset);
        leaf.insert(first.clone(), offset_pair(offset));
        levels.push(leaf);

        for node in rest {
            offset = parent_offset(offset);
            levels.push(PathLevel::from([(node.clone(), offset)]));
        }

        Self(levels)
    }

    /// Number of levels, equal to the proof's node count.
    pub fn height(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn levels(&self) -> &[PathLevel] {
        &self.0
    }

    pub fn level(&self, index: usize) -> Option<&PathLevel> {
        self.0.get(index)
    }

    /// Offset of `hash` on level `level`, if present.
    pub fn offset_of(&self, level: usize, hash: &str) -> Option<u64> {
        self.0.get(level).and_then(|l| l.get(hash)).copied()
    }

    pub fn to_json(&self) -> Result<String, EntityError> {
        serde_json::to_string(self).map_err(|e| EntityError::InvalidMerkleProof(e.to_string()))
    }
}

impl From<&MerkleProof> for CompoundMerklePath {
    fn from(proof: &MerkleProof) -> Self {
        Self::from_proof(proof)
    }
}

/// Conversion available on anything carrying a Merkle proof.
pub trait ToCompoundMerklePath {
    fn to_compound_merkle_path(&self) -> CompoundMerklePath;
}

impl ToCompoundMerklePath for MerkleProof {
    fn to_compound_merkle_path(&self) -> CompoundMerklePath {
        CompoundMerklePath::from_proof(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_index_three_height_three() {
        let proof = MerkleProof::new("tx", 3, nodes(&["h0", "h1", "h2"]));
        let path = proof.to_compound_merkle_path();

        assert_eq!(path.height(), 3);
        assert_eq!(
            path.level(0),
            Some(&PathLevel::from([("tx".to_string(), 3), ("h0".to_string(), 2)]))
        );
        assert_eq!(path.level(1), Some(&PathLevel::from([("h1".to_string(), 0)])));
        assert_eq!(path.level(2), Some(&PathLevel::from([("h2".to_string(), 1)])));
    }

    #[test]
    fn test_empty_nodes_yield_empty_path() {
        let proof = MerkleProof::new("tx", 5, vec![]);
        let path = CompoundMerklePath::from(&proof);
        assert!(path.is_empty());
        assert_eq!(path.to_json().unwrap(), "[]");
    }

    #[test]
    fn test_single_level_even_index() {
        let proof = MerkleProof::new("tx", 0, nodes(&["h0"]));
        let path = proof.to_compound_merkle_path();

        assert_eq!(path.height(), 1);
        assert_eq!(path.offset_of(0, "tx"), Some(0));
        assert_eq!(path.offset_of(0, "h0"), Some(1));
    }

    #[test]
    fn test_duplicated_leaf_keeps_sibling_offset() {
        let proof = MerkleProof::new("tx", 4, nodes(&["tx", "h1"]));
        let path = proof.to_compound_merkle_path();

        assert_eq!(path.level(0).map(|l| l.len()), Some(1));
        assert_eq!(path.offset_of(0, "tx"), Some(5));
    }

    #[test]
    fn test_json_shape() {
        let proof = MerkleProof::new("tx", 1, nodes(&["h0", "h1"]));
        let json = proof.to_compound_merkle_path().to_json().unwrap();
        assert_eq!(json, r#"[{"h0":0,"tx":1},{"h1":1}]"#);
    }

    proptest! {
        #[test]
        fn prop_height_matches_node_count(index in 0u64..1_000_000, height in 0usize..24) {
            let names: Vec<String> = (0..height).map(|i| format!("n{i}")).collect();
            let proof = MerkleProof::new("tx", index, names);
            prop_assert_eq!(proof.to_compound_merkle_path().height(), height);
        }

        #[test]
        fn prop_level_offsets_follow_index_bits(index in 0u64..(1u64 << 40), height in 1usize..24) {
            let names: Vec<String> = (0..height).map(|i| format!("n{i}")).collect();
            let proof = MerkleProof::new("tx", index, names);
            let path = proof.to_compound_merkle_path();

            prop_assert_eq!(path.offset_of(0, "tx"), Some(index));
            prop_assert_eq!(path.offset_of(0, "n0"), Some(index ^ 1));
            for level in 1..height {
                let expected = (index >> level) ^ 1;
                prop_assert_eq!(path.offset_of(level, &format!("n{level}")), Some(expected));
            }
        }
    }
}
