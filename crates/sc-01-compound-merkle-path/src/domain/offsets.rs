//! Offset arithmetic inside one level of a binary Merkle tree.

/// Offset of the sibling node on the same level.
#[inline]
pub fn offset_pair(offset: u64) -> u64 {
    if offset % 2 == 0 {
        offset + 1
    } else {
        offset - 1
    }
}

/// Offset of the sibling of this node's parent, one level up.
#[inline]
pub fn parent_offset(offset: u64) -> u64 {
    offset_pair(offset / 2)
}
