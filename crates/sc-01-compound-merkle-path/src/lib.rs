//! # Compound Merkle Path (sc-01)
//!
//! Converts a Merkle inclusion proof (`txOrId`, `index`, sibling `nodes`)
//! into a Compound Merkle Path: one map per tree level, leaf level first,
//! associating each hash with its offset inside that level.
//!
//! ## Offsets
//!
//! | Function | Definition |
//! |----------|------------|
//! | `offset_pair(o)` | `o + 1` when `o` is even, `o - 1` when odd |
//! | `parent_offset(o)` | `offset_pair(o / 2)` |
//!
//! Level 0 holds the transaction at `index` and its sibling at
//! `offset_pair(index)`. Every higher level `i` holds `nodes[i]` at the
//! running offset `parent_offset(previous)`. A proof without nodes yields an
//! empty path.
//!
//! The transform is pure and total; it never fails.

pub mod domain;

pub use domain::entities::{CompoundMerklePath, ToCompoundMerklePath};
pub use domain::offsets::{offset_pair, parent_offset};
