use std::fmt::Display;

use pallas::crypto::hash::Hash;
use serde::{Deserialize, Serialize};

use crate::{BlockId, BlockNo, Slot};

/// A chain point carrying only slot + hash, used to describe a rollback
/// target. Unlike `Tip`, a `Point` never carries a block number: it's either
/// `Genesis` or a specific `(slot, blockId)` pair handed down by the
/// follower when it asks us to roll back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq)]
pub enum Point {
    Genesis,
    Specific(Slot, BlockId),
}

impl Point {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Genesis => 0,
            Self::Specific(slot, _) => *slot,
        }
    }

    pub fn hash(&self) -> Option<BlockId> {
        match self {
            Self::Specific(_, hash) => Some(*hash),
            Self::Genesis => None,
        }
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Genesis => write!(f, "Genesis"),
            Self::Specific(slot, hash) => write!(f, "{slot}({hash})"),
        }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Genesis, Self::Genesis) => true,
            (Self::Specific(l0, l1), Self::Specific(r0, r1)) => l0 == r0 && l1 == r1,
            _ => false,
        }
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.slot().cmp(&other.slot()).then_with(|| self.hash().cmp(&other.hash()))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The tip of the in-memory index: either `Genesis` (nothing appended yet)
/// or a fully specified `(slot, blockId, blockNo)` triple.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq)]
pub enum Tip {
    Genesis,
    Tip(Slot, BlockId, BlockNo),
}

impl Tip {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Genesis => 0,
            Self::Tip(slot, ..) => *slot,
        }
    }

    pub fn hash(&self) -> Option<BlockId> {
        match self {
            Self::Tip(_, hash, _) => Some(*hash),
            Self::Genesis => None,
        }
    }

    pub fn block_no(&self) -> Option<BlockNo> {
        match self {
            Self::Tip(_, _, no) => Some(*no),
            Self::Genesis => None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Self::Genesis)
    }

    /// The `Point` this tip would be referenced by in a rollback request.
    pub fn as_point(&self) -> Point {
        match self {
            Self::Genesis => Point::Genesis,
            Self::Tip(slot, hash, _) => Point::Specific(*slot, *hash),
        }
    }
}

impl Display for Tip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Genesis => write!(f, "Genesis"),
            Self::Tip(slot, hash, no) => write!(f, "{slot}({hash})@{no}"),
        }
    }
}

impl PartialEq for Tip {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Genesis, Self::Genesis) => true,
            (Self::Tip(l0, l1, l2), Self::Tip(r0, r1, r2)) => l0 == r0 && l1 == r1 && l2 == r2,
            _ => false,
        }
    }
}

impl Ord for Tip {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.slot().cmp(&other.slot())
    }
}

impl PartialOrd for Tip {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Tip {
    /// Fixed 48-byte encoding used as the value in the `tip` table's key:
    /// 8 bytes big-endian slot, 32 bytes hash, 8 bytes big-endian block no.
    /// Big-endian slot keeps byte order consistent with numeric order, which
    /// the `tip` table relies on for range scans during reduction/rollback.
    pub fn into_bytes(self) -> [u8; 48] {
        let mut out = [0u8; 48];
        out[0..8].copy_from_slice(&self.slot().to_be_bytes());
        out[8..40].copy_from_slice(self.hash().map(|h| *h).unwrap_or([0u8; 32]).as_slice());
        out[40..48].copy_from_slice(&self.block_no().unwrap_or(0).to_be_bytes());
        out
    }

    const GENESIS_BYTES: [u8; 48] = [0u8; 48];

    pub fn from_bytes(value: [u8; 48]) -> Self {
        if value == Self::GENESIS_BYTES {
            return Tip::Genesis;
        }

        let slot_half: [u8; 8] = value[0..8].try_into().unwrap();
        let hash_half: [u8; 32] = value[8..40].try_into().unwrap();
        let no_half: [u8; 8] = value[40..48].try_into().unwrap();

        Tip::Tip(
            u64::from_be_bytes(slot_half),
            Hash::new(hash_half),
            u64::from_be_bytes(no_half) as BlockNo,
        )
    }
}
