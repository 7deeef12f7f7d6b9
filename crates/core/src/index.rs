//! `UtxoIndex` (C3): an ordered, in-memory timeline of `UtxoState` entries
//! measured by tip. A `Vec` gives us O(1) tip access and O(n) split/rollback;
//! the finger-tree shape the balance-tracking literature uses isn't required
//! here, only its split/concat/measure contract, and within the configured
//! depth window `n` stays small.

use tracing::{debug, warn};

use crate::{
    error::{InsertError, RollbackError},
    Point, Tip, TxOutRef, TxUtxoBalance, UtxoState,
};

#[derive(Debug, Clone, Default)]
pub struct UtxoIndex {
    entries: Vec<UtxoState>,
}

pub struct InsertSuccess {
    pub position: usize,
}

pub struct RollbackResult {
    pub new_tip: Tip,
}

pub enum ReduceResult {
    Reduced {
        combined_state: UtxoState,
    },
    NotReduced,
}

impl UtxoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<UtxoState>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[UtxoState] {
        &self.entries
    }

    /// The tip of the rightmost entry, or `Genesis` for an empty index.
    pub fn tip(&self) -> Tip {
        self.entries.last().map(|e| e.tip).unwrap_or(Tip::Genesis)
    }

    pub fn oldest_slot(&self) -> Option<u64> {
        self.entries.first().map(|e| e.tip.slot())
    }

    pub fn insert(&mut self, new: UtxoState) -> Result<InsertSuccess, InsertError> {
        if new.tip.is_genesis() {
            return Err(InsertError::InsertUtxoNoTip);
        }

        let current_tip = self.tip();

        if new.tip.slot() <= current_tip.slot() {
            return Err(InsertError::DuplicateBlock(new.tip.slot()));
        }

        self.entries.push(new);

        Ok(InsertSuccess {
            position: self.entries.len() - 1,
        })
    }

    /// Splits off the suffix whose tips have `slot > point.slot`.
    pub fn rollback(&mut self, point: Point) -> Result<RollbackResult, RollbackError> {
        if let Some(oldest) = self.oldest_slot() {
            if point.slot() < oldest && !matches!(point, Point::Genesis) {
                return Err(RollbackError::OldPointNotFound(point));
            }
        }

        if let Point::Specific(slot, hash) = point {
            if let Some(entry) = self.entries.iter().find(|e| e.tip.slot() == slot) {
                if entry.tip.hash() != Some(hash) {
                    return Err(RollbackError::TipMismatch(slot));
                }
            }
        }

        self.entries.retain(|e| e.tip.slot() <= point.slot());

        let new_tip = self.tip();

        debug!(%point, %new_tip, "rolled back in-memory index");

        Ok(RollbackResult { new_tip })
    }

    /// Collapses every entry older than the depth window into a single
    /// combined entry. Only triggers once the index holds more than
    /// `depth + 1` entries; this is the only operation that loses historical
    /// rollback resolution, so callers must persist the reduction before
    /// swapping the index in.
    pub fn reduce_block_count(&mut self, depth: usize) -> ReduceResult {
        if self.entries.len() <= depth + 1 {
            return ReduceResult::NotReduced;
        }

        let split_at = self.entries.len() - depth;
        let collapsed: Vec<UtxoState> = self.entries.drain(..split_at).collect();

        let combined_tip = collapsed
            .last()
            .map(|e| e.tip)
            .expect("collapsed range is non-empty");

        let combined_balance = collapsed
            .into_iter()
            .fold(TxUtxoBalance::empty(), |acc, e| acc.merge(e.data));

        let combined_state = UtxoState {
            data: combined_balance,
            tip: combined_tip,
        };

        self.entries.insert(0, combined_state.clone());

        warn!(slot = combined_tip.slot(), "reduced utxo index depth window");

        ReduceResult::Reduced { combined_state }
    }

    /// True iff some delta contains `out_ref` in its outputs and no later
    /// delta contains it in its inputs.
    pub fn is_unspent_output(&self, out_ref: &TxOutRef) -> bool {
        let mut found_output_at = None;

        for (i, entry) in self.entries.iter().enumerate() {
            if entry.data.contains_output(out_ref) {
                found_output_at = Some(i);
            }
        }

        let Some(produced_at) = found_output_at else {
            return false;
        };

        !self.entries[produced_at..]
            .iter()
            .any(|e| e.data.contains_input(out_ref))
    }
}
