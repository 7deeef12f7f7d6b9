//! Control Handler (C5): orchestrates `AppendBlock` / `Rollback` /
//! `ResumeSync` / `CollectGarbage` / `GetDiagnostics` transitions over the
//! in-memory `UtxoIndex` and its `Projection`.
//!
//! Mirrors how this codebase keeps `WalStore`/`StateStore`/`ArchiveStore` as
//! independent trait boundaries rather than a single god object: the
//! control surface takes an explicit context (`ChainIndexConfig` +
//! `Projection`) rather than owning global state.

use std::sync::Mutex;

use tracing::{error, info, warn};

use crate::{
    error::{ControlError, InsertError, RollbackError},
    index::{InsertSuccess, ReduceResult},
    AuxRows, ChainIndexConfig, Diagnostics, Point, Projection, Tip, Tx, UtxoIndex, UtxoState,
};

/// A block handed down by the follower, paired per-tx with whether it
/// should be indexed into the auxiliary tables.
pub struct ChainSyncBlock {
    pub tip: Tip,
    pub transactions: Vec<(Tx, AuxRows)>,
}

/// Orchestrates state transitions over a single `UtxoIndex`, guarded by one
/// mutex: only one writer is ever active, matching the concurrency model's
/// single-writer-many-readers contract.
pub struct ControlHandler<P: Projection> {
    index: Mutex<UtxoIndex>,
    projection: P,
    config: ChainIndexConfig,
}

impl<P: Projection> ControlHandler<P> {
    pub fn new(index: UtxoIndex, projection: P, config: ChainIndexConfig) -> Self {
        Self {
            index: Mutex::new(index),
            projection,
            config,
        }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn tip(&self) -> Tip {
        self.index.lock().expect("utxo index mutex poisoned").tip()
    }

    /// Snapshot of the in-memory index, used by tests and by `Restore` to
    /// cross-check observational equivalence after a reload.
    pub fn snapshot(&self) -> Vec<UtxoState> {
        self.index
            .lock()
            .expect("utxo index mutex poisoned")
            .entries()
            .to_vec()
    }

    /// Builds a `QueryHandler` over the current in-memory index and this
    /// handler's projection, for the duration of `f`. A real RPC shell would
    /// rather copy just the tip out from under the lock and run projection
    /// I/O unlocked (see §5's consistency note); this is the coarser,
    /// correct-by-construction version used by tests and single-threaded
    /// embedding.
    pub fn with_query<R>(&self, f: impl FnOnce(crate::query::QueryHandler<P>) -> R) -> R {
        let index = self.index.lock().expect("utxo index mutex poisoned");
        f(crate::query::QueryHandler::new(&index, &self.projection))
    }

    pub fn append_block(&self, block: ChainSyncBlock) -> Result<(), ControlError> {
        let txs: Vec<Tx> = block.transactions.iter().map(|(tx, _)| tx.clone()).collect();
        let new_state = UtxoState::from_block(block.tip, &txs);

        let mut index = self.index.lock().expect("utxo index mutex poisoned");

        // Stage the transition on a scratch copy: §4.3 commits the database
        // first and only swaps the in-memory index in once that succeeds, so
        // a projection failure must never leave `index` ahead of `tip`.
        let mut staged = index.clone();

        let insert_result = staged.insert(new_state.clone());

        let InsertSuccess { position } = match insert_result {
            Ok(success) => success,
            Err(cause) => {
                error!(tip = %block.tip, "insertion failed");
                return Err(ControlError::InsertionFailed(cause));
            }
        };

        // A tx's aux rows are only projected when it asked to be stored; its
        // balance still applies regardless (already folded into `new_state`
        // above via `from_block`, which doesn't look at `store_tx`).
        let storable = block.transactions.iter().filter(|(tx, _)| tx.store_tx);

        let combined_aux = AuxRows {
            outputs: storable
                .clone()
                .flat_map(|(_, aux)| aux.outputs.clone())
                .collect(),
            datums: storable
                .clone()
                .flat_map(|(_, aux)| aux.datums.clone())
                .collect(),
            scripts: storable
                .clone()
                .flat_map(|(_, aux)| aux.scripts.clone())
                .collect(),
            redeemers: storable
                .clone()
                .flat_map(|(_, aux)| aux.redeemers.clone())
                .collect(),
            addresses: storable
                .clone()
                .flat_map(|(_, aux)| aux.addresses.clone())
                .collect(),
            asset_classes: storable
                .flat_map(|(_, aux)| aux.asset_classes.clone())
                .collect(),
        };

        let reduced = staged.reduce_block_count(self.config.depth as usize);

        let reduce_to_slot = match &reduced {
            ReduceResult::Reduced { combined_state } => Some(combined_state.tip.slot()),
            ReduceResult::NotReduced => None,
        };

        self.projection.apply_append(
            block.tip,
            &new_state,
            &combined_aux,
            self.config.batch_size,
            reduce_to_slot,
        )?;

        *index = staged;

        info!(tip = %block.tip, pos = position, "insertion success");

        Ok(())
    }

    pub fn rollback(&self, point: Point) -> Result<(), ControlError> {
        let mut index = self.index.lock().expect("utxo index mutex poisoned");

        // Same staged-commit shape as `append_block`: resolve the rollback
        // against a scratch copy and only swap it in once the projection
        // write has committed, so a failed `apply_rollback` leaves the live
        // index untouched rather than ahead of the database.
        let mut staged = index.clone();

        let rollback_result = staged.rollback(point);

        let result = match rollback_result {
            Ok(result) => result,
            Err(cause) => {
                error!(%point, "rollback failed");
                return Err(ControlError::RollbackFailed(cause));
            }
        };

        self.projection.apply_rollback(point)?;

        *index = staged;

        info!(tip = %result.new_tip, "rollback success");

        Ok(())
    }

    /// Rolls back to `point` then rebuilds the in-memory index purely from
    /// the projection, the same restore path taken at startup.
    pub fn resume_sync(&self, point: Point) -> Result<(), ControlError> {
        self.projection.apply_rollback(point)?;

        let restored = crate::restore::restore_from_projection(&self.projection)?;

        let mut index = self.index.lock().expect("utxo index mutex poisoned");
        *index = restored;

        info!(%point, "resumed sync from projection");

        Ok(())
    }

    pub fn collect_garbage(&self) -> Result<(), ControlError> {
        self.projection.collect_garbage()?;
        Ok(())
    }

    pub fn get_diagnostics(&self) -> Diagnostics {
        self.projection.diagnostics()
    }

    pub fn warn_if_genesis(&self) {
        if self.tip().is_genesis() {
            warn!("tip is genesis");
        }
    }
}

pub use crate::error::InsertError as UtxoIndexInsertError;
pub use crate::error::RollbackError as UtxoIndexRollbackError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{AuxRows as ProjAux, Diagnostics as ProjDiagnostics, Page, PageQuery};
    use crate::{AssetClass, Credential};
    use pallas::crypto::hash::Hash;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryProjection {
        balances: StdMutex<Vec<UtxoState>>,
        tip: StdMutex<Option<Tip>>,
    }

    impl Projection for InMemoryProjection {
        fn apply_append(
            &self,
            tip: Tip,
            state: &UtxoState,
            _aux: &AuxRows,
            _batch_size: usize,
            _reduce_to_slot: Option<u64>,
        ) -> Result<(), crate::error::ProjectionError> {
            self.balances.lock().unwrap().push(state.clone());
            *self.tip.lock().unwrap() = Some(tip);
            Ok(())
        }

        fn apply_rollback(&self, point: Point) -> Result<(), crate::error::ProjectionError> {
            self.balances
                .lock()
                .unwrap()
                .retain(|s| s.tip.slot() <= point.slot());
            Ok(())
        }

        fn collect_garbage(&self) -> Result<(), crate::error::ProjectionError> {
            Ok(())
        }

        fn diagnostics(&self) -> ProjDiagnostics {
            ProjDiagnostics::default()
        }

        fn datum_from_hash(&self, _hash: &crate::Hash32) -> Result<Option<Vec<u8>>, crate::error::ProjectionError> {
            Ok(None)
        }

        fn script_from_hash(&self, _hash: &crate::Hash32) -> Result<Option<Vec<u8>>, crate::error::ProjectionError> {
            Ok(None)
        }

        fn redeemer_from_hash(&self, _hash: &crate::Hash32) -> Result<Option<Vec<u8>>, crate::error::ProjectionError> {
            Ok(None)
        }

        fn tx_out_from_ref(
            &self,
            _out_ref: &crate::TxOutRef,
        ) -> Result<Option<crate::TxOutput>, crate::error::ProjectionError> {
            Ok(None)
        }

        fn utxo_set_at_credential(
            &self,
            page: PageQuery,
            _credential: &Credential,
        ) -> Result<Page<crate::TxOutRef>, crate::error::ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn utxo_set_with_currency(
            &self,
            page: PageQuery,
            _asset: &AssetClass,
        ) -> Result<Page<crate::TxOutRef>, crate::error::ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn txo_set_at_credential(
            &self,
            page: PageQuery,
            _credential: &Credential,
        ) -> Result<Page<crate::TxOutRef>, crate::error::ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn get_tip(&self) -> Result<Option<Tip>, crate::error::ProjectionError> {
            Ok(*self.tip.lock().unwrap())
        }

        fn get_resume_points(&self) -> Result<Vec<Tip>, crate::error::ProjectionError> {
            Ok(self.tip.lock().unwrap().iter().copied().collect())
        }

        fn read_all_balances(&self) -> Result<Vec<UtxoState>, crate::error::ProjectionError> {
            Ok(self.balances.lock().unwrap().clone())
        }
    }

    fn hash(byte: u8) -> Hash<32> {
        Hash::new([byte; 32])
    }

    #[test]
    fn append_then_rollback_round_trips() {
        let handler = ControlHandler::new(
            UtxoIndex::new(),
            InMemoryProjection::default(),
            ChainIndexConfig::default(),
        );

        let tx = crate::Tx {
            tx_id: hash(1),
            inputs: Vec::new(),
            outputs: Vec::new(),
            store_tx: true,
        };

        handler
            .append_block(ChainSyncBlock {
                tip: Tip::Tip(10, hash(10), 1),
                transactions: vec![(tx, ProjAux::default())],
            })
            .unwrap();

        assert_eq!(handler.tip().slot(), 10);

        handler.rollback(Point::Genesis).unwrap();
        assert!(handler.tip().is_genesis());
    }
}
