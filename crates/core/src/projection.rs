//! `Projection` (C4): the trait a durable relational store must implement to
//! stay in lock-step with the in-memory `UtxoIndex`. The in-memory index is
//! the single source of truth for liveness (see the open question in the
//! design notes); a `Projection` is a derived read-path optimization plus
//! the durability layer `Restore` rebuilds from at startup.

use crate::{
    error::ProjectionError, AssetClass, Credential, Hash32, Point, Tip, TxOutRef, TxOutput,
    UtxoState,
};

/// One page of an ordered-by-`out_ref` query result.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub page_size: usize,
    pub after_key: Option<TxOutRef>,
}

impl PageQuery {
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size,
            after_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub current_page_query: PageQuery,
    pub next_page_query: Option<PageQuery>,
    pub items: Vec<T>,
}

/// Counts answering `GetDiagnostics`. A value of `-1` means the underlying
/// aggregate query failed rather than propagating the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    pub num_scripts: i64,
    pub num_addresses: i64,
    pub num_asset_classes: i64,
    pub num_unspent_outputs: i64,
    pub num_unmatched_inputs: i64,
}

/// One row of per-tx auxiliary data projected alongside a block's balance.
/// Emitted by the control handler for every tx whose `store_tx` flag is
/// true; skipped otherwise (but the balance is always applied).
#[derive(Debug, Clone, Default)]
pub struct AuxRows {
    pub outputs: Vec<TxOutput>,
    pub datums: Vec<(Hash32, Vec<u8>)>,
    pub scripts: Vec<(Hash32, Vec<u8>)>,
    pub redeemers: Vec<(Hash32, Vec<u8>)>,
    pub addresses: Vec<(Credential, TxOutRef)>,
    pub asset_classes: Vec<(AssetClass, TxOutRef)>,
}

/// The relational projection kept in lock-step with the in-memory
/// `UtxoIndex` across append/rollback/reduce/gc transitions (C4).
pub trait Projection {
    /// Applies a single block's balance and auxiliary rows in one write
    /// transaction. Rows are batched internally in groups of `batch_size`.
    ///
    /// When `reduce_to_slot` is `Some(slot)`, `reduceOldUtxoDb(slot)` runs
    /// first, inside the *same* write transaction as the append: per §4.3
    /// step 3, reduction and the block it triggered on must commit or abort
    /// together, so a failed append never leaves the projection reduced
    /// without the block that caused the reduction.
    fn apply_append(
        &self,
        tip: Tip,
        state: &UtxoState,
        aux: &AuxRows,
        batch_size: usize,
        reduce_to_slot: Option<u64>,
    ) -> Result<(), ProjectionError>;

    /// `rollbackUtxoDb`: deletes every `tip` row (and dependent
    /// output/input rows) with slot greater than `point`'s slot; a `Genesis`
    /// point deletes every `tip` row.
    fn apply_rollback(&self, point: Point) -> Result<(), ProjectionError>;

    /// Truncates the per-tx indices (`datums`, `scripts`, `redeemers`,
    /// `utxo_out_ref`, `addresses`, `asset_classes`). Leaves `tip`,
    /// `unspent_outputs`, `unmatched_inputs` untouched.
    fn collect_garbage(&self) -> Result<(), ProjectionError>;

    fn diagnostics(&self) -> Diagnostics;

    fn datum_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError>;

    fn script_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError>;

    fn redeemer_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError>;

    fn tx_out_from_ref(&self, out_ref: &TxOutRef) -> Result<Option<TxOutput>, ProjectionError>;

    fn utxo_set_at_credential(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, ProjectionError>;

    fn utxo_set_with_currency(
        &self,
        page: PageQuery,
        asset: &AssetClass,
    ) -> Result<Page<TxOutRef>, ProjectionError>;

    fn txo_set_at_credential(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, ProjectionError>;

    /// Reads the max-slot row from `tip`, if any has been persisted.
    fn get_tip(&self) -> Result<Option<Tip>, ProjectionError>;

    /// All persisted tips, newest-first, as candidate intersection points
    /// for the upstream follower to negotiate a resume point from.
    fn get_resume_points(&self) -> Result<Vec<Tip>, ProjectionError>;

    /// Reads every `unspent_outputs`/`unmatched_inputs` row, ordered
    /// ascending by slot, used by `Restore` to rebuild the in-memory index.
    fn read_all_balances(&self) -> Result<Vec<UtxoState>, ProjectionError>;
}
