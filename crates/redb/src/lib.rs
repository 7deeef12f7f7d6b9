//! `redb`-backed implementation of `chain_index_core::Projection` (C4): the
//! durable relational projection the in-memory `UtxoIndex` is mirrored into.
//!
//! Table layout departs from a literal `(tip_slot, out_ref)` composite key
//! for `unspent_outputs`/`unmatched_inputs` in one respect: here `out_ref`
//! is the key and `tip_slot` is the value. That's what lets
//! `UtxoSetAtAddress`/`UtxoSetWithCurrency` do an O(1) liveness check per
//! candidate instead of a slot-keyed range scan, and it turns
//! `reduceOldUtxoDb`'s "UPDATE tip_slot" step into an in-place value
//! overwrite rather than a delete-and-reinsert. See `DESIGN.md`.

mod store;
mod tables;

pub use store::RedbProjection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] ::redb::DatabaseError),

    #[error(transparent)]
    Transaction(Box<::redb::TransactionError>),

    #[error("internal error")]
    SetDurability(Box<::redb::SetDurabilityError>),

    #[error(transparent)]
    Table(#[from] ::redb::TableError),

    #[error(transparent)]
    Storage(#[from] ::redb::StorageError),

    #[error(transparent)]
    Commit(#[from] ::redb::CommitError),

    #[error("corrupt row encoding in table {0}")]
    Corrupt(&'static str),
}

impl From<::redb::TransactionError> for Error {
    fn from(error: ::redb::TransactionError) -> Self {
        Error::Transaction(Box::new(error))
    }
}

impl From<::redb::SetDurabilityError> for Error {
    fn from(error: ::redb::SetDurabilityError) -> Self {
        Error::SetDurability(Box::new(error))
    }
}

impl From<Error> for chain_index_core::error::ProjectionError {
    fn from(error: Error) -> Self {
        chain_index_core::error::ProjectionError::Storage(error.to_string())
    }
}
