//! Layered error enums, composed with `#[from]` the way the rest of this
//! codebase composes them: one enum per component, folded into a top-level
//! `ChainIndexError` at the crate boundary.

use thiserror::Error;

use crate::{Point, Slot};

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("cannot insert a block at genesis tip")]
    InsertUtxoNoTip,

    #[error("duplicate block at slot {0}, index tip is already at or past it")]
    DuplicateBlock(Slot),

    #[error("tip mismatch inserting at slot {0}: predecessor hash does not match")]
    TipMismatch(Slot),
}

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("rollback point {0} is older than the oldest retained snapshot")]
    OldPointNotFound(Point),

    #[error("tip mismatch at slot {0}: retained hash differs from requested point")]
    TipMismatch(Slot),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query failed: index has no tip yet")]
    QueryFailedNoTip,

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("underlying storage error: {0}")]
    Storage(String),

    #[error("invalid cursor encoding")]
    InvalidCursor,

    #[error("requested table is not initialized")]
    UninitializedTable,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("insertion failed: {0}")]
    InsertionFailed(#[from] InsertError),

    #[error("rollback failed: {0}")]
    RollbackFailed(#[from] RollbackError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Top-level error surfaced across the crate boundary.
#[derive(Debug, Error)]
pub enum ChainIndexError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("configuration error: {0}")]
    Config(String),
}
