//! Core UTxO state engine for the chain index.
//!
//! This crate is deliberately narrow: it owns the in-memory slot-indexed
//! ledger of UTxO deltas (`UtxoIndex`), the traits a durable projection must
//! implement to stay in lock-step with it (`Projection`), and the two
//! handler traits an upstream follower and an RPC shell consume
//! (`ControlHandler`, `QueryHandler`). Block decoding, the network follower
//! and the RPC shell itself live outside this crate.

pub mod balance;
pub mod config;
pub mod control;
pub mod error;
pub mod index;
pub mod point;
pub mod projection;
pub mod query;
pub mod restore;
pub mod schema;

pub use balance::*;
pub use config::*;
pub use control::*;
pub use error::*;
pub use index::*;
pub use point::*;
pub use projection::*;
pub use query::*;
pub use restore::*;
pub use schema::*;

/// A block slot; monotonically increasing within a chain.
pub type Slot = u64;

/// The height of a block, a.k.a. block number.
pub type BlockNo = u64;

/// A 32-byte content-addressed hash, used for block ids, tx ids and script
/// and datum hashes alike.
pub type Hash32 = pallas::crypto::hash::Hash<32>;

/// The index of an output within its originating transaction.
pub type OutputIndex = u32;

/// A transaction id.
pub type TxId = Hash32;

/// A block id.
pub type BlockId = Hash32;
