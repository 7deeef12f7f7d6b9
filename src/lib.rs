//! `chain-index`: the crate boundary that wires the core UTxO engine
//! (`chain_index_core`) to its `redb`-backed projection (`chain_index_redb`),
//! the way the root `dolos` crate wires `dolos-core` to the storage and
//! serving crates it depends on — this crate carries no node-follower, no
//! RPC shell and no CLI of its own (those are external collaborators per
//! the engine's scope), only the facade a caller embeds directly.

pub mod facade;

pub use chain_index_core as core;
pub use chain_index_redb as redb;

pub use facade::{init_tracing, load_config, ChainIndex, Error};
