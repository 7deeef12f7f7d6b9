//! Fixture builders and scenario replay for `chain-index`'s test suites.
//! Mirrors `dolos-testing`'s role in the wider workspace — a dedicated
//! crate other crates pull in only as a dev-dependency — scoped down to the
//! handful of helpers this narrower engine's tests actually need: no CBOR
//! block bodies, no mempool, no Cardano ledger rules.

pub mod fixtures;
pub mod scenario;

pub use fixtures::*;
pub use scenario::Scenario;
