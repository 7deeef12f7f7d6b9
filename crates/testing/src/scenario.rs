//! A `Scenario` wraps a live `ControlHandler<RedbProjection>` so a test can
//! drive append/rollback/resume/gc events and assert on the result, the same
//! role `dolos-testing`'s harnesses play for the node-follower stack, scaled
//! down to this crate's domain and backed by an in-memory `redb` database
//! rather than a real chain.

use chain_index_core::{
    error::ControlError, AuxRows, ChainIndexConfig, ChainSyncBlock, ControlHandler, Diagnostics,
    Point, Tip, Tx, TxOutRef,
};
use chain_index_redb::RedbProjection;

pub struct Scenario {
    handler: ControlHandler<RedbProjection>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    pub fn new() -> Self {
        Self::with_config(ChainIndexConfig::default())
    }

    pub fn with_config(config: ChainIndexConfig) -> Self {
        let projection = RedbProjection::in_memory().expect("in-memory redb database");
        Self {
            handler: ControlHandler::new(chain_index_core::UtxoIndex::new(), projection, config),
        }
    }

    pub fn append(&self, tip: Tip, txs: Vec<(Tx, AuxRows)>) -> Result<(), ControlError> {
        self.handler.append_block(ChainSyncBlock {
            tip,
            transactions: txs,
        })
    }

    pub fn rollback(&self, point: Point) -> Result<(), ControlError> {
        self.handler.rollback(point)
    }

    pub fn resume_sync(&self, point: Point) -> Result<(), ControlError> {
        self.handler.resume_sync(point)
    }

    pub fn collect_garbage(&self) -> Result<(), ControlError> {
        self.handler.collect_garbage()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.handler.get_diagnostics()
    }

    pub fn tip(&self) -> Tip {
        self.handler.tip()
    }

    /// `(tip, is_unspent)` for `out_ref`, as `UtxoSetMembership` would
    /// report it. Panics if the tip is still `Genesis`; scenarios that want
    /// to exercise the genesis error path should call `handler()` directly.
    pub fn is_unspent(&self, out_ref: &TxOutRef) -> bool {
        self.handler
            .with_query(|q| q.utxo_set_membership(out_ref).map(|(_, live)| live))
            .expect("scenario queried before any block was appended")
    }

    pub fn handler(&self) -> &ControlHandler<RedbProjection> {
        &self.handler
    }
}
