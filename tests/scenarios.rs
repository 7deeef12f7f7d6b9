//! Whole-engine scenario tests: drive the public `chain_index::ChainIndex`
//! facade against a real on-disk `redb` file, the way `dolos`'s own
//! `tests/*.rs` exercise a full storage backend rather than a mock. Mirrors
//! scenarios S1-S6, but through the crate boundary a real embedder would use
//! (`ChainIndex::open`/`append_block`/`rollback`/`resume_sync`) instead of
//! `chain-index-core`'s internals directly.

use chain_index::core::{ChainIndexConfig, ChainSyncBlock, Credential, PageQuery, Point};
use chain_index::ChainIndex;
use chain_index_testing::{out_ref, tip_at, TxBuilder};

fn config_at(dir: &std::path::Path, depth: u64) -> ChainIndexConfig {
    ChainIndexConfig {
        depth,
        db_path: dir.join("chain-index.redb").to_string_lossy().to_string(),
        ..ChainIndexConfig::default()
    }
}

/// S1-S3: append two blocks (the second spending one of the first's
/// outputs), then roll back the second away and check liveness reverts,
/// all through a chain index backed by a real file on disk.
#[test]
fn append_then_rollback_round_trips_through_the_facade() {
    let dir = tempfile::tempdir().unwrap();
    let chain = ChainIndex::open(config_at(dir.path(), 2160)).unwrap();

    let (tx1, aux1) = TxBuilder::new(1).produces_plain().produces_plain().build();
    let a = tx1.outputs[0].out_ref;
    let b = tx1.outputs[1].out_ref;

    chain
        .append_block(ChainSyncBlock {
            tip: tip_at(10, 10, 1),
            transactions: vec![(tx1, aux1)],
        })
        .unwrap();

    assert_eq!(chain.tip().slot(), 10);
    assert!(chain.with_query(|q| q.utxo_set_membership(&a).unwrap().1));
    assert!(chain.with_query(|q| q.utxo_set_membership(&b).unwrap().1));

    let (tx2, aux2) = TxBuilder::new(2).spends(a).produces_plain().build();
    let c = tx2.outputs[0].out_ref;

    chain
        .append_block(ChainSyncBlock {
            tip: tip_at(20, 20, 2),
            transactions: vec![(tx2, aux2)],
        })
        .unwrap();

    assert!(!chain.with_query(|q| q.utxo_set_membership(&a).unwrap().1));
    assert!(chain.with_query(|q| q.utxo_set_membership(&c).unwrap().1));

    chain
        .rollback(Point::Specific(10, tip_at(10, 10, 1).hash().unwrap()))
        .unwrap();

    assert_eq!(chain.tip().slot(), 10);
    assert!(chain.with_query(|q| q.utxo_set_membership(&a).unwrap().1));
    assert!(!chain.with_query(|q| q.utxo_set_membership(&c).unwrap().1));
}

/// S6, but across a real process boundary: append two blocks, drop the
/// `ChainIndex`, reopen it against the same on-disk file, and check the
/// restored engine agrees with what was live before the restart.
#[test]
fn restart_restores_tip_and_liveness_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let a;
    let b;
    let c;

    {
        let chain = ChainIndex::open(config_at(dir.path(), 2160)).unwrap();

        let (tx1, aux1) = TxBuilder::new(1).produces_plain().produces_plain().build();
        a = tx1.outputs[0].out_ref;
        b = tx1.outputs[1].out_ref;
        chain
            .append_block(ChainSyncBlock {
                tip: tip_at(10, 10, 1),
                transactions: vec![(tx1, aux1)],
            })
            .unwrap();

        let (tx2, aux2) = TxBuilder::new(2).spends(a).produces_plain().build();
        c = tx2.outputs[0].out_ref;
        chain
            .append_block(ChainSyncBlock {
                tip: tip_at(20, 20, 2),
                transactions: vec![(tx2, aux2)],
            })
            .unwrap();
    }

    let reopened = ChainIndex::open(config_at(dir.path(), 2160)).unwrap();

    assert_eq!(reopened.tip().slot(), 20);
    assert!(!reopened.with_query(|q| q.utxo_set_membership(&a).unwrap().1));
    assert!(reopened.with_query(|q| q.utxo_set_membership(&b).unwrap().1));
    assert!(reopened.with_query(|q| q.utxo_set_membership(&c).unwrap().1));
}

/// S5: garbage collection truncates the address index but leaves the UTxO
/// ledger (and therefore liveness) untouched.
#[test]
fn collect_garbage_drops_address_history_not_liveness() {
    let dir = tempfile::tempdir().unwrap();
    let chain = ChainIndex::open(config_at(dir.path(), 2160)).unwrap();

    let cred = Credential::Payment(chain_index_testing::tag_hash(42));
    let (tx, aux) = TxBuilder::new(1)
        .produces(b"addr-a", vec![cred], Vec::new())
        .produces_plain()
        .build();
    let b = tx.outputs[1].out_ref;

    chain
        .append_block(ChainSyncBlock {
            tip: tip_at(10, 10, 1),
            transactions: vec![(tx, aux)],
        })
        .unwrap();

    chain.collect_garbage().unwrap();

    let page = chain.with_query(|q| q.utxo_set_at_address(PageQuery::first(10), &cred).unwrap());
    assert!(page.items.is_empty());
    assert!(chain.with_query(|q| q.utxo_set_membership(&b).unwrap().1));

    let diag = chain.diagnostics();
    assert_eq!(diag.num_addresses, 0);
    assert_eq!(diag.num_unspent_outputs, 2);
}

/// `ResumeSync` rolls the projection back to the negotiated point and
/// rebuilds the in-memory index purely from what's left on disk.
#[test]
fn resume_sync_rebuilds_index_at_the_requested_point() {
    let dir = tempfile::tempdir().unwrap();
    let chain = ChainIndex::open(config_at(dir.path(), 2160)).unwrap();

    let (tx1, aux1) = TxBuilder::new(1).produces_plain().build();
    let a = out_ref(1, 0);
    chain
        .append_block(ChainSyncBlock {
            tip: tip_at(10, 10, 1),
            transactions: vec![(tx1, aux1)],
        })
        .unwrap();

    let (tx2, aux2) = TxBuilder::new(2).spends(a).produces_plain().build();
    chain
        .append_block(ChainSyncBlock {
            tip: tip_at(20, 20, 2),
            transactions: vec![(tx2, aux2)],
        })
        .unwrap();

    chain
        .resume_sync(Point::Specific(10, tip_at(10, 10, 1).hash().unwrap()))
        .unwrap();

    assert_eq!(chain.tip().slot(), 10);
    assert!(chain.with_query(|q| q.utxo_set_membership(&a).unwrap().1));
}
