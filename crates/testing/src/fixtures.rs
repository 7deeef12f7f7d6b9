//! Deterministic fake tips, hashes and `Tx` builders, the same role
//! `dolos-testing`'s `blocks.rs::slot_to_hash` plays for the node-follower
//! tests, scaled down to this crate's domain: no CBOR, no genesis, just the
//! handful of typed values `chain-index-core` actually consumes.

use chain_index_core::{AssetClass, AuxRows, Credential, Hash32, Tip, Tx, TxOutRef, TxOutput};

/// A stable hash derived from a single byte tag. Two calls with the same tag
/// always produce the same hash; distinct tags practically never collide.
pub fn tag_hash(tag: u8) -> Hash32 {
    let mut hasher = pallas::crypto::hash::Hasher::<256>::new();
    hasher.input(&[tag]);
    hasher.finalize()
}

/// A `Tip` at `slot`, tagged with a block hash and derived block number.
pub fn tip_at(slot: u64, tag: u8, block_no: u64) -> Tip {
    Tip::Tip(slot, tag_hash(tag), block_no)
}

/// A `TxOutRef` pointing at output `index` of the tx tagged `tag`.
pub fn out_ref(tag: u8, index: u32) -> TxOutRef {
    TxOutRef::new(tag_hash(tag), index)
}

/// Builds a `Tx` (and the `AuxRows` a follower would project for it) from a
/// tag, a set of consumed refs, and a list of `(address, credentials,
/// assets)` triples describing the outputs it produces.
pub struct TxBuilder {
    tx_id: Hash32,
    inputs: Vec<TxOutRef>,
    outputs: Vec<TxOutput>,
    store_tx: bool,
}

impl TxBuilder {
    pub fn new(tag: u8) -> Self {
        Self {
            tx_id: tag_hash(tag),
            inputs: Vec::new(),
            outputs: Vec::new(),
            store_tx: true,
        }
    }

    pub fn spends(mut self, out_ref: TxOutRef) -> Self {
        self.inputs.push(out_ref);
        self
    }

    pub fn produces(mut self, address: &[u8], credentials: Vec<Credential>, assets: Vec<AssetClass>) -> Self {
        let index = self.outputs.len() as u32;
        self.outputs.push(TxOutput {
            out_ref: TxOutRef::new(self.tx_id, index),
            address: address.to_vec(),
            credentials,
            assets,
            datum_hash: None,
            body: vec![0u8; 8],
        });
        self
    }

    /// A bare output with no credential/asset tags, for tests that only
    /// care about balance tracking.
    pub fn produces_plain(self) -> Self {
        self.produces(b"", Vec::new(), Vec::new())
    }

    pub fn store(mut self, store_tx: bool) -> Self {
        self.store_tx = store_tx;
        self
    }

    pub fn out_ref(&self, index: u32) -> TxOutRef {
        TxOutRef::new(self.tx_id, index)
    }

    pub fn build(self) -> (Tx, AuxRows) {
        let aux = derive_aux_rows(&self.outputs);
        let tx = Tx {
            tx_id: self.tx_id,
            inputs: self.inputs,
            outputs: self.outputs,
            store_tx: self.store_tx,
        };
        (tx, aux)
    }
}

/// The `AuxRows` a real follower would derive from a decoded tx's outputs:
/// the resolved output bodies plus every credential/asset tag they carry.
/// Datums and scripts aren't modeled here since `TxOutput` only carries a
/// datum *hash*, not its content — tests that need datum/script lookups
/// populate those rows directly.
pub fn derive_aux_rows(outputs: &[TxOutput]) -> AuxRows {
    let mut aux = AuxRows::default();

    for out in outputs {
        for cred in &out.credentials {
            aux.addresses.push((*cred, out.out_ref));
        }
        for asset in &out.assets {
            aux.asset_classes.push((asset.clone(), out.out_ref));
        }
        aux.outputs.push(out.clone());
    }

    aux
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_hash_is_deterministic() {
        assert_eq!(tag_hash(7), tag_hash(7));
        assert_ne!(tag_hash(7), tag_hash(8));
    }

    #[test]
    fn builder_derives_address_and_asset_rows() {
        let cred = Credential::Payment(tag_hash(99));
        let asset = AssetClass {
            policy_id: tag_hash(1),
            token_name: b"SYNTH".to_vec(),
        };

        let (tx, aux) = TxBuilder::new(1)
            .produces(b"addr1", vec![cred], vec![asset.clone()])
            .build();

        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(aux.addresses, vec![(cred, tx.outputs[0].out_ref)]);
        assert_eq!(aux.asset_classes, vec![(asset, tx.outputs[0].out_ref)]);
    }
}
