//! `TxUtxoBalance`: the per-block delta of produced and consumed outputs
//! (C2). Carries no script/datum data of its own — that lives in the
//! per-tx indices projected by `Projection`.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::{BlockId, Hash32, OutputIndex, TxId};

/// Reference to a transaction output: `(TxId, OutputIndex)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxOutRef {
    pub tx_id: TxId,
    pub index: OutputIndex,
}

impl TxOutRef {
    pub fn new(tx_id: TxId, index: OutputIndex) -> Self {
        Self { tx_id, index }
    }

    /// Fixed 36-byte big-endian encoding: 32-byte tx id then 4-byte index.
    /// Used as the sort key for every table keyed by `out_ref`, so ordering
    /// here must match the pagination contract's "ascending by out_ref
    /// lexicographic bytes".
    pub fn into_bytes(self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[0..32].copy_from_slice(self.tx_id.as_slice());
        out[32..36].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: [u8; 36]) -> Self {
        let tx_half: [u8; 32] = bytes[0..32].try_into().unwrap();
        let idx_half: [u8; 4] = bytes[32..36].try_into().unwrap();
        Self {
            tx_id: Hash32::new(tx_half),
            index: u32::from_be_bytes(idx_half),
        }
    }
}

impl std::fmt::Display for TxOutRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

/// The payment or stake credential carried by an address. We don't model
/// bech32/base58 parsing here (that's the follower's job, upstream of this
/// crate); a credential is just the raw hash bytes plus a kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Credential {
    Payment(Hash32),
    Stake(Hash32),
    Script(Hash32),
}

impl Credential {
    pub fn as_hash(&self) -> &Hash32 {
        match self {
            Self::Payment(h) | Self::Stake(h) | Self::Script(h) => h,
        }
    }
}

/// `(currencySymbol, tokenName)`. Never constructed for the ada pair — that
/// exclusion is enforced by the caller building asset_classes rows, not by
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetClass {
    pub policy_id: Hash32,
    pub token_name: Vec<u8>,
}

/// A resolved transaction handed to us by the upstream follower: already
/// decoded, never raw CBOR.
#[derive(Debug, Clone)]
pub struct Tx {
    pub tx_id: TxId,
    pub inputs: Vec<TxOutRef>,
    pub outputs: Vec<TxOutput>,
    /// When false, skip projecting this tx's datum/script/redeemer/address/
    /// asset rows, but still apply its balance to the UTxO set.
    pub store_tx: bool,
}

/// The body of an output, as resolved by the upstream follower.
#[derive(Debug, Clone)]
pub struct TxOutput {
    pub out_ref: TxOutRef,
    pub address: Vec<u8>,
    pub credentials: Vec<Credential>,
    pub assets: Vec<AssetClass>,
    pub datum_hash: Option<Hash32>,
    pub body: Vec<u8>,
}

/// The per-block delta: outputs created, inputs consumed. Disjoint within a
/// single block by construction (see `from_block`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxUtxoBalance {
    pub outputs: BTreeSet<TxOutRef>,
    pub inputs: BTreeSet<TxOutRef>,
}

impl TxUtxoBalance {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Componentwise union, the monoid this type forms under `<>`.
    pub fn merge(mut self, other: Self) -> Self {
        self.outputs.extend(other.outputs);
        self.inputs.extend(other.inputs);
        self
    }

    /// `outputs = (⋃ tx.outputs) \ (⋃ tx.inputs)`, `inputs = (⋃ tx.inputs) \
    /// (⋃ tx.outputs)` — pairs created and spent within the same block
    /// cancel out of both sets, not just `inputs`.
    pub fn from_block(txs: &[Tx]) -> Self {
        let mut raw_outputs = BTreeSet::new();
        let mut raw_inputs = BTreeSet::new();

        for tx in txs {
            raw_outputs.extend(tx.outputs.iter().map(|o| o.out_ref));
            raw_inputs.extend(tx.inputs.iter().copied());
        }

        let outputs: BTreeSet<TxOutRef> = raw_outputs.difference(&raw_inputs).copied().collect();
        let inputs: BTreeSet<TxOutRef> = raw_inputs.difference(&raw_outputs).copied().collect();

        Self { outputs, inputs }
    }

    pub fn contains_output(&self, out_ref: &TxOutRef) -> bool {
        self.outputs.contains(out_ref)
    }

    pub fn contains_input(&self, out_ref: &TxOutRef) -> bool {
        self.inputs.contains(out_ref)
    }
}

/// The unit carried at each slot of the `UtxoIndex`: a balance paired with
/// the tip it was observed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoState {
    pub data: TxUtxoBalance,
    pub tip: crate::Tip,
}

impl UtxoState {
    pub fn from_block(tip: crate::Tip, txs: &[Tx]) -> Self {
        Self {
            data: TxUtxoBalance::from_block(txs),
            tip,
        }
    }
}

/// All the block ids touched by a set of txs, used only for log context.
pub fn involved_block_ids(states: &[UtxoState]) -> HashSet<BlockId> {
    states.iter().filter_map(|s| s.tip.hash()).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::proptest;

    use super::*;
    use pallas::crypto::hash::Hash;

    prop_compose! {
        fn any_out_ref()(tx_byte in any::<u8>(), index in any::<u32>()) -> TxOutRef {
            TxOutRef::new(Hash::new([tx_byte; 32]), index)
        }
    }

    prop_compose! {
        fn any_balance()(
            outputs in prop::collection::btree_set(any_out_ref(), 0..6),
            inputs in prop::collection::btree_set(any_out_ref(), 0..6),
        ) -> TxUtxoBalance {
            TxUtxoBalance { outputs, inputs }
        }
    }

    proptest! {
        #[test]
        fn merge_is_associative(a in any_balance(), b in any_balance(), c in any_balance()) {
            let left = a.clone().merge(b.clone()).merge(c.clone());
            let right = a.merge(b.merge(c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn empty_is_identity(a in any_balance()) {
            prop_assert_eq!(a.clone().merge(TxUtxoBalance::empty()), a.clone());
            prop_assert_eq!(TxUtxoBalance::empty().merge(a.clone()), a);
        }
    }

    #[test]
    fn intra_block_cancellation_removes_pair_from_both_sets() {
        let shared = TxOutRef::new(Hash::new([1u8; 32]), 0);

        let producer = Tx {
            tx_id: Hash::new([1u8; 32]),
            inputs: Vec::new(),
            outputs: vec![crate::TxOutput {
                out_ref: shared,
                address: Vec::new(),
                credentials: Vec::new(),
                assets: Vec::new(),
                datum_hash: None,
                body: Vec::new(),
            }],
            store_tx: true,
        };

        let consumer = Tx {
            tx_id: Hash::new([2u8; 32]),
            inputs: vec![shared],
            outputs: Vec::new(),
            store_tx: true,
        };

        let balance = TxUtxoBalance::from_block(&[producer, consumer]);

        assert!(!balance.contains_output(&shared));
        assert!(!balance.contains_input(&shared));
    }
}
