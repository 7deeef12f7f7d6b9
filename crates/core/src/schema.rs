//! Flat table definitions and the bidirectional value <-> row codecs (C1).
//!
//! This module only names the schema and encodes/decodes rows; it owns no
//! storage engine handle. A concrete `Projection` (e.g. the redb-backed one)
//! opens tables under these names and uses these codecs to move between
//! typed domain values and the raw bytes it stores.

use crate::{AssetClass, Credential, Hash32, Point, Tip, TxOutRef, TxOutput};

pub const TABLE_TIP: &str = "tip";
pub const TABLE_UNSPENT_OUTPUTS: &str = "unspent_outputs";
pub const TABLE_UNMATCHED_INPUTS: &str = "unmatched_inputs";
pub const TABLE_UTXO_OUT_REF: &str = "utxo_out_ref";
pub const TABLE_DATUMS: &str = "datums";
pub const TABLE_SCRIPTS: &str = "scripts";
pub const TABLE_REDEEMERS: &str = "redeemers";
pub const TABLE_ADDRESSES: &str = "addresses";
pub const TABLE_ASSET_CLASSES: &str = "asset_classes";

/// Rows inserted/removed in a single write batch top out at this many keys,
/// the historical rationale being a SQL driver's bound-variable limit; the
/// redb-backed projection keeps the constant anyway to bound write-lock
/// hold time and WAL growth.
pub const DEFAULT_BATCH_SIZE: usize = 400;

/// Encodes an `out_ref` for use as a table key. Shared by
/// `unspent_outputs`, `unmatched_inputs`, `utxo_out_ref`, `addresses` and
/// `asset_classes`.
pub fn encode_out_ref(out_ref: &TxOutRef) -> Vec<u8> {
    out_ref.into_bytes().to_vec()
}

pub fn decode_out_ref(bytes: &[u8]) -> Option<TxOutRef> {
    let arr: [u8; 36] = bytes.try_into().ok()?;
    Some(TxOutRef::from_bytes(arr))
}

/// `unspent_outputs` / `unmatched_inputs` key: `(tip_slot, out_ref)`,
/// encoded big-endian-slot-first so a range scan by slot prefix works.
pub fn encode_slot_out_ref_key(slot: u64, out_ref: &TxOutRef) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 36);
    out.extend_from_slice(&slot.to_be_bytes());
    out.extend_from_slice(&out_ref.into_bytes());
    out
}

pub fn decode_slot_out_ref_key(bytes: &[u8]) -> Option<(u64, TxOutRef)> {
    if bytes.len() != 44 {
        return None;
    }
    let slot = u64::from_be_bytes(bytes[0..8].try_into().ok()?);
    let out_ref = decode_out_ref(&bytes[8..44])?;
    Some((slot, out_ref))
}

pub fn encode_tip_key(slot: u64) -> Vec<u8> {
    slot.to_be_bytes().to_vec()
}

pub fn encode_tip_value(tip: &Tip) -> Vec<u8> {
    tip.into_bytes().to_vec()
}

pub fn decode_tip_value(bytes: &[u8]) -> Option<Tip> {
    let arr: [u8; 48] = bytes.try_into().ok()?;
    Some(Tip::from_bytes(arr))
}

pub fn encode_hash_key(hash: &Hash32) -> Vec<u8> {
    hash.as_slice().to_vec()
}

pub fn decode_hash_key(bytes: &[u8]) -> Option<Hash32> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(Hash32::new(arr))
}

/// `addresses`/`asset_classes` non-unique index key prefix: the credential
/// or asset-class bytes, so a prefix scan finds every `out_ref` tagged with
/// it.
pub fn encode_credential_key(cred: &Credential) -> Vec<u8> {
    match cred {
        Credential::Payment(h) => {
            let mut v = vec![0u8];
            v.extend_from_slice(h.as_slice());
            v
        }
        Credential::Stake(h) => {
            let mut v = vec![1u8];
            v.extend_from_slice(h.as_slice());
            v
        }
        Credential::Script(h) => {
            let mut v = vec![2u8];
            v.extend_from_slice(h.as_slice());
            v
        }
    }
}

/// Policy id, then a length-prefixed token name so two asset classes whose
/// names happen to share a byte prefix never collide under a prefix scan
/// (e.g. policy+"ab" vs policy+"abc").
pub fn encode_asset_class_key(asset: &AssetClass) -> Vec<u8> {
    let mut v = asset.policy_id.as_slice().to_vec();
    v.push(asset.token_name.len() as u8);
    v.extend_from_slice(&asset.token_name);
    v
}

/// `utxo_out_ref` value row: minimal encoding of a resolved output body.
/// Layout: 4-byte BE address length, address bytes, 1-byte datum-hash
/// presence flag (+32 bytes if present), then the raw output body bytes.
pub fn encode_tx_output(out: &TxOutput) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(out.address.len() as u32).to_be_bytes());
    v.extend_from_slice(&out.address);
    match out.datum_hash {
        Some(h) => {
            v.push(1);
            v.extend_from_slice(h.as_slice());
        }
        None => v.push(0),
    }
    v.extend_from_slice(&out.body);
    v
}

pub fn decode_tx_output(out_ref: TxOutRef, bytes: &[u8]) -> Option<TxOutput> {
    if bytes.len() < 5 {
        return None;
    }
    let addr_len = u32::from_be_bytes(bytes[0..4].try_into().ok()?) as usize;
    let mut cursor = 4;
    let address = bytes.get(cursor..cursor + addr_len)?.to_vec();
    cursor += addr_len;
    let has_datum = *bytes.get(cursor)?;
    cursor += 1;
    let datum_hash = if has_datum == 1 {
        let arr: [u8; 32] = bytes.get(cursor..cursor + 32)?.try_into().ok()?;
        cursor += 32;
        Some(Hash32::new(arr))
    } else {
        None
    };
    let body = bytes.get(cursor..)?.to_vec();

    Some(TxOutput {
        out_ref,
        address,
        credentials: Vec::new(),
        assets: Vec::new(),
        datum_hash,
        body,
    })
}

pub fn point_to_slot_bound(point: Point) -> u64 {
    point.slot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_ref_roundtrips() {
        let r = TxOutRef::new(Hash32::new([7u8; 32]), 3);
        assert_eq!(decode_out_ref(&encode_out_ref(&r)), Some(r));
    }

    #[test]
    fn slot_out_ref_key_roundtrips() {
        let r = TxOutRef::new(Hash32::new([9u8; 32]), 1);
        let key = encode_slot_out_ref_key(42, &r);
        assert_eq!(decode_slot_out_ref_key(&key), Some((42, r)));
    }

    #[test]
    fn tip_value_roundtrips() {
        let tip = Tip::Tip(100, Hash32::new([1u8; 32]), 5);
        assert_eq!(decode_tip_value(&encode_tip_value(&tip)), Some(tip));
    }

    #[test]
    fn tx_output_roundtrips() {
        let out_ref = TxOutRef::new(Hash32::new([2u8; 32]), 0);
        let output = TxOutput {
            out_ref,
            address: vec![1, 2, 3],
            credentials: Vec::new(),
            assets: Vec::new(),
            datum_hash: Some(Hash32::new([3u8; 32])),
            body: vec![9, 9, 9],
        };

        let encoded = encode_tx_output(&output);
        let decoded = decode_tx_output(out_ref, &encoded).unwrap();

        assert_eq!(decoded.address, output.address);
        assert_eq!(decoded.datum_hash, output.datum_hash);
        assert_eq!(decoded.body, output.body);
    }
}
