//! Table definitions (C1, redb flavor) and the prefix-range helper the
//! address/asset-class queries use.

use redb::TableDefinition;

pub type Table = TableDefinition<'static, &'static [u8], &'static [u8]>;

pub const TIP: Table = TableDefinition::new(chain_index_core::TABLE_TIP);
pub const UNSPENT_OUTPUTS: Table = TableDefinition::new(chain_index_core::TABLE_UNSPENT_OUTPUTS);
pub const UNMATCHED_INPUTS: Table = TableDefinition::new(chain_index_core::TABLE_UNMATCHED_INPUTS);
pub const UTXO_OUT_REF: Table = TableDefinition::new(chain_index_core::TABLE_UTXO_OUT_REF);
pub const DATUMS: Table = TableDefinition::new(chain_index_core::TABLE_DATUMS);
pub const SCRIPTS: Table = TableDefinition::new(chain_index_core::TABLE_SCRIPTS);
pub const REDEEMERS: Table = TableDefinition::new(chain_index_core::TABLE_REDEEMERS);
/// Composite key `credential_bytes ++ out_ref_bytes`, sorted so a prefix
/// scan on `credential_bytes` enumerates every tagged `out_ref` ascending.
pub const ADDRESSES: Table = TableDefinition::new(chain_index_core::TABLE_ADDRESSES);
/// Composite key `asset_class_bytes ++ out_ref_bytes`.
pub const ASSET_CLASSES: Table = TableDefinition::new(chain_index_core::TABLE_ASSET_CLASSES);

/// The smallest byte string that sorts strictly after every string with
/// `prefix` as a prefix, i.e. the exclusive upper bound of a prefix scan.
/// `None` only if `prefix` is all `0xff` (not reachable here: every prefix
/// we scan carries a non-`0xff` tag or length byte).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    for i in (0..out.len()).rev() {
        if out[i] != 0xff {
            out[i] += 1;
            out.truncate(i + 1);
            return Some(out);
        }
    }
    None
}
