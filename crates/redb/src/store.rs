use std::path::Path;

use chain_index_core::{
    error::ProjectionError,
    schema::{
        decode_out_ref, decode_tip_value, decode_tx_output, encode_credential_key,
        encode_asset_class_key, encode_out_ref, encode_tip_key, encode_tip_value,
    },
    AssetClass, Credential, Diagnostics, Hash32, Page, PageQuery, Point, Projection, Tip, TxOutRef,
    TxOutput, UtxoState,
};
use redb::{
    Database, Durability, ReadableDatabase, ReadableTable, ReadableTableMetadata, ReadTransaction,
    WriteTransaction,
};
use tracing::trace;

use crate::tables::{self, prefix_upper_bound};
use crate::Error;

/// A `redb`-backed `Projection`. Opens (or creates) one on-disk database and
/// initializes every table named in `tables.rs` on first use.
pub struct RedbProjection {
    db: Database,
}

impl RedbProjection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let db = Database::builder()
            .set_repair_callback(|progress| {
                tracing::warn!(progress = progress.progress() * 100f64, "chain-index db is repairing")
            })
            .create(path)?;
        let store = Self { db };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, Error> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), Error> {
        let mut wx = self.db.begin_write()?;
        wx.set_durability(Durability::Immediate)?;
        let _ = wx.open_table(tables::TIP)?;
        let _ = wx.open_table(tables::UNSPENT_OUTPUTS)?;
        let _ = wx.open_table(tables::UNMATCHED_INPUTS)?;
        let _ = wx.open_table(tables::UTXO_OUT_REF)?;
        let _ = wx.open_table(tables::DATUMS)?;
        let _ = wx.open_table(tables::SCRIPTS)?;
        let _ = wx.open_table(tables::REDEEMERS)?;
        let _ = wx.open_table(tables::ADDRESSES)?;
        let _ = wx.open_table(tables::ASSET_CLASSES)?;
        wx.commit()?;
        Ok(())
    }

    fn is_live(&self, rx: &ReadTransaction, out_ref: &TxOutRef) -> Result<bool, Error> {
        let key = encode_out_ref(out_ref);
        let unspent = rx.open_table(tables::UNSPENT_OUTPUTS)?;
        let unmatched = rx.open_table(tables::UNMATCHED_INPUTS)?;
        Ok(unspent.get(key.as_slice())?.is_some() && unmatched.get(key.as_slice())?.is_none())
    }

    /// Paginated prefix scan shared by the three credential/asset queries.
    /// `live_only` applies the `unspent_outputs \ unmatched_inputs` filter;
    /// `TxoSetAtAddress` passes `false` since it's a historical query.
    fn scan_prefix(
        &self,
        table: tables::Table,
        prefix: Vec<u8>,
        page: PageQuery,
        live_only: bool,
    ) -> Result<Page<TxOutRef>, Error> {
        let rx = self.db.begin_read()?;
        let t = rx.open_table(table)?;

        let upper = prefix_upper_bound(&prefix);
        let range = match &upper {
            Some(end) => t.range(prefix.as_slice()..end.as_slice())?,
            None => t.range(prefix.as_slice()..)?,
        };

        let mut items = Vec::with_capacity(page.page_size);
        let mut overflow = None;

        for entry in range {
            let (k, _) = entry?;
            let key = k.value();
            let out_ref_bytes = &key[prefix.len()..];
            let Some(out_ref) = decode_out_ref(out_ref_bytes) else {
                return Err(Error::Corrupt("addresses/asset_classes"));
            };

            if let Some(after) = page.after_key {
                if out_ref <= after {
                    continue;
                }
            }

            if live_only && !self.is_live(&rx, &out_ref)? {
                continue;
            }

            if items.len() == page.page_size {
                overflow = Some(out_ref);
                break;
            }

            items.push(out_ref);
        }

        let next_page_query = overflow.map(|_| PageQuery {
            page_size: page.page_size,
            after_key: items.last().copied(),
        });

        Ok(Page {
            current_page_query: page,
            next_page_query,
            items,
        })
    }
}

fn diag_count(db: &Database, table: tables::Table) -> i64 {
    (|| -> Result<i64, Error> {
        let rx = db.begin_read()?;
        let t = rx.open_table(table)?;
        Ok(t.len()? as i64)
    })()
    .unwrap_or(-1)
}

/// `reduceOldUtxoDb(slot)`: folds everything before `slot` into a single
/// snapshot at `slot`, run against an already-open write transaction so the
/// caller can commit it atomically alongside the append it precedes.
fn reduce_within_txn(wx: &mut WriteTransaction, slot: u64, batch_size: usize) -> Result<(), Error> {
    let slot_bytes = slot.to_be_bytes();

    {
        let mut tip_table = wx.open_table(tables::TIP)?;
        let stale: Vec<Vec<u8>> = tip_table
            .range(..slot_bytes.as_slice())?
            .map(|e| e.map(|(k, _)| k.value().to_vec()))
            .collect::<Result<_, _>>()?;
        for chunk in stale.chunks(batch_size.max(1)) {
            for key in chunk {
                tip_table.remove(key.as_slice())?;
            }
        }
    }

    // `UPDATE ... SET tip_slot = $slot WHERE tip_slot < $slot`: since the
    // key here is the out_ref (not the slot), this is a value overwrite
    // rather than a re-key.
    for table in [tables::UNSPENT_OUTPUTS, tables::UNMATCHED_INPUTS] {
        let mut t = wx.open_table(table)?;
        let stale: Vec<Vec<u8>> = t
            .iter()?
            .filter_map(|e| match e {
                Ok((k, v)) => {
                    let cur = u64::from_be_bytes(v.value().try_into().ok()?);
                    (cur < slot).then(|| k.value().to_vec())
                }
                Err(_) => None,
            })
            .collect();
        for chunk in stale.chunks(batch_size.max(1)) {
            for key in chunk {
                t.insert(key.as_slice(), slot_bytes.as_slice())?;
            }
        }
    }

    // Matched-pair deletion at the new snapshot slot: in place of a
    // database trigger, issue the second delete explicitly within this
    // same transaction.
    let matched: Vec<Vec<u8>> = {
        let unspent = wx.open_table(tables::UNSPENT_OUTPUTS)?;
        let unmatched = wx.open_table(tables::UNMATCHED_INPUTS)?;
        unspent
            .iter()?
            .filter_map(|e| e.ok())
            .filter(|(_, v)| v.value() == slot_bytes.as_slice())
            .filter_map(|(k, _)| {
                let key = k.value().to_vec();
                unmatched
                    .get(key.as_slice())
                    .ok()
                    .flatten()
                    .filter(|v| v.value() == slot_bytes.as_slice())
                    .map(|_| key)
            })
            .collect()
    };

    {
        let mut unspent = wx.open_table(tables::UNSPENT_OUTPUTS)?;
        let mut unmatched = wx.open_table(tables::UNMATCHED_INPUTS)?;
        for key in &matched {
            unspent.remove(key.as_slice())?;
            unmatched.remove(key.as_slice())?;
        }
    }

    trace!(slot, reduced = matched.len(), "reduced projection snapshot");

    Ok(())
}

impl Projection for RedbProjection {
    fn apply_append(
        &self,
        tip: Tip,
        state: &UtxoState,
        aux: &chain_index_core::AuxRows,
        batch_size: usize,
        reduce_to_slot: Option<u64>,
    ) -> Result<(), ProjectionError> {
        let mut wx = self.db.begin_write().map_err(Error::from)?;
        wx.set_durability(Durability::Immediate).map_err(Error::from)?;

        // When a block triggers depth reduction, `reduceOldUtxoDb` runs first,
        // inside this same write transaction, so a failure anywhere in the
        // append below aborts the reduction along with it.
        if let Some(slot) = reduce_to_slot {
            reduce_within_txn(&mut wx, slot, batch_size)?;
        }

        {
            let mut tip_table = wx.open_table(tables::TIP).map_err(Error::from)?;
            tip_table
                .insert(encode_tip_key(tip.slot()).as_slice(), encode_tip_value(&tip).as_slice())
                .map_err(Error::from)?;
        }

        let slot_bytes = tip.slot().to_be_bytes();

        {
            let mut unspent = wx.open_table(tables::UNSPENT_OUTPUTS).map_err(Error::from)?;
            for chunk in state.data.outputs.iter().collect::<Vec<_>>().chunks(batch_size.max(1)) {
                for out_ref in chunk {
                    unspent
                        .insert(encode_out_ref(out_ref).as_slice(), slot_bytes.as_slice())
                        .map_err(Error::from)?;
                }
            }
        }

        {
            let mut unmatched = wx.open_table(tables::UNMATCHED_INPUTS).map_err(Error::from)?;
            for chunk in state.data.inputs.iter().collect::<Vec<_>>().chunks(batch_size.max(1)) {
                for out_ref in chunk {
                    unmatched
                        .insert(encode_out_ref(out_ref).as_slice(), slot_bytes.as_slice())
                        .map_err(Error::from)?;
                }
            }
        }

        {
            let mut out_ref_table = wx.open_table(tables::UTXO_OUT_REF).map_err(Error::from)?;
            for chunk in aux.outputs.chunks(batch_size.max(1)) {
                for out in chunk {
                    out_ref_table
                        .insert(
                            encode_out_ref(&out.out_ref).as_slice(),
                            chain_index_core::schema::encode_tx_output(out).as_slice(),
                        )
                        .map_err(Error::from)?;
                }
            }
        }

        {
            let mut datums = wx.open_table(tables::DATUMS).map_err(Error::from)?;
            for chunk in aux.datums.chunks(batch_size.max(1)) {
                for (hash, value) in chunk {
                    datums.insert(hash.as_slice(), value.as_slice()).map_err(Error::from)?;
                }
            }
        }

        {
            let mut scripts = wx.open_table(tables::SCRIPTS).map_err(Error::from)?;
            for chunk in aux.scripts.chunks(batch_size.max(1)) {
                for (hash, value) in chunk {
                    scripts.insert(hash.as_slice(), value.as_slice()).map_err(Error::from)?;
                }
            }
        }

        {
            let mut redeemers = wx.open_table(tables::REDEEMERS).map_err(Error::from)?;
            for chunk in aux.redeemers.chunks(batch_size.max(1)) {
                for (hash, value) in chunk {
                    redeemers.insert(hash.as_slice(), value.as_slice()).map_err(Error::from)?;
                }
            }
        }

        {
            let mut addresses = wx.open_table(tables::ADDRESSES).map_err(Error::from)?;
            for chunk in aux.addresses.chunks(batch_size.max(1)) {
                for (cred, out_ref) in chunk {
                    let mut key = encode_credential_key(cred);
                    key.extend_from_slice(&encode_out_ref(out_ref));
                    addresses.insert(key.as_slice(), &[][..]).map_err(Error::from)?;
                }
            }
        }

        {
            let mut asset_classes = wx.open_table(tables::ASSET_CLASSES).map_err(Error::from)?;
            for chunk in aux.asset_classes.chunks(batch_size.max(1)) {
                for (asset, out_ref) in chunk {
                    let mut key = encode_asset_class_key(asset);
                    key.extend_from_slice(&encode_out_ref(out_ref));
                    asset_classes.insert(key.as_slice(), &[][..]).map_err(Error::from)?;
                }
            }
        }

        wx.commit().map_err(Error::from)?;

        Ok(())
    }

    fn apply_rollback(&self, point: Point) -> Result<(), ProjectionError> {
        let mut wx = self.db.begin_write().map_err(Error::from)?;
        wx.set_durability(Durability::Immediate).map_err(Error::from)?;

        match point {
            Point::Genesis => {
                for table in [tables::TIP, tables::UNSPENT_OUTPUTS, tables::UNMATCHED_INPUTS] {
                    let mut t = wx.open_table(table).map_err(Error::from)?;
                    t.retain(|_, _| false).map_err(Error::from)?;
                }
            }
            Point::Specific(slot, _) => {
                {
                    let mut tip_table = wx.open_table(tables::TIP).map_err(Error::from)?;
                    let bound = (slot + 1).to_be_bytes();
                    let past: Vec<Vec<u8>> = tip_table
                        .range(bound.as_slice()..)
                        .map_err(Error::from)?
                        .map(|e| e.map(|(k, _)| k.value().to_vec()))
                        .collect::<Result<_, _>>()
                        .map_err(Error::from)?;
                    for key in past {
                        tip_table.remove(key.as_slice()).map_err(Error::from)?;
                    }
                }

                for table in [tables::UNSPENT_OUTPUTS, tables::UNMATCHED_INPUTS] {
                    let mut t = wx.open_table(table).map_err(Error::from)?;
                    let future: Vec<Vec<u8>> = t
                        .iter()
                        .map_err(Error::from)?
                        .filter_map(|e| match e {
                            Ok((k, v)) => {
                                let s = u64::from_be_bytes(v.value().try_into().ok()?);
                                (s > slot).then(|| k.value().to_vec())
                            }
                            Err(_) => None,
                        })
                        .collect();
                    for key in future {
                        t.remove(key.as_slice()).map_err(Error::from)?;
                    }
                }
            }
        }

        wx.commit().map_err(Error::from)?;

        Ok(())
    }

    fn collect_garbage(&self) -> Result<(), ProjectionError> {
        let mut wx = self.db.begin_write().map_err(Error::from)?;
        wx.set_durability(Durability::Immediate).map_err(Error::from)?;

        for table in [
            tables::DATUMS,
            tables::SCRIPTS,
            tables::REDEEMERS,
            tables::UTXO_OUT_REF,
            tables::ADDRESSES,
            tables::ASSET_CLASSES,
        ] {
            let mut t = wx.open_table(table).map_err(Error::from)?;
            t.retain(|_, _| false).map_err(Error::from)?;
        }

        wx.commit().map_err(Error::from)?;

        Ok(())
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            num_scripts: diag_count(&self.db, tables::SCRIPTS),
            num_addresses: diag_count(&self.db, tables::ADDRESSES),
            num_asset_classes: diag_count(&self.db, tables::ASSET_CLASSES),
            num_unspent_outputs: diag_count(&self.db, tables::UNSPENT_OUTPUTS),
            num_unmatched_inputs: diag_count(&self.db, tables::UNMATCHED_INPUTS),
        }
    }

    fn datum_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
        self.read_hash_table(tables::DATUMS, hash)
            .map_err(ProjectionError::from)
    }

    fn script_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
        self.read_hash_table(tables::SCRIPTS, hash)
            .map_err(ProjectionError::from)
    }

    fn redeemer_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
        self.read_hash_table(tables::REDEEMERS, hash)
            .map_err(ProjectionError::from)
    }

    fn tx_out_from_ref(&self, out_ref: &TxOutRef) -> Result<Option<TxOutput>, ProjectionError> {
        let rx = self.db.begin_read().map_err(Error::from)?;
        let t = rx.open_table(tables::UTXO_OUT_REF).map_err(Error::from)?;
        let key = encode_out_ref(out_ref);
        let Some(value) = t.get(key.as_slice()).map_err(Error::from)? else {
            return Ok(None);
        };
        Ok(decode_tx_output(*out_ref, value.value()))
    }

    fn utxo_set_at_credential(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, ProjectionError> {
        let prefix = encode_credential_key(credential);
        Ok(self.scan_prefix(tables::ADDRESSES, prefix, page, true)?)
    }

    fn utxo_set_with_currency(
        &self,
        page: PageQuery,
        asset: &AssetClass,
    ) -> Result<Page<TxOutRef>, ProjectionError> {
        let prefix = encode_asset_class_key(asset);
        Ok(self.scan_prefix(tables::ASSET_CLASSES, prefix, page, true)?)
    }

    fn txo_set_at_credential(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, ProjectionError> {
        let prefix = encode_credential_key(credential);
        Ok(self.scan_prefix(tables::ADDRESSES, prefix, page, false)?)
    }

    fn get_tip(&self) -> Result<Option<Tip>, ProjectionError> {
        let rx = self.db.begin_read().map_err(Error::from)?;
        let t = rx.open_table(tables::TIP).map_err(Error::from)?;
        let Some((_, value)) = t.iter().map_err(Error::from)?.filter_map(|e| e.ok()).last() else {
            return Ok(None);
        };
        Ok(decode_tip_value(value.value()))
    }

    fn get_resume_points(&self) -> Result<Vec<Tip>, ProjectionError> {
        let rx = self.db.begin_read().map_err(Error::from)?;
        let t = rx.open_table(tables::TIP).map_err(Error::from)?;
        let mut tips: Vec<Tip> = t
            .iter()
            .map_err(Error::from)?
            .filter_map(|e| e.ok())
            .filter_map(|(_, v)| decode_tip_value(v.value()))
            .collect();
        tips.reverse();
        Ok(tips)
    }

    fn read_all_balances(&self) -> Result<Vec<UtxoState>, ProjectionError> {
        let rx = self.db.begin_read().map_err(Error::from)?;

        let mut states = Vec::new();

        let unspent = rx.open_table(tables::UNSPENT_OUTPUTS).map_err(Error::from)?;
        for entry in unspent.iter().map_err(Error::from)? {
            let (k, v) = entry.map_err(Error::from)?;
            let Some(out_ref) = decode_out_ref(k.value()) else {
                continue;
            };
            let slot = u64::from_be_bytes(v.value().try_into().map_err(|_| Error::Corrupt("unspent_outputs"))?);
            states.push(UtxoState {
                data: chain_index_core::TxUtxoBalance {
                    outputs: [out_ref].into_iter().collect(),
                    inputs: Default::default(),
                },
                tip: Tip::Tip(slot, Hash32::new([0u8; 32]), 0),
            });
        }

        let unmatched = rx.open_table(tables::UNMATCHED_INPUTS).map_err(Error::from)?;
        for entry in unmatched.iter().map_err(Error::from)? {
            let (k, v) = entry.map_err(Error::from)?;
            let Some(out_ref) = decode_out_ref(k.value()) else {
                continue;
            };
            let slot = u64::from_be_bytes(v.value().try_into().map_err(|_| Error::Corrupt("unmatched_inputs"))?);
            states.push(UtxoState {
                data: chain_index_core::TxUtxoBalance {
                    outputs: Default::default(),
                    inputs: [out_ref].into_iter().collect(),
                },
                tip: Tip::Tip(slot, Hash32::new([0u8; 32]), 0),
            });
        }

        Ok(states)
    }
}

impl RedbProjection {
    fn read_hash_table(&self, table: tables::Table, hash: &Hash32) -> Result<Option<Vec<u8>>, Error> {
        let rx = self.db.begin_read()?;
        let t = rx.open_table(table)?;
        Ok(t.get(hash.as_slice())?.map(|v| v.value().to_vec()))
    }
}
