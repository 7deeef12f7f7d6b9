//! Query Handler (C6): answers point queries and paginated queries against
//! the in-memory tip (for liveness) and the `Projection` (for bulk lookup).

use tracing::warn;

use crate::{
    error::QueryError, AssetClass, Credential, Hash32, Page, PageQuery, Projection, Tip, TxOutRef,
    TxOutput, UtxoIndex,
};

/// Reads the in-memory tip and, where relevant, joins against the
/// projection. Takes the index by reference rather than owning it: callers
/// hold it behind the same mutex the control handler uses.
pub struct QueryHandler<'a, P: Projection> {
    index: &'a UtxoIndex,
    projection: &'a P,
}

impl<'a, P: Projection> QueryHandler<'a, P> {
    pub fn new(index: &'a UtxoIndex, projection: &'a P) -> Self {
        Self { index, projection }
    }

    pub fn datum_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.projection.datum_from_hash(hash)?)
    }

    pub fn validator_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.projection.script_from_hash(hash)?)
    }

    pub fn minting_policy_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.projection.script_from_hash(hash)?)
    }

    pub fn stake_validator_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.projection.script_from_hash(hash)?)
    }

    pub fn redeemer_from_hash(&self, hash: &Hash32) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.projection.redeemer_from_hash(hash)?)
    }

    /// Not filtered by liveness: callers wanting liveness combine this with
    /// `utxo_set_membership`.
    pub fn tx_out_from_ref(&self, out_ref: &TxOutRef) -> Result<Option<TxOutput>, QueryError> {
        Ok(self.projection.tx_out_from_ref(out_ref)?)
    }

    pub fn utxo_set_membership(&self, out_ref: &TxOutRef) -> Result<(Tip, bool), QueryError> {
        let tip = self.index.tip();

        if tip.is_genesis() {
            return Err(QueryError::QueryFailedNoTip);
        }

        Ok((tip, self.index.is_unspent_output(out_ref)))
    }

    /// Accepts any credential kind (payment, stake or script) since the
    /// projection already keys `addresses` by the generic `Credential` type
    /// and all three are legitimate "enumerate by credential" queries.
    pub fn utxo_set_at_address(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, QueryError> {
        let tip = self.index.tip();

        if tip.is_genesis() {
            warn!("tip is genesis");
            return Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            });
        }

        Ok(self.projection.utxo_set_at_credential(page, credential)?)
    }

    pub fn utxo_set_with_currency(
        &self,
        page: PageQuery,
        asset: &AssetClass,
    ) -> Result<Page<TxOutRef>, QueryError> {
        let tip = self.index.tip();

        if tip.is_genesis() {
            warn!("tip is genesis");
            return Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            });
        }

        Ok(self.projection.utxo_set_with_currency(page, asset)?)
    }

    /// Historical query, no liveness filter: returns every output ever
    /// tagged with `credential`, spent or not.
    pub fn txo_set_at_address(
        &self,
        page: PageQuery,
        credential: &Credential,
    ) -> Result<Page<TxOutRef>, QueryError> {
        let tip = self.index.tip();

        if tip.is_genesis() {
            warn!("tip is genesis");
            return Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            });
        }

        Ok(self.projection.txo_set_at_credential(page, credential)?)
    }

    pub fn get_tip(&self) -> Tip {
        self.index.tip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectionError;
    use crate::{AuxRows, Diagnostics, UtxoState};

    #[derive(Default)]
    struct NullProjection;

    impl Projection for NullProjection {
        fn apply_append(
            &self,
            _tip: Tip,
            _state: &UtxoState,
            _aux: &AuxRows,
            _batch_size: usize,
            _reduce_to_slot: Option<u64>,
        ) -> Result<(), ProjectionError> {
            Ok(())
        }

        fn apply_rollback(&self, _point: crate::Point) -> Result<(), ProjectionError> {
            Ok(())
        }

        fn collect_garbage(&self) -> Result<(), ProjectionError> {
            Ok(())
        }

        fn diagnostics(&self) -> Diagnostics {
            Diagnostics::default()
        }

        fn datum_from_hash(&self, _hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
            Ok(None)
        }

        fn script_from_hash(&self, _hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
            Ok(None)
        }

        fn redeemer_from_hash(&self, _hash: &Hash32) -> Result<Option<Vec<u8>>, ProjectionError> {
            Ok(None)
        }

        fn tx_out_from_ref(&self, _out_ref: &TxOutRef) -> Result<Option<TxOutput>, ProjectionError> {
            Ok(None)
        }

        fn utxo_set_at_credential(
            &self,
            page: PageQuery,
            _credential: &Credential,
        ) -> Result<Page<TxOutRef>, ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn utxo_set_with_currency(
            &self,
            page: PageQuery,
            _asset: &AssetClass,
        ) -> Result<Page<TxOutRef>, ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn txo_set_at_credential(
            &self,
            page: PageQuery,
            _credential: &Credential,
        ) -> Result<Page<TxOutRef>, ProjectionError> {
            Ok(Page {
                current_page_query: page,
                next_page_query: None,
                items: Vec::new(),
            })
        }

        fn get_tip(&self) -> Result<Option<Tip>, ProjectionError> {
            Ok(None)
        }

        fn get_resume_points(&self) -> Result<Vec<Tip>, ProjectionError> {
            Ok(Vec::new())
        }

        fn read_all_balances(&self) -> Result<Vec<UtxoState>, ProjectionError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn membership_fails_at_genesis() {
        let index = UtxoIndex::new();
        let projection = NullProjection;
        let handler = QueryHandler::new(&index, &projection);

        let out_ref = TxOutRef::new(Hash32::new([1u8; 32]), 0);
        let err = handler.utxo_set_membership(&out_ref).unwrap_err();
        assert!(matches!(err, QueryError::QueryFailedNoTip));
    }
}
