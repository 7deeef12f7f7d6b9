//! Restore (C7): rebuilds the in-memory `UtxoIndex` purely from the
//! `Projection`'s persisted tables at startup, without replaying the
//! upstream feed.

use std::collections::BTreeMap;

use crate::{error::ProjectionError, Projection, Tip, TxUtxoBalance, UtxoIndex, UtxoState};

/// 1. Reads every `unspent_outputs`/`unmatched_inputs` row. 2. Folds them
/// into a `slot -> TxUtxoBalance` map under the monoid. 3. Reads every `tip`
/// row ordered ascending by slot. 4. Builds the `UtxoIndex` by pairing each
/// tip with its folded balance (or the identity balance if none was
/// recorded at that slot).
pub fn restore_from_projection<P: Projection>(projection: &P) -> Result<UtxoIndex, ProjectionError> {
    let balances = projection.read_all_balances()?;

    let mut by_slot: BTreeMap<u64, TxUtxoBalance> = BTreeMap::new();
    for state in balances {
        by_slot
            .entry(state.tip.slot())
            .and_modify(|b| *b = b.clone().merge(state.data.clone()))
            .or_insert(state.data);
    }

    let mut tips = projection.get_resume_points()?;
    tips.sort_by_key(|t| t.slot());

    let entries: Vec<UtxoState> = tips
        .into_iter()
        .map(|tip| UtxoState {
            data: by_slot.remove(&tip.slot()).unwrap_or_default(),
            tip,
        })
        .collect();

    Ok(UtxoIndex::from_entries(entries))
}

/// `getResumePoints`: persisted tips, newest-first, exposed as a first-class
/// query so a caller can negotiate an intersection before calling
/// `ResumeSync`, rather than being forced to always reconstruct from
/// scratch.
pub fn resume_points<P: Projection>(projection: &P) -> Result<Vec<Tip>, ProjectionError> {
    projection.get_resume_points()
}
