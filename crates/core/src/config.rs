//! Configuration, loaded the way the rest of this codebase loads it: a
//! plain `serde`-derived struct with a `Default`, layered over a TOML file
//! via the `config` crate at the crate boundary (see the root crate's
//! `load` helper).

use serde::{Deserialize, Serialize};

/// `{ depth: Word64, dbPath: Path, batchSize: Int = 400 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainIndexConfig {
    /// Rollback window, in blocks, before the index collapses a slot into
    /// the compacted snapshot.
    pub depth: u64,

    /// Filesystem path of the projection's backing store.
    pub db_path: String,

    /// Row batch size for writes into the projection.
    pub batch_size: usize,
}

impl Default for ChainIndexConfig {
    fn default() -> Self {
        Self {
            depth: 2160,
            db_path: "chain-index.redb".to_string(),
            batch_size: crate::schema::DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ChainIndexConfig::default();
        assert_eq!(config.depth, 2160);
        assert_eq!(config.batch_size, 400);
    }
}
