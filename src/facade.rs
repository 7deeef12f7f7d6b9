//! Crate-boundary facade: config loading, tracing setup and the `ChainIndex`
//! handle a caller constructs once and hands to both its follower loop and
//! its query surface.

use std::path::Path;

use chain_index_core::{
    error::{ControlError, ProjectionError},
    ChainIndexConfig, ChainSyncBlock, ControlHandler, Diagnostics, Point, Tip,
};
use chain_index_redb::RedbProjection;
use tracing::info;

/// Top-level error surfaced across the crate boundary: either a failure
/// inside the engine itself, or a failure loading its configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("failed to open projection store: {0}")]
    Store(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads a `ChainIndexConfig` layered over an optional TOML file with
/// environment overrides (`CHAIN_INDEX_DEPTH`, `CHAIN_INDEX_DB_PATH`, ...),
/// the same way the rest of this workspace's binaries build their `config`.
pub fn load_config(path: Option<&Path>) -> Result<ChainIndexConfig, Error> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(&path.to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHAIN_INDEX")
            .separator("_")
            .try_parsing(true),
    );

    // `ChainIndexConfig` carries `#[serde(default)]`, so a document with no
    // sources at all (no file, no matching env vars) still deserializes to
    // `ChainIndexConfig::default()` rather than erroring on missing fields.
    Ok(builder.build()?.try_deserialize()?)
}

/// Sets the process-wide `tracing` subscriber from the `RUST_LOG`
/// environment variable, falling back to `info`. Safe to call once at
/// startup; a second call is a silent no-op (mirrors the other binaries in
/// this workspace, which only ever call it from `main`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Hex-formats a tip's block hash for structured log fields, e.g.
/// `info!(tip = %tip_hex(&tip), "insertion success")`.
pub fn tip_hex(tip: &Tip) -> String {
    tip.hash().map(|h| hex::encode(h.as_slice())).unwrap_or_else(|| "genesis".to_string())
}

/// The engine a caller embeds: an in-memory `UtxoIndex` behind a
/// `ControlHandler`, backed by a `redb` projection opened at
/// `config.db_path`. Owns nothing the follower or RPC shell need beyond
/// this handle.
pub struct ChainIndex {
    handler: ControlHandler<RedbProjection>,
}

impl ChainIndex {
    /// Opens (or creates) the projection at `config.db_path` and restores
    /// the in-memory index from it (C7), so a freshly constructed
    /// `ChainIndex` is immediately query-ready after a process restart.
    pub fn open(config: ChainIndexConfig) -> Result<Self, Error> {
        let projection = RedbProjection::open(&config.db_path).map_err(|e| Error::Store(e.to_string()))?;
        let index = chain_index_core::restore::restore_from_projection(&projection)?;

        info!(depth = config.depth, tip = %index.tip(), "chain index restored");

        Ok(Self {
            handler: ControlHandler::new(index, projection, config),
        })
    }

    pub fn control(&self) -> &ControlHandler<RedbProjection> {
        &self.handler
    }

    pub fn append_block(&self, block: ChainSyncBlock) -> Result<(), Error> {
        Ok(self.handler.append_block(block)?)
    }

    pub fn rollback(&self, point: Point) -> Result<(), Error> {
        Ok(self.handler.rollback(point)?)
    }

    pub fn resume_sync(&self, point: Point) -> Result<(), Error> {
        Ok(self.handler.resume_sync(point)?)
    }

    pub fn collect_garbage(&self) -> Result<(), Error> {
        Ok(self.handler.collect_garbage()?)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.handler.get_diagnostics()
    }

    pub fn tip(&self) -> Tip {
        self.handler.tip()
    }

    pub fn with_query<R>(&self, f: impl FnOnce(chain_index_core::query::QueryHandler<RedbProjection>) -> R) -> R {
        self.handler.with_query(f)
    }
}
