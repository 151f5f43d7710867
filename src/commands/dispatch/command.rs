//! Command trait and context for dispatching commands

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cli::Cli;
use kinship_core::bail_usage;
use kinship_core::error::Result;
use kinship_core::store::{
    FsImageResolver, ImageResolver, NoImages, NoteFilter, NoteSource, SnapshotStore,
};
use kinship_core::{CancellationToken, CorrelationEngine, EngineConfig, NoteRecord};
use tracing::debug;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, start: Instant) -> Self {
        Self { cli, start }
    }

    /// Effective configuration: `--config` when given, built-in defaults otherwise
    pub fn load_config(&self) -> Result<EngineConfig> {
        match &self.cli.config {
            Some(path) => EngineConfig::load(path),
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn open_store(&self) -> Result<SnapshotStore> {
        let Some(path) = self.cli.notes.as_ref() else {
            bail_usage!("no note snapshot given (use --notes <file> or KINSHIP_NOTES)");
        };
        let store = SnapshotStore::load(path)?;
        debug!(elapsed = ?self.start.elapsed(), notes = store.len(), "open_store");
        Ok(store)
    }

    /// Notes selected by the global `--tag` / `--since` filters
    pub fn select_notes(&self, store: &SnapshotStore) -> Result<Vec<NoteRecord>> {
        let mut filter = NoteFilter::default();
        if let Some(tag) = &self.cli.tag {
            filter = filter.with_tag(tag);
        }
        if let Some(since) = self.cli.since {
            filter = filter.with_created_after(since);
        }
        store.list_notes(&filter)
    }

    /// Engine with images resolved relative to the snapshot file
    pub fn engine(&self, store: &SnapshotStore) -> Result<CorrelationEngine> {
        let resolver: Arc<dyn ImageResolver> = match store.source() {
            Some(path) => Arc::new(FsImageResolver::for_snapshot(path)),
            None => Arc::new(NoImages),
        };
        CorrelationEngine::new(self.load_config()?, resolver)
    }

    /// Token fired by Ctrl-C or by the `--timeout` deadline
    pub fn cancellation(&self) -> CancellationToken {
        let token = match self.cli.timeout {
            Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
            None => CancellationToken::new(),
        };

        let handle = token.clone();
        if let Err(e) = ctrlc::set_handler(move || handle.cancel()) {
            debug!(error = %e, "interrupt handler not installed");
        }
        token
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("kinship {}", env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}
