//! Subcommand routing

use crate::cli::Commands;
use crate::commands::dispatch::command::{Command, CommandContext};
use crate::commands::{analyze, clusters, config, duplicates, graph, related};
use kinship_core::engine::Thresholds;
use kinship_core::error::Result;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Commands::Graph { edge_threshold } => graph::execute(ctx, *edge_threshold),
            Commands::Clusters { edge_threshold } => clusters::execute(ctx, *edge_threshold),
            Commands::Related {
                id,
                k,
                edge_threshold,
            } => related::execute(ctx, id, *k, *edge_threshold),
            Commands::Duplicates { threshold } => duplicates::execute(ctx, *threshold),
            Commands::Analyze {
                edge_threshold,
                dup_threshold,
            } => analyze::execute(
                ctx,
                Thresholds {
                    edge: *edge_threshold,
                    dup: *dup_threshold,
                },
            ),
            Commands::Config { default } => config::execute(ctx, *default),
        }
    }
}
