//! `kinship graph` command

use crate::commands::dispatch::CommandContext;
use crate::commands::format::{format_breakdown, print_json};
use kinship_core::error::Result;

pub fn execute(ctx: &CommandContext, edge_threshold: Option<f64>) -> Result<()> {
    let store = ctx.open_store()?;
    let notes = ctx.select_notes(&store)?;
    let engine = ctx.engine(&store)?;
    let graph = engine.build_graph(&notes, edge_threshold, &ctx.cancellation())?;

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&graph),
        human => {
            if !ctx.cli.quiet {
                println!(
                    "{} notes, {} edges (threshold {:.2})",
                    graph.node_count(),
                    graph.edge_count(),
                    graph.edge_threshold
                );
            }
            for edge in &graph.edges {
                println!(
                    "{} -- {}  {:.3}  ({})",
                    edge.source,
                    edge.target,
                    edge.weight,
                    format_breakdown(&edge.breakdown)
                );
            }
            if !ctx.cli.quiet {
                let isolated = graph.isolated();
                if !isolated.is_empty() {
                    let ids: Vec<&str> = isolated.into_iter().collect();
                    println!("isolated: {}", ids.join(", "));
                }
            }
        }
    )
}
