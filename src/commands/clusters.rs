//! `kinship clusters` command

use crate::commands::dispatch::CommandContext;
use crate::commands::format::print_json;
use kinship_core::error::Result;
use kinship_core::TopicCluster;

pub fn execute(ctx: &CommandContext, edge_threshold: Option<f64>) -> Result<()> {
    let store = ctx.open_store()?;
    let notes = ctx.select_notes(&store)?;
    let engine = ctx.engine(&store)?;
    let graph = engine.build_graph(&notes, edge_threshold, &ctx.cancellation())?;
    let clusters = engine.extract_clusters(&graph);

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&serde_json::json!({ "clusters": clusters })),
        human => {
            if clusters.is_empty() && !ctx.cli.quiet {
                println!("No notes");
            }
            for cluster in &clusters {
                print_cluster(cluster);
            }
        }
    )
}

pub fn print_cluster(cluster: &TopicCluster) {
    let noun = if cluster.len() == 1 { "note" } else { "notes" };
    println!("{}  {} ({} {})", cluster.id, cluster.name, cluster.len(), noun);
    if !cluster.tags.is_empty() {
        println!("    tags: {}", cluster.tags.join(", "));
    }
    if !cluster.keywords.is_empty() {
        println!("    keywords: {}", cluster.keywords.join(", "));
    }
    println!("    notes: {}", cluster.note_ids.join(", "));
}
