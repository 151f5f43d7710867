//! `kinship analyze` command

use crate::commands::clusters::print_cluster;
use crate::commands::dispatch::CommandContext;
use crate::commands::duplicates::print_group;
use crate::commands::format::print_json;
use kinship_core::engine::Thresholds;
use kinship_core::error::Result;

pub fn execute(ctx: &CommandContext, thresholds: Thresholds) -> Result<()> {
    let store = ctx.open_store()?;
    let notes = ctx.select_notes(&store)?;
    let engine = ctx.engine(&store)?;
    let analysis = engine.analyze(&notes, thresholds, &ctx.cancellation())?;

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&analysis),
        human => {
            let stats = &analysis.stats;
            if !ctx.cli.quiet {
                println!(
                    "{} notes, {} candidate pairs{}, {} edges",
                    stats.notes,
                    stats.candidate_pairs,
                    if stats.prefiltered { " (pre-filtered)" } else { "" },
                    stats.edges
                );
                if stats.images_fingerprinted > 0 || stats.images_failed > 0 {
                    println!(
                        "images: {} fingerprinted, {} unusable",
                        stats.images_fingerprinted, stats.images_failed
                    );
                }
                println!();
                println!("Duplicates ({}):", stats.duplicate_groups);
            }
            for group in &analysis.duplicates {
                print_group(group, ctx.cli.verbose);
            }
            if !ctx.cli.quiet {
                println!();
                println!("Clusters ({}):", stats.clusters);
            }
            for cluster in &analysis.clusters {
                print_cluster(cluster);
            }
        }
    )
}
