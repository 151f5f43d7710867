//! `kinship duplicates` command

use crate::commands::dispatch::CommandContext;
use crate::commands::format::{format_breakdown, print_json};
use kinship_core::error::Result;
use kinship_core::DuplicateGroup;

pub fn execute(ctx: &CommandContext, threshold: Option<f64>) -> Result<()> {
    let store = ctx.open_store()?;
    let notes = ctx.select_notes(&store)?;
    let engine = ctx.engine(&store)?;
    let groups = engine.find_duplicates(&notes, threshold, &ctx.cancellation())?;
    let threshold = threshold.unwrap_or(engine.config().dup_threshold);

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&serde_json::json!({
            "threshold": threshold,
            "groups": groups,
        })),
        human => {
            if groups.is_empty() {
                if !ctx.cli.quiet {
                    println!("No duplicates found");
                }
            } else {
                for group in &groups {
                    print_group(group, ctx.cli.verbose);
                }
            }
        }
    )
}

pub fn print_group(group: &DuplicateGroup, with_pairs: bool) {
    println!(
        "{}  (earliest {})",
        group.note_ids.join(", "),
        group.earliest_created_at.format("%Y-%m-%d")
    );
    if with_pairs {
        for pair in &group.pairs {
            println!(
                "    {} ~ {}  {:.3}  ({})",
                pair.a,
                pair.b,
                pair.score,
                format_breakdown(&pair.breakdown)
            );
        }
    }
}
