//! `kinship related` command

use crate::commands::dispatch::CommandContext;
use crate::commands::format::print_json;
use kinship_core::error::Result;
use kinship_core::store::NoteSource;

pub fn execute(
    ctx: &CommandContext,
    id: &str,
    k: Option<usize>,
    edge_threshold: Option<f64>,
) -> Result<()> {
    let store = ctx.open_store()?;
    // Unknown ids fail before any scoring work
    store.get_note(id)?;

    let notes = ctx.select_notes(&store)?;
    let engine = ctx.engine(&store)?;
    let graph = engine.build_graph(&notes, edge_threshold, &ctx.cancellation())?;
    let related = engine.find_related(&graph, id, k)?;

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&serde_json::json!({ "id": id, "related": related })),
        human => {
            if related.is_empty() {
                if !ctx.cli.quiet {
                    println!("No notes related to {}", id);
                }
            } else {
                for note in &related {
                    println!("{}  {:.3}", note.id, note.score);
                }
            }
        }
    )
}
