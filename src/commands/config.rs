//! `kinship config` command

use crate::commands::dispatch::CommandContext;
use crate::commands::format::print_json;
use kinship_core::error::Result;
use kinship_core::EngineConfig;

pub fn execute(ctx: &CommandContext, default: bool) -> Result<()> {
    let config = if default {
        EngineConfig::default()
    } else {
        ctx.load_config()?
    };

    crate::output_by_format_result!(ctx.cli.format,
        json => print_json(&config),
        human => {
            print!("{}", config.to_toml()?);
        }
    )
}
