//! `formulary cache` -- inspect or empty the download cache.

use anyhow::Result;

use crate::cli::{CacheArgs, CacheCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `formulary cache` command.
pub fn run(ctx: &RuntimeContext, args: &CacheArgs) -> Result<()> {
    let downloads = ctx.layout.downloads_dir();
    match args.command {
        CacheCommands::Path => {
            if ctx.json {
                output_json(&serde_json::json!({ "path": downloads }));
            } else {
                println!("{}", downloads.display());
            }
        }
        CacheCommands::Clean => {
            let removed = ctx.fetcher().clean()?;
            if ctx.json {
                output_json(&serde_json::json!({ "removed": removed }));
            } else {
                ctx.say(format!("Removed {removed} cached download(s)"));
            }
        }
    }
    Ok(())
}
