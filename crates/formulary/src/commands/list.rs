//! `formulary list` -- list installed packages.

use anyhow::Result;
use formulary_install::list_installed;

use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `formulary list` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let receipts = list_installed(&ctx.layout)?;

    if ctx.json {
        output_json(&receipts);
        return Ok(());
    }
    if receipts.is_empty() {
        ctx.say("No packages installed.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = receipts
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.version.clone(),
                r.entry_points.join(", "),
                r.installed_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    output_table(&["NAME", "VERSION", "ENTRY POINTS", "INSTALLED"], &rows);
    Ok(())
}
