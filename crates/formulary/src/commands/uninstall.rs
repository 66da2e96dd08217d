//! `formulary uninstall` -- remove an installed package.

use anyhow::Result;
use formulary_install::uninstall;
use formulary_ui::styles;

use crate::cli::UninstallArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `formulary uninstall` command.
pub fn run(ctx: &RuntimeContext, args: &UninstallArgs) -> Result<()> {
    let removed = uninstall(&ctx.layout, &args.name)?;
    if ctx.json {
        output_json(&removed);
    } else {
        ctx.say(format!(
            "{} Uninstalled {} ({} version(s), {} link(s))",
            styles::render_pass_icon(),
            styles::render_accent(&removed.name),
            removed.kegs.len(),
            removed.unlinked.len()
        ));
    }
    Ok(())
}
