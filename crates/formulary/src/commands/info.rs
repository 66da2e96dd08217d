//! `formulary info` -- show a formula and its install state.

use anyhow::Result;
use formulary_install::installed_receipt;

use crate::cli::FormulaArgs;
use crate::context::RuntimeContext;
use crate::output::{format_descriptor_detail, output_json};

/// Execute the `formulary info` command.
pub fn run(ctx: &RuntimeContext, args: &FormulaArgs) -> Result<()> {
    let descriptor = ctx.load_formula(&args.formula)?;
    let version = descriptor.version();
    let installed = installed_receipt(&ctx.layout, &descriptor.name, &version)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "formula": descriptor,
            "version": version,
            "path": descriptor.source,
            "installed": installed,
        }));
    } else {
        println!("{}", format_descriptor_detail(&descriptor, installed.as_ref()));
    }
    Ok(())
}
