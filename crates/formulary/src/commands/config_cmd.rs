//! `formulary config` -- inspect configuration.

use anyhow::{Context, Result, bail};
use formulary_config::save_config;

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `formulary config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            if ctx.json {
                output_json(&ctx.config);
            } else {
                print!("{}", serde_yaml::to_string(&ctx.config).context("failed to render configuration")?);
            }
        }
        ConfigCommands::Path => {
            if ctx.json {
                output_json(&serde_json::json!({
                    "path": ctx.config_file,
                    "exists": ctx.config_file.is_file(),
                }));
            } else {
                println!("{}", ctx.config_file.display());
            }
        }
        ConfigCommands::Init { force } => {
            if ctx.config_file.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    ctx.config_file.display()
                );
            }
            save_config(&ctx.config_file, &ctx.config)?;
            ctx.say(format!("Wrote {}", ctx.config_file.display()));
        }
    }
    Ok(())
}
