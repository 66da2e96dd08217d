//! `formulary install` -- fetch, verify and install a formula.

use anyhow::Result;
use formulary_install::{InstallOptions, InstallStatus, smoke_test};
use formulary_ui::styles;

use crate::cli::InstallArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `formulary install` command.
pub fn run(ctx: &RuntimeContext, args: &InstallArgs) -> Result<()> {
    let descriptor = ctx.load_formula(&args.formula)?;
    let installer = ctx.installer();

    ctx.say(format!(
        "{} Installing {}",
        styles::render_accent(styles::ICON_ARROW),
        styles::render_package(&descriptor.name, &descriptor.version())
    ));
    let outcome = installer.install(&descriptor, InstallOptions { force: args.force })?;

    let smoke = if args.test {
        Some(smoke_test(&ctx.layout, &descriptor, ctx.test_timeout())?)
    } else {
        None
    };

    if ctx.json {
        output_json(&serde_json::json!({
            "status": outcome.status,
            "keg": outcome.keg,
            "links": outcome.links,
            "receipt": outcome.receipt,
            "test": smoke.as_ref().map(|s| serde_json::json!({
                "passed": true,
                "binary": s.binary,
                "status": s.status,
            })),
        }));
        return Ok(());
    }

    let package = styles::render_package(&outcome.receipt.name, &outcome.receipt.version);
    match outcome.status {
        InstallStatus::AlreadyInstalled => ctx.say(format!(
            "{} {package} is already installed (use --force to reinstall)",
            styles::render_pass_icon()
        )),
        InstallStatus::Installed => {
            ctx.say(format!(
                "{} Installed {package} in {}",
                styles::render_pass_icon(),
                outcome.keg.display()
            ));
            if outcome.receipt.unverified {
                ctx.say(format!(
                    "{} Checksum verification was skipped for at least one archive",
                    styles::render_warn_icon()
                ));
            }
        }
    }
    for link in &outcome.links {
        ctx.say(format!("  {}", styles::render_muted(&link.display().to_string())));
    }
    if let Some(run) = smoke {
        ctx.say(format!(
            "{} Smoke test passed ({})",
            styles::render_pass_icon(),
            run.binary.display()
        ));
    }
    Ok(())
}
