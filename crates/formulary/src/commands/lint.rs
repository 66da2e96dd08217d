//! `formulary lint` -- audit formulas.
//!
//! Formulas are parsed without validation so that every problem is
//! reported as a finding instead of failing on the first one.

use anyhow::{Result, bail};
use formulary_core::validation::{self, Finding};
use formulary_ui::styles;
use serde::Serialize;

use crate::cli::LintArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

#[derive(Serialize)]
struct LintReport {
    formula: String,
    path: String,
    findings: Vec<Finding>,
}

/// Execute the `formulary lint` command.
pub fn run(ctx: &RuntimeContext, args: &LintArgs) -> Result<()> {
    let mut reports = Vec::new();
    for name in &args.formulas {
        let path = ctx.find_formula(name)?;
        let descriptor = formulary_formula::parser::load_unvalidated(&path)?;
        reports.push(LintReport {
            formula: descriptor.name.clone(),
            path: path.display().to_string(),
            findings: validation::lint(&descriptor),
        });
    }

    let failed = reports
        .iter()
        .filter(|r| {
            if args.strict {
                !r.findings.is_empty()
            } else {
                validation::has_errors(&r.findings)
            }
        })
        .count();

    if ctx.json {
        output_json(&reports);
    } else {
        for report in &reports {
            if report.findings.is_empty() {
                ctx.say(format!("{} {}", styles::render_pass_icon(), report.formula));
                continue;
            }
            println!("{} ({})", styles::render_bold(&report.formula), styles::render_muted(&report.path));
            for finding in &report.findings {
                println!(
                    "  {} {}: {}",
                    styles::render_severity(finding.severity),
                    finding.field,
                    finding.message
                );
            }
        }
    }

    if failed > 0 {
        bail!("lint found problems in {failed} formula(s)");
    }
    Ok(())
}
