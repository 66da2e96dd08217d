//! `formulary fetch` -- download and verify archives without installing.

use anyhow::Result;
use formulary_install::InstallFailure;
use formulary_ui::styles;
use serde::Serialize;

use crate::cli::FormulaArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

#[derive(Serialize)]
struct FetchedView<'a> {
    name: &'a str,
    kind: formulary_core::ArchiveKind,
    url: &'a str,
    path: &'a std::path::Path,
    sha256: &'a str,
    verified: bool,
    cached: bool,
}

/// Execute the `formulary fetch` command.
pub fn run(ctx: &RuntimeContext, args: &FormulaArgs) -> Result<()> {
    let descriptor = ctx.load_formula(&args.formula)?;
    let fetched = ctx.fetcher().fetch_all(&descriptor).map_err(InstallFailure::from)?;

    if ctx.json {
        let views: Vec<FetchedView<'_>> = fetched
            .iter()
            .map(|a| FetchedView {
                name: &a.name,
                kind: a.kind,
                url: &a.url,
                path: &a.path,
                sha256: &a.sha256,
                verified: a.verified,
                cached: a.cached,
            })
            .collect();
        output_json(&views);
        return Ok(());
    }

    if ctx.quiet {
        return Ok(());
    }
    let rows: Vec<Vec<String>> = fetched
        .iter()
        .map(|a| {
            let state = match (a.verified, a.cached) {
                (true, true) => styles::render_pass("cached"),
                (true, false) => styles::render_pass("verified"),
                (false, _) => styles::render_warn("unverified"),
            };
            vec![a.name.clone(), state, a.path.display().to_string()]
        })
        .collect();
    output_table(&["ARCHIVE", "STATE", "PATH"], &rows);
    Ok(())
}
