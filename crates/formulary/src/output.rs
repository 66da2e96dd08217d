//! Output formatting helpers for the `formulary` CLI.

use std::io::{self, Write};

use formulary_core::receipt::InstallReceipt;
use formulary_core::PackageDescriptor;
use formulary_ui::styles;
use serde::Serialize;

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple aligned table with headers and rows.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in format_table(headers, rows) {
        let _ = writeln!(handle, "{}", line);
    }
}

fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut lines = vec![render(&header), render(&separator)];
    lines.extend(rows.iter().map(|row| render(row)));
    lines
}

/// Multi-line human view of a formula and its install state.
pub fn format_descriptor_detail(descriptor: &PackageDescriptor, installed: Option<&InstallReceipt>) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{}: {}",
        styles::render_package(&descriptor.name, &descriptor.version()),
        descriptor.description
    ));
    if !descriptor.homepage.is_empty() {
        lines.push(descriptor.homepage.clone());
    }
    if !descriptor.license.is_empty() {
        lines.push(format!("License: {}", descriptor.license));
    }
    lines.push(format!("Source: {}", descriptor.url));
    if descriptor.sha256.is_placeholder() {
        lines.push(format!("SHA-256: {}", styles::render_warn("placeholder (unverified)")));
    } else {
        lines.push(format!("SHA-256: {}", descriptor.sha256.as_str()));
    }
    if !descriptor.source.is_empty() {
        lines.push(format!("Formula: {}", descriptor.source));
    }

    if !descriptor.depends_on.is_empty() {
        lines.push(String::new());
        lines.push(styles::render_bold("DEPENDENCIES"));
        for dep in &descriptor.depends_on {
            lines.push(format!("  {dep}"));
        }
    }
    if !descriptor.resources.is_empty() {
        lines.push(String::new());
        lines.push(styles::render_bold("RESOURCES"));
        for r in &descriptor.resources {
            lines.push(format!("  {} {}", r.name, styles::render_muted(&r.url)));
        }
    }
    if let Some(test) = &descriptor.test {
        lines.push(String::new());
        lines.push(styles::render_bold("TEST"));
        lines.push(format!("  {} {}", descriptor.test_binary(), test.args.join(" ")));
        lines.push(format!("  expects {:?}", test.expect));
    }

    lines.push(String::new());
    match installed {
        Some(r) => lines.push(format!(
            "{} Installed {} ({})",
            styles::render_pass_icon(),
            r.installed_at.format("%Y-%m-%d %H:%M"),
            r.entry_points.join(", ")
        )),
        None => lines.push(styles::render_muted("Not installed")),
    }
    lines.join("\n")
}
