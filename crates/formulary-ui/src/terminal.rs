//! Terminal detection.

use std::env;

/// Returns `true` if stdout is a terminal.
pub fn is_tty() -> bool {
    crossterm::tty::IsTty::is_tty(&std::io::stdout())
}

/// Whether ANSI colors should be emitted on stdout.
///
/// `NO_COLOR` (any value), `CLICOLOR=0` and `TERM=dumb` disable color;
/// `CLICOLOR_FORCE` enables it without a terminal. Otherwise color follows
/// TTY detection.
pub fn supports_color() -> bool {
    color_decision(
        |key| env::var_os(key).is_some(),
        |key| env::var(key).ok(),
        is_tty(),
    )
}

fn color_decision(
    is_set: impl Fn(&str) -> bool,
    value: impl Fn(&str) -> Option<String>,
    tty: bool,
) -> bool {
    if is_set("NO_COLOR") {
        return false;
    }
    if value("CLICOLOR").as_deref() == Some("0") || value("TERM").as_deref() == Some("dumb") {
        return false;
    }
    if is_set("CLICOLOR_FORCE") {
        return true;
    }
    tty
}
