//! Semantic colors and icons.
//!
//! Only outcomes get color: green for done, yellow for warnings and
//! unverified archives, red for failures. Names and versions use accent and
//! muted tones so they scan easily in lists.

use formulary_core::validation::Severity;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0x7f, 0xd9, 0x62);
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54);
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78);
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80);
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff);

pub const ICON_PASS: &str = "\u{2713}";
pub const ICON_WARN: &str = "\u{26A0}";
pub const ICON_FAIL: &str = "\u{2716}";
pub const ICON_ARROW: &str = "\u{2192}";

fn paint(s: &str, rgb: (u8, u8, u8), enabled: bool) -> String {
    if enabled {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color(s: &str, rgb: (u8, u8, u8)) -> String {
    paint(s, rgb, supports_color())
}

// ---------------------------------------------------------------------------
// Render helpers
// ---------------------------------------------------------------------------

pub fn render_pass(s: &str) -> String {
    color(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color(s, MUTED)
}

pub fn render_accent(s: &str) -> String {
    color(s, ACCENT)
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

pub fn render_pass_icon() -> String {
    render_pass(ICON_PASS)
}

pub fn render_warn_icon() -> String {
    render_warn(ICON_WARN)
}

pub fn render_fail_icon() -> String {
    render_fail(ICON_FAIL)
}

/// `name version` with the version muted.
pub fn render_package(name: &str, version: &str) -> String {
    format!("{} {}", render_accent(name), render_muted(version))
}

/// Icon and label for a lint finding's severity.
pub fn render_severity(severity: Severity) -> String {
    match severity {
        Severity::Error => format!("{} {}", render_fail_icon(), render_fail("error")),
        Severity::Warning => format!("{} {}", render_warn_icon(), render_warn("warning")),
    }
}
