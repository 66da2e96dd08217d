//! Terminal output styling for formulary.
//!
//! Color is applied only when the terminal supports it and the user has not
//! opted out; every helper degrades to plain text otherwise.

pub mod styles;
pub mod terminal;
