//! Command handlers, one module per subcommand.

pub mod cache;
pub mod completion;
pub mod config_cmd;
pub mod fetch;
pub mod info;
pub mod install;
pub mod lint;
pub mod list;
pub mod uninstall;
pub mod version;
