//! Clap CLI definitions for the `formulary` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// formulary -- install packages from formula descriptors.
///
/// A formula names a source archive, its checksum, the runtime it needs,
/// optional bundled resources and a smoke test. formulary fetches and
/// verifies everything, installs it into an isolated environment and links
/// its executables into `<prefix>/bin`.
#[derive(Parser, Debug)]
#[command(
    name = "formulary",
    about = "Install packages from formula descriptors",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Installation prefix (default: ~/.formulary).
    #[arg(long, global = true, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Configuration file (default: ~/.config/formulary/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, verify and install a formula.
    Install(InstallArgs),

    /// Run a formula's smoke test against the installed package.
    Test(FormulaArgs),

    /// Fetch and verify a formula's archives into the download cache.
    Fetch(FormulaArgs),

    /// Show a formula and whether it is installed.
    Info(FormulaArgs),

    /// Check formulas for problems.
    Lint(LintArgs),

    /// List installed packages.
    #[command(alias = "ls")]
    List,

    /// Remove an installed package and its links.
    #[command(alias = "remove")]
    Uninstall(UninstallArgs),

    /// Manage the download cache.
    Cache(CacheArgs),

    /// Inspect configuration.
    Config(ConfigArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

/// A formula name or path.
#[derive(Args, Debug)]
pub struct FormulaArgs {
    /// Formula name (looked up in ./, ./Formula/ and <prefix>/formulas/) or path.
    pub formula: String,
}

/// Arguments for `formulary install`.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Formula name or path.
    pub formula: String,

    /// Reinstall even if the same version is already installed.
    #[arg(short, long)]
    pub force: bool,

    /// Run the smoke test after installing.
    #[arg(long)]
    pub test: bool,
}

/// Arguments for `formulary lint`.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Formula names or paths.
    #[arg(required = true)]
    pub formulas: Vec<String>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `formulary uninstall`.
#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Installed package name.
    pub name: String,
}

/// Arguments for `formulary cache`.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Print the download cache directory.
    Path,
    /// Delete every cached download.
    Clean,
}

/// Arguments for `formulary config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write the effective configuration to the configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for `formulary completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Target shell.
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["formulary", "install", "mcpverse", "--force", "--json", "--prefix", "/tmp/p"])
            .unwrap();
        assert!(cli.global.json);
        assert_eq!(cli.global.prefix, Some(PathBuf::from("/tmp/p")));
        match cli.command {
            Some(Commands::Install(args)) => {
                assert_eq!(args.formula, "mcpverse");
                assert!(args.force);
                assert!(!args.test);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lint_requires_a_formula() {
        assert!(Cli::try_parse_from(["formulary", "lint"]).is_err());
    }
}
