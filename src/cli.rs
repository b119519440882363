use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "envoy")]
#[command(version = VERSION)]
#[command(about = DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Name of the command to launch (e.g. "maya", "nuke")
    #[arg(value_name = "COMMAND")]
    pub name: Option<String>,

    /// Arguments passed through to the launched executable
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// List all registered commands and exit
    #[arg(long)]
    pub list: bool,

    /// Print a resolved command's environment-file chain and exit
    #[arg(long, value_name = "COMMAND")]
    pub info: Option<String>,

    /// Print the resolved executable path for a command and exit
    #[arg(long, value_name = "COMMAND")]
    pub which: Option<String>,

    /// Inherit the full host environment instead of the closed allowlist
    #[arg(long)]
    pub inherit_env: bool,

    /// Extra variable names to carry through in closed mode, separated by
    /// the platform path separator
    #[arg(long, value_name = "VARS")]
    pub allow: Option<String>,

    /// Explicit bundle-config JSON file (overrides auto-discovery)
    #[arg(long, value_name = "FILE")]
    pub bundles_config: Option<PathBuf>,

    /// Root directories to scan for bundles, separated by the platform path
    /// separator (overrides `ENVOY_BNDL_ROOTS`)
    #[arg(long, value_name = "ROOTS")]
    pub bundle_roots: Option<String>,

    /// Explicit single-file `commands.json` (overrides bundle discovery and
    /// `ENVOY_COMMANDS_FILE`)
    #[arg(long, value_name = "FILE")]
    pub commands_file: Option<PathBuf>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
