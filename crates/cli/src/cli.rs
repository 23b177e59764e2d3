use std::path::PathBuf;

use semver::Version;

#[derive(clap::Parser, Debug)]
#[clap(name = "hatch", about = "Install and run hatch packages")]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Install one or more packages from the registry
    Install {
        /// Package identifiers
        #[clap(required = true)]
        ids: Vec<String>,
        /// Version to install (single package only)
        #[clap(long)]
        version: Option<Version>,
        /// Resolve from the registry even if already installed
        #[clap(long)]
        refresh: bool,
        /// Refuse packages that request flagged permissions
        #[clap(long)]
        deny_flagged: bool,
        /// Maximum number of installs in flight
        #[clap(long)]
        concurrency: Option<usize>,
    },
    /// Install a package from a repository URL
    InstallRepo {
        /// e.g. https://github.com/owner/repo
        url: String,
        /// Refuse packages that request flagged permissions
        #[clap(long)]
        deny_flagged: bool,
    },
    /// List installed packages
    List {
        /// Show manifest details
        #[clap(long)]
        detailed: bool,
    },
    /// Remove an installed package
    Uninstall { id: String },
    /// Enable an installed package
    Enable { id: String },
    /// Disable an installed package
    Disable { id: String },
    /// Load an installed package and run its activate and deactivate routines
    Run { id: String },
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the full configuration
    Show,
    /// Print one configuration value
    Get { key: String },
    /// Set a configuration value, e.g. `registry.mode direct`
    Set { key: String, value: String },
    /// Reset configuration to defaults
    Reset,
}
