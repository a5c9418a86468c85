//! CLI command definitions
//!
//! Defines the clap commands for the formcheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::scenario::ScenarioKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one scenario on one capability profile
    Run {
        /// Scenario to run
        #[arg(long, short, value_enum)]
        scenario: ScenarioKind,

        /// Capability profile from the config file
        #[arg(long, short)]
        profile: String,

        /// Use the local backend instead of the grid
        #[arg(long)]
        local: bool,

        /// Turn on verbose console logs and network capture
        #[arg(long)]
        diagnostics: bool,

        /// Form fixture (YAML); defaults to the built-in Astro Sky form
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a scenario on several profiles at once, one session each
    RunAll {
        /// Scenario to run
        #[arg(long, short, value_enum)]
        scenario: ScenarioKind,

        /// Capability profiles; can be given multiple times
        #[arg(long = "profile", short = 'p', required = true)]
        profiles: Vec<String>,

        /// Use the local backend instead of the grid
        #[arg(long)]
        local: bool,

        /// Turn on verbose console logs and network capture
        #[arg(long)]
        diagnostics: bool,

        /// Form fixture (YAML)
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List configured capability profiles
    Profiles {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check that the grid (or local backend) is ready
    Status {
        /// Query the local backend instead of the grid
        #[arg(long)]
        local: bool,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}
