// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "localcloud")]
#[command(about = "Local build-agent cloud: images, instances, and reuse")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new localcloud.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Check that every configured image can provision instances
    Validate,

    /// Fire concurrent start requests at an image and show its instances
    Simulate {
        /// Image id (defined in config)
        #[arg(short, long)]
        image: String,

        /// Concurrent start requests per round
        #[arg(short = 'n', long, default_value_t = 1)]
        requests: usize,

        /// Number of rounds to run
        #[arg(short, long, default_value_t = 1)]
        rounds: usize,

        /// Stop the started instances at the end of each round
        #[arg(long)]
        stop: bool,
    },
}
