// SPDX-License-Identifier: MIT

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::profile::CardKind;
use crate::utils::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "cardls",
    version,
    about = "Read FAT32 card images through an emulated SPI memory card",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// MBR partition to mount (1-4)
    #[arg(short, long, global = true, default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=4))]
    pub partition: u8,

    /// TOML profile for the emulated card
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Card flavour, overrides the profile
    #[arg(long, global = true, value_enum)]
    pub card: Option<CardKind>,

    /// Clock rate to switch to after bring-up
    #[arg(long, global = true)]
    pub speed_hz: Option<u32>,

    /// Log card traffic and filesystem decisions
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn log_level(&self) -> LogLevel {
        if self.quiet {
            LogLevel::Quiet
        } else if self.verbose {
            LogLevel::Verbose
        } else {
            LogLevel::Normal
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bring-up summary, partition record and FAT32 geometry
    Info {
        /// Disk image
        image: PathBuf,
    },
    /// List a directory
    Ls {
        /// Disk image
        image: PathBuf,
        /// Directory path, `/`-separated from the root
        #[arg(default_value = "/")]
        path: String,
        /// List the directory starting at this cluster instead of a path
        #[arg(long, conflicts_with = "path")]
        cluster: Option<u32>,
        /// Include volume label and dot entries
        #[arg(short, long)]
        all: bool,
    },
    /// Print a file to stdout
    Cat {
        /// Disk image
        image: PathBuf,
        /// File path, `/`-separated from the root
        name: String,
    },
    /// Hex dump of one card block
    Block {
        /// Disk image
        image: PathBuf,
        /// Block index
        #[arg(default_value_t = 0)]
        lba: u32,
    },
}

impl Commands {
    pub fn image(&self) -> &PathBuf {
        match self {
            Commands::Info { image }
            | Commands::Ls { image, .. }
            | Commands::Cat { image, .. }
            | Commands::Block { image, .. } => image,
        }
    }
}
