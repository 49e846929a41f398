//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! `generate` runs the whole pipeline; `scan` and `list` expose the discovery
//! half on its own.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Generate Go interface mocks and a mock registration file.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where to look for interfaces.
#[derive(Debug, Clone, ClapArgs)]
pub struct TreeArgs {
    /// Directory to search for interfaces.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Recurse into subdirectories. Entries starting with `.` or `_` are always skipped.
    #[arg(short, long)]
    pub recursive: bool,

    /// Space-separated build tags, recorded but not evaluated.
    #[arg(long, default_value = "")]
    pub tags: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate mocks for matching interfaces and the registration file.
    Generate {
        #[command(flatten)]
        tree: TreeArgs,

        /// Name (or anchored pattern) of the interface to mock; stops at the first match.
        #[arg(long)]
        name: Option<String>,

        /// Mock every interface found.
        #[arg(long)]
        all: bool,

        /// Generate mocks beside their interfaces, in the same package.
        #[arg(long)]
        inpackage: bool,

        /// Directory for generated mocks and `register.go`.
        #[arg(long, default_value = "./mocks")]
        output: PathBuf,

        /// Package name for mocks generated outside the interface's package.
        #[arg(long, default_value = "mocks")]
        outpkg: String,

        /// Print mocks to stdout instead of writing files.
        #[arg(long)]
        print: bool,

        /// Extra comment added to each generated file's header.
        #[arg(long, default_value = "")]
        note: String,

        /// Module source root stripped from import paths. Defaults to `$GOPATH/src`.
        #[arg(long)]
        src_root: Option<PathBuf>,

        /// Emit the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List files that would be parsed without processing them.
    Scan {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Parse the tree and list discovered interfaces and the registration entry.
    List {
        #[command(flatten)]
        tree: TreeArgs,

        /// Only list this interface (anchored pattern).
        #[arg(long)]
        name: Option<String>,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },
}
