//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download whole albums from file-sharing hosts.
///
/// Each album lands in its own directory under the output directory.
/// Interrupted downloads resume from their `.part` files on the next run.
#[derive(Parser, Debug, Default)]
#[command(name = "albumdl")]
#[command(author, version, about)]
pub struct Args {
    /// Album URLs to download
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// File with one album URL per line (`#` starts a comment)
    #[arg(short = 'i', long, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Base directory for album folders [default: downloads]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Files downloaded in parallel within an album (1-32)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: Option<u8>,

    /// HTTP proxy for every request (e.g. http://127.0.0.1:8080)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Extract downloaded .zip files next to the archive
    #[arg(short = 'x', long)]
    pub extract: bool,

    /// Attempts per file before giving up (1-10) [default: 5]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Per-file speed limit in KiB/s (0 to disable) [default: 512]
    #[arg(short = 's', long, value_name = "KIB")]
    pub speed_limit_kb: Option<u64>,

    /// Minimum delay between requests to the same host in milliseconds (0 to disable, max 60000) [default: 300]
    #[arg(short = 'l', long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub request_delay_ms: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Default log level from the verbosity flags.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
