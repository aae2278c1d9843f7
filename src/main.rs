//! CLI entry point for albumdl.

use std::process::ExitCode;

use clap::Parser;

mod app;
mod cli;
mod config;

use cli::Args;

/// Process exit status. Clap exits with 2 on its own for argument errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// The run completed, including runs with failed files or albums.
    Success,
    /// The run could not start.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse before tracing so --help works without logs
    let args = Args::parse();

    let exit = match app::runtime::run_downloader(args).await {
        Ok(_) => ProcessExit::Success,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    exit.into()
}
