//! One download run: settings, input, scheduler, summary.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use albumdl_core::{
    AlbumResult, HostLimiter, HttpClient, RetryPolicy, Scheduler, SchedulerConfig, TransferEngine,
    build_default_registry, collect_urls,
};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::app::progress_ui::{TerminalProgress, status_printer};
use crate::app::terminal;
use crate::cli::Args;
use crate::config::{RunSettings, load_file_config};

/// Totals across every album in a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunTotals {
    pub(crate) albums: usize,
    pub(crate) failed_albums: usize,
    pub(crate) downloaded: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
}

impl RunTotals {
    pub(crate) fn add(&mut self, result: &AlbumResult) {
        self.albums += 1;
        if result.is_album_failure() {
            self.failed_albums += 1;
        }
        self.downloaded += result.downloaded;
        self.skipped += result.skipped;
        self.failed += result.failed;
    }
}

impl std::fmt::Display for RunTotals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Done: {} albums ({} failed), ok={} skip={} fail={}",
            self.albums, self.failed_albums, self.downloaded, self.skipped, self.failed
        )
    }
}

/// Runs every queued album to completion.
///
/// Errors only when the run cannot start; per-file and per-album failures are
/// reported in the summary instead.
pub(crate) async fn run_downloader(args: Args) -> Result<RunTotals> {
    let no_color = terminal::is_no_color_requested(args.no_color);
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    let file_config = load_file_config(args.config.as_deref())?;
    let settings = RunSettings::resolve(&args, file_config.as_ref());
    debug!(?settings, "effective settings");

    let input = collect_urls(&args.urls, args.input_file.as_deref())?;
    if input.is_empty() {
        eprintln!("No album URLs given. Pass URLs as arguments or use --input-file <PATH>.");
        return Ok(RunTotals::default());
    }
    info!(albums = input.urls.len(), "albumdl starting");

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                settings.output_dir.display()
            )
        })?;

    let client = HttpClient::new(&settings.client).context("Failed to build HTTP client")?;
    let registry = Arc::new(build_default_registry(&client));

    let host_limiter = if settings.request_delay.is_zero() {
        debug!("request spacing disabled");
        Arc::new(HostLimiter::disabled())
    } else {
        Arc::new(HostLimiter::new(settings.request_delay))
    };

    let use_bars = terminal::should_use_progress_bars(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let progress = Arc::new(TerminalProgress::new(use_bars));
    let status = status_printer(&progress, args.quiet);

    let engine = TransferEngine::new(
        client,
        RetryPolicy::with_max_attempts(settings.max_attempts),
        host_limiter,
    )
    .with_speed_limit(settings.speed_limit_bytes)
    .with_progress(progress)
    .with_status_hook(status);

    let scheduler = Scheduler::new(
        registry,
        engine,
        SchedulerConfig {
            base_dir: settings.output_dir.clone(),
            concurrency: settings.concurrency,
            extract_archives: settings.extract_archives,
        },
    )?;

    for url in input.urls {
        scheduler.submit(url)?;
    }
    scheduler.shutdown();

    let mut totals = RunTotals::default();
    let results = scheduler.run();
    futures_util::pin_mut!(results);
    while let Some(result) = results.next().await {
        if args.quiet
            && let Some(error) = &result.error
        {
            eprintln!("Error: {}: {error}", result.source_url);
        }
        totals.add(&result);
    }

    if totals.failed > 0 || totals.failed_albums > 0 {
        warn!(
            failed_files = totals.failed,
            failed_albums = totals.failed_albums,
            "run finished with failures"
        );
    }
    if !args.quiet {
        println!("{totals}");
    }
    Ok(totals)
}
