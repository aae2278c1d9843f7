//! Progress bars and status lines for download runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use albumdl_core::{ProgressReporter, StatusHook, TransferOutcome};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg:30!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {eta}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:30!} {bytes} {bytes_per_sec}";

/// One bar per in-flight file. Hidden when bars are disabled.
pub(crate) struct TerminalProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TerminalProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        let target = if enabled {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn new_bar(&self, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(len) => ProgressBar::new(len).with_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            ),
            None => ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            ),
        };
        self.multi.add(bar)
    }

    /// Number of bars currently shown.
    pub(crate) fn active(&self) -> usize {
        self.bars.lock().map_or(0, |bars| bars.len())
    }
}

impl ProgressReporter for TerminalProgress {
    fn file_started(&self, file: &str, resumed_from: u64, total: Option<u64>) {
        let bar = self.new_bar(total);
        bar.set_message(file.to_string());
        bar.set_position(resumed_from);
        if let Ok(mut bars) = self.bars.lock()
            && let Some(previous) = bars.insert(file.to_string(), bar)
        {
            previous.finish_and_clear();
            self.multi.remove(&previous);
        }
    }

    fn bytes_written(&self, file: &str, bytes: u64) {
        if let Ok(bars) = self.bars.lock()
            && let Some(bar) = bars.get(file)
        {
            bar.inc(bytes);
        }
    }

    fn file_finished(&self, file: &str, _outcome: TransferOutcome) {
        let removed = self.bars.lock().ok().and_then(|mut bars| bars.remove(file));
        if let Some(bar) = removed {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

/// Status lines go to stdout above the bars; `quiet` drops them.
pub(crate) fn status_printer(progress: &Arc<TerminalProgress>, quiet: bool) -> StatusHook {
    if quiet {
        return albumdl_core::silent_status_hook();
    }
    let progress = Arc::clone(progress);
    Arc::new(move |message: &str| {
        progress.multi.suspend(|| println!("{message}"));
    })
}
