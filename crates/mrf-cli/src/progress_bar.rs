//! Console progress bar driven by source byte counts

use mrf_core::{Progress, ProgressReporter};
use parking_lot::Mutex;
use std::io::Write;
use std::time::Instant;

const BAR_WIDTH: usize = 40;
const UNKNOWN_TOTAL_STEP: u64 = 8 * 1024 * 1024;

/// Renders a single-line bar on stdout, redrawn on every whole percent
/// (or every 8 MiB when the source length is unknown)
pub struct ConsoleProgress {
    state: Mutex<BarState>,
}

struct BarState {
    started: Instant,
    last_mark: Option<u64>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarState {
                started: Instant::now(),
                last_mark: None,
            }),
        }
    }

    fn draw(line: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\r{line}");
        let _ = stdout.flush();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn start(&self, total: Option<u64>) {
        let mut state = self.state.lock();
        state.started = Instant::now();
        state.last_mark = None;
        Self::draw(&render(&Progress { bytes: 0, total }, 0.0));
    }

    fn advance(&self, progress: &Progress) {
        let mark = match progress.fraction() {
            Some(fraction) => (fraction * 100.0) as u64,
            None => progress.bytes / UNKNOWN_TOTAL_STEP,
        };
        let mut state = self.state.lock();
        if state.last_mark == Some(mark) {
            return;
        }
        state.last_mark = Some(mark);
        Self::draw(&render(progress, state.started.elapsed().as_secs_f64()));
    }

    fn finish(&self, progress: &Progress) {
        let state = self.state.lock();
        Self::draw(&render(progress, state.started.elapsed().as_secs_f64()));
        println!();
    }
}

/// One bar line, e.g. `[=========>      ] 61% | 1.2 GiB / 2.0 GiB | 35s`
pub fn render(progress: &Progress, elapsed_secs: f64) -> String {
    match (progress.fraction(), progress.total) {
        (Some(fraction), Some(total)) => {
            let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
            let mut bar = "=".repeat(filled);
            if filled < BAR_WIDTH {
                bar.push('>');
                bar.push_str(&" ".repeat(BAR_WIDTH - filled - 1));
            }
            format!(
                "[{bar}] {:>3.0}% | {} / {} | {:.0}s",
                fraction * 100.0,
                human_bytes(progress.bytes),
                human_bytes(total),
                elapsed_secs
            )
        }
        _ => format!(
            "{} read | {:.0}s",
            human_bytes(progress.bytes),
            elapsed_secs
        ),
    }
}

/// Binary-unit byte count with one decimal
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
