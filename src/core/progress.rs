use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use crate::shared::constants::PROGRESS_LOG_EVERY;
use crate::utils::time_utils::{format_clock, Timer};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Terminal,
    Log,
    Hidden,
}

/// Frame counter shown as a single rewritten line on stderr.
///
/// When stderr is not a terminal the count goes to the debug log every
/// `PROGRESS_LOG_EVERY` frames instead.
pub struct Progress {
    total: Option<u64>,
    done: u64,
    timer: Timer,
    last_draw: Option<Instant>,
    mode: Mode,
}

impl Progress {
    /// `total` of 0 means the length is unknown.
    pub fn new(total: u64) -> Self {
        let mode = if io::stderr().is_terminal() { Mode::Terminal } else { Mode::Log };
        Self::with_mode(total, mode)
    }

    pub fn hidden() -> Self {
        Self::with_mode(0, Mode::Hidden)
    }

    fn with_mode(total: u64, mode: Mode) -> Self {
        Self {
            total: (total > 0).then_some(total),
            done: 0,
            timer: Timer::new(),
            last_draw: None,
            mode,
        }
    }

    pub fn done(&self) -> u64 {
        self.done
    }

    pub fn tick(&mut self) {
        self.done += 1;
        match self.mode {
            Mode::Terminal => {
                let due = self.last_draw.map_or(true, |t| t.elapsed() >= REDRAW_INTERVAL);
                if due {
                    self.draw();
                }
            }
            Mode::Log => {
                if self.done % PROGRESS_LOG_EVERY == 0 {
                    crate::utils::logger::info(&self.line());
                }
            }
            Mode::Hidden => {}
        }
    }

    pub fn finish(&mut self) {
        match self.mode {
            Mode::Terminal => {
                self.draw();
                eprintln!();
            }
            Mode::Log => crate::utils::logger::info(&self.line()),
            Mode::Hidden => {}
        }
    }

    fn line(&self) -> String {
        render_line(self.done, self.total, self.timer.rate(self.done), self.timer.elapsed())
    }

    fn draw(&mut self) {
        let mut stderr = io::stderr();
        let _ = queue!(
            stderr,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(self.line())
        );
        let _ = stderr.flush();
        self.last_draw = Some(Instant::now());
    }
}

pub fn render_line(done: u64, total: Option<u64>, rate: f64, elapsed: Duration) -> String {
    match total {
        Some(total) => {
            let pct = (done as f64 / total as f64 * 100.0).min(100.0);
            format!(
                "Processing: {:>3.0}% {}/{} [{}, {:.1} f/s]",
                pct,
                done,
                total,
                format_clock(elapsed),
                rate
            )
        }
        None => format!("Processing: {} f [{}, {:.1} f/s]", done, format_clock(elapsed), rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_line_with_total() {
        let line = render_line(30, Some(120), 15.0, Duration::from_secs(2));
        assert_eq!(line, "Processing:  25% 30/120 [00:02, 15.0 f/s]");
    }

    #[test]
    fn test_render_line_unknown_total() {
        let line = render_line(7, None, 3.5, Duration::from_secs(61));
        assert_eq!(line, "Processing: 7 f [01:01, 3.5 f/s]");
    }

    #[test]
    fn test_reported_count_can_be_short() {
        // containers sometimes under-report the frame count
        let line = render_line(11, Some(10), 1.0, Duration::ZERO);
        assert!(line.starts_with("Processing: 100% 11/10"));
    }

    #[test]
    fn test_hidden_still_counts() {
        let mut progress = Progress::hidden();
        progress.tick();
        progress.tick();
        progress.finish();
        assert_eq!(progress.done(), 2);
    }
}
