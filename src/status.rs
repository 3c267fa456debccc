use std::io::{self, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::{PrintStyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};

use crate::app::{ProgressEvent, ProgressSink};

const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct LineState {
    total: usize,
    current: usize,
    activity: Option<String>,
    tick: usize,
}

impl LineState {
    fn status_text(&self) -> String {
        let mut text = format!("Downloading {} accessions", self.total);
        if self.current > 0 {
            text.push_str(&format!(" ({}/{})", self.current, self.total));
        }
        if let Some(activity) = &self.activity {
            text.push_str(&format!(" {activity}"));
        }
        text
    }

    fn frame(&self) -> char {
        SPINNER[self.tick % SPINNER.len()]
    }
}

fn draw(state: &LineState) -> io::Result<()> {
    let mut out = io::stderr().lock();
    out.queue(MoveToColumn(0))?
        .queue(Clear(ClearType::CurrentLine))?
        .queue(PrintStyledContent(state.frame().cyan()))?;
    write!(out, " {}", state.status_text())?;
    out.flush()
}

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Single status line on stderr, with per-item results printed above it.
///
/// The spinner advances on a background thread while a download blocks; all
/// terminal writes happen under the state lock.
pub struct StatusLine {
    state: Arc<Mutex<LineState>>,
    ticker: Mutex<Option<Ticker>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LineState::default())),
            ticker: Mutex::new(None),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_ticker(&self) {
        self.stop_ticker();
        let (stop, rx) = mpsc::channel::<()>();
        let state = Arc::clone(&self.state);
        let handle = thread::spawn(move || {
            while let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(TICK) {
                let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                state.tick = state.tick.wrapping_add(1);
                if draw(&state).is_err() {
                    break;
                }
            }
        });
        if let Ok(mut ticker) = self.ticker.lock() {
            *ticker = Some(Ticker { stop, handle });
        }
    }

    fn stop_ticker(&self) {
        let ticker = self.ticker.lock().ok().and_then(|mut ticker| ticker.take());
        if let Some(Ticker { stop, handle }) = ticker {
            let _ = stop.send(());
            let _ = handle.join();
        }
    }

    // Clears the status line, prints a permanent line, then restores the status.
    fn println_above(&self, line: String) -> io::Result<()> {
        let state = self.lock_state();
        {
            let mut out = io::stderr().lock();
            out.queue(MoveToColumn(0))?
                .queue(Clear(ClearType::CurrentLine))?;
            writeln!(out, "{line}")?;
        }
        draw(&state)
    }

    fn finish(&self, succeeded: bool, elapsed: Duration) -> io::Result<()> {
        self.stop_ticker();
        let text = format!(
            "{} accessions processed in {:.1}s",
            self.lock_state().total,
            elapsed.as_secs_f64()
        );
        let mut out = io::stderr().lock();
        out.queue(MoveToColumn(0))?
            .queue(Clear(ClearType::CurrentLine))?;
        if succeeded {
            out.queue(PrintStyledContent("✔ ".green().bold()))?;
            writeln!(out, "{text}")?;
        } else {
            out.queue(PrintStyledContent("✘ ".red().bold()))?;
            writeln!(out, "Some accessions failed ({text})")?;
        }
        out.flush()
    }

    fn handle(&self, event: ProgressEvent) -> io::Result<()> {
        match event {
            ProgressEvent::Started { total } => {
                {
                    let mut state = self.lock_state();
                    *state = LineState {
                        total,
                        ..LineState::default()
                    };
                    draw(&state)?;
                }
                self.start_ticker();
                Ok(())
            }
            ProgressEvent::Downloading { accession, format } => {
                let mut state = self.lock_state();
                state.activity = Some(format!("{accession} [{format}]"));
                draw(&state)
            }
            ProgressEvent::Skipped { accession, .. } => self.println_above(format!(
                "{} not a valid accession. Skipping.",
                accession.yellow()
            )),
            ProgressEvent::Downloaded { accession, .. } => {
                self.println_above(format!("{accession} {}", "✓".green()))
            }
            ProgressEvent::Failed { accession, reason } => {
                self.println_above(format!("{accession} {} {reason}", "✗".red()))
            }
            ProgressEvent::Progress { current, total } => {
                let mut state = self.lock_state();
                state.current = current;
                state.total = total;
                state.activity = None;
                draw(&state)
            }
            ProgressEvent::Finished { succeeded, elapsed } => self.finish(succeeded, elapsed),
        }
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StatusLine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

impl ProgressSink for StatusLine {
    fn event(&self, event: ProgressEvent) {
        // A broken terminal must not abort the downloads.
        if let Err(err) = self.handle(event) {
            tracing::debug!(error = %err, "status line write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_tracks_progress() {
        let state = LineState {
            total: 3,
            current: 2,
            activity: Some("NC_000001.11 [fasta]".to_string()),
            tick: 0,
        };
        assert_eq!(
            state.status_text(),
            "Downloading 3 accessions (2/3) NC_000001.11 [fasta]"
        );
    }

    #[test]
    fn ticker_advances_spinner_between_events() {
        let status = StatusLine::new();
        status.event(ProgressEvent::Started { total: 1 });
        thread::sleep(TICK * 4);
        let ticked = status.lock_state().tick;
        status.event(ProgressEvent::Finished {
            succeeded: true,
            elapsed: Duration::from_millis(1),
        });
        assert!(ticked > 0);
        assert!(status.ticker.lock().unwrap().is_none());
    }
}
