//! Startup/reload progress indicator rendered by a worker thread.
//!
//! The main thread never touches session state while the indicator runs:
//! [`ProgressIndicator::stop`] returns only after the worker has finished.

use parking_lot::{Condvar, Mutex};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const BAR_CELLS: usize = 9;
const LIT_CELLS: usize = 3;
const MAX_MESSAGE: usize = 60;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

struct State {
    running: bool,
    message: String,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

pub struct ProgressIndicator {
    shared: Arc<Shared>,
    sink: Sink,
    worker: Option<JoinHandle<()>>,
    enabled: bool,
}

impl std::fmt::Debug for ProgressIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressIndicator")
            .field("enabled", &self.enabled)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ProgressIndicator {
    /// Indicator drawing on stderr.
    pub fn new(enabled: bool) -> Self {
        Self::with_writer(enabled, Box::new(io::stderr()))
    }

    pub fn with_writer(enabled: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    running: false,
                    message: String::new(),
                }),
                wake: Condvar::new(),
            }),
            sink: Arc::new(Mutex::new(writer)),
            worker: None,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Start animating with `title`; returns false when disabled or already running.
    pub fn start(&mut self, title: &str, message: &str) -> bool {
        if !self.enabled || self.worker.is_some() {
            return false;
        }
        {
            let mut state = self.shared.state.lock();
            state.running = true;
            state.message = message.to_string();
        }
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);
        let title = title.to_string();
        let spawned = thread::Builder::new()
            .name("progress".into())
            .spawn(move || animate(&shared, &sink, &title));
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                true
            }
            Err(err) => {
                tracing::warn!(%err, "progress indicator unavailable");
                self.shared.state.lock().running = false;
                false
            }
        }
    }

    pub fn update(&self, message: &str) {
        self.shared.state.lock().message = message.to_string();
    }

    /// Signal the worker and wait until it has exited.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.shared.state.lock().running = false;
        self.shared.wake.notify_all();
        if handle.join().is_err() {
            tracing::warn!("progress indicator thread panicked");
        }
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn bar(frame: usize) -> String {
    (0..BAR_CELLS)
        .map(|cell| {
            let offset = (cell + BAR_CELLS - frame % BAR_CELLS) % BAR_CELLS;
            if offset < LIT_CELLS {
                '#'
            } else {
                ' '
            }
        })
        .collect()
}

fn animate(shared: &Shared, sink: &Sink, title: &str) {
    let mut frame = 0;
    let mut state = shared.state.lock();
    while state.running {
        let line = format!(
            "\r\x1b[2K{title} [{}] {}",
            bar(frame),
            truncate(&state.message, MAX_MESSAGE)
        );
        {
            let mut out = sink.lock();
            let _ = out.write_all(line.as_bytes());
            let _ = out.flush();
        }
        frame = frame.wrapping_add(1);
        shared.wake.wait_for(&mut state, FRAME_INTERVAL);
    }
    drop(state);
    let mut out = sink.lock();
    let _ = out.write_all(b"\r\x1b[2K");
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::SharedBuffer;

    #[test]
    fn disabled_indicator_never_starts() {
        let mut progress = ProgressIndicator::with_writer(false, Box::new(io::sink()));
        assert!(!progress.start("AITESS", "Loading..."));
        assert!(!progress.is_active());
        progress.stop();
    }

    #[test]
    fn stop_waits_for_worker() {
        let buffer = SharedBuffer::default();
        let mut progress = ProgressIndicator::with_writer(true, Box::new(buffer.clone()));
        assert!(progress.start("AITESS", "Loading..."));
        assert!(!progress.start("AITESS", "again"));
        progress.update("Reading configuration file...");
        thread::sleep(Duration::from_millis(120));
        progress.stop();
        assert!(!progress.is_active());
        let drawn = buffer.contents();
        assert!(drawn.contains("AITESS ["));
        assert!(drawn.ends_with("\r\x1b[2K"));
    }

    #[test]
    fn bar_moves_three_lit_cells() {
        assert_eq!(bar(0), "###      ");
        assert_eq!(bar(1), " ###     ");
        assert_eq!(bar(8), "##      #");
    }

    #[test]
    fn long_messages_are_shortened() {
        assert_eq!(truncate("abcdefgh", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
