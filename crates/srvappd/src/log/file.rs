//! Buffered append-only file sink.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::warn;

use super::LOG_TARGET;
use super::message::LogMessage;
use super::sink::{Closeable, FlushInterval, LogSink, SinkError, Toggle};

// Wait used by the flusher while every print flushes on its own.
const IDLE_TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct FileState {
    writer: Option<BufWriter<File>>,
    interval: Duration,
    last_flush: Instant,
    pending: bool,
    stopped: bool,
}

impl FileState {
    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        self.pending = false;
        self.last_flush = Instant::now();
        Ok(())
    }
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    state: Mutex<FileState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, error: &std::io::Error) {
        warn!(
            target: LOG_TARGET,
            file = %self.path.display(),
            error = %error,
            "failed to write log file"
        );
    }
}

/// Durable sink writing one line per message.
///
/// Output is buffered. A background thread flushes it at most one flush
/// interval after it was written, and close flushes whatever remains. A
/// closed sink ignores further messages.
#[derive(Debug)]
pub struct FileSink {
    shared: Arc<Shared>,
    enabled: AtomicBool,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl FileSink {
    /// Opens `path` for appending, creating it when missing, and starts the
    /// flusher thread.
    pub fn open(path: impl Into<PathBuf>, interval: Duration) -> Result<Self, SinkError> {
        let path = path.into();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o640);
        }
        let file = options.open(&path).map_err(|source| SinkError::Open {
            path: path.clone(),
            source,
        })?;
        let shared = Arc::new(Shared {
            path: path.clone(),
            state: Mutex::new(FileState {
                writer: Some(BufWriter::new(file)),
                interval,
                last_flush: Instant::now(),
                pending: false,
                stopped: false,
            }),
            wake: Condvar::new(),
        });
        let flusher = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("log-file-flusher".to_owned())
                .spawn(move || run_flusher(&shared))
                .map_err(|source| SinkError::Flusher { path, source })?
        };
        Ok(Self {
            shared,
            enabled: AtomicBool::new(true),
            flusher: Mutex::new(Some(flusher)),
        })
    }

    /// File the sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    fn stop_flusher(&self) {
        self.shared.lock().stopped = true;
        self.shared.wake.notify_all();
        let handle = self
            .flusher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(target: LOG_TARGET, file = %self.path().display(), "log flusher panicked");
            }
        }
    }
}

fn run_flusher(shared: &Shared) {
    let mut state = shared.lock();
    loop {
        if state.stopped || state.writer.is_none() {
            return;
        }
        let tick = if state.interval.is_zero() {
            IDLE_TICK
        } else {
            state.interval
        };
        state = shared
            .wake
            .wait_timeout(state, tick)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
        if state.pending && state.last_flush.elapsed() >= state.interval {
            if let Err(error) = state.flush() {
                shared.report(&error);
            }
        }
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn print(&self, message: &LogMessage) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.shared.lock();
        let Some(writer) = state.writer.as_mut() else {
            return;
        };
        if let Err(error) = writeln!(writer, "{message}") {
            self.shared.report(&error);
            return;
        }
        state.pending = true;
        if state.last_flush.elapsed() >= state.interval {
            if let Err(error) = state.flush() {
                self.shared.report(&error);
            }
        }
    }

    fn closer(&self) -> Option<&dyn Closeable> {
        Some(self)
    }

    fn toggle(&self) -> Option<&dyn Toggle> {
        Some(self)
    }

    fn flush_control(&self) -> Option<&dyn FlushInterval> {
        Some(self)
    }
}

impl Closeable for FileSink {
    fn close(&self) -> Result<(), SinkError> {
        self.stop_flusher();
        let Some(mut writer) = self.shared.lock().writer.take() else {
            return Ok(());
        };
        writer.flush().map_err(|source| SinkError::Flush {
            sink: self.path().display().to_string(),
            source,
        })
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.stop_flusher();
    }
}

impl Toggle for FileSink {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl FlushInterval for FileSink {
    fn set_flush_interval(&self, interval: Duration) {
        self.shared.lock().interval = interval;
        self.shared.wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn zero_interval_flushes_every_line() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::ZERO).expect("sink should open");

        sink.print(&LogMessage::new("info", "first line"));

        let content = fs::read_to_string(&path).expect("log should be readable");
        assert!(content.contains("[info]"), "{content}");
        assert!(content.contains("first line"), "{content}");
    }

    #[test]
    fn long_interval_defers_until_close() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::from_secs(3600)).expect("sink should open");

        sink.print(&LogMessage::new("debug", "buffered"));
        assert_eq!(fs::read_to_string(&path).expect("readable"), "");

        sink.close().expect("close should flush");
        assert!(fs::read_to_string(&path).expect("readable").contains("buffered"));

        sink.print(&LogMessage::new("debug", "after close"));
        assert!(!fs::read_to_string(&path).expect("readable").contains("after close"));
    }

    #[test]
    fn shortening_the_interval_takes_effect() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::from_secs(3600)).expect("sink should open");

        sink.set_flush_interval(Duration::ZERO);
        sink.print(&LogMessage::new("info", "prompt"));
        assert!(fs::read_to_string(&path).expect("readable").contains("prompt"));
    }

    fn wait_for(path: &Path, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if fs::read_to_string(path).is_ok_and(|content| content.contains(needle)) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn quiet_sink_flushes_on_its_own() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::from_millis(50)).expect("sink should open");

        thread::sleep(Duration::from_millis(60));
        sink.print(&LogMessage::new("info", "first"));
        sink.print(&LogMessage::new("error", "last words"));

        assert!(wait_for(&path, "last words"), "last line never reached the file");
        sink.close().expect("close should succeed");
    }

    #[test]
    fn shortened_interval_wakes_the_flusher() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::from_secs(3600)).expect("sink should open");

        sink.print(&LogMessage::new("info", "waiting"));
        assert_eq!(fs::read_to_string(&path).expect("readable"), "");
        sink.set_flush_interval(Duration::from_millis(20));

        assert!(wait_for(&path, "waiting"));
    }

    #[test]
    fn dropping_an_open_sink_flushes_buffered_lines() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("all.log");
        let sink = FileSink::open(&path, Duration::from_secs(3600)).expect("sink should open");

        sink.print(&LogMessage::new("info", "kept"));
        drop(sink);

        assert!(fs::read_to_string(&path).expect("readable").contains("kept"));
    }

    #[test]
    fn open_reports_missing_directory() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing").join("all.log");
        let error = FileSink::open(&path, Duration::ZERO).expect_err("open should fail");
        assert!(matches!(error, SinkError::Open { .. }));
    }
}
