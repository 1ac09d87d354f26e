//! Process-wide outcome recorder.
//!
//! Counters and the diagnostic write share one re-entrant guard, so each
//! `pass`/`fail` is a single indivisible step for every other thread. The
//! guard is re-entrant because capture assertions hold it for their whole
//! run and the captured code may itself record outcomes.
//!
//! Standard streams and the panic hook belong to the process, not to one
//! recorder. A private recorder's guard therefore also takes the global
//! recorder's guard first, always in that order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::config::{ReportConfig, report_config};
use crate::location::SourceLocation;
use crate::report::Summary;

/// Running pass/fail counts. `total == passed + failed` always holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
}

impl Tally {
    fn record_pass(self) -> Self {
        Self {
            passed: self.passed + 1,
            total: self.total + 1,
            ..self
        }
    }

    fn record_fail(self) -> Self {
        Self {
            failed: self.failed + 1,
            total: self.total + 1,
            ..self
        }
    }
}

struct RecorderState {
    tally: Cell<Tally>,
    sink: RefCell<Box<dyn Write + Send>>,
}

/// Holds the running tally and writes failure and summary lines.
pub struct Recorder {
    state: ReentrantMutex<RecorderState>,
    config: ReportConfig,
}

/// Held re-entrant guard of a [`Recorder`].
///
/// While alive, no other thread can record outcomes through this recorder
/// or the global one, and no other thread can redirect a standard stream.
pub struct RecorderGuard<'a> {
    state: ReentrantMutexGuard<'a, RecorderState>,
    // Released after `state`.
    _process: Option<ReentrantMutexGuard<'static, RecorderState>>,
}

impl Recorder {
    /// Recorder writing to the process's standard output.
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self::with_sink(config, io::stdout())
    }

    /// Recorder writing its lines to `sink`.
    #[must_use]
    pub fn with_sink(config: ReportConfig, sink: impl Write + Send + 'static) -> Self {
        Self {
            state: ReentrantMutex::new(RecorderState {
                tally: Cell::new(Tally::default()),
                sink: RefCell::new(Box::new(sink)),
            }),
            config,
        }
    }

    /// Active reporting flags.
    #[must_use]
    pub const fn config(&self) -> ReportConfig {
        self.config
    }

    /// Acquire the recorder's guard. Re-entrant on the same thread.
    ///
    /// For a private recorder this takes the global recorder's guard first.
    #[must_use]
    pub fn lock(&self) -> RecorderGuard<'_> {
        let process = global_recorder();
        let process_guard = (!std::ptr::eq(self, process)).then(|| process.state.lock());
        RecorderGuard {
            state: self.state.lock(),
            _process: process_guard,
        }
    }

    /// Record a passing check.
    pub fn pass(&self) {
        let guard = self.lock();
        guard.state.tally.set(guard.state.tally.get().record_pass());
    }

    /// Record a failing check and write its diagnostic line.
    pub fn fail(&self, location: &SourceLocation, detail: &str) {
        let guard = self.lock();
        let state = &*guard.state;
        state.tally.set(state.tally.get().record_fail());

        let line = if self.config.show_failure_details {
            format!("{location}: test failed, {detail}")
        } else {
            format!("{location}: test failed")
        };
        write_line(state, &line);

        if self.config.break_on_fail {
            std::process::abort();
        }
    }

    /// Pass if `condition` holds, otherwise fail with `detail`.
    pub fn assert(&self, condition: bool, location: &SourceLocation, detail: &str) {
        if condition {
            self.pass();
        } else {
            self.fail(location, detail);
        }
    }

    /// Write the summary line. Counters are left untouched.
    pub fn results(&self) {
        let guard = self.lock();
        let state = &*guard.state;
        let summary = Summary::from(state.tally.get());
        write_line(state, &summary.to_string());
    }

    /// Write the summary line and return the failure count as a process
    /// exit status (clamped to 255 so a non-zero count never wraps to 0).
    pub fn end_test(&self) -> i32 {
        let guard = self.lock();
        let state = &*guard.state;
        let summary = Summary::from(state.tally.get());
        write_line(state, &summary.to_string());
        i32::from(summary.exit_status())
    }

    /// Consistent snapshot of all three counters.
    #[must_use]
    pub fn tally(&self) -> Tally {
        self.lock().state.tally.get()
    }

    /// Snapshot as a [`Summary`].
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.tally().into()
    }

    #[must_use]
    pub fn passed(&self) -> u64 {
        self.tally().passed
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.tally().failed
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.tally().total
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(report_config())
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("tally", &self.tally())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn write_line(state: &RecorderState, line: &str) {
    let mut sink = state.sink.borrow_mut();
    let written = writeln!(sink, "{line}").and_then(|()| sink.flush());
    if let Err(err) = written {
        tracing::warn!(error = %err, "recorder sink rejected a line");
    }
}

static GLOBAL_RECORDER: OnceLock<Recorder> = OnceLock::new();

/// The recorder shared by every call site in the process.
#[must_use]
pub fn global_recorder() -> &'static Recorder {
    GLOBAL_RECORDER.get_or_init(Recorder::default)
}

/// Cloneable in-memory sink for recorders built in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    /// Drain and return everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.buf.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn recorder(config: ReportConfig) -> (Recorder, MemorySink) {
        let sink = MemorySink::new();
        (Recorder::with_sink(config, sink.clone()), sink)
    }

    #[test]
    fn pass_counts_without_output() {
        let (rec, sink) = recorder(ReportConfig::quiet());
        rec.pass();
        rec.pass();
        assert_eq!(
            rec.tally(),
            Tally {
                passed: 2,
                failed: 0,
                total: 2
            }
        );
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn quiet_failure_line_omits_detail() {
        let (rec, sink) = recorder(ReportConfig::quiet());
        rec.assert(false, &SourceLocation::new("filename", 2), "detail");
        assert_eq!(sink.contents(), "filename(2): test failed\n");
        assert_eq!(rec.failed(), 1);
        assert_eq!(rec.passed(), 0);
        assert_eq!(rec.total(), 1);
    }

    #[test]
    fn verbose_failure_line_carries_detail() {
        let (rec, sink) = recorder(ReportConfig::verbose());
        rec.assert(false, &SourceLocation::new("filename", 2), "detail");
        assert_eq!(sink.contents(), "filename(2): test failed, detail\n");
    }

    #[test]
    fn assert_true_passes_silently() {
        let (rec, sink) = recorder(ReportConfig::verbose());
        rec.assert(true, &SourceLocation::new("filename", 1), "passed");
        assert_eq!(rec.passed(), 1);
        assert_eq!(rec.failed(), 0);
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn results_line_matches_contract() {
        let (rec, sink) = recorder(ReportConfig::quiet());
        for _ in 0..5 {
            rec.pass();
        }
        for _ in 0..3 {
            rec.fail(&SourceLocation::new("f", 1), "");
        }
        sink.take();
        rec.results();
        assert_eq!(sink.contents(), "5 passed, 3 failed, 8 total\n");
        assert_eq!(rec.total(), 8);
    }

    #[test]
    fn end_test_reports_failures_as_status() {
        let (rec, sink) = recorder(ReportConfig::quiet());
        rec.pass();
        rec.fail(&SourceLocation::new("f", 9), "");
        sink.take();
        assert_eq!(rec.end_test(), 1);
        assert_eq!(sink.contents(), "1 passed, 1 failed, 2 total\n");
    }

    #[test]
    fn guard_is_reentrant() {
        let (rec, _sink) = recorder(ReportConfig::quiet());
        let _outer = rec.lock();
        rec.pass();
        rec.fail(&SourceLocation::new("f", 1), "");
        assert_eq!(rec.total(), 2);
    }

    #[test]
    fn concurrent_calls_lose_nothing() {
        let (rec, sink) = recorder(ReportConfig::quiet());
        let rec = Arc::new(rec);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let rec = Arc::clone(&rec);
                thread::spawn(move || {
                    for _ in 0..250 {
                        rec.pass();
                        rec.fail(&SourceLocation::new("thread.rs", i), "");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let tally = rec.tally();
        assert_eq!(tally.passed, 1000);
        assert_eq!(tally.failed, 1000);
        assert_eq!(tally.total, 2000);

        let output = sink.contents();
        assert_eq!(output.lines().count(), 1000);
        for line in output.lines() {
            assert!(line.starts_with("thread.rs("), "torn line: {line:?}");
            assert!(line.ends_with("): test failed"), "torn line: {line:?}");
        }
    }

    #[test]
    fn private_guard_excludes_global_recorder() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let (rec, _sink) = recorder(ReportConfig::quiet());
        let acquired = AtomicBool::new(false);
        thread::scope(|scope| {
            let guard = rec.lock();
            let waiter = scope.spawn(|| {
                let _global = global_recorder().lock();
                acquired.store(true, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));
            drop(guard);
            waiter.join().expect("waiter thread");
        });
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn global_recorder_is_a_singleton() {
        assert!(std::ptr::eq(global_recorder(), global_recorder()));
    }
}
