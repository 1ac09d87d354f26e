//! Stream-capture self check, built as a plain test executable.
//!
//! libtest intercepts `print!` inside `#[test]` functions and writes its own
//! progress lines to stdout, both of which would defeat descriptor-level
//! capture. This target runs with `harness = false` and reports through the
//! library itself.
//!
//! Run: cargo test -p wild-unit-testing --test self_check

use std::io::Write;
use std::panic;
use std::process::ExitCode;
use std::thread;

use wild_unit_testing::{
    MemorySink, Recorder, ReportConfig, SourceLocation, StdStream, assert_equals, assert_prints,
    assert_prints_to_stderr, assert_throws, assert_true, capture_stderr, capture_stdout, end_test,
    fail,
};

fn captured_stdout<R>(code: impl FnOnce() -> R) -> String {
    match capture_stdout(code) {
        Ok((_, text)) => text,
        Err(err) => {
            fail!(err.to_string());
            String::new()
        }
    }
}

fn failure_lines_reach_stdout() {
    let quiet = Recorder::new(ReportConfig::quiet());
    let text =
        captured_stdout(|| quiet.assert(false, &SourceLocation::new("filename", 2), "detail"));
    assert_equals!(text, "filename(2): test failed\n");

    let verbose = Recorder::new(ReportConfig::verbose());
    let text = captured_stdout(|| verbose.fail(&SourceLocation::new("filename", 3), "detail"));
    assert_equals!(text, "filename(3): test failed, detail\n");

    assert_equals!(quiet.tally().failed, 1);
    assert_equals!(quiet.tally().total, 1);
    assert_equals!(quiet.passed(), 0);
}

fn results_line_reaches_stdout() {
    let rec = Recorder::new(ReportConfig::quiet());
    let text = captured_stdout(|| {
        for _ in 0..5 {
            rec.pass();
        }
        for line in 0..3 {
            rec.fail(&SourceLocation::new("f", line), "");
        }
    });
    assert_equals!(text.lines().count(), 3);

    let text = captured_stdout(|| rec.results());
    assert_equals!(text, "5 passed, 3 failed, 8 total\n");
}

fn capture_sees_only_its_own_output() {
    print!("before ");
    let text = captured_stdout(|| print!("during"));
    println!("after");
    assert_equals!(text, "during");

    let text = captured_stdout(|| {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(b"raw ");
        let _ = out.write_all(b"bytes");
    });
    assert_equals!(text, "raw bytes");
}

fn stderr_capture() {
    match capture_stderr(|| eprint!("to stderr")) {
        Ok(((), text)) => assert_equals!(text, "to stderr"),
        Err(err) => fail!(err.to_string()),
    }
    assert_prints_to_stderr!(eprintln!("warn"), "warn\n");
}

fn sentinel_after_capture_is_visible() {
    let outer = captured_stdout(|| {
        assert_prints!(print!("inner"), "inner");
        print!("sentinel");
    });
    assert_equals!(outer, "sentinel");
}

fn print_then_panic() {
    print!("lost");
    panic!("capture body panicked");
}

fn capture_restores_stream_when_code_panics() {
    let unwound = panic::catch_unwind(|| {
        let _ = capture_stdout(print_then_panic);
    });
    assert_true!(unwound.is_err());

    let text = captured_stdout(|| print!("after panic"));
    assert_equals!(text, "after panic");
}

fn failing_capture_check_is_recorded() {
    let sink = MemorySink::new();
    let rec = Recorder::with_sink(ReportConfig::verbose(), sink.clone());
    rec.assert_prints(|| print!("actual"), "expected");
    rec.assert_prints(|| print!("same"), "same");
    assert_equals!(rec.failed(), 1);
    assert_equals!(rec.passed(), 1);
    let expected_tail =
        "test failed, captured stdout == expected (left: \"actual\", right: \"expected\")\n";
    assert_true!(sink.contents().ends_with(expected_tail));
}

fn private_recorder_capture_holds_its_guard() {
    let rec = Recorder::new(ReportConfig::quiet());
    match rec.capture(StdStream::Stdout, || {
        rec.pass();
        print!("x");
        7
    }) {
        Ok((value, text)) => {
            assert_equals!(value, 7);
            assert_equals!(text, "x");
        }
        Err(err) => fail!(err.to_string()),
    }
    assert_equals!(rec.passed(), 1);
}

fn captured_stderr<R>(code: impl FnOnce() -> R) -> String {
    match capture_stderr(code) {
        Ok((_, text)) => text,
        Err(err) => {
            fail!(err.to_string());
            String::new()
        }
    }
}

fn print_twice(text: &str) {
    print!("{text}");
    thread::yield_now();
    print!("{text}");
}

fn captures_on_different_recorders_do_not_overlap() {
    const ROUNDS: usize = 200;
    let private = Recorder::with_sink(ReportConfig::verbose(), MemorySink::new());

    let (own_clean, private_clean) = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            (0..ROUNDS)
                .filter(|_| {
                    private
                        .capture(StdStream::Stdout, || print_twice("AA"))
                        .is_ok_and(|((), text)| text == "AAAA")
                })
                .count()
        });
        let own_clean = (0..ROUNDS)
            .filter(|_| captured_stdout(|| print_twice("BB")) == "BBBB")
            .count();
        (own_clean, worker.join().unwrap_or(0))
    });

    assert_equals!(own_clean, ROUNDS);
    assert_equals!(private_clean, ROUNDS);
}

#[derive(Debug)]
struct InvalidArgument;

fn throws_invalid_argument() {
    panic::panic_any(InvalidArgument);
}

fn panics_on_worker_thread() {
    let worker = thread::Builder::new()
        .name("noisy-worker".to_owned())
        .spawn(|| panic!("worker failure"));
    if let Ok(handle) = worker {
        let _ = handle.join();
    }
    throws_invalid_argument();
}

fn expected_throw_writes_nothing_to_stderr() {
    let text = captured_stderr(|| assert_throws!(throws_invalid_argument(), InvalidArgument));
    assert_equals!(text, "");

    // Panics on other threads still reach the hook while the throw check runs.
    let text = captured_stderr(|| assert_throws!(panics_on_worker_thread(), InvalidArgument));
    assert_true!(text.contains("noisy-worker"));
    assert_true!(text.contains("worker failure"));
    assert_true!(!text.contains("thread 'main'"));

    // The previous hook is back once the check is done.
    let text = captured_stderr(|| panic::catch_unwind(throws_invalid_argument));
    assert_true!(text.contains("panicked"));
}

fn main() -> ExitCode {
    failure_lines_reach_stdout();
    results_line_reaches_stdout();
    capture_sees_only_its_own_output();
    stderr_capture();
    sentinel_after_capture_is_visible();
    capture_restores_stream_when_code_panics();
    failing_capture_check_is_recorded();
    private_recorder_capture_holds_its_guard();
    captures_on_different_recorders_do_not_overlap();
    expected_throw_writes_nothing_to_stderr();

    end_test!();
}
