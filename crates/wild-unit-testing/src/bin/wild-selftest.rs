//! CLI entrypoint for the wild-unit-testing self-check program.

use std::process::ExitCode;
use std::thread;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wild_unit_testing::{
    MemorySink, Recorder, ReportConfig, SourceLocation, assert_equals, assert_false,
    assert_prints, assert_prints_to_stderr, assert_throws, assert_true, capture_stdout, fail,
    global_recorder,
};

/// Number of failing checks each stress iteration makes.
const STRESS_CHECKS_PER_ITERATION: u64 = 6;

/// Self-check and stress tooling for wild-unit-testing.
#[derive(Debug, Parser)]
#[command(name = "wild-selftest")]
#[command(about = "Self-check program for the wild-unit-testing recorder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exercise every check kind; exit status is the failure count.
    Run {
        /// Print the summary as JSON instead of the summary line.
        #[arg(long)]
        json: bool,
    },
    /// Make failing checks from several threads at once.
    Stress {
        /// Worker threads.
        #[arg(long, default_value_t = 2)]
        threads: u64,
        /// Iterations per thread.
        #[arg(long, default_value_t = 100)]
        iterations: u64,
    },
}

#[derive(Debug)]
struct InvalidArgument;

#[derive(Debug)]
struct OutOfRange;

fn throws_invalid_argument() {
    std::panic::panic_any(InvalidArgument);
}

fn throws_out_of_range() {
    std::panic::panic_any(OutOfRange);
}

fn returns_normally() {}

fn self_check() {
    assert_equals!(13, 13);
    assert_equals!(true, true);
    assert_equals!(false, false);
    let s = String::from("foo");
    assert_equals!("foo", s);
    assert_true!(!s.is_empty());
    assert_false!(s.is_empty());

    // A private recorder must not touch the global tally.
    let sink = MemorySink::new();
    let test = Recorder::with_sink(ReportConfig::verbose(), sink.clone());
    test.assert(true, &SourceLocation::new("filename", 1), "passed");
    assert_equals!(1, test.passed());
    assert_equals!(0, test.failed());
    assert_equals!(sink.take(), "");

    test.assert(false, &SourceLocation::new("filename", 2), "false == false");
    assert_equals!(sink.take(), "filename(2): test failed, false == false\n");
    assert_equals!(1, test.passed());
    assert_equals!(1, test.failed());
    assert_equals!(2, test.total());

    let thrower = Recorder::with_sink(ReportConfig::quiet(), MemorySink::new());
    thrower.assert_throws::<InvalidArgument, _>(throws_invalid_argument);
    thrower.assert_throws::<InvalidArgument, _>(throws_out_of_range);
    thrower.assert_throws::<InvalidArgument, _>(returns_normally);
    assert_equals!(1, thrower.passed());
    assert_equals!(2, thrower.failed());

    assert_throws!(throws_invalid_argument(), InvalidArgument);
    wild_unit_testing::assert_returns_err::<std::num::ParseIntError, i32>(|| {
        Ok("forty-two".parse::<i32>()?)
    });

    assert_prints!(print!("hello"), "hello");
    assert_prints!(println!("line"), "line\n");
    assert_prints_to_stderr!(eprint!("oops"), "oops");

    // Output written after a capture must reach the real stream again.
    match capture_stdout(|| {
        assert_prints!(print!("inner"), "inner");
        print!("sentinel");
    }) {
        Ok(((), outer)) => assert_equals!(outer, "sentinel"),
        Err(err) => fail!(err.to_string()),
    }
}

fn failing_checks() {
    assert_true!(1 > 2);
    assert_false!(2 > 1);
    assert_equals!(1, 2);
    assert_prints!(print!("out"), "expected out");
    assert_prints_to_stderr!(eprint!("err"), "expected err");
    assert_throws!(returns_normally(), InvalidArgument);
}

/// Failures a stress run must record, or `None` if the count overflows.
fn expected_stress_failures(threads: u64, iterations: u64) -> Option<u64> {
    threads
        .checked_mul(iterations)?
        .checked_mul(STRESS_CHECKS_PER_ITERATION)
}

fn stress(
    threads: u64,
    iterations: u64,
    expected: u64,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let baseline = global_recorder().failed();
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            thread::spawn(move || {
                for _ in 0..iterations {
                    failing_checks();
                }
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| "stress worker panicked".to_string())?;
    }

    let recorder = global_recorder();
    recorder.results();
    let observed = recorder.failed() - baseline;
    if observed == expected {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("expected {expected} failures, recorded {observed}");
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { json } => {
            self_check();
            let recorder = global_recorder();
            let summary = recorder.summary();
            if json {
                println!("{}", summary.to_json());
            } else {
                recorder.results();
            }
            Ok(summary.exit_code())
        }
        Command::Stress {
            threads,
            iterations,
        } => {
            let Some(expected) = expected_stress_failures(threads, iterations) else {
                Cli::command()
                    .error(
                        ErrorKind::ValueValidation,
                        format!("{threads} threads x {iterations} iterations is too many checks"),
                    )
                    .exit();
            };
            stress(threads, iterations, expected)
        }
    }
}
