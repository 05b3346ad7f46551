//! CLI driver for the three benchmark scenarios. Everything in this binary
//! is "out of scope plumbing" relative to `sched-core` (spec.md §1): option
//! parsing, counters, CSV dumping, and signal-driven shutdown. The core
//! scheduling fabric knows nothing about any of it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use sched_bench::error::BenchError;
use sched_bench::scenarios::{self, ScenarioConfig};
use sched_bench::SharedStop;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compares a suspension-based mutex against a blocking one", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Producers contend for sched_core::AsyncMutex.
    CoroMutex(CommonArgs),
    /// Producers contend for a blocking std::sync::Mutex (baseline).
    StdMutex(CommonArgs),
    /// Producers increment a shared counter with no synchronization at all.
    RaceCondition(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Number of worker threads in the pool.
    #[arg(long, default_value_t = 10)]
    workers: usize,
    /// Number of concurrently running producers.
    #[arg(long, default_value_t = 10)]
    producers: usize,
    /// Critical-section increments performed by each producer.
    #[arg(long, default_value_t = 100_000)]
    iterations: usize,
    /// CSV file the periodic counter dump is appended to.
    #[arg(long, default_value = "counters.csv")]
    output: PathBuf,
    /// Interval between periodic counter dumps, in milliseconds.
    #[arg(long, default_value_t = 500)]
    dump_interval_ms: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let stop: SharedStop = Arc::new(AtomicBool::new(false));

    if let Err(err) = register_sigint(stop.clone()) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::CoroMutex(args) => run("coro-mutex", args, stop, scenarios::run_coro_mutex),
        Command::StdMutex(args) => run("std-mutex", args, stop, scenarios::run_std_mutex),
        Command::RaceCondition(args) => {
            run("race-condition", args, stop, scenarios::run_race_condition)
        }
    };

    match result {
        Ok(total) => {
            println!("final counter: {total}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    name: &str,
    args: CommonArgs,
    stop: SharedStop,
    scenario: impl FnOnce(&ScenarioConfig, SharedStop) -> Result<i64, BenchError>,
) -> Result<i64, BenchError> {
    tracing::info!(
        scenario = name,
        workers = args.workers,
        producers = args.producers,
        iterations = args.iterations,
        "starting scenario"
    );
    let cfg = ScenarioConfig {
        workers: args.workers,
        producers: args.producers,
        iterations: args.iterations,
        output: args.output,
        dump_interval: Duration::from_millis(args.dump_interval_ms),
    };
    scenario(&cfg, stop)
}

/// Registers SIGINT to set `stop` instead of terminating the process
/// outright, so an in-flight scenario gets a chance to stop its pool and
/// flush its final counter dump. Replaces the "a way to be signalled to
/// stop" external collaborator named in spec.md §1.
fn register_sigint(stop: SharedStop) -> Result<(), BenchError> {
    // SIGINT clearing an `AtomicBool` is exactly the use case
    // `signal_hook::flag::register` exists for; it is async-signal-safe and
    // needs no handler body of our own.
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop)
        .map(|_id| ())
        .map_err(BenchError::SignalRegistration)
}
