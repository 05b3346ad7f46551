//! Smoke test for `run_coro_mutex`, isolated in its own test binary: the
//! scenario binds `sched_core`'s process-wide `TaskManager` singleton, so it
//! cannot share a process with any other test that also binds it (see the
//! module doc on `sched_bench::scenarios`).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use sched_bench::scenarios::{run_coro_mutex, ScenarioConfig};

#[test]
fn coro_mutex_scenario_yields_exact_total() {
    let path = std::env::temp_dir().join("sched-bench-coro-mutex-smoke.csv");
    let cfg = ScenarioConfig {
        workers: 4,
        producers: 4,
        iterations: 2_000,
        output: path.clone(),
        dump_interval: Duration::from_secs(3600),
    };
    let stop: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));

    let total = run_coro_mutex(&cfg, stop).unwrap();

    assert_eq!(total, 4 * 2_000);
    std::fs::remove_file(&path).ok();
}
