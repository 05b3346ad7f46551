//! Smoke test for `run_race_condition`, isolated in its own test binary:
//! the scenario binds `sched_core`'s process-wide `TaskManager` singleton,
//! so it cannot share a process with any other test that also binds it
//! (see the module doc on `sched_bench::scenarios`).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use sched_bench::scenarios::{run_race_condition, ScenarioConfig};

#[test]
fn race_condition_scenario_never_exceeds_the_guarded_total() {
    let path = std::env::temp_dir().join("sched-bench-race-smoke-unused.csv");
    let cfg = ScenarioConfig {
        workers: 4,
        producers: 4,
        iterations: 2_000,
        output: path.clone(),
        dump_interval: Duration::from_secs(3600),
    };
    let stop: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));

    let total = run_race_condition(&cfg, stop).unwrap();

    assert!(total <= 4 * 2_000);
    assert!(total > 0);
    std::fs::remove_file(&path).ok();
}
