//! Periodic CSV dump of an [`AtomicMultipleCounter`] to a file, on its own
//! background thread. Grounded on `counter-dumper.{h,cpp}`, which borrows an
//! external counter rather than owning one (see `DESIGN.md` for why the
//! older, self-contained `atomicCounterLogger` variant is not reimplemented
//! here): a worker sleeps for an interval, appends one row
//! (`elapsed,c0,c1,...,total`), and repeats until stopped, at which point it
//! does one final dump.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::counter::AtomicMultipleCounter;
use crate::error::BenchError;

/// Appends one CSV row per `interval` to `path`, until [`CounterDumper::stop`]
/// is called (which also performs one last dump so the final counts are
/// never lost to a race with shutdown).
pub struct CounterDumper {
    counter: Arc<AtomicMultipleCounter>,
    path: PathBuf,
    interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    start_time: Instant,
    stopped: bool,
}

impl CounterDumper {
    pub fn new(counter: Arc<AtomicMultipleCounter>, path: impl AsRef<Path>, interval: Duration) -> Self {
        Self {
            counter,
            path: path.as_ref().to_path_buf(),
            interval,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            start_time: Instant::now(),
            stopped: false,
        }
    }

    /// Spawns the background dump thread. A no-op if already started.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        self.start_time = Instant::now();

        let counter = self.counter.clone();
        let path = self.path.clone();
        let interval = self.interval;
        let running = self.running.clone();
        let start_time = self.start_time;

        self.worker = Some(
            thread::Builder::new()
                .name("CounterDumper".to_string())
                .spawn(move || {
                    while running.load(Ordering::Acquire) {
                        thread::sleep(interval);
                        if let Err(err) = dump_row(&counter, &path, start_time) {
                            tracing::error!(%err, path = %path.display(), "failed to append counter dump row");
                        }
                    }
                })
                .expect("failed to spawn CounterDumper thread"),
        );
    }

    /// Stops the background thread and performs one last dump. A no-op
    /// (including the final dump) if already stopped, so calling this
    /// explicitly and then letting the dumper drop does not append a
    /// duplicate trailing row.
    pub fn stop(&mut self) -> Result<(), BenchError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        dump_row(&self.counter, &self.path, self.start_time)
    }
}

impl Drop for CounterDumper {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(%err, "failed to flush counter dump on drop");
        }
    }
}

fn dump_row(counter: &AtomicMultipleCounter, path: &Path, start_time: Instant) -> Result<(), BenchError> {
    let elapsed = start_time.elapsed();
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;

    let mut row = format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}");
    for i in 0..counter.size() {
        row.push(',');
        row.push_str(&counter.get(i).to_string());
    }
    row.push(',');
    row.push_str(&counter.get_total().to_string());
    row.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| BenchError::CsvOpen { path: path.to_path_buf(), source })?;
    file.write_all(row.as_bytes())
        .map_err(|source| BenchError::CsvWrite { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stop_flushes_a_final_row() {
        let dir = std::env::temp_dir().join(format!("sched-bench-test-{:?}", thread::current().id()));
        let counter = Arc::new(AtomicMultipleCounter::new(1));
        counter.increment(0);

        let mut dumper = CounterDumper::new(counter, &dir, Duration::from_secs(3600));
        dumper.start();
        dumper.stop().unwrap();

        let contents = std::fs::read_to_string(&dir).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.trim_end().ends_with(",1,1"));
        std::fs::remove_file(&dir).ok();
    }
}
