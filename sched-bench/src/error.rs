//! Fallible setup paths for the benchmark binary. `sched-core` stays
//! infallible at its public API (spec.md §7); only the plumbing around it —
//! file I/O for the CSV dumper and signal registration — can fail.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("failed to open counter dump file {path}")]
    CsvOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write counter dump row to {path}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to register SIGINT handler")]
    SignalRegistration(#[source] std::io::Error),
}
