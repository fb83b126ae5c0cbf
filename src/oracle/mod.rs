pub mod http;
pub mod types;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use thiserror::Error;

pub use types::{parse_reply, AskRequest, OracleDiag, OracleJob, RawPrediction, VisionRequest};

#[derive(Debug, Error)]
pub enum OracleError {
    /// Credentials rejected. Fatal: never retried, aborts the run.
    #[error("oracle authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    /// Retries exhausted on timeouts or server errors. The affected
    /// pages degrade to UNKNOWN; the run continues.
    #[error("oracle request failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
}

impl OracleError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, OracleError::Auth { .. })
    }
}

/// Seam to the external inference service. Implementations must be safe
/// to call from multiple worker threads at once.
pub trait Oracle: Sync {
    /// Classify a text batch; returns the parsed per-page predictions.
    /// Pages the oracle skipped are simply absent from the result.
    fn ask(&self, req: &AskRequest) -> Result<Vec<RawPrediction>, OracleError>;

    /// Classify a single page from its rendered image.
    fn vision(&self, req: &VisionRequest) -> Result<Vec<RawPrediction>, OracleError>;

    fn health(&self) -> Result<OracleDiag, OracleError>;

    /// Total requests issued so far, for cost accounting.
    fn calls_made(&self) -> u64;
}

/// Fan a set of independent oracle jobs across worker threads, bounded by
/// `max_parallel`. Results come back in job order; merging them into the
/// label sequence stays with the single calling thread.
pub fn dispatch<O: Oracle + ?Sized>(
    oracle: &O,
    jobs: &[OracleJob],
    max_parallel: usize,
) -> Vec<Result<Vec<RawPrediction>, OracleError>> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let workers = max_parallel.max(1).min(jobs.len());
    if workers == 1 {
        return jobs.iter().map(|job| run_job(oracle, job)).collect();
    }

    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || loop {
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                if idx >= jobs.len() {
                    break;
                }
                let result = run_job(oracle, &jobs[idx]);
                if tx.send((idx, result)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<Result<Vec<RawPrediction>, OracleError>>> =
            (0..jobs.len()).map(|_| None).collect();
        for (idx, result) in rx {
            slots[idx] = Some(result);
        }
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(OracleError::Exhausted {
                        attempts: 0,
                        message: "worker dropped job".into(),
                    })
                })
            })
            .collect()
    })
}

fn run_job<O: Oracle + ?Sized>(
    oracle: &O,
    job: &OracleJob,
) -> Result<Vec<RawPrediction>, OracleError> {
    match job {
        OracleJob::Ask(req) => oracle.ask(req),
        OracleJob::Vision(req) => oracle.vision(req),
    }
}
