//! Parallel filesystem tree scan
//!
//! Walks a tracked root, hashes every file across a fixed-size pool of
//! worker threads, and merges the per-worker results after a join barrier so
//! classification always sees one consistent snapshot. Failures on
//! individual paths accumulate into the outcome instead of aborting the
//! batch; a soft timeout keeps already-hashed records and marks the outcome
//! partial.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, hash_file};
use crate::path::RelPath;
use crate::{Error, Result};

/// One file observed on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: RelPath,
    pub hash: ContentHash,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Scan tuning knobs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Number of hashing workers. Clamped to at least one.
    pub workers: usize,
    /// Soft deadline for the whole scan. When exceeded, workers stop at the
    /// next file boundary and the outcome is marked partial.
    pub soft_timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            soft_timeout: None,
        }
    }
}

/// Whether an operation ran to completion or hit its soft deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Complete,
    Partial,
}

/// A per-path failure that did not abort the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of scanning one tracked root.
#[derive(Debug)]
pub struct ScanOutcome {
    pub records: BTreeMap<RelPath, FileRecord>,
    pub failures: Vec<ScanFailure>,
    pub completion: Completion,
}

impl ScanOutcome {
    /// Whether every discovered file was hashed without failure.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.completion == Completion::Complete
    }
}

/// Scan every file under `root`.
///
/// # Errors
///
/// Returns `Error::NotADirectory` if `root` is not a directory. Unreadable
/// files and directories below the root accumulate as failures in the
/// outcome rather than erroring out.
pub fn scan_tree(root: &Path, options: &ScanOptions) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(Error::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let started = Instant::now();
    let deadline = options.soft_timeout.map(|t| started + t);

    let mut files = Vec::new();
    let mut failures = Vec::new();
    collect_files(root, root, &mut files, &mut failures);
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let workers = options.workers.max(1);
    let cancelled = AtomicBool::new(false);
    let chunk_size = files.len().div_ceil(workers).max(1);

    let mut records = BTreeMap::new();
    if !files.is_empty() {
        let worker_outputs = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for slice in files.chunks(chunk_size) {
                let cancelled = &cancelled;
                handles.push(scope.spawn(move || hash_slice(slice, cancelled, deadline)));
            }
            handles
                .into_iter()
                .map(|h| h.join().expect("scan worker panicked"))
                .collect::<Vec<_>>()
        });

        for (worker_records, worker_failures) in worker_outputs {
            for record in worker_records {
                records.insert(record.path.clone(), record);
            }
            failures.extend(worker_failures);
        }
    }

    let partial = cancelled.load(Ordering::Relaxed);
    let completion = if partial {
        Completion::Partial
    } else {
        Completion::Complete
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(
        root = %root.display(),
        files = records.len(),
        failures = failures.len(),
        elapsed_ms,
        partial,
        "scan finished"
    );

    Ok(ScanOutcome {
        records,
        failures,
        completion,
    })
}

/// One worker's share of the hashing work.
///
/// The slice is owned exclusively by this worker; the only shared state is
/// the cancellation flag, checked at file boundaries so no half-hashed state
/// is ever published.
fn hash_slice(
    slice: &[(RelPath, PathBuf)],
    cancelled: &AtomicBool,
    deadline: Option<Instant>,
) -> (Vec<FileRecord>, Vec<ScanFailure>) {
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for (rel, native) in slice {
        if cancelled.load(Ordering::Relaxed) {
            break;
        }
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            cancelled.store(true, Ordering::Relaxed);
            break;
        }

        match hash_one(native) {
            Ok((hash, size, modified)) => records.push(FileRecord {
                path: rel.clone(),
                hash,
                size,
                modified,
            }),
            Err(err) => {
                tracing::warn!(path = %native.display(), error = %err, "failed to hash file");
                failures.push(ScanFailure {
                    path: native.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    (records, failures)
}

fn hash_one(path: &Path) -> Result<(ContentHash, u64, DateTime<Utc>)> {
    let meta = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let modified: DateTime<Utc> = meta.modified().map_err(|e| Error::io(path, e))?.into();
    let hash = hash_file(path)?;
    Ok((hash, meta.len(), modified))
}

/// Depth-first walk collecting (relative, native) file path pairs.
fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut Vec<(RelPath, PathBuf)>,
    failures: &mut Vec<ScanFailure>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            failures.push(ScanFailure {
                path: dir.to_path_buf(),
                message: err.to_string(),
            });
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                failures.push(ScanFailure {
                    path: dir.to_path_buf(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                failures.push(ScanFailure {
                    path: path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        if file_type.is_dir() {
            collect_files(root, &path, files, failures);
        } else if file_type.is_file() {
            match RelPath::from_root_relative(root, &path) {
                Ok(rel) => files.push((rel, path)),
                Err(err) => failures.push(ScanFailure {
                    path: path.clone(),
                    message: err.to_string(),
                }),
            }
        }
        // Symlinks are skipped: a tracked mod tree owns its files directly
        // and a link out of the root must not be followed into foreign state.
    }
}
