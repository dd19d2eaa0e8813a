//! Sled-backed store with a single writer gate and lock-free readers.

use crate::error::StorageError;
use crate::store::txn::{Txn, TxnMode};
use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const TREE_NAME: &str = "niwa";
const LOCK_FILE: &str = "niwa.lock";
const READ_ATTEMPTS: usize = 64;
/// Prefix of the I/O error sled returns when its own database lock is held.
const SLED_LOCK_HELD: &str = "could not acquire lock";

/// How a committing writer waits for the writer gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block up to the given duration, then fail with `Busy`.
    Wait(Duration),
    /// Fail with `Busy` immediately if another commit is in progress.
    FailFast,
}

impl WaitPolicy {
    fn patience(&self) -> Duration {
        match self {
            WaitPolicy::Wait(timeout) => *timeout,
            WaitPolicy::FailFast => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub write_retries: u32,
    pub retry_backoff: Duration,
    pub wait_policy: WaitPolicy,
    pub flush_on_commit: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            write_retries: 3,
            retry_backoff: Duration::from_millis(10),
            wait_policy: WaitPolicy::Wait(Duration::from_millis(5000)),
            flush_on_commit: true,
        }
    }
}

pub struct Store {
    path: PathBuf,
    db: sled::Db,
    tree: sled::Tree,
    gate: Mutex<()>,
    /// Odd while a batch is being applied.
    commit_seq: AtomicU64,
    options: StoreOptions,
    /// Held for the store's lifetime; declared last so it is released after `db`.
    _lock: File,
}

impl Store {
    /// Open (or create) the store at `path`.
    ///
    /// One store per database across processes: an exclusive lock on `niwa.lock` in the
    /// database directory is taken first. While another process holds it (or sled's own
    /// lock is still being released), opening is retried until the wait policy's timeout
    /// and then fails with `Busy`.
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self, StorageError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let deadline = Instant::now() + options.wait_policy.patience();

        let lock = lock_database(path, &options, deadline)?;
        let mut attempt: u32 = 0;
        let db = loop {
            match sled::Config::new().path(path).open() {
                Ok(db) => break db,
                Err(sled::Error::Io(e)) if e.to_string().starts_with(SLED_LOCK_HELD) => {
                    attempt += 1;
                    wait_for_lock(path, &options, deadline, attempt)?;
                }
                Err(e) => return Err(e.into()),
            }
        };
        let tree = db.open_tree(TREE_NAME)?;
        debug!(path = %path.display(), "Opened store");

        Ok(Self {
            path: path.to_path_buf(),
            db,
            tree,
            gate: Mutex::new(()),
            commit_seq: AtomicU64::new(0),
            options,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn begin_read(&self) -> Txn<'_> {
        Txn::new(self, TxnMode::Read)
    }

    pub fn begin_write(&self) -> Txn<'_> {
        Txn::new(self, TxnMode::Write)
    }

    /// Run `f` in a write transaction and commit it.
    ///
    /// `WriteConflict` re-runs `f` from scratch up to `write_retries` times with linear
    /// backoff. Any error returned by `f` aborts the transaction.
    pub fn write<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut Txn<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut attempt: u32 = 0;
        loop {
            let mut txn = self.begin_write();
            let value = match f(&mut txn) {
                Ok(value) => value,
                Err(e) => {
                    txn.abort();
                    return Err(e);
                }
            };
            match txn.commit() {
                Ok(()) => return Ok(value),
                Err(StorageError::WriteConflict) if attempt < self.options.write_retries => {
                    attempt += 1;
                    warn!(attempt, max = self.options.write_retries, "Write conflict, retrying");
                    std::thread::sleep(self.options.retry_backoff * attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run `f` against a consistent view of the store.
    ///
    /// Readers never take the writer gate. A run that overlapped a commit is discarded
    /// and repeated; after `READ_ATTEMPTS` races the read takes the gate instead.
    pub fn read<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut Txn<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        for _ in 0..READ_ATTEMPTS {
            let before = self.commit_seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::thread::yield_now();
                continue;
            }
            let mut txn = self.begin_read();
            let result = f(&mut txn);
            if self.commit_seq.load(Ordering::Acquire) == before {
                return result;
            }
            trace!("Read overlapped a commit, re-running");
        }

        let _gate = self.gate.lock();
        let mut txn = self.begin_read();
        f(&mut txn)
    }

    pub fn size_on_disk(&self) -> Result<u64, StorageError> {
        Ok(self.db.size_on_disk()?)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn tree(&self) -> &sled::Tree {
        &self.tree
    }

    pub(crate) fn acquire_writer_gate(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        match self.options.wait_policy {
            WaitPolicy::FailFast => self
                .gate
                .try_lock()
                .ok_or_else(|| StorageError::Busy("another commit is in progress".to_string())),
            WaitPolicy::Wait(timeout) => self.gate.try_lock_for(timeout).ok_or_else(|| {
                StorageError::Busy(format!(
                    "writer gate not acquired within {}ms",
                    timeout.as_millis()
                ))
            }),
        }
    }

    /// Apply a batch while holding the writer gate.
    pub(crate) fn apply(&self, batch: sled::Batch) -> Result<(), StorageError> {
        self.commit_seq.fetch_add(1, Ordering::AcqRel);
        let applied = self.tree.apply_batch(batch);
        self.commit_seq.fetch_add(1, Ordering::AcqRel);
        applied?;

        if self.options.flush_on_commit {
            self.tree.flush()?;
        }
        Ok(())
    }
}

fn lock_database(path: &Path, options: &StoreOptions, deadline: Instant) -> Result<File, StorageError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path.join(LOCK_FILE))?;

    let mut attempt: u32 = 0;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                attempt += 1;
                wait_for_lock(path, options, deadline, attempt)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Sleep one backoff step, or fail with `Busy` once `deadline` has passed.
fn wait_for_lock(
    path: &Path,
    options: &StoreOptions,
    deadline: Instant,
    attempt: u32,
) -> Result<(), StorageError> {
    let now = Instant::now();
    if now >= deadline {
        return Err(StorageError::Busy(format!(
            "database at {} is locked by another process",
            path.display()
        )));
    }
    warn!(path = %path.display(), attempt, "Database locked, retrying open");
    std::thread::sleep(options.retry_backoff.min(deadline - now));
    Ok(())
}
