//! Store transactions.
//!
//! A transaction buffers its writes and records everything it read. Committing a write
//! transaction takes the store's writer gate, re-checks the recorded reads against the
//! current state and applies the buffered writes as one `sled::Batch`.

use crate::error::StorageError;
use crate::store::keys;
use crate::store::persistence::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::IVec;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    Read,
    Write,
}

type ScanResult = Vec<(IVec, IVec)>;

pub struct Txn<'s> {
    store: &'s Store,
    mode: TxnMode,
    reads: HashMap<Vec<u8>, Option<IVec>>,
    scans: Vec<(Vec<u8>, ScanResult)>,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'s> Txn<'s> {
    pub(crate) fn new(store: &'s Store, mode: TxnMode) -> Self {
        Self {
            store,
            mode,
            reads: HashMap::new(),
            scans: Vec::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    /// Read a raw value, seeing this transaction's own buffered writes.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let value = self.store.tree().get(key)?;
        self.reads
            .entry(key.to_vec())
            .or_insert_with(|| value.clone());
        Ok(value.map(|v| v.to_vec()))
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.ensure_writable()?;
        self.writes.insert(key, Some(value));
        Ok(())
    }

    pub fn delete(&mut self, key: Vec<u8>) -> Result<(), StorageError> {
        self.ensure_writable()?;
        self.writes.insert(key, None);
        Ok(())
    }

    /// All live entries under `prefix`, in key order, with buffered writes applied.
    pub fn scan_prefix(&mut self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let observed = collect_prefix(self.store.tree(), prefix)?;
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = observed
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        self.scans.push((prefix.to_vec(), observed));

        for (key, write) in self.writes.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Delete every live key under `prefix`; returns how many were removed.
    pub fn delete_prefix(&mut self, prefix: &[u8]) -> Result<usize, StorageError> {
        let keys: Vec<Vec<u8>> = self.scan_prefix(prefix)?.into_iter().map(|(k, _)| k).collect();
        let removed = keys.len();
        for key in keys {
            self.delete(key)?;
        }
        Ok(removed)
    }

    pub fn get_record<T: DeserializeOwned>(&mut self, key: &[u8]) -> Result<Option<T>, StorageError> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(keys::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_record<T: Serialize>(&mut self, key: Vec<u8>, value: &T) -> Result<(), StorageError> {
        let bytes = keys::encode(value)?;
        self.put(key, bytes)
    }

    pub fn scan_records<T: DeserializeOwned>(&mut self, prefix: &[u8]) -> Result<Vec<T>, StorageError> {
        self.scan_prefix(prefix)?
            .iter()
            .map(|(_, value)| keys::decode(value))
            .collect()
    }

    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Commit buffered writes atomically. A read transaction commits as a no-op.
    pub fn commit(self) -> Result<(), StorageError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let _gate = self.store.acquire_writer_gate()?;
        self.validate()?;

        let mut batch = sled::Batch::default();
        for (key, write) in &self.writes {
            match write {
                Some(value) => batch.insert(key.as_slice(), value.as_slice()),
                None => batch.remove(key.as_slice()),
            }
        }
        trace!(writes = self.writes.len(), reads = self.reads.len(), "Applying batch");
        self.store.apply(batch)
    }

    /// Drop buffered writes.
    pub fn abort(self) {
        trace!(discarded = self.writes.len(), "Transaction aborted");
    }

    fn validate(&self) -> Result<(), StorageError> {
        let tree = self.store.tree();
        for (key, seen) in &self.reads {
            if tree.get(key)? != *seen {
                return Err(StorageError::WriteConflict);
            }
        }
        for (prefix, seen) in &self.scans {
            if collect_prefix(tree, prefix)? != *seen {
                return Err(StorageError::WriteConflict);
            }
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), StorageError> {
        match self.mode {
            TxnMode::Write => Ok(()),
            TxnMode::Read => Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "write attempted in a read transaction",
            ))),
        }
    }
}

fn collect_prefix(tree: &sled::Tree, prefix: &[u8]) -> Result<ScanResult, StorageError> {
    let mut out = Vec::new();
    for item in tree.scan_prefix(prefix) {
        out.push(item?);
    }
    Ok(out)
}
