//! # Reference Store (sled)
//!
//! A self-contained implementation of [`StateStore`] over sled's embedded
//! key-value store. Production deployments sit on a host ledger that
//! provides versioned state natively; this backend exists so the crate is
//! testable and runnable on its own, with the same observable semantics.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                                  | Value                     |
//! |------------|--------------------------------------|---------------------------|
//! | `state`    | composite or tx-id key (UTF-8)       | entity JSON bytes         |
//! | `versions` | `len(key)` (4B BE) ++ key ++ seq (8B BE) | `bincode(VersionRecord)` |
//!
//! The length prefix keeps version keys unambiguous even though state
//! keys contain embedded U+0000 delimiters, and the big-endian sequence
//! suffix makes sled's lexicographic order equal chronological order, so
//! a prefix scan yields a key's history oldest first with no sorting.
//!
//! ## Invocation semantics
//!
//! [`SledStore::invoke`] runs a closure against an [`Invocation`] that
//! buffers every write over a read-through view of committed state. If
//! the closure returns an error, the buffer is dropped and nothing
//! becomes visible. On success the buffered writes are applied to the
//! `state` tree as one atomic `sled::Batch` and appended to the version
//! log stamped with the invocation's transaction id and timestamp. The
//! last write per key within an invocation wins, matching the write-set
//! collapse of the host ledger this backend stands in for.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sled::{Batch, Db, Tree};

use crate::error::{LedgerError, LedgerResult};
use crate::store::{KeyVersion, KvIter, StateStore, VersionIter};

// ---------------------------------------------------------------------------
// Version record encoding
// ---------------------------------------------------------------------------

/// On-disk form of one version log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionRecord {
    tx_id: String,
    value: Option<Vec<u8>>,
    timestamp_millis: i64,
    is_delete: bool,
}

fn version_prefix(key: &str) -> Vec<u8> {
    let key_bytes = key.as_bytes();
    let mut prefix = Vec::with_capacity(4 + key_bytes.len());
    prefix.extend_from_slice(&(key_bytes.len() as u32).to_be_bytes());
    prefix.extend_from_slice(key_bytes);
    prefix
}

fn version_key(prefix: &[u8], seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn decode_version(bytes: &[u8]) -> LedgerResult<KeyVersion> {
    let record: VersionRecord =
        bincode::deserialize(bytes).map_err(|err| LedgerError::Store(err.to_string()))?;
    let timestamp = Utc
        .timestamp_millis_opt(record.timestamp_millis)
        .single()
        .ok_or_else(|| LedgerError::Store("version timestamp out of range".to_string()))?;
    Ok(KeyVersion {
        tx_id: record.tx_id,
        value: record.value,
        timestamp,
        is_delete: record.is_delete,
    })
}

fn key_to_string(bytes: &[u8]) -> LedgerResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| LedgerError::Store("non-utf8 key in state tree".to_string()))
}

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// Versioned key-value store backed by sled.
///
/// sled trees support lock-free concurrent reads and serialized writes,
/// so a `SledStore` can be shared across threads behind `Arc` without
/// extra synchronization. Invocations serialize their commits through
/// sled's batch application.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    state: Tree,
    versions: Tree,
}

impl SledStore {
    /// Opens or creates a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Creates a temporary store that lives in memory and disappears on
    /// drop. Ideal for tests: no filesystem residue, no cleanup.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        let state = db.open_tree("state")?;
        let versions = db.open_tree("versions")?;
        Ok(Self { db, state, versions })
    }

    /// Runs one invocation against the store.
    ///
    /// `tx_id` and `timestamp` are host-assigned: the core never mints
    /// transaction ids. On success every buffered write commits
    /// atomically and is appended to the version log; on error nothing
    /// is written.
    pub fn invoke<T>(
        &self,
        tx_id: &str,
        timestamp: DateTime<Utc>,
        f: impl FnOnce(&mut Invocation<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut invocation = Invocation {
            store: self,
            tx_id: tx_id.to_string(),
            timestamp,
            writes: BTreeMap::new(),
        };
        let output = f(&mut invocation)?;
        self.commit(invocation)?;
        Ok(output)
    }

    fn commit(&self, invocation: Invocation<'_>) -> LedgerResult<()> {
        if invocation.writes.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::default();
        for (key, value) in &invocation.writes {
            match value {
                Some(bytes) => batch.insert(key.as_bytes(), bytes.clone()),
                None => batch.remove(key.as_bytes()),
            }
        }
        self.state.apply_batch(batch)?;

        let timestamp_millis = invocation.timestamp.timestamp_millis();
        for (key, value) in &invocation.writes {
            let prefix = version_prefix(key);
            let seq = self.next_seq(&prefix)?;
            let record = VersionRecord {
                tx_id: invocation.tx_id.clone(),
                value: value.clone(),
                timestamp_millis,
                is_delete: value.is_none(),
            };
            let bytes =
                bincode::serialize(&record).map_err(|err| LedgerError::Store(err.to_string()))?;
            self.versions.insert(version_key(&prefix, seq), bytes)?;
        }

        self.db.flush()?;
        Ok(())
    }

    fn next_seq(&self, prefix: &[u8]) -> LedgerResult<u64> {
        match self.versions.scan_prefix(prefix).next_back() {
            Some(entry) => {
                let (key, _) = entry?;
                let tail: [u8; 8] = key[key.len() - 8..]
                    .try_into()
                    .map_err(|_| LedgerError::Store("malformed version key".to_string()))?;
                Ok(u64::from_be_bytes(tail) + 1)
            }
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One buffered unit of work against a [`SledStore`].
pub struct Invocation<'a> {
    store: &'a SledStore,
    tx_id: String,
    timestamp: DateTime<Utc>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl Invocation<'_> {
    /// Host commit timestamp carried by this invocation.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl StateStore for Invocation<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        Ok(self.store.state.get(key.as_bytes())?.map(|ivec| ivec.to_vec()))
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> LedgerResult<()> {
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> LedgerResult<KvIter<'_>> {
        // Committed view first, then overlay this invocation's buffer so
        // the scan observes its own writes.
        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for entry in self.store.state.scan_prefix(prefix.as_bytes()) {
            let (key, value) = entry?;
            merged.insert(key_to_string(&key)?, value.to_vec());
        }
        for (key, value) in self.writes.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(Box::new(merged.into_iter().map(Ok)))
    }

    fn history(&self, key: &str) -> LedgerResult<VersionIter<'_>> {
        let prefix = version_prefix(key);
        let iter = self
            .store
            .versions
            .scan_prefix(prefix)
            .map(|entry| match entry {
                Ok((_, value)) => decode_version(&value),
                Err(err) => Err(err.into()),
            });
        Ok(Box::new(iter))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn open_temporary_is_empty() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-0", t(0), |inv| {
                assert!(inv.get("anything")?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn open_persistent_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .invoke("tx-1", t(1), |inv| inv.put("k", b"v".to_vec()))
                .unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        store
            .invoke("tx-2", t(2), |inv| {
                assert_eq!(inv.get("k")?, Some(b"v".to_vec()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn failed_invocation_leaves_no_writes() {
        let store = SledStore::open_temporary().unwrap();
        let result: LedgerResult<()> = store.invoke("tx-1", t(1), |inv| {
            inv.put("a", b"1".to_vec())?;
            inv.put("b", b"2".to_vec())?;
            Err(LedgerError::Validation("abort after staging".into()))
        });
        assert!(result.is_err());

        store
            .invoke("tx-2", t(2), |inv| {
                assert!(inv.get("a")?.is_none());
                assert!(inv.get("b")?.is_none());
                assert_eq!(inv.history("a")?.count(), 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn reads_observe_buffered_writes() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(1), |inv| {
                inv.put("k", b"v1".to_vec())?;
                assert_eq!(inv.get("k")?, Some(b"v1".to_vec()));
                inv.delete("k")?;
                assert_eq!(inv.get("k")?, None);
                inv.put("k", b"v2".to_vec())?;
                assert_eq!(inv.get("k")?, Some(b"v2".to_vec()));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn last_write_per_key_wins() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(1), |inv| {
                inv.put("k", b"first".to_vec())?;
                inv.put("k", b"second".to_vec())
            })
            .unwrap();

        store
            .invoke("tx-2", t(2), |inv| {
                assert_eq!(inv.get("k")?, Some(b"second".to_vec()));
                // Collapsed write set produces exactly one version.
                assert_eq!(inv.history("k")?.count(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn history_is_oldest_first_with_deletion_markers() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(100), |inv| inv.put("k", b"v1".to_vec()))
            .unwrap();
        store
            .invoke("tx-2", t(200), |inv| inv.put("k", b"v2".to_vec()))
            .unwrap();
        store.invoke("tx-3", t(300), |inv| inv.delete("k")).unwrap();

        store
            .invoke("tx-4", t(400), |inv| {
                let versions: Vec<KeyVersion> =
                    inv.history("k")?.collect::<LedgerResult<_>>()?;
                assert_eq!(versions.len(), 3);
                assert_eq!(versions[0].tx_id, "tx-1");
                assert_eq!(versions[0].value, Some(b"v1".to_vec()));
                assert_eq!(versions[0].timestamp, t(100));
                assert!(!versions[0].is_delete);
                assert_eq!(versions[1].value, Some(b"v2".to_vec()));
                assert!(versions[2].is_delete);
                assert_eq!(versions[2].value, None);
                assert_eq!(versions[2].tx_id, "tx-3");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn history_does_not_include_staged_writes() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(1), |inv| {
                inv.put("k", b"v".to_vec())?;
                assert_eq!(inv.history("k")?.count(), 0);
                Ok(())
            })
            .unwrap();
        store
            .invoke("tx-2", t(2), |inv| {
                assert_eq!(inv.history("k")?.count(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn version_logs_are_isolated_per_key() {
        // "ab" + seq bytes must never read as history of "a".
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(1), |inv| {
                inv.put("a", b"1".to_vec())?;
                inv.put("ab", b"2".to_vec())
            })
            .unwrap();
        store
            .invoke("tx-2", t(2), |inv| {
                assert_eq!(inv.history("a")?.count(), 1);
                assert_eq!(inv.history("ab")?.count(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn scan_prefix_merges_buffered_writes() {
        let store = SledStore::open_temporary().unwrap();
        store
            .invoke("tx-1", t(1), |inv| {
                inv.put("p/one", b"1".to_vec())?;
                inv.put("p/two", b"2".to_vec())?;
                inv.put("q/other", b"3".to_vec())
            })
            .unwrap();

        store
            .invoke("tx-2", t(2), |inv| {
                inv.delete("p/one")?;
                inv.put("p/three", b"4".to_vec())?;
                let pairs: Vec<(String, Vec<u8>)> =
                    inv.scan_prefix("p/")?.collect::<LedgerResult<_>>()?;
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["p/three", "p/two"]);
                Ok(())
            })
            .unwrap();
    }
}
