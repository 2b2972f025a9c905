//! File-backed record store.
//!
//! Stands in for the hosted realtime and document databases so the feed and the
//! mirror can run against local data. A collection path maps to a directory
//! holding one JSON object per record:
//!
//! ```text
//! <root>/pens/LTT_6001/StudyData/1700000000000.json     (realtime, device-written)
//! <root>/Users/LTT_6001/StudyData/1700000000000.json    (documents, dashboard-read)
//! ```
//!
//! ## Design Principles
//!
//! - **Atomic writes**: temp file + rename, so readers never see half a record
//! - **Graceful degradation**: missing directories read as "no data"; unreadable
//!   records are skipped with a warning
//! - **Full snapshots**: subscribers always receive the whole collection

use crate::error::{PenError, Result};
use crate::feed::{DataSource, SnapshotHandler, SnapshotResult, Subscription};
use crate::identity::is_valid_segment;
use fs_err as fs;
use pen_protocol::{RawActivityRecord, Snapshot, MAX_RECORD_BYTES};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "json";

/// Names, sizes and mtimes of a collection's record files, sorted by name.
type Fingerprint = Vec<(String, u64, Option<SystemTime>)>;

#[derive(Debug, Clone, PartialEq)]
enum Observed {
    Unseen,
    Seen(Option<Fingerprint>),
    Failed,
}

struct Subscriber {
    path: String,
    handler: SnapshotHandler,
    active: Rc<Cell<bool>>,
    observed: Observed,
}

struct FileSubscription {
    active: Rc<Cell<bool>>,
}

impl Subscription for FileSubscription {
    fn cancel(&mut self) {
        self.active.set(false);
    }
}

/// A [`DataSource`] over a directory tree.
///
/// Subscriptions are driven by [`FileStore::poll`]: the caller's event loop
/// decides how often the store is re-checked.
pub struct FileStore {
    root: PathBuf,
    subscribers: RefCell<Vec<Subscriber>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a collection path such as `pens/LTT_6001/StudyData`.
    pub fn collection_dir(&self, path: &str) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !is_valid_segment(segment) {
                return Err(PenError::Transport(format!(
                    "invalid collection path: {}",
                    path
                )));
            }
            dir.push(segment);
        }
        Ok(dir)
    }

    fn record_file(&self, path: &str, id: &str) -> Result<PathBuf> {
        if !is_valid_segment(id) {
            return Err(PenError::Transport(format!("invalid record id: {}", id)));
        }
        Ok(self
            .collection_dir(path)?
            .join(format!("{}.{}", id, RECORD_EXTENSION)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Reads every record in a collection. An absent or empty collection is `None`.
    pub fn read_snapshot(&self, path: &str) -> SnapshotResult {
        let dir = self.collection_dir(path)?;
        let Some(files) = list_record_files(&dir)? else {
            return Ok(None);
        };

        let mut snapshot = Snapshot::new();
        for (id, file) in files {
            match read_record_file(&file) {
                Ok(Some(record)) => {
                    snapshot.insert(id, record);
                }
                Ok(None) => {
                    warn!(path = %file.display(), "Skipping record that is not a JSON object");
                }
                Err(err) => {
                    warn!(path = %file.display(), error = %err, "Skipping unreadable record");
                }
            }
        }

        Ok((!snapshot.is_empty()).then_some(snapshot))
    }

    /// Reads one record. `None` when it does not exist or holds JSON `null`.
    pub fn read_record(&self, path: &str, id: &str) -> Result<Option<RawActivityRecord>> {
        let file = self.record_file(path, id)?;
        if !file.exists() {
            return Ok(None);
        }
        read_record_file(&file)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Writes one record atomically, creating the collection if needed.
    pub fn write_record(&self, path: &str, id: &str, record: &RawActivityRecord) -> Result<()> {
        let file = self.record_file(path, id)?;
        let dir = self.collection_dir(path)?;
        fs::create_dir_all(&dir).map_err(|e| PenError::io("Failed to create collection", e))?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| PenError::json("Failed to serialize record", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| PenError::io("Failed to create temp file", e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| PenError::io("Failed to write temp file", e))?;
        tmp.flush()
            .map_err(|e| PenError::io("Failed to flush temp file", e))?;
        tmp.persist(&file)
            .map_err(|e| PenError::io("Failed to persist record", e.error))?;

        debug!(path = %file.display(), "Record written");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Re-checks every subscribed collection and re-delivers those that changed.
    ///
    /// Returns how many deliveries were made. A failure is delivered once and
    /// then suppressed until the collection becomes readable again.
    pub fn poll(&self) -> usize {
        // Handlers may call back into the store; release the borrow first.
        let mut subscribers = std::mem::take(&mut *self.subscribers.borrow_mut());
        subscribers.retain(|s| s.active.get());

        let mut delivered = 0;
        for subscriber in subscribers.iter_mut() {
            if self.refresh_subscriber(subscriber) {
                delivered += 1;
            }
        }

        let mut current = self.subscribers.borrow_mut();
        subscribers.append(&mut *current);
        *current = subscribers;
        delivered
    }

    fn refresh_subscriber(&self, subscriber: &mut Subscriber) -> bool {
        let observed = match self.fingerprint(&subscriber.path) {
            Ok(fingerprint) => Observed::Seen(fingerprint),
            Err(err) => {
                if subscriber.observed == Observed::Failed {
                    return false;
                }
                subscriber.observed = Observed::Failed;
                (subscriber.handler)(Err(err));
                return true;
            }
        };
        if observed == subscriber.observed {
            return false;
        }

        match self.read_snapshot(&subscriber.path) {
            Ok(snapshot) => {
                subscriber.observed = observed;
                (subscriber.handler)(Ok(snapshot));
            }
            Err(err) => {
                subscriber.observed = Observed::Failed;
                (subscriber.handler)(Err(err));
            }
        }
        true
    }

    fn fingerprint(&self, path: &str) -> Result<Option<Fingerprint>> {
        let dir = self.collection_dir(path)?;
        let Some(files) = list_record_files(&dir)? else {
            return Ok(None);
        };

        let mut fingerprint = Fingerprint::with_capacity(files.len());
        for (id, file) in files {
            let metadata = fs::metadata(&file).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let mtime = metadata.and_then(|m| m.modified().ok());
            fingerprint.push((id, size, mtime));
        }
        Ok(Some(fingerprint))
    }
}

impl DataSource for FileStore {
    fn subscribe(&self, path: &str, handler: SnapshotHandler) -> Result<Box<dyn Subscription>> {
        self.collection_dir(path)?;
        let active = Rc::new(Cell::new(true));
        let mut subscriber = Subscriber {
            path: path.to_string(),
            handler,
            active: Rc::clone(&active),
            observed: Observed::Unseen,
        };

        // Deliver the current state before registering, outside any borrow.
        self.refresh_subscriber(&mut subscriber);

        self.subscribers.borrow_mut().push(subscriber);
        Ok(Box::new(FileSubscription { active }))
    }

    fn fetch_once(&self, path: &str) -> SnapshotResult {
        self.read_snapshot(path)
    }
}

/// Lists `<id>.json` files in `dir`, sorted by id. `None` if `dir` is missing.
fn list_record_files(dir: &Path) -> Result<Option<Vec<(String, PathBuf)>>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(PenError::Transport(err.to_string())),
    };

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == RECORD_EXTENSION))
        .filter_map(|path| {
            let id = path.file_stem()?.to_str()?.to_string();
            is_valid_segment(&id).then_some((id, path))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(Some(files))
}

fn read_record_file(file: &Path) -> Result<Option<RawActivityRecord>> {
    let size = fs::metadata(file)
        .map_err(|e| PenError::io("Failed to stat record", e))?
        .len();
    if size > MAX_RECORD_BYTES {
        return Err(PenError::RecordTooLarge {
            path: file.to_path_buf(),
            size,
        });
    }

    let content =
        fs::read_to_string(file).map_err(|e| PenError::io("Failed to read record", e))?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| PenError::json(format!("Failed to parse {}", file.display()), e))?;
    Ok(RawActivityRecord::from_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const PATH: &str = "pens/LTT_6001/StudyData";

    fn record(value: Value) -> RawActivityRecord {
        RawActivityRecord::from_json(value).unwrap()
    }

    fn recording_handler() -> (Rc<RefCell<Vec<SnapshotResult>>>, SnapshotHandler) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Box::new(move |result| sink.borrow_mut().push(result)))
    }

    #[test]
    fn missing_collection_is_no_data() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        assert!(store.read_snapshot(PATH).unwrap().is_none());
    }

    #[test]
    fn writes_and_reads_records() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let r = record(json!({"ActiveTimeSeconds": 30, "Timestamp": 1_700_000_000_000_i64}));

        store.write_record(PATH, "1700000000000", &r).unwrap();

        assert_eq!(store.read_record(PATH, "1700000000000").unwrap(), Some(r.clone()));
        let snapshot = store.read_snapshot(PATH).unwrap().unwrap();
        assert_eq!(snapshot.get("1700000000000"), Some(&r));
        assert!(temp
            .path()
            .join("pens/LTT_6001/StudyData/1700000000000.json")
            .exists());
    }

    #[test]
    fn skips_unreadable_records() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store
            .write_record(PATH, "good", &record(json!({"ActiveTimeSeconds": 1})))
            .unwrap();
        let dir = store.collection_dir(PATH).unwrap();
        std::fs::write(dir.join("broken.json"), "{oops").unwrap();
        std::fs::write(dir.join("scalar.json"), "42").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let snapshot = store.read_snapshot(PATH).unwrap().unwrap();
        let ids: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn rejects_unsafe_paths_and_ids() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        assert!(store.read_snapshot("pens/../etc").is_err());
        assert!(store
            .write_record(PATH, "../escape", &RawActivityRecord::default())
            .is_err());
    }

    #[test]
    fn subscribe_delivers_current_state_then_changes() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let (seen, handler) = recording_handler();

        let _subscription = store.subscribe(PATH, handler).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert!(matches!(seen.borrow()[0], Ok(None)));

        assert_eq!(store.poll(), 0);

        store
            .write_record(PATH, "a", &record(json!({"ActiveTimeSeconds": 5})))
            .unwrap();
        assert_eq!(store.poll(), 1);
        assert_eq!(store.poll(), 0);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        let snapshot = seen[1].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn cancelled_subscriptions_stop_receiving() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let (seen, handler) = recording_handler();

        let mut subscription = store.subscribe(PATH, handler).unwrap();
        subscription.cancel();
        subscription.cancel();

        store
            .write_record(PATH, "a", &record(json!({"ActiveTimeSeconds": 5})))
            .unwrap();
        assert_eq!(store.poll(), 0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn unreadable_collection_reports_once_until_it_recovers() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let dir = store.collection_dir(PATH).unwrap();
        std::fs::create_dir_all(dir.parent().unwrap()).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();
        let (seen, handler) = recording_handler();

        let _subscription = store.subscribe(PATH, handler).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert!(matches!(seen.borrow()[0], Err(PenError::Transport(_))));

        assert_eq!(store.poll(), 0);
        assert_eq!(store.poll(), 0);
        assert_eq!(seen.borrow().len(), 1);

        std::fs::remove_file(&dir).unwrap();
        store
            .write_record(PATH, "a", &record(json!({"ActiveTimeSeconds": 5})))
            .unwrap();
        assert_eq!(store.poll(), 1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        let snapshot = seen[1].as_ref().unwrap().as_ref().unwrap();
        assert!(snapshot.contains_key("a"));
    }
}
