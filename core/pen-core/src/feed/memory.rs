//! In-memory data source for embedding and tests.

use super::{DataSource, SnapshotHandler, SnapshotResult, Subscription};
use crate::error::{PenError, Result};
use pen_protocol::Snapshot;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

struct Subscriber {
    path: String,
    handler: SnapshotHandler,
    active: Rc<Cell<bool>>,
}

#[derive(Default)]
struct Inner {
    snapshots: HashMap<String, Snapshot>,
    subscribers: Vec<Subscriber>,
    fetch_error: Option<String>,
}

/// A [`DataSource`] backed by process memory.
///
/// Deliveries are synchronous: [`MemorySource::publish`] returns after every
/// subscriber on the path has run.
#[derive(Default)]
pub struct MemorySource {
    inner: RefCell<Inner>,
}

struct MemorySubscription {
    active: Rc<Cell<bool>>,
}

impl Subscription for MemorySubscription {
    fn cancel(&mut self) {
        self.active.set(false);
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the data at `path` without notifying subscribers.
    pub fn set_snapshot(&self, path: &str, snapshot: Option<Snapshot>) {
        let mut inner = self.inner.borrow_mut();
        match snapshot {
            Some(snapshot) => {
                inner.snapshots.insert(path.to_string(), snapshot);
            }
            None => {
                inner.snapshots.remove(path);
            }
        }
    }

    /// Replaces the data at `path` and delivers it to every subscriber.
    pub fn publish(&self, path: &str, snapshot: Option<Snapshot>) {
        self.set_snapshot(path, snapshot.clone());
        self.notify(path, || Ok(snapshot.clone()));
    }

    /// Delivers a transport failure to every subscriber on `path`.
    pub fn fail(&self, path: &str, message: &str) {
        self.notify(path, || Err(PenError::Transport(message.to_string())));
    }

    /// Makes subsequent `fetch_once` calls fail (or succeed again with `None`).
    pub fn set_fetch_error(&self, message: Option<&str>) {
        self.inner.borrow_mut().fetch_error = message.map(str::to_string);
    }

    /// Number of live subscriptions on `path`.
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.path == path && s.active.get())
            .count()
    }

    fn current(&self, path: &str) -> Option<Snapshot> {
        self.inner.borrow().snapshots.get(path).cloned()
    }

    fn notify(&self, path: &str, delivery: impl Fn() -> SnapshotResult) {
        // Handlers may call back into this source, so none of them runs while
        // the subscriber list is borrowed.
        let mut subscribers = std::mem::take(&mut self.inner.borrow_mut().subscribers);
        subscribers.retain(|s| s.active.get());
        for subscriber in subscribers.iter_mut().filter(|s| s.path == path) {
            if subscriber.active.get() {
                (subscriber.handler)(delivery());
            }
        }

        let mut inner = self.inner.borrow_mut();
        let added = std::mem::take(&mut inner.subscribers);
        subscribers.extend(added);
        inner.subscribers = subscribers;
    }
}

impl DataSource for MemorySource {
    fn subscribe(&self, path: &str, mut handler: SnapshotHandler) -> Result<Box<dyn Subscription>> {
        let active = Rc::new(Cell::new(true));
        handler(Ok(self.current(path)));

        self.inner.borrow_mut().subscribers.push(Subscriber {
            path: path.to_string(),
            handler,
            active: Rc::clone(&active),
        });
        Ok(Box::new(MemorySubscription { active }))
    }

    fn fetch_once(&self, path: &str) -> SnapshotResult {
        if let Some(message) = &self.inner.borrow().fetch_error {
            return Err(PenError::Transport(message.clone()));
        }
        Ok(self.current(path))
    }
}
