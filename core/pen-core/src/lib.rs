//! # pen-core
//!
//! Core library for the smart pen dashboard: turns raw activity records
//! uploaded by a pen into timelines, study-time totals and a live connection
//! status.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Data sources deliver on the
//!   caller's thread; clients can wrap with async if needed.
//! - **Not thread-safe**: Feeds share state through `Rc`/`Cell`. Clients that
//!   need threads provide their own synchronization.
//! - **Pure pipeline**: `build_entries → aggregate → classify_status` is
//!   recomputed from scratch for every snapshot. Nothing accumulates between
//!   updates.
//! - **Graceful degradation**: Malformed records are dropped, missing
//!   collections read as "no data", and a corrupt config falls back to
//!   defaults.
//! - **Explicit clock**: Every time-dependent function takes the reference
//!   instant as a parameter.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pen_core::{FileStore, PenFeed};
//! use std::rc::Rc;
//!
//! let store = Rc::new(FileStore::new(root));
//! let mut feed = PenFeed::new(store.clone(), document_path("LTT_6001"), renderer, status);
//! feed.subscribe()?;
//! loop {
//!     store.poll();
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod entries;
pub mod error;
pub mod feed;
pub mod format;
pub mod identity;
pub mod mirror;
pub mod status;
pub mod storage;
pub mod store;
pub mod timestamp;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use aggregate::{aggregate, AggregateSnapshot, CalendarWindow};
pub use config::{load_config, save_config, try_load_config, PenConfig};
pub use entries::{build_entries, latest_orientation, NormalizedEntry, Orientation};
pub use error::{PenError, Result};
pub use feed::{
    Clock, DataSource, FeedClock, FeedOptions, MemorySource, PenFeed, PenUpdate, RenderSink,
    SnapshotHandler, SnapshotResult, StatusReport, StatusSink, Subscription, SummaryLabels,
    SystemClock, TimelineItem, UpdateOrigin, DEFAULT_TIMELINE_LIMIT,
};
pub use format::{format_duration, format_orientation, format_relative_time};
pub use identity::normalize_pen_id;
pub use mirror::{mirror_all, mirror_record, MirrorOutcome, MirrorReport};
pub use status::{classify_status, ConnectionStatus, WRITING_WINDOW_SECS};
pub use storage::StorageConfig;
pub use store::FileStore;
pub use timestamp::normalize_timestamp;

pub use pen_protocol::{
    document_path, realtime_path, RawActivityRecord, RawTimestamp, Snapshot,
};
