//! Live feed adapter.
//!
//! Bridges a push subscription (or a one-shot read) of raw snapshots to the
//! pipeline `build_entries → aggregate → classify_status`, and hands the
//! result to the rendering and status collaborators.
//!
//! # Ownership
//!
//! A [`PenFeed`] is an explicitly owned session object: one feed per data
//! source path. Several feeds (several pens, test harnesses) coexist freely
//! because nothing here is global.
//!
//! # Threading
//!
//! Single-threaded. Handlers run synchronously inside the transport's delivery
//! call and share state through `Rc`/`Cell`, so feeds are `!Send`.
//!
//! # Cancellation
//!
//! Every subscription gets a generation number. Cancelling bumps the feed's
//! generation, so callbacks still in flight from an older subscription are
//! dropped before they reach the pipeline.

mod memory;

pub use memory::MemorySource;

use crate::aggregate::{aggregate, AggregateSnapshot};
use crate::entries::{build_entries, latest_orientation, NormalizedEntry, Orientation};
use crate::error::{PenError, Result};
use crate::format::{
    format_duration, format_orientation, format_relative_time, format_timeline_timestamp,
    PLACEHOLDER,
};
use crate::status::{classify_status, ConnectionStatus};
use chrono::{DateTime, FixedOffset, Local, TimeZone};
use pen_protocol::Snapshot;
use serde::Serialize;
use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Number of entries shown in the dashboard timeline.
pub const DEFAULT_TIMELINE_LIMIT: usize = 6;

/// One delivery from a data source: a full snapshot, "no data yet", or a
/// transport failure.
pub type SnapshotResult = Result<Option<Snapshot>>;

/// Callback a data source invokes for every delivery.
pub type SnapshotHandler = Box<dyn FnMut(SnapshotResult)>;

// ═══════════════════════════════════════════════════════════════════════════════
// Collaborator seams
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle to an active subscription.
pub trait Subscription {
    /// Stops deliveries. Calling it more than once is a no-op.
    fn cancel(&mut self);
}

/// A store of raw activity records addressed by path.
pub trait DataSource {
    /// Registers `handler` for every change at `path`. Sources deliver full
    /// snapshots, never deltas, and may deliver the current state immediately.
    fn subscribe(&self, path: &str, handler: SnapshotHandler) -> Result<Box<dyn Subscription>>;

    /// Reads the current snapshot at `path` once.
    fn fetch_once(&self, path: &str) -> SnapshotResult;
}

/// Presentation of computed updates. The feed never formats for display itself.
pub trait RenderSink {
    fn render(&self, update: &PenUpdate);
}

/// Display of the connection state, including transport failures.
pub trait StatusSink {
    fn report(&self, report: &StatusReport);
}

/// Source of the reference instant for each update.
///
/// The zone decides where today, the week and the month begin. It has to be
/// the user's real zone, not just its current offset, or boundaries on the
/// far side of a daylight-saving change shift by an hour.
pub trait Clock {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the process's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A [`Clock`] as the feed holds it, behind `dyn`. Implemented for every clock.
pub trait FeedClock {
    /// Runs the pipeline over `snapshot` at the clock's current instant.
    fn evaluate(
        &self,
        snapshot: Option<&Snapshot>,
        history_limit: Option<usize>,
        origin: UpdateOrigin,
    ) -> PenUpdate;
}

impl<C> FeedClock for C
where
    C: Clock,
    <C::Tz as TimeZone>::Offset: Display,
{
    fn evaluate(
        &self,
        snapshot: Option<&Snapshot>,
        history_limit: Option<usize>,
        origin: UpdateOrigin,
    ) -> PenUpdate {
        PenUpdate::compute(snapshot, self.now(), history_limit, origin)
    }
}

/// What the status sink is told after each delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    Status(ConnectionStatus),
    /// The transport failed; the pen is shown as disconnected.
    Error(String),
}

impl StatusReport {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            StatusReport::Status(status) => *status,
            StatusReport::Error(_) => ConnectionStatus::Disconnected,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// View model
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrigin {
    Live,
    Refresh,
}

/// Everything derived from one snapshot. Rebuilt wholesale on every delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenUpdate {
    pub origin: UpdateOrigin,
    pub evaluated_at: DateTime<FixedOffset>,
    /// Newest first.
    pub entries: Vec<NormalizedEntry>,
    /// `None` when the source has no data.
    pub aggregate: Option<AggregateSnapshot>,
    pub status: ConnectionStatus,
    /// Roll and pitch of the newest entry.
    pub orientation: Option<Orientation>,
    // Formatted in the clock's zone while it is still known.
    #[serde(skip)]
    labels: SummaryLabels,
    #[serde(skip)]
    rows: Vec<TimelineItem>,
}

/// One timeline row, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineItem {
    pub id: String,
    pub time: String,
    pub duration: String,
}

/// Headline figures, already formatted, with placeholders when there is no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLabels {
    pub today: String,
    pub week: String,
    pub month: String,
    pub total: String,
    pub longest_today: String,
    pub last_sync: String,
    pub orientation: String,
}

impl SummaryLabels {
    fn new<Tz>(
        aggregate: Option<&AggregateSnapshot>,
        orientation: Option<&Orientation>,
        now: &DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        match aggregate {
            Some(a) => SummaryLabels {
                today: format_duration(a.today_seconds),
                week: format_duration(a.week_seconds),
                month: format_duration(a.month_seconds),
                total: format_duration(a.total_seconds),
                longest_today: format_duration(a.longest_session_today),
                last_sync: format_relative_time(a.latest_timestamp, now),
                orientation: format_orientation(orientation),
            },
            None => SummaryLabels {
                today: PLACEHOLDER.to_string(),
                week: PLACEHOLDER.to_string(),
                month: PLACEHOLDER.to_string(),
                total: PLACEHOLDER.to_string(),
                longest_today: PLACEHOLDER.to_string(),
                last_sync: PLACEHOLDER.to_string(),
                orientation: PLACEHOLDER.to_string(),
            },
        }
    }
}

impl PenUpdate {
    /// Runs the pipeline over one snapshot.
    ///
    /// Calendar windows and displayed times use the zone of `now`.
    /// `history_limit` keeps only the newest N entries, matching a store query
    /// capped at N documents.
    pub fn compute<Tz>(
        snapshot: Option<&Snapshot>,
        now: DateTime<Tz>,
        history_limit: Option<usize>,
        origin: UpdateOrigin,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut entries = snapshot.map(build_entries).unwrap_or_default();
        if let Some(limit) = history_limit {
            entries.truncate(limit);
        }
        let aggregate = aggregate(&entries, &now);
        let status = classify_status(
            aggregate.as_ref().and_then(|a| a.latest_timestamp),
            &now,
        );
        let orientation = snapshot.and_then(|s| latest_orientation(s, &entries));

        let zone = now.timezone();
        let rows = entries
            .iter()
            .map(|entry| TimelineItem {
                id: entry.id.clone(),
                time: format_timeline_timestamp(entry.timestamp, &zone),
                duration: format_duration(entry.seconds),
            })
            .collect();
        let labels = SummaryLabels::new(aggregate.as_ref(), orientation.as_ref(), &now);

        Self {
            origin,
            evaluated_at: now.fixed_offset(),
            entries,
            aggregate,
            status,
            orientation,
            labels,
            rows,
        }
    }

    pub fn has_data(&self) -> bool {
        self.aggregate.is_some()
    }

    /// The newest `limit` entries as timeline rows; empty when there is no data.
    pub fn timeline(&self, limit: usize) -> Vec<TimelineItem> {
        self.rows.iter().take(limit).cloned().collect()
    }

    pub fn summary_labels(&self) -> SummaryLabels {
        self.labels.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Feed
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables for a [`PenFeed`].
#[derive(Clone)]
pub struct FeedOptions {
    pub clock: Rc<dyn FeedClock>,
    pub history_limit: Option<usize>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            clock: Rc::new(SystemClock),
            history_limit: None,
        }
    }
}

/// The part of a feed that subscription handlers share.
struct Pipeline {
    path: String,
    renderer: Rc<dyn RenderSink>,
    status: Rc<dyn StatusSink>,
    clock: Rc<dyn FeedClock>,
    history_limit: Option<usize>,
}

impl Pipeline {
    fn deliver(&self, snapshot: Option<Snapshot>, origin: UpdateOrigin) -> PenUpdate {
        let update = self
            .clock
            .evaluate(snapshot.as_ref(), self.history_limit, origin);
        debug!(
            path = %self.path,
            origin = ?origin,
            entries = update.entries.len(),
            status = %update.status,
            "Pen feed updated"
        );
        self.renderer.render(&update);
        self.status.report(&StatusReport::Status(update.status));
        update
    }

    fn fail(&self, err: &PenError, origin: UpdateOrigin) {
        warn!(path = %self.path, origin = ?origin, error = %err, "Pen feed transport error");
        self.status.report(&StatusReport::Error(err.to_string()));
    }

    fn handle(&self, result: SnapshotResult, origin: UpdateOrigin) {
        match result {
            Ok(snapshot) => {
                self.deliver(snapshot, origin);
            }
            Err(err) => self.fail(&err, origin),
        }
    }
}

/// Live view over one data source path.
pub struct PenFeed {
    source: Rc<dyn DataSource>,
    pipeline: Rc<Pipeline>,
    subscription: Option<Box<dyn Subscription>>,
    generation: Rc<Cell<u64>>,
}

impl PenFeed {
    pub fn new(
        source: Rc<dyn DataSource>,
        path: impl Into<String>,
        renderer: Rc<dyn RenderSink>,
        status: Rc<dyn StatusSink>,
    ) -> Self {
        Self::with_options(source, path, renderer, status, FeedOptions::default())
    }

    pub fn with_options(
        source: Rc<dyn DataSource>,
        path: impl Into<String>,
        renderer: Rc<dyn RenderSink>,
        status: Rc<dyn StatusSink>,
        options: FeedOptions,
    ) -> Self {
        Self {
            source,
            pipeline: Rc::new(Pipeline {
                path: path.into(),
                renderer,
                status,
                clock: options.clock,
                history_limit: options.history_limit,
            }),
            subscription: None,
            generation: Rc::new(Cell::new(0)),
        }
    }

    pub fn path(&self) -> &str {
        &self.pipeline.path
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Starts the live subscription. A no-op while one is already active.
    ///
    /// Failing to establish the subscription is reported to the status sink
    /// and returned.
    pub fn subscribe(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            trace!(path = %self.path(), "Pen feed already subscribed");
            return Ok(());
        }

        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        let current = Rc::clone(&self.generation);
        let pipeline = Rc::clone(&self.pipeline);
        let handler: SnapshotHandler = Box::new(move |result| {
            if current.get() != generation {
                trace!(path = %pipeline.path, "Dropping delivery from cancelled subscription");
                return;
            }
            pipeline.handle(result, UpdateOrigin::Live);
        });

        match self.source.subscribe(self.path(), handler) {
            Ok(subscription) => {
                debug!(path = %self.path(), "Pen feed subscribed");
                self.subscription = Some(subscription);
                Ok(())
            }
            Err(err) => {
                self.generation.set(generation.wrapping_add(1));
                self.pipeline.fail(&err, UpdateOrigin::Live);
                Err(err)
            }
        }
    }

    /// Re-runs the pipeline against a single read. Leaves any active
    /// subscription untouched.
    pub fn refresh(&self) -> Result<PenUpdate> {
        match self.source.fetch_once(self.path()) {
            Ok(snapshot) => Ok(self.pipeline.deliver(snapshot, UpdateOrigin::Refresh)),
            Err(err) => {
                self.pipeline.fail(&err, UpdateOrigin::Refresh);
                Err(err)
            }
        }
    }

    /// Cancels the live subscription. Safe to call repeatedly or before
    /// subscribing.
    pub fn unsubscribe(&mut self) {
        self.generation.set(self.generation.get().wrapping_add(1));
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            debug!(path = %self.path(), "Pen feed unsubscribed");
        }
    }
}

impl Drop for PenFeed {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
