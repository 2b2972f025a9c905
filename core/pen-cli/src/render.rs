//! Terminal presentation of feed updates.

use pen_core::{
    AggregateSnapshot, ConnectionStatus, Orientation, PenUpdate, RenderSink, StatusReport,
    StatusSink, SummaryLabels, TimelineItem, UpdateOrigin,
};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::io::Write;

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Multi-line summary used by `smartpen summary`.
pub fn summary_text(pen_id: &str, path: &str, update: &PenUpdate, timeline_limit: usize) -> String {
    let labels = update.summary_labels();
    let mut out = format!("Pen {} ({})\n", pen_id, path);
    out.push_str(&format!("  Status:        {}\n", update.status));
    out.push_str(&format!("  Last sync:     {}\n", labels.last_sync));
    out.push_str(&format!("  Today:         {}\n", labels.today));
    out.push_str(&format!("  Longest today: {}\n", labels.longest_today));
    out.push_str(&format!("  This week:     {}\n", labels.week));
    out.push_str(&format!("  This month:    {}\n", labels.month));
    out.push_str(&format!("  Total:         {}\n", labels.total));
    out.push_str(&format!("  Orientation:   {}\n", labels.orientation));

    let timeline = update.timeline(timeline_limit);
    if timeline.is_empty() {
        out.push_str("  No activity recorded.\n");
    } else {
        out.push_str("  Timeline:\n");
        for item in &timeline {
            out.push_str(&format!("    {:<20} {}\n", item.time, item.duration));
        }
    }
    out
}

/// JSON shape printed by `smartpen summary --json`.
#[derive(Debug, Serialize)]
pub struct SummaryView<'a> {
    pub pen_id: &'a str,
    pub path: &'a str,
    pub evaluated_at: String,
    pub status: ConnectionStatus,
    pub labels: SummaryLabels,
    pub aggregate: Option<&'a AggregateSnapshot>,
    pub orientation: Option<&'a Orientation>,
    pub timeline: Vec<TimelineItem>,
}

impl<'a> SummaryView<'a> {
    pub fn new(
        pen_id: &'a str,
        path: &'a str,
        update: &'a PenUpdate,
        timeline_limit: usize,
    ) -> Self {
        Self {
            pen_id,
            path,
            evaluated_at: update.evaluated_at.to_rfc3339(),
            status: update.status,
            labels: update.summary_labels(),
            aggregate: update.aggregate.as_ref(),
            orientation: update.orientation.as_ref(),
            timeline: update.timeline(timeline_limit),
        }
    }
}

/// Prints one line per update and a line whenever the status changes.
pub struct TerminalRenderer<W: Write> {
    out: RefCell<W>,
    last_status: Cell<Option<ConnectionStatus>>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            last_status: Cell::new(None),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.borrow_mut();
        if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!(error = %err, "Failed to write to terminal");
        }
    }
}

impl<W: Write> RenderSink for TerminalRenderer<W> {
    fn render(&self, update: &PenUpdate) {
        let labels = update.summary_labels();
        let origin = match update.origin {
            UpdateOrigin::Live => "live",
            UpdateOrigin::Refresh => "refresh",
        };
        self.write_line(&format!(
            "[{}] {} · today {} · week {} · total {} · last sync {} · {}",
            update.evaluated_at.format(CLOCK_FORMAT),
            origin,
            labels.today,
            labels.week,
            labels.total,
            labels.last_sync,
            labels.orientation,
        ));
    }
}

impl<W: Write> StatusSink for TerminalRenderer<W> {
    fn report(&self, report: &StatusReport) {
        match report {
            StatusReport::Status(status) => {
                if self.last_status.replace(Some(*status)) != Some(*status) {
                    self.write_line(&format!("status: {}", status));
                }
            }
            StatusReport::Error(message) => {
                self.last_status.set(Some(ConnectionStatus::Disconnected));
                self.write_line(&format!("error: {}", message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};
    use pen_core::{RawActivityRecord, Snapshot};
    use serde_json::json;

    fn update() -> PenUpdate {
        let now = FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 28, 12, 0, 0)
            .unwrap();
        let at = (now - Duration::seconds(20)).timestamp_millis();
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "a".to_string(),
            RawActivityRecord::from_json(json!({
                "ActiveTimeSeconds": 3661,
                "Timestamp": at,
                "Roll": 12.5,
                "Pitch": -3,
            }))
            .unwrap(),
        );
        PenUpdate::compute(Some(&snapshot), now, None, UpdateOrigin::Live)
    }

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn summary_lists_totals_and_timeline() {
        let text = summary_text("LTT_1", "Users/LTT_1/StudyData", &update(), 6);
        assert!(text.contains("Status:        writing"));
        assert!(text.contains("Today:         1h 1m"));
        assert!(text.contains("11:59 · 28/01"));
        assert!(text.contains("Orientation:   Roll=12.5°, Pitch=-3.0°"));
    }

    #[test]
    fn summary_without_data_shows_placeholders() {
        let now = FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 28, 12, 0, 0)
            .unwrap();
        let empty = PenUpdate::compute(None, now, None, UpdateOrigin::Refresh);
        let text = summary_text("LTT_1", "Users/LTT_1/StudyData", &empty, 6);
        assert!(text.contains("Status:        disconnected"));
        assert!(text.contains("Orientation:   --"));
        assert!(text.contains("No activity recorded."));
    }

    #[test]
    fn status_lines_only_on_change() {
        let renderer = TerminalRenderer::new(Vec::new());
        renderer.report(&StatusReport::Status(ConnectionStatus::Idle));
        renderer.report(&StatusReport::Status(ConnectionStatus::Idle));
        renderer.report(&StatusReport::Status(ConnectionStatus::Writing));
        renderer.report(&StatusReport::Error("offline".into()));

        assert_eq!(
            output(renderer),
            "status: idle\nstatus: writing\nerror: offline\n"
        );
    }

    #[test]
    fn render_prints_one_line() {
        let renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&update());
        let text = output(renderer);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("[12:00:00] live · today 1h 1m"));
        assert!(text.trim_end().ends_with("· Roll=12.5°, Pitch=-3.0°"));
    }

    #[test]
    fn summary_view_serializes() {
        let update = update();
        let view = SummaryView::new("LTT_1", "Users/LTT_1/StudyData", &update, 6);
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["status"], "writing");
        assert_eq!(value["labels"]["total"], "1h 1m");
        assert_eq!(value["timeline"].as_array().unwrap().len(), 1);
        assert_eq!(value["orientation"]["roll"], 12.5);
        assert_eq!(value["orientation"]["pitch"], -3.0);
        assert_eq!(value["labels"]["orientation"], "Roll=12.5°, Pitch=-3.0°");
    }
}
