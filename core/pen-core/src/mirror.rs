//! Realtime → document record mirror.
//!
//! The device writes each session to `pens/{pen}/StudyData/{entry}` in the
//! realtime store; the dashboard reads `Users/{pen}/StudyData/{entry}` from the
//! document store. Mirroring copies a record across with merge semantics:
//! fields from the realtime record win, fields only present in the existing
//! document are kept, and nested objects are merged key by key.

use crate::error::Result;
use crate::identity::{is_valid_segment, normalize_pen_id};
use crate::store::FileStore;
use pen_protocol::{document_path, realtime_path, RawActivityRecord, STUDY_DATA_COLLECTION};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The record was written to the document store.
    Copied,
    /// The realtime record was missing or empty; nothing was written.
    NoData,
}

/// Totals from a backfill over every realtime record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Copies one realtime record into the document store.
pub fn mirror_record(store: &FileStore, pen_id: &str, entry_id: &str) -> Result<MirrorOutcome> {
    let pen_id = normalize_pen_id(pen_id)?;
    let source_path = realtime_path(&pen_id);
    let dest_path = document_path(&pen_id);

    info!(pen_id = %pen_id, entry_id, "Mirroring {}/{}", source_path, entry_id);

    let Some(source) = store.read_record(&source_path, entry_id)? else {
        warn!(pen_id = %pen_id, entry_id, "No data to mirror");
        return Ok(MirrorOutcome::NoData);
    };
    if source.fields().is_empty() {
        warn!(pen_id = %pen_id, entry_id, "No data to mirror");
        return Ok(MirrorOutcome::NoData);
    }

    let existing = match store.read_record(&dest_path, entry_id) {
        Ok(existing) => existing.map(RawActivityRecord::into_fields).unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, entry_id, "Replacing unreadable document");
            Map::new()
        }
    };

    let merged = merge_fields(existing, source.into_fields());
    store.write_record(&dest_path, entry_id, &RawActivityRecord::new(merged))?;

    info!(pen_id = %pen_id, entry_id, "Mirrored to {}/{}", dest_path, entry_id);
    Ok(MirrorOutcome::Copied)
}

/// Mirrors every record under `pens/*/StudyData/`. One failing record never
/// stops the others.
pub fn mirror_all(store: &FileStore) -> MirrorReport {
    let mut report = MirrorReport::default();
    let pens_dir = store.root().join("pens");
    if !pens_dir.exists() {
        return report;
    }

    let records = WalkDir::new(&pens_dir)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file());

    for entry in records {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let collection = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let pen_id = path
            .parent()
            .and_then(|p| p.parent())
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let entry_id = path.file_stem().and_then(|n| n.to_str());

        let (Some(pen_id), Some(entry_id)) = (pen_id, entry_id) else {
            report.skipped += 1;
            continue;
        };
        if !is_json || collection != Some(STUDY_DATA_COLLECTION) || !is_valid_segment(entry_id) {
            report.skipped += 1;
            continue;
        }

        match mirror_record(store, pen_id, entry_id) {
            Ok(MirrorOutcome::Copied) => report.copied += 1,
            Ok(MirrorOutcome::NoData) => report.skipped += 1,
            Err(err) => {
                error!(error = %err, pen_id, entry_id, "Failed to mirror record");
                report.failed += 1;
            }
        }
    }

    info!(
        copied = report.copied,
        skipped = report.skipped,
        failed = report.failed,
        "Mirror backfill finished"
    );
    report
}

/// Merges `incoming` over `base`; nested objects merge recursively.
fn merge_fields(mut base: Map<String, Value>, incoming: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in incoming {
        let merged = match (base.remove(&key), value) {
            (Some(Value::Object(old)), Value::Object(new)) => Value::Object(merge_fields(old, new)),
            (_, value) => value,
        };
        base.insert(key, merged);
    }
    base
}
