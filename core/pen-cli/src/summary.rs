//! `smartpen summary`: one-shot read of a pen's activity.

use crate::render::{summary_text, SummaryView, TerminalRenderer};
use crate::session::{Session, Source};
use pen_core::{FeedOptions, PenFeed, StorageConfig};
use std::io::sink;
use std::rc::Rc;

pub fn run(
    storage: &StorageConfig,
    pen: Option<&str>,
    source: Source,
    json: bool,
) -> Result<String, String> {
    let Session {
        config,
        pen_id,
        path,
        store,
    } = Session::open(storage, pen, source)?;

    // Output is printed once at the end, so the sinks stay quiet.
    let quiet = Rc::new(TerminalRenderer::new(sink()));
    let options = FeedOptions {
        history_limit: config.history_limit,
        ..FeedOptions::default()
    };
    let feed = PenFeed::with_options(Rc::new(store), path.clone(), quiet.clone(), quiet, options);
    let update = feed.refresh()?;

    if json {
        let view = SummaryView::new(&pen_id, &path, &update, config.timeline_limit);
        serde_json::to_string_pretty(&view).map_err(|e| format!("Failed to encode summary: {}", e))
    } else {
        Ok(summary_text(&pen_id, &path, &update, config.timeline_limit))
    }
}
