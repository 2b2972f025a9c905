//! `smartpen watch`: follow a pen's records as they change.

use crate::render::TerminalRenderer;
use crate::session::{Session, Source};
use pen_core::{FeedOptions, PenFeed, StorageConfig};
use std::io::Write;
use std::rc::Rc;
use std::thread;

/// Subscribes and polls the store until `ticks` polls have run, or forever.
pub fn run<W: Write + 'static>(
    storage: &StorageConfig,
    pen: Option<&str>,
    source: Source,
    ticks: Option<u64>,
    out: W,
) -> Result<(), String> {
    let Session {
        config,
        pen_id,
        path,
        store,
    } = Session::open(storage, pen, source)?;

    let store = Rc::new(store);
    let renderer = Rc::new(TerminalRenderer::new(out));
    let options = FeedOptions {
        history_limit: config.history_limit,
        ..FeedOptions::default()
    };
    let mut feed = PenFeed::with_options(
        store.clone(),
        path.clone(),
        renderer.clone(),
        renderer,
        options,
    );

    tracing::info!(pen_id = %pen_id, path = %path, "Watching pen");
    feed.subscribe()?;

    let interval = config.poll_interval();
    let mut polls = 0u64;
    while ticks.map_or(true, |limit| polls < limit) {
        thread::sleep(interval);
        store.poll();
        polls += 1;
    }

    feed.unsubscribe();
    tracing::info!(pen_id = %pen_id, polls, "Stopped watching pen");
    Ok(())
}
