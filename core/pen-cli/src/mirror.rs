//! `smartpen mirror`: copy realtime records into the document store.

use pen_core::{
    document_path, load_config, mirror_all, mirror_record, normalize_pen_id, realtime_path,
    FileStore, MirrorOutcome, StorageConfig,
};

pub enum Target<'a> {
    One { pen_id: &'a str, entry_id: &'a str },
    All,
}

pub fn run(storage: &StorageConfig, target: Target<'_>) -> Result<String, String> {
    let config = load_config(storage);
    let store = FileStore::new(config.store_root(storage));

    match target {
        Target::One { pen_id, entry_id } => {
            let pen_id = normalize_pen_id(pen_id)?;
            match mirror_record(&store, &pen_id, entry_id)? {
                MirrorOutcome::Copied => Ok(format!(
                    "Copied {}/{} to {}/{}",
                    realtime_path(&pen_id),
                    entry_id,
                    document_path(&pen_id),
                    entry_id
                )),
                MirrorOutcome::NoData => Ok(format!(
                    "No data at {}/{}",
                    realtime_path(&pen_id),
                    entry_id
                )),
            }
        }
        Target::All => {
            let report = mirror_all(&store);
            let summary = format!(
                "Mirrored {} records ({} skipped, {} failed)",
                report.copied, report.skipped, report.failed
            );
            if report.failed > 0 {
                Err(summary)
            } else {
                Ok(summary)
            }
        }
    }
}
