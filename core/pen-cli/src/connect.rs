//! `smartpen connect`: remember which pen to follow.

use pen_core::{save_config, try_load_config, StorageConfig};

pub fn run(storage: &StorageConfig, raw_pen_id: &str) -> Result<String, String> {
    // A config that fails to parse is reported, never overwritten.
    let mut config = try_load_config(storage)?;
    let pen_id = config.connect(raw_pen_id)?;
    save_config(storage, &config)?;
    tracing::info!(pen_id = %pen_id, "Pen connected");
    Ok(pen_id)
}
