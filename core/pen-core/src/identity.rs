//! Pen and record identifiers.
//!
//! Both end up as path segments in the stores, so they are restricted to a
//! conservative character set.

use crate::error::{PenError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap());

/// Trims and validates a user-entered pen id (e.g. `LTT_6001`).
pub fn normalize_pen_id(raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(PenError::InvalidPenId {
            id: raw.to_string(),
            reason: "pen id is required".to_string(),
        });
    }
    if !RE_SEGMENT.is_match(id) {
        return Err(PenError::InvalidPenId {
            id: raw.to_string(),
            reason: "use letters, digits, '_' or '-' (at most 128)".to_string(),
        });
    }
    Ok(id.to_string())
}

/// True when `value` can be used as a record id or path segment.
pub fn is_valid_segment(value: &str) -> bool {
    RE_SEGMENT.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_valid_ids() {
        assert_eq!(normalize_pen_id("  LTT_6001 ").unwrap(), "LTT_6001");
    }

    #[test]
    fn rejects_empty_ids() {
        assert!(matches!(
            normalize_pen_id("   "),
            Err(PenError::InvalidPenId { .. })
        ));
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(normalize_pen_id("../etc").is_err());
        assert!(normalize_pen_id("a/b").is_err());
        assert!(normalize_pen_id("pen 1").is_err());
    }

    #[test]
    fn accepts_push_style_record_ids() {
        assert!(is_valid_segment("-NxYz_123"));
        assert!(is_valid_segment("1700000000000"));
        assert!(!is_valid_segment(".."));
        assert!(!is_valid_segment(""));
    }
}
