//! Install stamps and audit event ids.
//!
//! Every record written by one install carries the same stamp, taken once
//! when the links are in place.

use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

/// Install stamp: unix-epoch seconds followed by `Z`, e.g. `1771220592Z`.
pub fn now_epoch_z() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

/// Sortable id for one line of the store audit log.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
