//! `getVersion` gate (spec.md §4.1 item 7, §9 "Evolvability"): lets workflow
//! code that changes over time keep an in-flight instance on its original
//! branch across a deploy, by durably recording which version it took the
//! first time through.

use super::history::HistoryEvent;

/// Resolve a version marker against history: if `change_id` was already
/// recorded (replay), return the recorded version; otherwise this is the
/// first time this instance has reached the gate, so take `max_supported`
/// and hand back the event that should be appended to history.
pub fn resolve(
    recorded: Option<&HistoryEvent>,
    change_id: &str,
    min_supported: i32,
    max_supported: i32,
) -> (i32, bool) {
    if let Some(HistoryEvent::VersionMarker {
        change_id: recorded_change_id,
        version,
        ..
    }) = recorded
    {
        debug_assert_eq!(
            recorded_change_id, change_id,
            "history out of sync with workflow code at a getVersion gate"
        );
        return (*version, false);
    }
    let version = max_supported.clamp(min_supported, max_supported);
    (version, true)
}
