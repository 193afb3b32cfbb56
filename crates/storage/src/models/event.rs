use crate::schema::EVENT_ID;
use crate::table::Table;

/// Non-empty event identifiers in table order, without repeats.
pub fn event_ids(events: &Table) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in events.column_values(EVENT_ID).map(str::trim) {
        if !id.is_empty() && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// The most recently added event: the last non-empty identifier.
pub fn latest_event_id(events: &Table) -> Option<String> {
    events
        .column_values(EVENT_ID)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .last()
        .map(str::to_string)
}
