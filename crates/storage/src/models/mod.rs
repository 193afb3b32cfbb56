mod competitor;
mod event;
mod gender;
mod result;

pub use competitor::{NewCompetitor, STAMP_FORMAT, find_by_license, stamp};
pub use event::{event_ids, latest_event_id};
pub use gender::{Gender, InvalidGender, normalize_gender};
pub use result::{duplicate_pairs, result_pair};
