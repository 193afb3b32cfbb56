use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::gender::normalize_gender;
use crate::error::{Result, StorageError};
use crate::license;
use crate::schema::{BIRTH, CLUB, COMMENT, EMAIL, GENDER, LAST_CHANGED, LICENSE, NAME, PHONE};
use crate::table::Table;

/// Format of the `Last_changed` stamp.
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn stamp(now: NaiveDateTime) -> String {
    now.format(STAMP_FORMAT).to_string()
}

/// Competitor registered from the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewCompetitor {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(max = 255))]
    pub club: Option<String>,

    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,

    #[validate(length(max = 32))]
    pub birth: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub comment: Option<String>,
}

fn validate_gender(gender: &str) -> std::result::Result<(), validator::ValidationError> {
    normalize_gender(gender)
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("invalid_gender"))
}

impl NewCompetitor {
    /// Appends the competitor with the next free license number and returns it.
    /// Call `validate()` first. The table is unchanged on error.
    pub fn append_to(&self, table: &mut Table, now: NaiveDateTime) -> Result<u64> {
        let number = license::next_after(table.column_values(LICENSE))
            .ok_or(StorageError::LicenseNumbersExhausted { max: u64::MAX })?;
        let gender = self
            .gender
            .as_deref()
            .and_then(|g| normalize_gender(g).ok())
            .unwrap_or_default();

        // Keep the trailing empty row, if any, last.
        let at = if table.len() > 0 && table.is_row_empty(table.len() - 1) {
            table.len() - 1
        } else {
            table.len()
        };
        table.insert_empty_row(at);

        let fields = [
            (LICENSE, number.to_string()),
            (NAME, self.name.trim().to_string()),
            (CLUB, self.club.clone().unwrap_or_default()),
            (GENDER, gender),
            (BIRTH, self.birth.clone().unwrap_or_default()),
            (PHONE, self.phone.clone().unwrap_or_default()),
            (EMAIL, self.email.clone().unwrap_or_default()),
            (LAST_CHANGED, stamp(now)),
            (COMMENT, self.comment.clone().unwrap_or_default()),
        ];
        for (column, value) in fields {
            table.set_by_name(at, column, value);
        }
        Ok(number)
    }
}

/// Row of the first competitor carrying `license`, compared after normalization.
pub fn find_by_license(competitors: &Table, license: &str) -> Option<usize> {
    let wanted = license::normalize_str(license);
    if wanted.is_empty() {
        return None;
    }
    let col = competitors.column_index(LICENSE)?;
    (0..competitors.len()).find(|&row| {
        competitors
            .cell(row, col)
            .is_some_and(|v| license::normalize_str(v) == wanted)
    })
}
