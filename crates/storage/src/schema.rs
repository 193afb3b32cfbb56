use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::StorageError;

pub const LICENSE: &str = "Versenyengedelyszam";
pub const NAME: &str = "Name";
pub const CLUB: &str = "Egyesulet";
pub const GENDER: &str = "Gender";
pub const BIRTH: &str = "Birth";
pub const PHONE: &str = "Phone number";
pub const EMAIL: &str = "Email";
pub const LAST_CHANGED: &str = "Last_changed";
pub const COMMENT: &str = "Comment";
pub const EVENT_ID: &str = "Verseny_ID";
pub const RESULT_CATEGORY: &str = "Kategoria";
pub const START_DATE: &str = "Start_date";
pub const END_DATE: &str = "End_date";
pub const ORGANIZER: &str = "Organizer";

/// Score columns, one per discipline and variant, in presentation order.
pub const SCORE_COLUMNS: [&str; 12] = [
    "KKPI_NY",
    "KKPI_O",
    "NKPI_NY",
    "NKPI_O",
    "KKPU_NY",
    "KKPU_O",
    "NKOU_NY",
    "NKPU_O",
    "SORET_NY",
    "Soret_O",
    "HUZAGOLT_SORET_NY",
    "HUZAGOLT_SORET_O",
];

pub const COMPETITOR_COLUMNS: [&str; 9] = [
    LICENSE,
    NAME,
    CLUB,
    GENDER,
    BIRTH,
    PHONE,
    EMAIL,
    LAST_CHANGED,
    COMMENT,
];

pub const EVENT_COLUMNS: [&str; 4] = [EVENT_ID, START_DATE, END_DATE, ORGANIZER];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Competitors,
    Results,
    Events,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Competitors => "competitors",
            Self::Results => "results",
            Self::Events => "events",
        }
    }

    pub fn all() -> &'static [DatasetKind] {
        &[Self::Competitors, Self::Results, Self::Events]
    }

    pub fn schema(&self) -> Schema {
        match self {
            Self::Competitors => Schema::competitors(),
            Self::Results => Schema::results(),
            Self::Events => Schema::events(),
        }
    }

    fn parse_str(s: &str) -> Result<Self, StorageError> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "competitors" | "competitor" | "versenyzok" | "users" => Ok(Self::Competitors),
            "results" | "result" | "eredmenyek" | "eredmeny" => Ok(Self::Results),
            "events" | "event" | "versenyek" | "verseny" => Ok(Self::Events),
            _ => Err(StorageError::Config(format!(
                "Unknown dataset: '{}'. Available: {}",
                s,
                Self::all()
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl TryFrom<&str> for DatasetKind {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse_str(value)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required columns of one dataset plus the per-column editing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub kind: DatasetKind,
    pub columns: Vec<String>,
    /// Column whose cells are normalized as license numbers.
    pub id_like: Vec<String>,
    /// Columns joined into the lowercase search blob.
    pub search: Vec<String>,
}

impl Schema {
    pub fn competitors() -> Self {
        Self {
            kind: DatasetKind::Competitors,
            columns: owned(&COMPETITOR_COLUMNS),
            id_like: owned(&[LICENSE]),
            search: owned(&[LICENSE, NAME, PHONE, EMAIL, CLUB]),
        }
    }

    pub fn results() -> Self {
        let mut columns = owned(&[LICENSE, NAME, CLUB, GENDER, BIRTH, PHONE, EMAIL]);
        columns.extend(owned(&SCORE_COLUMNS));
        columns.extend(owned(&[COMMENT, EVENT_ID, RESULT_CATEGORY]));
        Self {
            kind: DatasetKind::Results,
            columns,
            id_like: owned(&[LICENSE]),
            search: owned(&[LICENSE, NAME, PHONE, EMAIL]),
        }
    }

    pub fn events() -> Self {
        Self {
            kind: DatasetKind::Events,
            columns: owned(&EVENT_COLUMNS),
            id_like: Vec::new(),
            search: Vec::new(),
        }
    }

    pub fn is_id_like(&self, column: &str) -> bool {
        self.id_like.iter().any(|c| c == column)
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
