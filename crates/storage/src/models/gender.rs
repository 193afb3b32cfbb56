use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid gender '{0}', expected M or F")]
pub struct InvalidGender(pub String);

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

impl FromStr for Gender {
    type Err = InvalidGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Gender::M),
            "F" => Ok(Gender::F),
            _ => Err(InvalidGender(s.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical cell text for a gender entry: `M`, `F`, or empty.
pub fn normalize_gender(raw: &str) -> Result<String, InvalidGender> {
    if raw.trim().is_empty() {
        return Ok(String::new());
    }
    raw.parse::<Gender>().map(|g| g.as_str().to_string())
}
