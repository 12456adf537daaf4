//! Age-rating groups mapped to certification allow-lists.

use std::fmt;
use std::str::FromStr;

/// Audience restriction chosen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeRating {
    Family,
    Teen,
    /// No restriction
    Adult,
}

const FAMILY_CERTIFICATIONS: &[&str] = &["ALL", "G", "PG", "12"];
const TEEN_CERTIFICATIONS: &[&str] = &["ALL", "G", "PG", "PG-13", "12", "15"];

impl AgeRating {
    /// Certifications allowed for this group; `None` means everything passes
    pub fn allowed_certifications(self) -> Option<&'static [&'static str]> {
        match self {
            AgeRating::Family => Some(FAMILY_CERTIFICATIONS),
            AgeRating::Teen => Some(TEEN_CERTIFICATIONS),
            AgeRating::Adult => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgeRating::Family => "family",
            AgeRating::Teen => "teen",
            AgeRating::Adult => "adult",
        }
    }
}

impl FromStr for AgeRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" => Ok(AgeRating::Family),
            "teen" => Ok(AgeRating::Teen),
            "adult" | "all" => Ok(AgeRating::Adult),
            other => Err(format!("unknown age rating '{}'", other)),
        }
    }
}

impl fmt::Display for AgeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
