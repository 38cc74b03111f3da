use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Fixed vocabulary for positive lesson observations.
pub const POSITIVE_TAGS: &[&str] = &[
    "Inspiring",
    "Motivating",
    "Active",
    "Connected",
    "Respectful",
    "Focused",
    "Safe",
    "Energetic",
];

/// Fixed vocabulary for negative lesson observations.
pub const NEGATIVE_TAGS: &[&str] = &[
    "Demotivating",
    "Passive",
    "Disrespectful",
    "Chaotic",
    "Distracted",
    "Noisy",
    "Unsafe",
];

/// Class groups a lesson can be registered against.
pub const CLASSES: &[&str] = &[
    "5ECWI/WEWI/WEWIC",
    "5HW",
    "5ECMT/5MT/5WEMTC",
    "5MT",
    "3HW/3MT",
    "6ECWI-HW",
    "6MT",
    "6WEWI",
    "6ECMT/6WEMT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Director,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "teacher" => Ok(Role::Teacher),
            "director" => Ok(Role::Director),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => write!(f, "teacher"),
            Role::Director => write!(f, "director"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// One daily mood submission. Duplicate (email, date) rows are allowed;
/// every row contributes to that date's average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub email: String,
    pub date: NaiveDate,
    pub energy: i32,
    pub stress: i32,
}

/// One lesson observation, appended to the teacher's lesson file.
/// Tags are comma-joined vocabulary words, re-split on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub timestamp: NaiveDateTime,
    pub class: String,
    pub approach: i32,
    pub management: i32,
    pub positive: String,
    pub negative: String,
}

/// Trims and lowercases, matching how addresses were entered in forms.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Local part of an address, used to derive per-teacher file names.
/// Similar addresses can collide; the files carry no email column to
/// distinguish them.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("director".parse::<Role>().unwrap(), Role::Director);
        assert_eq!(Role::Director.to_string(), "director");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ann.DeVos@School.be "), "ann.devos@school.be");
        assert_eq!(email_local_part("ann.devos@school.be"), "ann.devos");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn vocabularies_are_disjoint() {
        for tag in POSITIVE_TAGS {
            assert!(!NEGATIVE_TAGS.contains(tag));
        }
    }
}
