use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::child::ChildId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Cultural,
    Counting,
    Museum,
    Puzzle,
    Other,
}

impl ActivityType {
    pub fn all() -> [ActivityType; 5] {
        [
            ActivityType::Cultural,
            ActivityType::Counting,
            ActivityType::Museum,
            ActivityType::Puzzle,
            ActivityType::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Cultural => "cultural",
            ActivityType::Counting => "counting",
            ActivityType::Museum => "museum",
            ActivityType::Puzzle => "puzzle",
            ActivityType::Other => "other",
        }
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::all()
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown activity type: {s}"))
    }
}

/// One finished learning activity. Records are never edited after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredActivityRecord")]
pub struct ActivityRecord {
    /// Lets a sync consumer drop duplicates. Older records without one are given
    /// an id derived from their contents, so it is the same on every read.
    pub id: Uuid,
    pub child_id: ChildId,
    pub activity_type: ActivityType,
    pub activity_name: String,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Deserialize)]
struct StoredActivityRecord {
    #[serde(default)]
    id: Option<Uuid>,
    child_id: ChildId,
    activity_type: ActivityType,
    activity_name: String,
    #[serde(default)]
    score: Option<String>,
    #[serde(default)]
    duration_seconds: Option<u64>,
    completed_at: DateTime<Utc>,
    #[serde(default)]
    details: Option<String>,
}

impl From<StoredActivityRecord> for ActivityRecord {
    fn from(stored: StoredActivityRecord) -> Self {
        let mut record = ActivityRecord {
            id: Uuid::nil(),
            child_id: stored.child_id,
            activity_type: stored.activity_type,
            activity_name: stored.activity_name,
            score: stored.score,
            duration_seconds: stored.duration_seconds,
            completed_at: stored.completed_at,
            details: stored.details,
        };
        record.id = stored.id.unwrap_or_else(|| record.content_id());
        record
    }
}

impl ActivityRecord {
    pub fn new(
        child_id: ChildId,
        activity_type: ActivityType,
        activity_name: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            child_id,
            activity_type,
            activity_name: activity_name.into(),
            score: None,
            duration_seconds: None,
            completed_at,
            details: None,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: impl Into<String>) -> Self {
        self.score = Some(score.into());
        self
    }

    #[must_use]
    pub fn with_duration_seconds(mut self, seconds: u64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// A name-based id over everything but the id itself. Equal records always
    /// get the same one.
    pub fn content_id(&self) -> Uuid {
        let optional = |value: Option<&str>| value.map_or_else(String::new, |v| format!("+{v}"));
        let key = [
            self.child_id.as_str().to_string(),
            self.activity_type.as_str().to_string(),
            self.activity_name.clone(),
            self.completed_at.to_rfc3339(),
            optional(self.score.as_deref()),
            optional(self.duration_seconds.map(|s| s.to_string()).as_deref()),
            optional(self.details.as_deref()),
        ]
        .join("\u{1f}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}

impl Display for ActivityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.completed_at.format("%Y-%m-%d %H:%M"),
            self.activity_type,
            self.activity_name
        )?;
        if let Some(score) = &self.score {
            write!(f, " score={score}")?;
        }
        if let Some(seconds) = self.duration_seconds {
            write!(f, " {seconds}s")?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_activity_type_parses_case_insensitively() {
        assert_eq!("Puzzle".parse::<ActivityType>(), Ok(ActivityType::Puzzle));
        assert_eq!(" museum ".parse::<ActivityType>(), Ok(ActivityType::Museum));
        assert!("karaoke".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_record_serializes_type_in_lowercase_and_iso_timestamp() {
        let completed_at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        let record = ActivityRecord::new(
            ChildId::parse("kid").unwrap(),
            ActivityType::Counting,
            "Count the apples",
            completed_at,
        )
        .with_score("8/10");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["activity_type"], "counting");
        assert_eq!(json["completed_at"], "2024-03-04T09:30:00Z");
        assert_eq!(json["score"], "8/10");
    }

    #[test]
    fn test_record_without_id_gets_a_stable_one() {
        let json = r#"{
            "child_id": "kid",
            "activity_type": "museum",
            "activity_name": "Dinosaur hall",
            "completed_at": "2024-03-04T09:30:00Z"
        }"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert!(!record.id.is_nil());
        assert_eq!(record.score, None);
        assert_eq!(record.details, None);

        let again: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(again.id, record.id);
        assert_eq!(record.id, record.content_id());
    }

    #[test]
    fn test_stored_id_is_kept() {
        let record = ActivityRecord::new(
            ChildId::parse("kid").unwrap(),
            ActivityType::Puzzle,
            "3x3",
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let read: ActivityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn test_content_id_tells_records_apart() {
        let base = ActivityRecord::new(
            ChildId::parse("kid").unwrap(),
            ActivityType::Counting,
            "Count the apples",
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
        );
        let scored = base.clone().with_score("");
        let other_child = ActivityRecord {
            child_id: ChildId::parse("sibling").unwrap(),
            ..base.clone()
        };
        assert_ne!(base.content_id(), scored.content_id());
        assert_ne!(base.content_id(), other_child.content_id());
        assert_eq!(base.content_id(), base.clone().content_id());
    }
}
