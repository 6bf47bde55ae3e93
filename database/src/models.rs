//! Shapes stored under each namespace, and the versioned envelope that wraps them.
//!
//! Every value is written as `{"schema_version": N, "data": ...}`. Blobs written
//! before versioning existed carry no envelope and are read as version 0.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use types::{
    ActivityRecord, ActivityType, ChildId, MatchGameState, OverallStats, PuzzleState,
    WeeklyStats,
};

use crate::{error::DatabaseError, namespace::Namespace};

pub trait Persisted: Serialize + DeserializeOwned + Send + Sync {
    const SCHEMA_VERSION: u32;

    /// Converts data stored under an older `version` into the current shape.
    fn upgrade(_version: u32, data: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(data)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    data: Value,
}

pub fn encode<T: Persisted>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(&EnvelopeRef {
        schema_version: T::SCHEMA_VERSION,
        data: value,
    })?)
}

pub fn decode<T: Persisted>(namespace: Namespace, raw: &str) -> Result<T, DatabaseError> {
    let value: Value = serde_json::from_str(raw)?;
    let is_enveloped = value.as_object().is_some_and(|map| {
        map.len() == 2 && map.contains_key("schema_version") && map.contains_key("data")
    });

    let (version, data) = if is_enveloped {
        let envelope: Envelope = serde_json::from_value(value)?;
        (envelope.schema_version, envelope.data)
    } else {
        (0, value)
    };

    if version > T::SCHEMA_VERSION {
        return Err(DatabaseError::UnsupportedSchema {
            namespace: namespace.prefix().into_owned(),
            found: version,
            supported: T::SCHEMA_VERSION,
        });
    }
    if version < T::SCHEMA_VERSION {
        tracing::debug!(
            "Upgrading {} data from schema version {} to {}",
            namespace,
            version,
            T::SCHEMA_VERSION
        );
        return Ok(T::upgrade(version, data)?);
    }
    Ok(serde_json::from_value(data)?)
}

/// Sliding puzzle progress for one child.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleProgress {
    /// The unfinished puzzle to resume, if any.
    pub current: Option<PuzzleState>,
    pub solved_count: u32,
    /// Fewest moves needed to solve, by grid size.
    pub best_move_counts: BTreeMap<usize, u32>,
}

impl PuzzleProgress {
    /// Counts a finished puzzle and clears the resumable one. Returns true on a new best.
    pub fn record_solved(&mut self, grid_size: usize, moves: u32) -> bool {
        self.current = None;
        self.solved_count = self.solved_count.saturating_add(1);
        match self.best_move_counts.get(&grid_size) {
            Some(best) if *best <= moves => false,
            _ => {
                self.best_move_counts.insert(grid_size, moves);
                true
            }
        }
    }
}

/// When a learning session of one activity type began.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub activity_type: ActivityType,
    /// Epoch milliseconds.
    pub started_at_ms: i64,
}

/// Weekly stats as they were stored before versioning.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyWeeklyStats {
    week_start_timestamp: i64,
    daily_minutes: Vec<u32>,
}

/// An activity as it was stored before versioning. Unknown types are kept as `Other`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyActivityRecord {
    child_id: ChildId,
    activity_type: String,
    activity_name: String,
    #[serde(default)]
    score: Option<String>,
    #[serde(default)]
    duration_seconds: Option<u64>,
    completed_at: DateTime<Utc>,
    #[serde(default)]
    details: Option<String>,
}

impl From<LegacyActivityRecord> for ActivityRecord {
    fn from(legacy: LegacyActivityRecord) -> Self {
        let activity_type = legacy.activity_type.parse().unwrap_or(ActivityType::Other);
        let mut record = ActivityRecord::new(
            legacy.child_id,
            activity_type,
            legacy.activity_name,
            legacy.completed_at,
        );
        record.score = legacy.score;
        record.duration_seconds = legacy.duration_seconds;
        record.details = legacy.details;
        record.id = record.content_id();
        record
    }
}

fn upgrade_activity(entry: Value) -> Result<ActivityRecord, serde_json::Error> {
    if entry.get("childId").is_some() {
        let legacy: LegacyActivityRecord = serde_json::from_value(entry)?;
        return Ok(legacy.into());
    }
    serde_json::from_value(entry)
}

impl Persisted for PuzzleProgress {
    const SCHEMA_VERSION: u32 = 1;

    fn upgrade(_version: u32, data: Value) -> Result<Self, serde_json::Error> {
        // Unversioned progress was only ever the bare puzzle.
        if data.get("current").is_none() && data.get("tiles").is_some() {
            let puzzle: PuzzleState = serde_json::from_value(data)?;
            return Ok(PuzzleProgress {
                current: (!puzzle.is_complete()).then_some(puzzle),
                ..Default::default()
            });
        }
        serde_json::from_value(data)
    }
}

impl Persisted for MatchGameState {
    const SCHEMA_VERSION: u32 = 1;
}

impl Persisted for OverallStats {
    const SCHEMA_VERSION: u32 = 1;
}

impl Persisted for Vec<ActivityRecord> {
    const SCHEMA_VERSION: u32 = 1;

    /// Upgrades entry by entry. An entry that cannot be read is dropped on its own
    /// so the rest of the log survives.
    fn upgrade(_version: u32, data: Value) -> Result<Self, serde_json::Error> {
        let entries: Vec<Value> = serde_json::from_value(data)?;
        let total = entries.len();
        let records: Vec<ActivityRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match upgrade_activity(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Dropping unreadable legacy activity #{}: {}", index, e);
                    None
                }
            })
            .collect();
        if records.len() < total {
            tracing::warn!("Kept {} of {} legacy activities", records.len(), total);
        }
        Ok(records)
    }
}

impl Persisted for WeeklyStats {
    const SCHEMA_VERSION: u32 = 1;

    fn upgrade(_version: u32, data: Value) -> Result<Self, serde_json::Error> {
        if data.get("weekStartTimestamp").is_none() {
            return serde_json::from_value(data);
        }
        let legacy: LegacyWeeklyStats = serde_json::from_value(data)?;
        let mut daily_minutes = [0; types::week::DAYS_PER_WEEK];
        for (slot, minutes) in daily_minutes.iter_mut().zip(legacy.daily_minutes) {
            *slot = minutes;
        }
        WeeklyStats::from_week_start_millis(legacy.week_start_timestamp, daily_minutes)
            .map_err(serde::de::Error::custom)
    }
}

impl Persisted for SessionMarker {
    const SCHEMA_VERSION: u32 = 1;
}
