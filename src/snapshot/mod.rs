//! Debug snapshots of a mode engine.
//!
//! A snapshot is a point-in-time copy of the engine's bookkeeping: which
//! mode is active, what history holds, which slots are materialized. It
//! never includes mode instances. The JSON form is meant for tooling and
//! may change between releases; [`SNAPSHOT_VERSION`] is bumped when it does.

use crate::core::ModeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Status of one registered identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeStatus {
    pub id: ModeId,

    /// Instance name when materialized, type name otherwise
    pub name: String,

    pub lazy: bool,
    pub materialized: bool,

    /// Pinned by history: protected from unloading while history is kept
    pub in_history: bool,

    /// Declared priority, if the mode has a configuration record
    pub priority: Option<i32>,
}

/// Serializable view of an engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModeSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,

    pub engine_id: Uuid,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    pub active: Option<ModeId>,
    pub previous: Option<ModeId>,

    /// Remembered modes, most recent first
    pub history: Vec<ModeId>,

    pub modes: Vec<ModeStatus>,

    /// Instances waiting in the pool
    pub pooled: usize,

    /// Transition phase, rendered
    pub phase: String,
}

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

impl ModeSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Parse a snapshot, refusing other format versions.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        Ok(snapshot)
    }

    pub fn status(&self, id: ModeId) -> Option<&ModeStatus> {
        self.modes.iter().find(|status| status.id == id)
    }
}

fn fmt_mode(mode: Option<ModeId>) -> String {
    mode.map_or_else(|| "none".to_string(), |id| id.to_string())
}

impl fmt::Display for ModeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "engine {} @ {}", self.engine_id, self.taken_at.to_rfc3339())?;
        writeln!(
            f,
            "active: {}  previous: {}  phase: {}",
            fmt_mode(self.active),
            fmt_mode(self.previous),
            self.phase
        )?;

        let history: Vec<String> = self.history.iter().map(ToString::to_string).collect();
        writeln!(f, "history: [{}]", history.join(", "))?;
        writeln!(f, "pooled: {}", self.pooled)?;

        for status in &self.modes {
            let marker = if Some(status.id) == self.active { '*' } else { ' ' };
            let mut flags = Vec::new();
            if status.lazy {
                flags.push("lazy");
            }
            if !status.materialized {
                flags.push("unloaded");
            }
            if status.in_history {
                flags.push("history");
            }
            write!(f, "{marker} {:>3} {}", status.id.index(), status.name)?;
            if let Some(priority) = status.priority {
                write!(f, " (priority {priority})")?;
            }
            if !flags.is_empty() {
                write!(f, " [{}]", flags.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModeSnapshot {
        ModeSnapshot {
            version: SNAPSHOT_VERSION,
            engine_id: Uuid::nil(),
            taken_at: Utc::now(),
            active: Some(ModeId(1)),
            previous: Some(ModeId(0)),
            history: vec![ModeId(0)],
            modes: vec![
                ModeStatus {
                    id: ModeId(0),
                    name: "Idle".to_string(),
                    lazy: false,
                    materialized: true,
                    in_history: true,
                    priority: None,
                },
                ModeStatus {
                    id: ModeId(1),
                    name: "Attack".to_string(),
                    lazy: true,
                    materialized: true,
                    in_history: false,
                    priority: Some(5),
                },
            ],
            pooled: 0,
            phase: "idle".to_string(),
        }
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let snapshot = sample();
        let json = snapshot.to_json().unwrap();
        let restored = ModeSnapshot::from_json(&json).unwrap();

        assert_eq!(restored.active, snapshot.active);
        assert_eq!(restored.history, snapshot.history);
        assert_eq!(restored.modes, snapshot.modes);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = sample();
        snapshot.version = 99;
        let json = snapshot.to_json_pretty().unwrap();

        let result = ModeSnapshot::from_json(&json);
        assert!(matches!(
            result,
            Err(SnapshotError::UnsupportedVersion {
                found: 99,
                supported: 1
            })
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        let result = ModeSnapshot::from_json("{not json");
        assert!(matches!(result, Err(SnapshotError::DeserializationFailed(_))));
    }

    #[test]
    fn display_marks_active_and_flags() {
        let text = sample().to_string();

        assert!(text.contains("active: 1  previous: 0  phase: idle"));
        assert!(text.contains("history: [0]"));
        assert!(text.contains("*   1 Attack (priority 5) [lazy]"));
        assert!(text.contains("    0 Idle [history]"));
    }
}
