//! Engine-wide settings.

use serde::{Deserialize, Serialize};

/// Engine-wide settings. Deserializable so hosts can keep it alongside
/// their own configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of remembered modes. Zero disables history.
    pub history_limit: usize,

    /// Maximum number of retired instances kept per concrete mode type.
    /// Zero disables pooling: unloaded instances are destroyed.
    pub pool_capacity: usize,

    /// Whether `select` records the mode being left. `go_back` never does.
    pub record_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            pool_capacity: 8,
            record_history: true,
        }
    }
}
