//! Persisted snapshot layout.
//!
//! A checkpoint keeps what a snapshot needs to be rebuilt in another process:
//! the state value, context, history record and children. Pending effects
//! are not persisted; restoring announces the children again instead.

use crate::core::{ActorRef, Context, HistoryValue, Snapshot, StateValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable checkpoint of a machine snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Checkpoint<C: Context> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Id of the machine the snapshot belongs to
    pub machine_id: String,

    /// Version of the machine definition, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_version: Option<String>,

    pub value: StateValue,

    pub context: C,

    #[serde(default)]
    pub history_value: HistoryValue,

    #[serde(default)]
    pub children: BTreeMap<String, ActorRef>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl<C: Context> Checkpoint<C> {
    /// Capture `snapshot` of the machine `machine_id`.
    pub fn capture(machine_id: &str, machine_version: Option<&str>, snapshot: &Snapshot<C>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            machine_id: machine_id.to_string(),
            machine_version: machine_version.map(str::to_string),
            value: snapshot.value().clone(),
            context: snapshot.context().clone(),
            history_value: snapshot.history_value().clone(),
            children: snapshot.children().clone(),
            done: snapshot.is_done(),
            output: snapshot.output().cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(CheckpointError::SerializationFailed)
    }

    pub fn to_json_pretty(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self).map_err(CheckpointError::SerializationFailed)
    }

    /// Decode a checkpoint, rejecting unknown format versions before
    /// decoding the rest.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let raw: Value = serde_json::from_str(json).map_err(CheckpointError::DeserializationFailed)?;
        let found = raw
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| CheckpointError::ValidationFailed("missing format version".to_string()))?;
        if found != u64::from(CHECKPOINT_VERSION) {
            return Err(CheckpointError::UnsupportedVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                supported: CHECKPOINT_VERSION,
            });
        }
        serde_json::from_value(raw).map_err(CheckpointError::DeserializationFailed)
    }
}
