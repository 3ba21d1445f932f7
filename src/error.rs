//! Error taxonomy for the telemetry core.

use thiserror::Error;

use crate::scene::PoiKey;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A group marker references a POI slot the scene does not have.
    #[error("group {group} marker {marker} references POI slot {key}, but the scene holds {len}")]
    GroupMemberOutOfRange {
        group: usize,
        marker: usize,
        key: PoiKey,
        len: usize,
    },

    #[error("checkpoint index {index} out of range (track has {len})")]
    CheckpointOutOfRange { index: usize, len: usize },

    #[error("invalid telemetry config: {0}")]
    InvalidConfig(String),

    #[error("required collaborator missing: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid scene description: {0}")]
    InvalidScene(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
