//! Checkpoints along the observer's route, each tagged with the event it
//! publishes when reached.

use crate::error::{Result, TelemetryError};
use crate::telemetry::EventKind;
use crate::types::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub position: Vec3,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default)]
pub struct CheckpointTrack {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointTrack {
    pub fn new(checkpoints: Vec<Checkpoint>) -> Self {
        Self { checkpoints }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    /// Event kind for reaching checkpoint `index`.
    pub fn activate(&self, index: usize) -> Result<EventKind> {
        self.checkpoints
            .get(index)
            .map(|c| c.kind)
            .ok_or(TelemetryError::CheckpointOutOfRange {
                index,
                len: self.checkpoints.len(),
            })
    }
}
