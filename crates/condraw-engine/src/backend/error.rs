use crate::command::Stage;

use super::BufferRegion;

/// Errors raised by a [`Backend`](super::Backend).
///
/// None of these are retryable: missing capabilities and failed creation abort
/// startup, the rest indicate a defect in how the backend was driven.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("device lacks required capability: {0}")]
    MissingCapability(&'static str),

    #[error("failed to create {kind} `{label}`: {reason}")]
    Creation {
        kind: &'static str,
        label: String,
        reason: String,
    },

    #[error("unknown {kind} handle #{index}")]
    UnknownHandle { kind: &'static str, index: u32 },

    #[error("region {}..{} exceeds buffer of {capacity} bytes", region.offset, region.end())]
    RegionOutOfBounds { region: BufferRegion, capacity: u64 },

    #[error("{stage:?} access to {region:?} races an unsynchronized {writer:?} write")]
    Hazard {
        stage: Stage,
        writer: Stage,
        region: BufferRegion,
    },

    #[error("malformed command list: {0}")]
    Malformed(String),

    #[error("device error: {0}")]
    Device(String),
}

impl BackendError {
    pub(crate) fn creation(kind: &'static str, label: &str, reason: impl ToString) -> Self {
        Self::Creation {
            kind,
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }
}
