use serde::{Deserialize, Serialize};

/// Machine-readable tag explaining why a booking request was turned down.
/// The API layer serializes this into response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    ResourceBlocked,
    OutsideSchedule,
    BlackoutDate,
    TimeConflict,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::ResourceBlocked => "resource_blocked",
            DenyReason::OutsideSchedule => "outside_schedule",
            DenyReason::BlackoutDate => "blackout_date",
            DenyReason::TimeConflict => "time_conflict",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("time slot is already booked")]
    Conflict,

    #[error("resource is unavailable: {0}")]
    Unavailable(DenyReason),

    #[error("{0}")]
    Validation(String),

    #[error("access denied")]
    Forbidden,

    #[error("store error: {0}")]
    Store(String),
}

impl CoreError {
    /// The deny tag carried by admission failures, if this is one.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            CoreError::Unavailable(reason) => Some(*reason),
            CoreError::Conflict => Some(DenyReason::TimeConflict),
            _ => None,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
