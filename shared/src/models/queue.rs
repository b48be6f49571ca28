//! Queue Entry Model (same-day waiting list)

use serde::{Deserialize, Serialize};

/// Queue entry status, a subset of the appointment lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum QueueStatus {
    #[default]
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl QueueStatus {
    /// Waiting and in-progress entries count as active for an appointment
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Queue entry entity
///
/// `position` is 1-based per doctor among waiting entries and is 0 once the
/// entry leaves the waiting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct QueueEntry {
    pub id: i64,
    pub tenant_id: String,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    /// Human-readable sequence number (`Q-0001`)
    pub queue_number: String,
    pub position: i64,
    pub status: QueueStatus,
    pub estimated_wait_minutes: i64,
    pub checked_in_at: i64,
    pub called_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Status change payload for a queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusUpdate {
    pub status: QueueStatus,
}

/// Call-next payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCallNext {
    pub doctor_id: i64,
}
