//! Appointment Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Arrived,
    InQueue,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Arrived,
        Self::InQueue,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Completed and cancelled appointments accept no further changes
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Arrived => "arrived",
            Self::InQueue => "in_queue",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment entity (tenant-scoped, soft-deletable)
///
/// `appointment_date` is `YYYY-MM-DD`; `start_time`/`end_time` are `HH:MM`
/// on that date and describe the half-open interval `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Appointment {
    pub id: i64,
    pub tenant_id: String,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_date: String,
    pub start_time: String,
    pub end_time: String,
    pub appointment_type: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub arrived_at: Option<i64>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

/// Create appointment payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppointmentCreate {
    pub patient_id: i64,
    pub doctor_id: i64,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    #[validate(length(max = 100))]
    pub appointment_type: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Update appointment payload (time, doctor or descriptive fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppointmentUpdate {
    pub doctor_id: Option<i64>,
    pub appointment_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[validate(length(max = 100))]
    pub appointment_type: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppointmentStatusUpdate {
    pub status: AppointmentStatus,
    #[validate(length(max = 500))]
    pub cancellation_reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Result of an availability check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
}

/// A bookable interval of a doctor's day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}
