//! Unified error codes for the clinic service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Tenant errors
//! - 4xxx: Appointment errors
//! - 5xxx: Queue errors
//! - 6xxx: Billing errors
//! - 7xxx: Patient errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that the front-end can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Tenant ====================
    /// No tenant bound to the request
    TenantNotSelected = 3001,

    // ==================== 4xxx: Appointment ====================
    /// Appointment not found
    AppointmentNotFound = 4001,
    /// Requested interval overlaps another appointment of the doctor
    TimeSlotUnavailable = 4002,
    /// Appointment is completed or cancelled
    AppointmentClosed = 4003,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4004,
    /// Start/end time malformed or reversed
    InvalidTimeRange = 4005,

    // ==================== 5xxx: Queue ====================
    /// Queue entry not found
    QueueEntryNotFound = 5001,
    /// No waiting entry for the doctor
    QueueEmpty = 5002,
    /// Queue entry is already completed or cancelled
    QueueEntryClosed = 5003,

    // ==================== 6xxx: Billing ====================
    /// Invoice not found
    InvoiceNotFound = 6001,
    /// Invoice can no longer be edited
    InvoiceNotEditable = 6002,
    /// Invoice is cancelled
    InvoiceCancelled = 6003,
    /// Payment exceeds the outstanding balance
    PaymentExceedsBalance = 6004,
    /// Payment amount must be positive
    PaymentInvalidAmount = 6005,
    /// Invoice is already fully paid
    InvoiceAlreadyPaid = 6006,

    // ==================== 7xxx: Patient ====================
    /// Patient not found
    PatientNotFound = 7001,
    /// Patient still has open appointments
    PatientHasOpenAppointments = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Numeric value of the code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field missing",
            ErrorCode::ValueOutOfRange => "Value out of range",

            // Auth
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Tenant
            ErrorCode::TenantNotSelected => "No tenant selected",

            // Appointment
            ErrorCode::AppointmentNotFound => "Appointment not found",
            ErrorCode::TimeSlotUnavailable => "Time slot is not available",
            ErrorCode::AppointmentClosed => "Cannot update completed or cancelled appointment",
            ErrorCode::InvalidStatusTransition => "Invalid appointment status transition",
            ErrorCode::InvalidTimeRange => "End time must be after start time",

            // Queue
            ErrorCode::QueueEntryNotFound => "Queue entry not found",
            ErrorCode::QueueEmpty => "No patients waiting",
            ErrorCode::QueueEntryClosed => "Queue entry is already closed",

            // Billing
            ErrorCode::InvoiceNotFound => "Invoice not found",
            ErrorCode::InvoiceNotEditable => "Invoice can no longer be edited",
            ErrorCode::InvoiceCancelled => "Invoice is cancelled",
            ErrorCode::PaymentExceedsBalance => "Payment exceeds outstanding balance",
            ErrorCode::PaymentInvalidAmount => "Payment amount must be positive",
            ErrorCode::InvoiceAlreadyPaid => "Invoice is already paid",

            // Patient
            ErrorCode::PatientNotFound => "Patient not found",
            ErrorCode::PatientHasOpenAppointments => "Patient has open appointments",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Tenant
            3001 => Ok(ErrorCode::TenantNotSelected),

            // Appointment
            4001 => Ok(ErrorCode::AppointmentNotFound),
            4002 => Ok(ErrorCode::TimeSlotUnavailable),
            4003 => Ok(ErrorCode::AppointmentClosed),
            4004 => Ok(ErrorCode::InvalidStatusTransition),
            4005 => Ok(ErrorCode::InvalidTimeRange),

            // Queue
            5001 => Ok(ErrorCode::QueueEntryNotFound),
            5002 => Ok(ErrorCode::QueueEmpty),
            5003 => Ok(ErrorCode::QueueEntryClosed),

            // Billing
            6001 => Ok(ErrorCode::InvoiceNotFound),
            6002 => Ok(ErrorCode::InvoiceNotEditable),
            6003 => Ok(ErrorCode::InvoiceCancelled),
            6004 => Ok(ErrorCode::PaymentExceedsBalance),
            6005 => Ok(ErrorCode::PaymentInvalidAmount),
            6006 => Ok(ErrorCode::InvoiceAlreadyPaid),

            // Patient
            7001 => Ok(ErrorCode::PatientNotFound),
            7002 => Ok(ErrorCode::PatientHasOpenAppointments),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
