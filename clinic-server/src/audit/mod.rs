//! Audit trail
//!
//! Every mutation of a patient, appointment, queue entry or invoice leaves an
//! `audit_log` row naming the actor and carrying a snapshot or diff. Writes
//! are best-effort: a failed audit insert is logged and the operation that
//! triggered it still succeeds.

pub mod diff;

pub use diff::{create_diff, create_snapshot, create_transition};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::TenantIdentity;
use crate::db::audit::{self, NewAuditEntry};

/// Audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    PatientCreated,
    PatientUpdated,
    PatientDeleted,
    AppointmentCreated,
    AppointmentUpdated,
    AppointmentStatusChanged,
    AppointmentDeleted,
    QueueEntryCreated,
    QueueEntryStatusChanged,
    InvoiceCreated,
    InvoiceUpdated,
    InvoiceCancelled,
    PaymentRecorded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientCreated => "patient_created",
            Self::PatientUpdated => "patient_updated",
            Self::PatientDeleted => "patient_deleted",
            Self::AppointmentCreated => "appointment_created",
            Self::AppointmentUpdated => "appointment_updated",
            Self::AppointmentStatusChanged => "appointment_status_changed",
            Self::AppointmentDeleted => "appointment_deleted",
            Self::QueueEntryCreated => "queue_entry_created",
            Self::QueueEntryStatusChanged => "queue_entry_status_changed",
            Self::InvoiceCreated => "invoice_created",
            Self::InvoiceUpdated => "invoice_updated",
            Self::InvoiceCancelled => "invoice_cancelled",
            Self::PaymentRecorded => "payment_recorded",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes audit rows for the authenticated actor
#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an entry; failures are logged, never returned
    pub async fn log(
        &self,
        identity: &TenantIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: impl ToString,
        details: serde_json::Value,
    ) {
        let entry = NewAuditEntry {
            tenant_id: &identity.tenant_id,
            action: action.as_str(),
            resource_type,
            resource_id: resource_id.to_string(),
            actor_id: Some(&identity.user_id),
            actor_name: Some(&identity.name),
            details: Some(details),
        };
        if let Err(e) = audit::log(&self.pool, &entry, shared::util::now_millis()).await {
            tracing::error!(
                action = %action,
                resource_type,
                resource_id = %entry.resource_id,
                error = %e,
                "Failed to write audit log"
            );
        }
    }
}
