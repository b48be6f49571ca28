//! Appointment notifications
//!
//! Delivery is best-effort: callers log a failed notification and carry on.

use async_trait::async_trait;
use shared::models::Appointment;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Sink for patient-facing appointment messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn appointment_booked(&self, appointment: &Appointment) -> Result<(), NotifyError>;

    async fn appointment_cancelled(&self, appointment: &Appointment) -> Result<(), NotifyError>;
}

/// Writes a structured log line per notification
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn appointment_booked(&self, appointment: &Appointment) -> Result<(), NotifyError> {
        tracing::info!(
            tenant_id = %appointment.tenant_id,
            appointment_id = appointment.id,
            patient_id = appointment.patient_id,
            date = %appointment.appointment_date,
            start_time = %appointment.start_time,
            "Appointment confirmation queued"
        );
        Ok(())
    }

    async fn appointment_cancelled(&self, appointment: &Appointment) -> Result<(), NotifyError> {
        tracing::info!(
            tenant_id = %appointment.tenant_id,
            appointment_id = appointment.id,
            patient_id = appointment.patient_id,
            reason = appointment.cancellation_reason.as_deref().unwrap_or(""),
            "Appointment cancellation notice queued"
        );
        Ok(())
    }
}
