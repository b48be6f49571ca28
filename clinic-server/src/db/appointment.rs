//! Appointment Repository
//!
//! Writes that place an appointment on the calendar (insert, reschedule)
//! carry the overlap test in their `WHERE` clause, so the check and the write
//! are one statement and two bookings cannot slip past each other.

use shared::models::{Appointment, AppointmentStatus};
use sqlx::SqlitePool;

use super::columns::APPOINTMENT;

/// Appointments that still occupy their slot
const BLOCKING: &str = "deleted_at IS NULL AND status NOT IN ('completed', 'cancelled')";

/// List filters
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<String>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

pub async fn find_by_id(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT} FROM appointment WHERE tenant_id = ? AND id = ? AND deleted_at IS NULL"
    ))
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Whether another blocking appointment of the doctor overlaps `[start, end)`
pub async fn has_conflict(
    pool: &SqlitePool,
    tenant_id: &str,
    doctor_id: i64,
    date: &str,
    start: &str,
    end: &str,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let conflict: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT id FROM appointment WHERE tenant_id = ?1 AND doctor_id = ?2 AND appointment_date = ?3 AND {BLOCKING} AND start_time < ?5 AND end_time > ?4 AND (?6 IS NULL OR id != ?6) LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(doctor_id)
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(conflict.is_some())
}

/// Booked `(start, end)` intervals of a doctor's day, by start time
pub async fn booked_ranges(
    pool: &SqlitePool,
    tenant_id: &str,
    doctor_id: i64,
    date: &str,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(&format!(
        "SELECT start_time, end_time FROM appointment WHERE tenant_id = ? AND doctor_id = ? AND appointment_date = ? AND {BLOCKING} ORDER BY start_time"
    ))
    .bind(tenant_id)
    .bind(doctor_id)
    .bind(date)
    .fetch_all(pool)
    .await
}

pub async fn find_page(
    pool: &SqlitePool,
    tenant_id: &str,
    filter: &AppointmentFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Appointment>, i64), sqlx::Error> {
    let conditions = "tenant_id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR appointment_date = ?2) AND (?3 IS NULL OR doctor_id = ?3) AND (?4 IS NULL OR patient_id = ?4) AND (?5 IS NULL OR status = ?5)";

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM appointment WHERE {conditions}"))
            .bind(tenant_id)
            .bind(&filter.date)
            .bind(filter.doctor_id)
            .bind(filter.patient_id)
            .bind(filter.status)
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT} FROM appointment WHERE {conditions} ORDER BY appointment_date, start_time, id LIMIT ?6 OFFSET ?7"
    ))
    .bind(tenant_id)
    .bind(&filter.date)
    .bind(filter.doctor_id)
    .bind(filter.patient_id)
    .bind(filter.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

/// Insert unless the slot is taken; returns `false` on conflict
pub async fn insert_if_free(pool: &SqlitePool, a: &Appointment) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "INSERT INTO appointment (id, tenant_id, patient_id, doctor_id, appointment_date, start_time, end_time, appointment_type, reason, notes, status, created_by, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13 \
         WHERE NOT EXISTS (SELECT 1 FROM appointment WHERE tenant_id = ?2 AND doctor_id = ?4 AND appointment_date = ?5 AND {BLOCKING} AND start_time < ?7 AND end_time > ?6)"
    ))
    .bind(a.id)
    .bind(&a.tenant_id)
    .bind(a.patient_id)
    .bind(a.doctor_id)
    .bind(&a.appointment_date)
    .bind(&a.start_time)
    .bind(&a.end_time)
    .bind(&a.appointment_type)
    .bind(&a.reason)
    .bind(&a.notes)
    .bind(a.status)
    .bind(&a.created_by)
    .bind(a.created_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Write doctor, time and descriptive fields of an open appointment.
///
/// Returns `false` when the appointment is gone, closed, or the new slot
/// overlaps another booking.
pub async fn update_details_if_free(pool: &SqlitePool, a: &Appointment) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "UPDATE appointment SET doctor_id = ?1, appointment_date = ?2, start_time = ?3, end_time = ?4, appointment_type = ?5, reason = ?6, notes = ?7, updated_at = ?8 \
         WHERE tenant_id = ?9 AND id = ?10 AND {BLOCKING} \
         AND (doctor_id = ?1 OR NOT EXISTS (SELECT 1 FROM queue_entry q WHERE q.tenant_id = ?9 AND q.appointment_id = ?10 AND q.status IN ('waiting', 'in_progress'))) \
         AND NOT EXISTS (SELECT 1 FROM appointment o WHERE o.tenant_id = ?9 AND o.id != ?10 AND o.doctor_id = ?1 AND o.appointment_date = ?2 AND o.deleted_at IS NULL AND o.status NOT IN ('completed', 'cancelled') AND o.start_time < ?4 AND o.end_time > ?3)"
    ))
    .bind(a.doctor_id)
    .bind(&a.appointment_date)
    .bind(&a.start_time)
    .bind(&a.end_time)
    .bind(&a.appointment_type)
    .bind(&a.reason)
    .bind(&a.notes)
    .bind(a.updated_at)
    .bind(&a.tenant_id)
    .bind(a.id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Persist a status change, guarded on the status it was read with.
///
/// Returns `false` if another request changed the status in between.
pub async fn update_status(
    pool: &SqlitePool,
    a: &Appointment,
    expected: AppointmentStatus,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE appointment SET status = ?1, arrived_at = ?2, started_at = ?3, completed_at = ?4, cancelled_at = ?5, cancelled_by = ?6, cancellation_reason = ?7, notes = ?8, updated_at = ?9 \
         WHERE tenant_id = ?10 AND id = ?11 AND deleted_at IS NULL AND status = ?12",
    )
    .bind(a.status)
    .bind(a.arrived_at)
    .bind(a.started_at)
    .bind(a.completed_at)
    .bind(a.cancelled_at)
    .bind(&a.cancelled_by)
    .bind(&a.cancellation_reason)
    .bind(&a.notes)
    .bind(a.updated_at)
    .bind(&a.tenant_id)
    .bind(a.id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn soft_delete(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE appointment SET deleted_at = ?1, updated_at = ?1 WHERE tenant_id = ?2 AND id = ?3 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(tenant_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Appointments of a patient that are neither completed nor cancelled
pub async fn count_open_for_patient(
    pool: &SqlitePool,
    tenant_id: &str,
    patient_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM appointment WHERE tenant_id = ? AND patient_id = ? AND {BLOCKING}"
    ))
    .bind(tenant_id)
    .bind(patient_id)
    .fetch_one(pool)
    .await
}
