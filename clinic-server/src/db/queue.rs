//! Queue Entry Repository

use shared::models::{QueueEntry, QueueStatus};
use sqlx::{SqliteConnection, SqlitePool};

use super::columns::QUEUE_ENTRY;
use crate::scheduling::estimate_wait_minutes;

pub async fn find_by_id(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
) -> Result<Option<QueueEntry>, sqlx::Error> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {QUEUE_ENTRY} FROM queue_entry WHERE tenant_id = ? AND id = ?"
    ))
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The waiting or in-progress entry of an appointment, if any
pub async fn find_active_for_appointment(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    appointment_id: i64,
) -> Result<Option<QueueEntry>, sqlx::Error> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {QUEUE_ENTRY} FROM queue_entry WHERE tenant_id = ? AND appointment_id = ? AND status IN ('waiting', 'in_progress') LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(appointment_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn count_waiting(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    doctor_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM queue_entry WHERE tenant_id = ? AND doctor_id = ? AND status = 'waiting'",
    )
    .bind(tenant_id)
    .bind(doctor_id)
    .fetch_one(&mut *conn)
    .await
}

pub async fn insert(conn: &mut SqliteConnection, e: &QueueEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO queue_entry (id, tenant_id, appointment_id, patient_id, doctor_id, queue_number, position, status, estimated_wait_minutes, checked_in_at, called_at, completed_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(e.id)
    .bind(&e.tenant_id)
    .bind(e.appointment_id)
    .bind(e.patient_id)
    .bind(e.doctor_id)
    .bind(&e.queue_number)
    .bind(e.position)
    .bind(e.status)
    .bind(e.estimated_wait_minutes)
    .bind(e.checked_in_at)
    .bind(e.called_at)
    .bind(e.completed_at)
    .bind(e.created_at)
    .bind(e.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Entries of the tenant: waiting ones by position first, then the rest by check-in
pub async fn find_all(
    pool: &SqlitePool,
    tenant_id: &str,
    doctor_id: Option<i64>,
    status: Option<QueueStatus>,
) -> Result<Vec<QueueEntry>, sqlx::Error> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {QUEUE_ENTRY} FROM queue_entry WHERE tenant_id = ?1 AND (?2 IS NULL OR doctor_id = ?2) AND (?3 IS NULL OR status = ?3) \
         ORDER BY status != 'waiting', position, checked_in_at, id"
    ))
    .bind(tenant_id)
    .bind(doctor_id)
    .bind(status)
    .fetch_all(pool)
    .await
}

/// Lowest-position waiting entry of a doctor
pub async fn find_next_waiting(
    pool: &SqlitePool,
    tenant_id: &str,
    doctor_id: i64,
) -> Result<Option<QueueEntry>, sqlx::Error> {
    sqlx::query_as::<_, QueueEntry>(&format!(
        "SELECT {QUEUE_ENTRY} FROM queue_entry WHERE tenant_id = ? AND doctor_id = ? AND status = 'waiting' ORDER BY position, checked_in_at, id LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(doctor_id)
    .fetch_optional(pool)
    .await
}

/// Move an entry out of `expected`, stamping call/completion times and
/// dropping its position. Returns `false` if the entry was not in `expected`.
pub async fn update_status(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: i64,
    expected: QueueStatus,
    status: QueueStatus,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let called_at = (status == QueueStatus::InProgress).then_some(now);
    let completed_at = matches!(status, QueueStatus::Completed | QueueStatus::Cancelled)
        .then_some(now);
    let rows = sqlx::query(
        "UPDATE queue_entry SET status = ?1, position = 0, estimated_wait_minutes = 0, called_at = COALESCE(called_at, ?2), completed_at = COALESCE(completed_at, ?3), updated_at = ?4 \
         WHERE tenant_id = ?5 AND id = ?6 AND status = ?7",
    )
    .bind(status)
    .bind(called_at)
    .bind(completed_at)
    .bind(now)
    .bind(tenant_id)
    .bind(id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Renumber a doctor's waiting entries 1..n in their current order and
/// refresh their wait estimates.
pub async fn recompact(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    doctor_id: i64,
    slot_minutes: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM queue_entry WHERE tenant_id = ? AND doctor_id = ? AND status = 'waiting' ORDER BY position, checked_in_at, id",
    )
    .bind(tenant_id)
    .bind(doctor_id)
    .fetch_all(&mut *conn)
    .await?;

    for (index, id) in ids.into_iter().enumerate() {
        let position = index as i64 + 1;
        sqlx::query(
            "UPDATE queue_entry SET position = ?1, estimated_wait_minutes = ?2, updated_at = ?3 WHERE id = ?4 AND (position != ?1 OR estimated_wait_minutes != ?2)",
        )
        .bind(position)
        .bind(estimate_wait_minutes(position, slot_minutes))
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
