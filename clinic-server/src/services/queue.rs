//! Queue service: same-day waiting list per doctor
//!
//! Positions are 1-based among a doctor's waiting entries. Whenever an entry
//! leaves `waiting` the remaining ones are renumbered and their wait
//! estimates refreshed in the same transaction.

use shared::error::{AppError, ErrorCode};
use shared::models::{Appointment, AppointmentStatus, QueueEntry, QueueStatus};

use crate::audit::{AuditAction, create_snapshot, create_transition};
use crate::auth::TenantIdentity;
use crate::db::queue as queue_db;
use crate::db::sequence::{self, Sequence};
use crate::error::ServiceResult;
use crate::scheduling::estimate_wait_minutes;
use crate::services::appointment;
use crate::state::AppState;

const RESOURCE: &str = "queue_entry";

pub async fn get(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<QueueEntry> {
    queue_db::find_by_id(&state.pool, &identity.tenant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::QueueEntryNotFound).into())
}

pub async fn list(
    state: &AppState,
    identity: &TenantIdentity,
    doctor_id: Option<i64>,
    status: Option<QueueStatus>,
) -> ServiceResult<Vec<QueueEntry>> {
    Ok(queue_db::find_all(&state.pool, &identity.tenant_id, doctor_id, status).await?)
}

/// Put an appointment in its doctor's queue.
///
/// Idempotent: an appointment with an active entry gets that entry back.
pub async fn create_for_appointment(
    state: &AppState,
    identity: &TenantIdentity,
    appointment: &Appointment,
) -> ServiceResult<QueueEntry> {
    let tenant_id = &identity.tenant_id;

    {
        let mut conn = state.pool.acquire().await?;
        if let Some(existing) =
            queue_db::find_active_for_appointment(&mut conn, tenant_id, appointment.id).await?
        {
            return Ok(existing);
        }
    }

    let mut tx = state.pool.begin().await?;
    // Advancing the counter first takes the write lock, so the lookup and
    // count below cannot interleave with another check-in.
    let queue_number = sequence::next_number(&mut tx, tenant_id, Sequence::Queue).await?;

    if let Some(existing) =
        queue_db::find_active_for_appointment(&mut tx, tenant_id, appointment.id).await?
    {
        tx.rollback().await?;
        return Ok(existing);
    }

    let waiting = queue_db::count_waiting(&mut tx, tenant_id, appointment.doctor_id).await?;
    let position = waiting + 1;
    let now = shared::util::now_millis();
    let entry = QueueEntry {
        id: shared::util::snowflake_id(),
        tenant_id: tenant_id.clone(),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
        queue_number,
        position,
        status: QueueStatus::Waiting,
        estimated_wait_minutes: estimate_wait_minutes(position, state.config.queue_slot_minutes),
        checked_in_at: now,
        called_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    queue_db::insert(&mut tx, &entry).await?;
    tx.commit().await?;

    tracing::info!(
        tenant_id = %tenant_id,
        appointment_id = appointment.id,
        queue_number = %entry.queue_number,
        position,
        "Patient added to queue"
    );

    state
        .audit
        .log(
            identity,
            AuditAction::QueueEntryCreated,
            RESOURCE,
            entry.id,
            create_snapshot(&entry, RESOURCE),
        )
        .await;

    Ok(entry)
}

/// Allowed queue moves; `waiting` is never re-entered.
fn queue_transition_allowed(from: QueueStatus, to: QueueStatus) -> bool {
    matches!(
        (from, to),
        (QueueStatus::Waiting, QueueStatus::InProgress)
            | (QueueStatus::Waiting, QueueStatus::Cancelled)
            | (QueueStatus::InProgress, QueueStatus::Completed)
            | (QueueStatus::InProgress, QueueStatus::Cancelled)
    )
}

/// Apply a move and renumber the doctor's waiting list if the entry left it.
/// Returns `false` when the entry was no longer in `entry.status`.
async fn move_entry(
    state: &AppState,
    entry: &QueueEntry,
    target: QueueStatus,
) -> ServiceResult<bool> {
    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;
    let moved = queue_db::update_status(
        &mut tx,
        &entry.tenant_id,
        entry.id,
        entry.status,
        target,
        now,
    )
    .await?;
    if moved && entry.status == QueueStatus::Waiting {
        queue_db::recompact(
            &mut tx,
            &entry.tenant_id,
            entry.doctor_id,
            state.config.queue_slot_minutes,
            now,
        )
        .await?;
    }
    tx.commit().await?;
    Ok(moved)
}

/// Appointment status that mirrors a queue status
fn appointment_status_for(status: QueueStatus) -> Option<AppointmentStatus> {
    match status {
        QueueStatus::Waiting => None,
        QueueStatus::InProgress => Some(AppointmentStatus::InProgress),
        QueueStatus::Completed => Some(AppointmentStatus::Completed),
        QueueStatus::Cancelled => Some(AppointmentStatus::Cancelled),
    }
}

/// Carry a queue move over to the appointment; failures are only logged.
async fn sync_appointment(
    state: &AppState,
    identity: &TenantIdentity,
    entry: &QueueEntry,
    status: QueueStatus,
) {
    let Some(target) = appointment_status_for(status) else {
        return;
    };
    if let Err(e) =
        appointment::apply_status(state, identity, entry.appointment_id, target, None, None, false)
            .await
    {
        tracing::warn!(
            appointment_id = entry.appointment_id,
            queue_entry_id = entry.id,
            target = %target,
            error = %e,
            "Failed to sync appointment with queue entry"
        );
    }
}

/// Call the next waiting patient of a doctor
pub async fn call_next(
    state: &AppState,
    identity: &TenantIdentity,
    doctor_id: i64,
) -> ServiceResult<QueueEntry> {
    let tenant_id = &identity.tenant_id;

    // A concurrent call may take the head first; then the next one is tried
    let before = loop {
        let Some(head) = queue_db::find_next_waiting(&state.pool, tenant_id, doctor_id).await?
        else {
            return Err(AppError::new(ErrorCode::QueueEmpty)
                .with_detail("doctor_id", doctor_id)
                .into());
        };
        if move_entry(state, &head, QueueStatus::InProgress).await? {
            break head;
        }
    };

    let after = get(state, identity, before.id).await?;
    tracing::info!(
        tenant_id = %tenant_id,
        doctor_id,
        queue_number = %after.queue_number,
        "Called next patient"
    );

    state
        .audit
        .log(
            identity,
            AuditAction::QueueEntryStatusChanged,
            RESOURCE,
            after.id,
            create_transition(&before, &after, RESOURCE),
        )
        .await;

    sync_appointment(state, identity, &after, QueueStatus::InProgress).await;
    Ok(after)
}

/// Change an entry's status from the queue screen
pub async fn update_status(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    target: QueueStatus,
) -> ServiceResult<QueueEntry> {
    let before = get(state, identity, id).await?;
    if !before.status.is_active() {
        return Err(AppError::new(ErrorCode::QueueEntryClosed).into());
    }
    if before.status == target {
        return Ok(before);
    }
    if !queue_transition_allowed(before.status, target) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!(
                "Cannot change queue entry from {} to {}",
                before.status.as_str(),
                target.as_str()
            ),
        )
        .into());
    }

    if !move_entry(state, &before, target).await? {
        return Err(AppError::with_message(
            ErrorCode::QueueEntryClosed,
            "Queue entry was changed by another request",
        )
        .into());
    }
    let after = get(state, identity, id).await?;

    state
        .audit
        .log(
            identity,
            AuditAction::QueueEntryStatusChanged,
            RESOURCE,
            id,
            create_transition(&before, &after, RESOURCE),
        )
        .await;

    sync_appointment(state, identity, &after, target).await;
    Ok(after)
}

/// Follow an appointment transition with its active queue entry.
///
/// Called after the appointment changed; a missing entry is not an error.
pub async fn sync_with_appointment(
    state: &AppState,
    identity: &TenantIdentity,
    appointment_id: i64,
    status: AppointmentStatus,
) -> ServiceResult<()> {
    let target = match status {
        AppointmentStatus::InProgress => QueueStatus::InProgress,
        AppointmentStatus::Completed => QueueStatus::Completed,
        AppointmentStatus::Cancelled => QueueStatus::Cancelled,
        _ => return Ok(()),
    };

    let entry = {
        let mut conn = state.pool.acquire().await?;
        queue_db::find_active_for_appointment(&mut conn, &identity.tenant_id, appointment_id)
            .await?
    };
    let Some(entry) = entry else {
        return Ok(());
    };
    if entry.status == target {
        return Ok(());
    }

    // A waiting entry whose appointment completed skips straight to completed
    if move_entry(state, &entry, target).await? {
        let after = get(state, identity, entry.id).await?;
        state
            .audit
            .log(
                identity,
                AuditAction::QueueEntryStatusChanged,
                RESOURCE,
                entry.id,
                create_transition(&entry, &after, RESOURCE),
            )
            .await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_transitions() {
        assert!(queue_transition_allowed(QueueStatus::Waiting, QueueStatus::InProgress));
        assert!(queue_transition_allowed(QueueStatus::InProgress, QueueStatus::Completed));
        assert!(!queue_transition_allowed(QueueStatus::Waiting, QueueStatus::Completed));
        assert!(!queue_transition_allowed(QueueStatus::InProgress, QueueStatus::Waiting));
        assert!(!queue_transition_allowed(QueueStatus::Completed, QueueStatus::Cancelled));
    }

    #[test]
    fn test_appointment_mirror() {
        assert_eq!(appointment_status_for(QueueStatus::Waiting), None);
        assert_eq!(
            appointment_status_for(QueueStatus::Completed),
            Some(AppointmentStatus::Completed)
        );
    }
}
