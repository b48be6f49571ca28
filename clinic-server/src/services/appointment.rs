//! Appointment service
//!
//! Booking with conflict detection, rescheduling, and the status lifecycle.
//! Queue bookkeeping, notifications and audit writes that follow a change
//! are best-effort and never undo it.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Appointment, AppointmentCreate, AppointmentStatus, AppointmentStatusUpdate, AppointmentUpdate,
    TimeSlot,
};
use shared::response::{PageQuery, PaginatedResponse};
use validator::Validate;

use crate::audit::{AuditAction, create_diff, create_snapshot, create_transition};
use crate::auth::TenantIdentity;
use crate::db::appointment::{self as appointment_db, AppointmentFilter};
use crate::db::patient as patient_db;
use crate::db::queue as queue_db;
use crate::error::{ServiceError, ServiceResult};
use crate::scheduling::{TimeRange, ensure_transition};
use crate::services::queue;
use crate::state::AppState;
use crate::utils::time::{canonical_date, parse_time};
use crate::utils::validation::normalize_optional;

const RESOURCE: &str = "appointment";

fn slot_unavailable(doctor_id: i64, date: &str, range: &TimeRange) -> AppError {
    AppError::new(ErrorCode::TimeSlotUnavailable)
        .with_detail("doctor_id", doctor_id)
        .with_detail("appointment_date", date)
        .with_detail("start_time", range.start_str())
        .with_detail("end_time", range.end_str())
}

/// A queued or called appointment stays with the doctor whose list it is on
fn doctor_locked_by_queue(id: i64) -> ServiceError {
    AppError::with_message(
        ErrorCode::AppointmentClosed,
        "Cannot change the doctor of an appointment that is in the queue",
    )
    .with_detail("appointment_id", id)
    .into()
}

async fn has_active_queue_entry(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
) -> ServiceResult<bool> {
    let mut conn = state.pool.acquire().await?;
    Ok(
        queue_db::find_active_for_appointment(&mut conn, &identity.tenant_id, id)
            .await?
            .is_some(),
    )
}

pub async fn get(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
) -> ServiceResult<Appointment> {
    appointment_db::find_by_id(&state.pool, &identity.tenant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AppointmentNotFound).into())
}

pub async fn list(
    state: &AppState,
    identity: &TenantIdentity,
    mut filter: AppointmentFilter,
    page: PageQuery,
) -> ServiceResult<PaginatedResponse<Appointment>> {
    filter.date = filter.date.map(|d| canonical_date(&d)).transpose()?;
    let (items, total) = appointment_db::find_page(
        &state.pool,
        &identity.tenant_id,
        &filter,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(PaginatedResponse::new(
        items,
        page.page(),
        page.per_page(),
        total as u64,
    ))
}

/// `true` when no open appointment of the doctor overlaps `[start, end)` on `date`.
///
/// `exclude_id` skips the appointment being rescheduled.
pub async fn check_availability(
    state: &AppState,
    identity: &TenantIdentity,
    doctor_id: i64,
    date: &str,
    start: &str,
    end: &str,
    exclude_id: Option<i64>,
) -> ServiceResult<bool> {
    let range = TimeRange::parse(start, end)?;
    let date = canonical_date(date)?;
    let conflict = appointment_db::has_conflict(
        &state.pool,
        &identity.tenant_id,
        doctor_id,
        &date,
        &range.start_str(),
        &range.end_str(),
        exclude_id,
    )
    .await?;
    Ok(!conflict)
}

/// Free slots of `slot_minutes` within `[day_start, day_end)` of a doctor's day
pub async fn available_slots(
    state: &AppState,
    identity: &TenantIdentity,
    doctor_id: i64,
    date: &str,
    day_start: &str,
    day_end: &str,
    slot_minutes: i64,
) -> ServiceResult<Vec<TimeSlot>> {
    if !(5..=480).contains(&slot_minutes) {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            "slot_minutes must be between 5 and 480",
        )
        .into());
    }
    let day = TimeRange::parse(day_start, day_end)?;
    let date = canonical_date(date)?;

    let booked: Vec<TimeRange> =
        appointment_db::booked_ranges(&state.pool, &identity.tenant_id, doctor_id, &date)
            .await?
            .into_iter()
            .filter_map(|(start, end)| match (parse_time(&start), parse_time(&end)) {
                (Ok(s), Ok(e)) => Some(TimeRange { start: s, end: e }),
                _ => {
                    tracing::warn!(%start, %end, "Skipping appointment with unparsable time");
                    None
                }
            })
            .collect();

    Ok(day
        .slots(slot_minutes)
        .into_iter()
        .filter(|slot| !booked.iter().any(|b| b.overlaps(slot)))
        .map(|slot| TimeSlot {
            start_time: slot.start_str(),
            end_time: slot.end_str(),
        })
        .collect())
}

pub async fn create(
    state: &AppState,
    identity: &TenantIdentity,
    payload: AppointmentCreate,
) -> ServiceResult<Appointment> {
    payload.validate()?;
    let range = TimeRange::parse(&payload.start_time, &payload.end_time)?;
    let date = canonical_date(&payload.appointment_date)?;

    if !patient_db::exists(&state.pool, &identity.tenant_id, payload.patient_id).await? {
        return Err(AppError::new(ErrorCode::PatientNotFound)
            .with_detail("patient_id", payload.patient_id)
            .into());
    }

    if !check_availability(
        state,
        identity,
        payload.doctor_id,
        &date,
        &range.start_str(),
        &range.end_str(),
        None,
    )
    .await?
    {
        return Err(slot_unavailable(payload.doctor_id, &date, &range).into());
    }

    let now = shared::util::now_millis();
    let appointment = Appointment {
        id: shared::util::snowflake_id(),
        tenant_id: identity.tenant_id.clone(),
        patient_id: payload.patient_id,
        doctor_id: payload.doctor_id,
        appointment_date: date.clone(),
        start_time: range.start_str(),
        end_time: range.end_str(),
        appointment_type: normalize_optional(payload.appointment_type),
        reason: normalize_optional(payload.reason),
        notes: normalize_optional(payload.notes),
        status: AppointmentStatus::Scheduled,
        arrived_at: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        created_by: Some(identity.user_id.clone()),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    // The insert re-checks the slot atomically in case of a concurrent booking
    if !appointment_db::insert_if_free(&state.pool, &appointment).await? {
        return Err(slot_unavailable(appointment.doctor_id, &date, &range).into());
    }
    let appointment = get(state, identity, appointment.id).await?;

    tracing::info!(
        tenant_id = %identity.tenant_id,
        appointment_id = appointment.id,
        doctor_id = appointment.doctor_id,
        date = %appointment.appointment_date,
        start_time = %appointment.start_time,
        "Appointment booked"
    );

    state
        .audit
        .log(
            identity,
            AuditAction::AppointmentCreated,
            RESOURCE,
            appointment.id,
            create_snapshot(&appointment, RESOURCE),
        )
        .await;

    if let Err(e) = state.notifier.appointment_booked(&appointment).await {
        tracing::warn!(appointment_id = appointment.id, error = %e, "Booking notification failed");
    }

    Ok(appointment)
}

/// Reschedule or edit an open appointment
pub async fn update(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    payload: AppointmentUpdate,
) -> ServiceResult<Appointment> {
    payload.validate()?;
    let before = get(state, identity, id).await?;
    if before.status.is_terminal() {
        return Err(AppError::new(ErrorCode::AppointmentClosed).into());
    }

    let range = TimeRange::parse(
        payload.start_time.as_deref().unwrap_or(&before.start_time),
        payload.end_time.as_deref().unwrap_or(&before.end_time),
    )?;
    let date = match &payload.appointment_date {
        Some(d) => canonical_date(d)?,
        None => before.appointment_date.clone(),
    };

    let mut after = before.clone();
    after.doctor_id = payload.doctor_id.unwrap_or(before.doctor_id);
    after.appointment_date = date;
    after.start_time = range.start_str();
    after.end_time = range.end_str();
    if payload.appointment_type.is_some() {
        after.appointment_type = normalize_optional(payload.appointment_type);
    }
    if payload.reason.is_some() {
        after.reason = normalize_optional(payload.reason);
    }
    if payload.notes.is_some() {
        after.notes = normalize_optional(payload.notes);
    }
    after.updated_at = shared::util::now_millis();

    let doctor_changed = after.doctor_id != before.doctor_id;
    if doctor_changed && has_active_queue_entry(state, identity, id).await? {
        return Err(doctor_locked_by_queue(id));
    }

    let moved = doctor_changed
        || after.appointment_date != before.appointment_date
        || after.start_time != before.start_time
        || after.end_time != before.end_time;

    if moved
        && !check_availability(
            state,
            identity,
            after.doctor_id,
            &after.appointment_date,
            &after.start_time,
            &after.end_time,
            Some(id),
        )
        .await?
    {
        return Err(slot_unavailable(after.doctor_id, &after.appointment_date, &range).into());
    }

    if !appointment_db::update_details_if_free(&state.pool, &after).await? {
        // Lost a race: closed, deleted or the slot was taken meanwhile
        let current = get(state, identity, id).await?;
        if current.status.is_terminal() {
            return Err(AppError::new(ErrorCode::AppointmentClosed).into());
        }
        if doctor_changed && has_active_queue_entry(state, identity, id).await? {
            return Err(doctor_locked_by_queue(id));
        }
        return Err(slot_unavailable(after.doctor_id, &after.appointment_date, &range).into());
    }
    let after = get(state, identity, id).await?;

    state
        .audit
        .log(
            identity,
            AuditAction::AppointmentUpdated,
            RESOURCE,
            id,
            create_diff(&before, &after, RESOURCE),
        )
        .await;

    Ok(after)
}

/// Status change requested through the API
pub async fn update_status(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    payload: AppointmentStatusUpdate,
) -> ServiceResult<Appointment> {
    payload.validate()?;
    apply_status(
        state,
        identity,
        id,
        payload.status,
        normalize_optional(payload.cancellation_reason),
        normalize_optional(payload.notes),
        true,
    )
    .await
}

/// Stamp the lifecycle timestamp of `target`, keeping any earlier stamp
fn stamp(appointment: &mut Appointment, target: AppointmentStatus, actor: &str, now: i64) {
    match target {
        AppointmentStatus::Arrived => {
            appointment.arrived_at.get_or_insert(now);
        }
        AppointmentStatus::InProgress => {
            appointment.started_at.get_or_insert(now);
        }
        AppointmentStatus::Completed => {
            appointment.completed_at.get_or_insert(now);
        }
        AppointmentStatus::Cancelled => {
            appointment.cancelled_at.get_or_insert(now);
            appointment.cancelled_by.get_or_insert_with(|| actor.to_string());
        }
        AppointmentStatus::Scheduled | AppointmentStatus::Confirmed | AppointmentStatus::InQueue => {}
    }
}

/// Move an appointment along its lifecycle.
///
/// With `sync_queue` the appointment's queue entry follows: `in_queue`
/// creates one, `in_progress`/`completed`/`cancelled` carry it along. The
/// queue service passes `false` when the change originates from the queue.
pub async fn apply_status(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    target: AppointmentStatus,
    cancellation_reason: Option<String>,
    notes: Option<String>,
    sync_queue: bool,
) -> ServiceResult<Appointment> {
    let before = get(state, identity, id).await?;
    ensure_transition(before.status, target)?;

    let after = if before.status == target {
        before.clone()
    } else {
        let now = shared::util::now_millis();
        let mut after = before.clone();
        after.status = target;
        stamp(&mut after, target, &identity.user_id, now);
        if target == AppointmentStatus::Cancelled {
            after.cancellation_reason = cancellation_reason.or(after.cancellation_reason);
        }
        if notes.is_some() {
            after.notes = notes;
        }
        after.updated_at = now;

        if !appointment_db::update_status(&state.pool, &after, before.status).await? {
            let current = get(state, identity, id).await?;
            if current.status.is_terminal() {
                return Err(AppError::new(ErrorCode::AppointmentClosed).into());
            }
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "Appointment status was changed by another request",
            )
            .into());
        }
        let after = get(state, identity, id).await?;

        tracing::info!(
            tenant_id = %identity.tenant_id,
            appointment_id = id,
            from = %before.status,
            to = %target,
            "Appointment status changed"
        );

        state
            .audit
            .log(
                identity,
                AuditAction::AppointmentStatusChanged,
                RESOURCE,
                id,
                create_transition(&before, &after, RESOURCE),
            )
            .await;

        if target == AppointmentStatus::Cancelled
            && let Err(e) = state.notifier.appointment_cancelled(&after).await
        {
            tracing::warn!(appointment_id = id, error = %e, "Cancellation notification failed");
        }
        after
    };

    if sync_queue {
        sync_queue_entry(state, identity, &after, target).await;
    }
    Ok(after)
}

async fn sync_queue_entry(
    state: &AppState,
    identity: &TenantIdentity,
    appointment: &Appointment,
    target: AppointmentStatus,
) {
    let result = if target == AppointmentStatus::InQueue {
        queue::create_for_appointment(state, identity, appointment)
            .await
            .map(|_| ())
    } else {
        queue::sync_with_appointment(state, identity, appointment.id, target).await
    };
    if let Err(e) = result {
        tracing::error!(
            appointment_id = appointment.id,
            target = %target,
            error = %e,
            "Queue update after appointment status change failed"
        );
    }
}

/// Soft delete; an active queue entry is cancelled along with it
pub async fn delete(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<()> {
    let appointment = get(state, identity, id).await?;
    let now = shared::util::now_millis();
    if !appointment_db::soft_delete(&state.pool, &identity.tenant_id, id, now).await? {
        return Err(AppError::new(ErrorCode::AppointmentNotFound).into());
    }
    tracing::info!(tenant_id = %identity.tenant_id, appointment_id = id, "Appointment deleted");

    state
        .audit
        .log(
            identity,
            AuditAction::AppointmentDeleted,
            RESOURCE,
            id,
            create_snapshot(&appointment, RESOURCE),
        )
        .await;

    if let Err(e) =
        queue::sync_with_appointment(state, identity, id, AppointmentStatus::Cancelled).await
    {
        tracing::error!(appointment_id = id, error = %e, "Failed to cancel queue entry of deleted appointment");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment() -> Appointment {
        Appointment {
            id: 1,
            tenant_id: "t".into(),
            patient_id: 2,
            doctor_id: 3,
            appointment_date: "2026-03-02".into(),
            start_time: "09:00".into(),
            end_time: "09:30".into(),
            appointment_type: None,
            reason: None,
            notes: None,
            status: AppointmentStatus::Scheduled,
            arrived_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            created_by: None,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn test_stamp_keeps_first_timestamp() {
        let mut a = appointment();
        stamp(&mut a, AppointmentStatus::InProgress, "u1", 100);
        stamp(&mut a, AppointmentStatus::InProgress, "u1", 200);
        assert_eq!(a.started_at, Some(100));
    }

    #[test]
    fn test_stamp_cancel_records_actor() {
        let mut a = appointment();
        stamp(&mut a, AppointmentStatus::Cancelled, "u9", 100);
        assert_eq!(a.cancelled_at, Some(100));
        assert_eq!(a.cancelled_by.as_deref(), Some("u9"));
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn test_stamp_in_queue_sets_nothing() {
        let mut a = appointment();
        stamp(&mut a, AppointmentStatus::InQueue, "u1", 100);
        assert!(a.arrived_at.is_none() && a.started_at.is_none());
    }
}
