//! Patient service

use shared::error::{AppError, ErrorCode};
use shared::models::{Patient, PatientCreate, PatientUpdate};
use shared::response::{PageQuery, PaginatedResponse};
use validator::Validate;

use crate::audit::{AuditAction, create_diff, create_snapshot};
use crate::auth::TenantIdentity;
use crate::db::sequence::{self, Sequence};
use crate::db::{appointment as appointment_db, patient as patient_db};
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::utils::time::canonical_date;
use crate::utils::validation::{MAX_NAME_LEN, normalize_optional, validate_required_text};

const RESOURCE: &str = "patient";

pub async fn get(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<Patient> {
    patient_db::find_by_id(&state.pool, &identity.tenant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PatientNotFound).into())
}

pub async fn list(
    state: &AppState,
    identity: &TenantIdentity,
    search: Option<&str>,
    page: PageQuery,
) -> ServiceResult<PaginatedResponse<Patient>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let (items, total) = patient_db::find_page(
        &state.pool,
        &identity.tenant_id,
        search,
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

pub async fn create(
    state: &AppState,
    identity: &TenantIdentity,
    payload: PatientCreate,
) -> ServiceResult<Patient> {
    payload.validate()?;
    validate_required_text(&payload.first_name, "first_name", MAX_NAME_LEN)?;
    validate_required_text(&payload.last_name, "last_name", MAX_NAME_LEN)?;

    let date_of_birth = normalize_optional(payload.date_of_birth)
        .map(|d| canonical_date(&d))
        .transpose()?;

    let data = patient_db::NewPatient {
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        date_of_birth,
        gender: normalize_optional(payload.gender),
        phone: normalize_optional(payload.phone),
        email: normalize_optional(payload.email),
        address: normalize_optional(payload.address),
        notes: normalize_optional(payload.notes),
    };

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    let number = sequence::next_number(&mut tx, &identity.tenant_id, Sequence::Patient).await?;
    patient_db::insert(&mut tx, &identity.tenant_id, id, &number, &data, now).await?;
    tx.commit().await?;

    let patient = get(state, identity, id).await?;
    tracing::info!(tenant_id = %identity.tenant_id, patient_id = id, number = %patient.patient_number, "Patient registered");

    state
        .audit
        .log(
            identity,
            AuditAction::PatientCreated,
            RESOURCE,
            id,
            create_snapshot(&patient, RESOURCE),
        )
        .await;

    Ok(patient)
}

pub async fn update(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    mut payload: PatientUpdate,
) -> ServiceResult<Patient> {
    payload.validate()?;
    if let Some(name) = &payload.first_name {
        validate_required_text(name, "first_name", MAX_NAME_LEN)?;
    }
    if let Some(name) = &payload.last_name {
        validate_required_text(name, "last_name", MAX_NAME_LEN)?;
    }
    payload.date_of_birth = normalize_optional(payload.date_of_birth)
        .map(|d| canonical_date(&d))
        .transpose()?;
    payload.first_name = payload.first_name.map(|n| n.trim().to_string());
    payload.last_name = payload.last_name.map(|n| n.trim().to_string());

    let before = get(state, identity, id).await?;
    let now = shared::util::now_millis();
    if !patient_db::update(&state.pool, &identity.tenant_id, id, &payload, now).await? {
        return Err(AppError::new(ErrorCode::PatientNotFound).into());
    }
    let after = get(state, identity, id).await?;

    state
        .audit
        .log(
            identity,
            AuditAction::PatientUpdated,
            RESOURCE,
            id,
            create_diff(&before, &after, RESOURCE),
        )
        .await;

    Ok(after)
}

/// Soft delete; refused while the patient still has open appointments
pub async fn delete(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<()> {
    let patient = get(state, identity, id).await?;

    let open = appointment_db::count_open_for_patient(&state.pool, &identity.tenant_id, id).await?;
    if open > 0 {
        return Err(AppError::new(ErrorCode::PatientHasOpenAppointments)
            .with_detail("open_appointments", open)
            .into());
    }

    let now = shared::util::now_millis();
    if !patient_db::soft_delete(&state.pool, &identity.tenant_id, id, now).await? {
        return Err(AppError::new(ErrorCode::PatientNotFound).into());
    }
    tracing::info!(tenant_id = %identity.tenant_id, patient_id = id, "Patient deleted");

    state
        .audit
        .log(
            identity,
            AuditAction::PatientDeleted,
            RESOURCE,
            id,
            create_snapshot(&patient, RESOURCE),
        )
        .await;

    Ok(())
}
