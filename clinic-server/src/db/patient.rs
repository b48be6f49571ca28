//! Patient Repository

use shared::models::{Patient, PatientUpdate};
use sqlx::{SqliteConnection, SqlitePool};

use super::columns::PATIENT;

/// Normalized fields of a new patient
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

pub async fn find_by_id(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(&format!(
        "SELECT {PATIENT} FROM patient WHERE tenant_id = ? AND id = ? AND deleted_at IS NULL"
    ))
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn exists(pool: &SqlitePool, tenant_id: &str, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM patient WHERE tenant_id = ? AND id = ? AND deleted_at IS NULL",
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Page of patients, optionally filtered by a name/phone/number search term
pub async fn find_page(
    pool: &SqlitePool,
    tenant_id: &str,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Patient>, i64), sqlx::Error> {
    let pattern = search.map(|s| format!("%{}%", s.trim()));
    let filter = "tenant_id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR first_name LIKE ?2 OR last_name LIKE ?2 OR phone LIKE ?2 OR patient_number LIKE ?2)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM patient WHERE {filter}"))
        .bind(tenant_id)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

    let patients = sqlx::query_as::<_, Patient>(&format!(
        "SELECT {PATIENT} FROM patient WHERE {filter} ORDER BY last_name, first_name, id LIMIT ?3 OFFSET ?4"
    ))
    .bind(tenant_id)
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((patients, total))
}

pub async fn insert(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: i64,
    patient_number: &str,
    data: &NewPatient,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO patient (id, tenant_id, patient_number, first_name, last_name, date_of_birth, gender, phone, email, address, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(patient_number)
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.date_of_birth)
    .bind(&data.gender)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.address)
    .bind(&data.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Apply the fields present in `data`; returns whether a row changed
pub async fn update(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
    data: &PatientUpdate,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE patient SET first_name = COALESCE(?1, first_name), last_name = COALESCE(?2, last_name), date_of_birth = COALESCE(?3, date_of_birth), gender = COALESCE(?4, gender), phone = COALESCE(?5, phone), email = COALESCE(?6, email), address = COALESCE(?7, address), notes = COALESCE(?8, notes), updated_at = ?9 WHERE tenant_id = ?10 AND id = ?11 AND deleted_at IS NULL",
    )
    .bind(&data.first_name)
    .bind(&data.last_name)
    .bind(&data.date_of_birth)
    .bind(&data.gender)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.address)
    .bind(&data.notes)
    .bind(now)
    .bind(tenant_id)
    .bind(id)
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
        "UPDATE patient SET deleted_at = ?1, updated_at = ?1 WHERE tenant_id = ?2 AND id = ?3 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(tenant_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
