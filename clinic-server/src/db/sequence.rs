//! Per-tenant counters behind human-readable numbers
//!
//! Counter rows are advanced with a single write, so two concurrent callers
//! can never read the same value. On first use the counter continues after
//! the highest number already stored for the tenant.

use shared::util::{format_sequence, parse_sequence_suffix};
use sqlx::SqliteConnection;

use crate::scheduling::{format_queue_number, next_queue_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Queue,
    Patient,
    Invoice,
}

impl Sequence {
    fn name(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Patient => "patient",
            Self::Invoice => "invoice",
        }
    }

    /// Highest stored number of the tenant (`?1`). Numbers share a prefix and
    /// are zero-padded, so longer sorts after shorter.
    fn latest_sql(&self) -> &'static str {
        match self {
            Self::Queue => {
                "SELECT queue_number FROM queue_entry WHERE tenant_id = ?1 ORDER BY LENGTH(queue_number) DESC, queue_number DESC LIMIT 1"
            }
            Self::Patient => {
                "SELECT patient_number FROM patient WHERE tenant_id = ?1 ORDER BY LENGTH(patient_number) DESC, patient_number DESC LIMIT 1"
            }
            Self::Invoice => {
                "SELECT invoice_number FROM invoice WHERE tenant_id = ?1 ORDER BY LENGTH(invoice_number) DESC, invoice_number DESC LIMIT 1"
            }
        }
    }

    /// Display form of a counter value
    pub fn format(&self, value: i64) -> String {
        match self {
            Self::Queue => format_queue_number(value),
            Self::Patient => format_sequence("P", value, 6),
            Self::Invoice => format_sequence("INV", value, 6),
        }
    }

    /// Number following `previous`; `None` or garbage starts at 1
    fn successor(&self, previous: Option<&str>) -> String {
        match self {
            Self::Queue => next_queue_number(previous),
            _ => self.format(previous.and_then(parse_sequence_suffix).unwrap_or(0) + 1),
        }
    }
}

/// Advance the tenant's counter and return the formatted number.
///
/// Run it as the first write of a transaction: the `UPDATE` takes SQLite's
/// write lock even when no counter row exists yet, serializing whatever the
/// transaction does next.
pub async fn next_number(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sequence: Sequence,
) -> Result<String, sqlx::Error> {
    let advanced: Option<i64> = sqlx::query_scalar(
        "UPDATE tenant_sequence SET last_value = last_value + 1 WHERE tenant_id = ?1 AND name = ?2 RETURNING last_value",
    )
    .bind(tenant_id)
    .bind(sequence.name())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(value) = advanced {
        return Ok(sequence.format(value));
    }

    // First number for this tenant
    let previous: Option<String> = sqlx::query_scalar(sequence.latest_sql())
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;
    let first = sequence.successor(previous.as_deref());
    let seed = parse_sequence_suffix(&first).unwrap_or(1);

    let value: i64 = sqlx::query_scalar(
        "INSERT INTO tenant_sequence (tenant_id, name, last_value) VALUES (?1, ?2, ?3) \
         ON CONFLICT (tenant_id, name) DO UPDATE SET last_value = last_value + 1 \
         RETURNING last_value",
    )
    .bind(tenant_id)
    .bind(sequence.name())
    .bind(seed)
    .fetch_one(&mut *conn)
    .await?;
    Ok(sequence.format(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn test_counters_are_per_tenant_and_per_name() {
        let db = DbService::in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();

        assert_eq!(
            next_number(&mut conn, "a", Sequence::Queue).await.unwrap(),
            "Q-0001"
        );
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Queue).await.unwrap(),
            "Q-0002"
        );
        assert_eq!(
            next_number(&mut conn, "b", Sequence::Queue).await.unwrap(),
            "Q-0001"
        );
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Invoice).await.unwrap(),
            "INV-000001"
        );
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Patient).await.unwrap(),
            "P-000001"
        );
    }

    #[tokio::test]
    async fn test_counter_seeds_from_existing_numbers() {
        let db = DbService::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO patient (id, tenant_id, patient_number, first_name, last_name, created_at, updated_at) VALUES (1, 'a', 'P-000041', 'Ada', 'Lovelace', 0, 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Patient).await.unwrap(),
            "P-000042"
        );
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Patient).await.unwrap(),
            "P-000043"
        );
    }

    #[tokio::test]
    async fn test_counter_seeds_past_wider_numbers() {
        let db = DbService::in_memory().await.unwrap();
        for (id, number) in [(1, "P-999999"), (2, "P-1000000"), (3, "P-000500")] {
            sqlx::query(
                "INSERT INTO patient (id, tenant_id, patient_number, first_name, last_name, created_at, updated_at) VALUES (?, 'a', ?, 'Ada', 'Lovelace', 0, 0)",
            )
            .bind(id)
            .bind(number)
            .execute(&db.pool)
            .await
            .unwrap();
        }

        let mut conn = db.pool.acquire().await.unwrap();
        assert_eq!(
            next_number(&mut conn, "a", Sequence::Patient).await.unwrap(),
            "P-1000001"
        );
    }

    #[test]
    fn test_successor() {
        assert_eq!(Sequence::Queue.successor(Some("Q-0041")), "Q-0042");
        assert_eq!(Sequence::Queue.successor(None), "Q-0001");
        assert_eq!(Sequence::Invoice.successor(Some("INV-000009")), "INV-000010");
        assert_eq!(Sequence::Patient.successor(Some("bogus")), "P-000001");
    }
}
