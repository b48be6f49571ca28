//! Invoice & Payment Repository

use shared::models::{Invoice, InvoiceItem, InvoiceStatus, Payment};
use sqlx::{SqliteConnection, SqlitePool};

use super::columns::{INVOICE, PAYMENT};

async fn load_items(pool: &SqlitePool, invoice: &mut Invoice) -> Result<(), sqlx::Error> {
    invoice.items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT id, invoice_id, description, quantity, unit_price, amount FROM invoice_item WHERE invoice_id = ? ORDER BY id",
    )
    .bind(invoice.id)
    .fetch_all(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE} FROM invoice WHERE tenant_id = ? AND id = ?"
    ))
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match invoice {
        Some(mut invoice) => {
            load_items(pool, &mut invoice).await?;
            Ok(Some(invoice))
        }
        None => Ok(None),
    }
}

/// Page of invoices (without items), newest first
pub async fn find_page(
    pool: &SqlitePool,
    tenant_id: &str,
    status: Option<InvoiceStatus>,
    patient_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Invoice>, i64), sqlx::Error> {
    let conditions = "tenant_id = ?1 AND (?2 IS NULL OR status = ?2) AND (?3 IS NULL OR patient_id = ?3)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM invoice WHERE {conditions}"))
        .bind(tenant_id)
        .bind(status)
        .bind(patient_id)
        .fetch_one(pool)
        .await?;

    let items = sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE} FROM invoice WHERE {conditions} ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
    ))
    .bind(tenant_id)
    .bind(status)
    .bind(patient_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

pub async fn insert(conn: &mut SqliteConnection, inv: &Invoice) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO invoice (id, tenant_id, invoice_number, patient_id, appointment_id, subtotal, discount, tax, total, paid_amount, balance, status, due_date, notes, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(inv.id)
    .bind(&inv.tenant_id)
    .bind(&inv.invoice_number)
    .bind(inv.patient_id)
    .bind(inv.appointment_id)
    .bind(inv.subtotal)
    .bind(inv.discount)
    .bind(inv.tax)
    .bind(inv.total)
    .bind(inv.paid_amount)
    .bind(inv.balance)
    .bind(inv.status)
    .bind(&inv.due_date)
    .bind(&inv.notes)
    .bind(&inv.created_by)
    .bind(inv.created_at)
    .bind(inv.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replace all line items of an invoice
pub async fn replace_items(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    items: &[InvoiceItem],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM invoice_item WHERE invoice_id = ?")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;
    for item in items {
        sqlx::query(
            "INSERT INTO invoice_item (id, invoice_id, description, quantity, unit_price, amount) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id)
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Write totals, status and descriptive fields while the invoice is still
/// unpaid and in `expected` status.
pub async fn update_unpaid(
    conn: &mut SqliteConnection,
    inv: &Invoice,
    expected: InvoiceStatus,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE invoice SET subtotal = ?1, discount = ?2, tax = ?3, total = ?4, balance = ?4 - paid_amount, status = ?5, due_date = ?6, notes = ?7, updated_at = ?8 \
         WHERE tenant_id = ?9 AND id = ?10 AND status = ?11 AND paid_amount = 0",
    )
    .bind(inv.subtotal)
    .bind(inv.discount)
    .bind(inv.tax)
    .bind(inv.total)
    .bind(inv.status)
    .bind(&inv.due_date)
    .bind(&inv.notes)
    .bind(inv.updated_at)
    .bind(&inv.tenant_id)
    .bind(inv.id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Cancel an invoice that has received no payment
pub async fn cancel_unpaid(
    pool: &SqlitePool,
    tenant_id: &str,
    id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE invoice SET status = 'cancelled', updated_at = ?1 WHERE tenant_id = ?2 AND id = ?3 AND status IN ('draft', 'pending') AND paid_amount = 0",
    )
    .bind(now)
    .bind(tenant_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Add `amount` to the paid total and re-derive status.
///
/// The guard keeps `paid_amount <= total`; returns `false` when the invoice
/// is not payable or the amount exceeds the balance.
pub async fn apply_payment(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: i64,
    amount: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE invoice SET paid_amount = paid_amount + ?1, balance = total - (paid_amount + ?1), \
         status = CASE WHEN paid_amount + ?1 >= total THEN 'paid' ELSE 'partially_paid' END, updated_at = ?2 \
         WHERE tenant_id = ?3 AND id = ?4 AND status IN ('pending', 'partially_paid') AND paid_amount + ?1 <= total",
    )
    .bind(amount)
    .bind(now)
    .bind(tenant_id)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn insert_payment(conn: &mut SqliteConnection, p: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payment (id, tenant_id, invoice_id, amount, method, reference, notes, received_by, paid_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(p.id)
    .bind(&p.tenant_id)
    .bind(p.invoice_id)
    .bind(p.amount)
    .bind(p.method)
    .bind(&p.reference)
    .bind(&p.notes)
    .bind(&p.received_by)
    .bind(p.paid_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find_payments(
    pool: &SqlitePool,
    tenant_id: &str,
    invoice_id: i64,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT} FROM payment WHERE tenant_id = ? AND invoice_id = ? ORDER BY paid_at, id"
    ))
    .bind(tenant_id)
    .bind(invoice_id)
    .fetch_all(pool)
    .await
}
