//! Billing service: invoices and payments
//!
//! Amounts are integer minor units. `total = subtotal - discount + tax` and
//! `balance = total - paid_amount`; status follows from the paid amount.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Invoice, InvoiceCreate, InvoiceItem, InvoiceItemInput, InvoiceStatus, InvoiceUpdate, Payment,
    PaymentCreate, PaymentReceipt,
};
use shared::response::{PageQuery, PaginatedResponse};
use validator::Validate;

use crate::audit::{AuditAction, create_diff, create_snapshot, create_transition};
use crate::auth::TenantIdentity;
use crate::db::sequence::{self, Sequence};
use crate::db::{appointment as appointment_db, invoice as invoice_db, patient as patient_db};
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::utils::time::canonical_date;
use crate::utils::validation::{normalize_optional, validate_non_negative};

const RESOURCE: &str = "invoice";

/// Computed amounts of an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub items: Vec<InvoiceItem>,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
}

fn overflow() -> AppError {
    AppError::with_message(ErrorCode::ValueOutOfRange, "Invoice amount is too large")
}

/// Price the line items and apply discount and tax.
///
/// Rejects negative inputs and a discount larger than the subtotal.
pub fn compute_totals(
    invoice_id: i64,
    inputs: &[InvoiceItemInput],
    discount: i64,
    tax: i64,
) -> Result<Totals, AppError> {
    validate_non_negative(discount, "discount")?;
    validate_non_negative(tax, "tax")?;

    let mut items = Vec::with_capacity(inputs.len());
    let mut subtotal: i64 = 0;
    for input in inputs {
        if input.quantity <= 0 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("quantity must be positive, got {}", input.quantity),
            ));
        }
        validate_non_negative(input.unit_price, "unit_price")?;
        let amount = input
            .quantity
            .checked_mul(input.unit_price)
            .ok_or_else(overflow)?;
        subtotal = subtotal.checked_add(amount).ok_or_else(overflow)?;
        items.push(InvoiceItem {
            id: shared::util::snowflake_id(),
            invoice_id,
            description: input.description.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            amount,
        });
    }

    if discount > subtotal {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("discount {discount} exceeds subtotal {subtotal}"),
        ));
    }
    let total = (subtotal - discount).checked_add(tax).ok_or_else(overflow)?;

    Ok(Totals {
        items,
        subtotal,
        discount,
        tax,
        total,
    })
}

/// Status of an issued invoice from its paid amount
pub fn derive_status(total: i64, paid_amount: i64) -> InvoiceStatus {
    if paid_amount >= total {
        InvoiceStatus::Paid
    } else if paid_amount > 0 {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Pending
    }
}

fn closed_error(status: InvoiceStatus) -> AppError {
    match status {
        InvoiceStatus::Cancelled => AppError::new(ErrorCode::InvoiceCancelled),
        InvoiceStatus::Paid => AppError::new(ErrorCode::InvoiceAlreadyPaid),
        _ => AppError::new(ErrorCode::InvoiceNotEditable),
    }
}

pub async fn get(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<Invoice> {
    invoice_db::find_by_id(&state.pool, &identity.tenant_id, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvoiceNotFound).into())
}

pub async fn list(
    state: &AppState,
    identity: &TenantIdentity,
    status: Option<InvoiceStatus>,
    patient_id: Option<i64>,
    page: PageQuery,
) -> ServiceResult<PaginatedResponse<Invoice>> {
    let (items, total) = invoice_db::find_page(
        &state.pool,
        &identity.tenant_id,
        status,
        patient_id,
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
    payload: InvoiceCreate,
) -> ServiceResult<Invoice> {
    payload.validate()?;
    let tenant_id = &identity.tenant_id;

    if !patient_db::exists(&state.pool, tenant_id, payload.patient_id).await? {
        return Err(AppError::new(ErrorCode::PatientNotFound)
            .with_detail("patient_id", payload.patient_id)
            .into());
    }
    if let Some(appointment_id) = payload.appointment_id {
        let appointment = appointment_db::find_by_id(&state.pool, tenant_id, appointment_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::AppointmentNotFound))?;
        if appointment.patient_id != payload.patient_id {
            return Err(AppError::invalid("Appointment belongs to a different patient").into());
        }
    }
    let due_date = normalize_optional(payload.due_date)
        .map(|d| canonical_date(&d))
        .transpose()?;

    let id = shared::util::snowflake_id();
    let totals = compute_totals(id, &payload.items, payload.discount, payload.tax)?;
    let status = if payload.draft {
        InvoiceStatus::Draft
    } else {
        derive_status(totals.total, 0)
    };
    let now = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    let invoice_number = sequence::next_number(&mut tx, tenant_id, Sequence::Invoice).await?;
    let invoice = Invoice {
        id,
        tenant_id: tenant_id.clone(),
        invoice_number,
        patient_id: payload.patient_id,
        appointment_id: payload.appointment_id,
        subtotal: totals.subtotal,
        discount: totals.discount,
        tax: totals.tax,
        total: totals.total,
        paid_amount: 0,
        balance: totals.total,
        status,
        due_date,
        notes: normalize_optional(payload.notes),
        created_by: Some(identity.user_id.clone()),
        created_at: now,
        updated_at: now,
        items: Vec::new(),
    };
    invoice_db::insert(&mut tx, &invoice).await?;
    invoice_db::replace_items(&mut tx, id, &totals.items).await?;
    tx.commit().await?;

    let invoice = get(state, identity, id).await?;
    tracing::info!(
        tenant_id = %tenant_id,
        invoice_number = %invoice.invoice_number,
        total = invoice.total,
        "Invoice created"
    );

    state
        .audit
        .log(
            identity,
            AuditAction::InvoiceCreated,
            RESOURCE,
            id,
            create_snapshot(&invoice, RESOURCE),
        )
        .await;

    Ok(invoice)
}

/// Edit items, discount, tax or notes of an unpaid invoice; `issue` turns a
/// draft into a payable invoice.
pub async fn update(
    state: &AppState,
    identity: &TenantIdentity,
    id: i64,
    payload: InvoiceUpdate,
) -> ServiceResult<Invoice> {
    payload.validate()?;
    let before = get(state, identity, id).await?;
    if !before.status.is_editable() || before.paid_amount > 0 {
        return Err(closed_error(before.status).into());
    }

    let inputs: Vec<InvoiceItemInput> = match &payload.items {
        Some(items) => items.clone(),
        None => before
            .items
            .iter()
            .map(|i| InvoiceItemInput {
                description: i.description.clone(),
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
    };
    let totals = compute_totals(
        id,
        &inputs,
        payload.discount.unwrap_or(before.discount),
        payload.tax.unwrap_or(before.tax),
    )?;

    let mut after = before.clone();
    after.subtotal = totals.subtotal;
    after.discount = totals.discount;
    after.tax = totals.tax;
    after.total = totals.total;
    after.status = if before.status == InvoiceStatus::Draft && !payload.issue {
        InvoiceStatus::Draft
    } else {
        derive_status(totals.total, 0)
    };
    if payload.due_date.is_some() {
        after.due_date = normalize_optional(payload.due_date)
            .map(|d| canonical_date(&d))
            .transpose()?;
    }
    if payload.notes.is_some() {
        after.notes = normalize_optional(payload.notes);
    }
    after.updated_at = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    if !invoice_db::update_unpaid(&mut tx, &after, before.status).await? {
        tx.rollback().await?;
        return Err(AppError::with_message(
            ErrorCode::InvoiceNotEditable,
            "Invoice was changed by another request",
        )
        .into());
    }
    if payload.items.is_some() {
        invoice_db::replace_items(&mut tx, id, &totals.items).await?;
    }
    tx.commit().await?;

    let after = get(state, identity, id).await?;
    state
        .audit
        .log(
            identity,
            AuditAction::InvoiceUpdated,
            RESOURCE,
            id,
            create_diff(&before, &after, RESOURCE),
        )
        .await;

    Ok(after)
}

/// Cancel an invoice; only possible before any payment is recorded
pub async fn cancel(state: &AppState, identity: &TenantIdentity, id: i64) -> ServiceResult<Invoice> {
    let before = get(state, identity, id).await?;
    if before.status == InvoiceStatus::Cancelled {
        return Err(AppError::new(ErrorCode::InvoiceCancelled).into());
    }
    if before.paid_amount > 0 {
        return Err(AppError::with_message(
            ErrorCode::InvoiceNotEditable,
            "Invoices with recorded payments cannot be cancelled",
        )
        .into());
    }

    let now = shared::util::now_millis();
    if !invoice_db::cancel_unpaid(&state.pool, &identity.tenant_id, id, now).await? {
        let current = get(state, identity, id).await?;
        return Err(closed_error(current.status).into());
    }
    let after = get(state, identity, id).await?;
    tracing::info!(tenant_id = %identity.tenant_id, invoice_number = %after.invoice_number, "Invoice cancelled");

    state
        .audit
        .log(
            identity,
            AuditAction::InvoiceCancelled,
            RESOURCE,
            id,
            create_transition(&before, &after, RESOURCE),
        )
        .await;

    Ok(after)
}

/// Record a payment against an issued invoice.
///
/// Non-positive amounts and amounts above the outstanding balance are rejected.
pub async fn record_payment(
    state: &AppState,
    identity: &TenantIdentity,
    invoice_id: i64,
    payload: PaymentCreate,
) -> ServiceResult<PaymentReceipt> {
    payload.validate()?;
    if payload.amount <= 0 {
        return Err(AppError::new(ErrorCode::PaymentInvalidAmount)
            .with_detail("amount", payload.amount)
            .into());
    }

    let before = get(state, identity, invoice_id).await?;
    match before.status {
        InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid => {}
        InvoiceStatus::Draft => {
            return Err(AppError::with_message(
                ErrorCode::InvoiceNotEditable,
                "Draft invoices must be issued before payment",
            )
            .into());
        }
        status => return Err(closed_error(status).into()),
    }
    if payload.amount > before.balance {
        return Err(AppError::new(ErrorCode::PaymentExceedsBalance)
            .with_detail("amount", payload.amount)
            .with_detail("balance", before.balance)
            .into());
    }

    let now = shared::util::now_millis();
    let payment = Payment {
        id: shared::util::snowflake_id(),
        tenant_id: identity.tenant_id.clone(),
        invoice_id,
        amount: payload.amount,
        method: payload.method,
        reference: normalize_optional(payload.reference),
        notes: normalize_optional(payload.notes),
        received_by: Some(identity.user_id.clone()),
        paid_at: now,
    };

    let mut tx = state.pool.begin().await?;
    if !invoice_db::apply_payment(&mut tx, &identity.tenant_id, invoice_id, payment.amount, now)
        .await?
    {
        tx.rollback().await?;
        // Another payment or a cancellation landed first
        let current = get(state, identity, invoice_id).await?;
        return Err(match current.status {
            InvoiceStatus::Pending | InvoiceStatus::PartiallyPaid => {
                AppError::new(ErrorCode::PaymentExceedsBalance)
                    .with_detail("amount", payment.amount)
                    .with_detail("balance", current.balance)
            }
            status => closed_error(status),
        }
        .into());
    }
    invoice_db::insert_payment(&mut tx, &payment).await?;
    tx.commit().await?;

    let invoice = get(state, identity, invoice_id).await?;
    tracing::info!(
        tenant_id = %identity.tenant_id,
        invoice_number = %invoice.invoice_number,
        amount = payment.amount,
        balance = invoice.balance,
        "Payment recorded"
    );

    state
        .audit
        .log(
            identity,
            AuditAction::PaymentRecorded,
            RESOURCE,
            invoice_id,
            serde_json::json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "method": payment.method,
                "paid_amount": invoice.paid_amount,
                "balance": invoice.balance,
                "status": invoice.status,
            }),
        )
        .await;

    Ok(PaymentReceipt { payment, invoice })
}

pub async fn list_payments(
    state: &AppState,
    identity: &TenantIdentity,
    invoice_id: i64,
) -> ServiceResult<Vec<Payment>> {
    get(state, identity, invoice_id).await?;
    Ok(invoice_db::find_payments(&state.pool, &identity.tenant_id, invoice_id).await?)
}
