//! Invoice & Payment Models
//!
//! All monetary amounts are `i64` minor currency units (cents).

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Invoice status, derived from the paid amount once issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum InvoiceStatus {
    Draft,
    #[default]
    Pending,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Items, discount and tax can only change before any payment lands
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Insurance,
    Other,
}

/// Invoice line item (independent table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    /// `quantity * unit_price`
    pub amount: i64,
}

/// Invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,
    pub tenant_id: String,
    /// Human-readable number (`INV-000001`)
    pub invoice_number: String,
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
    pub paid_amount: i64,
    pub balance: i64,
    pub status: InvoiceStatus,
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub items: Vec<InvoiceItem>,
}

/// Line item input
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceItemInput {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(range(min = 0))]
    pub unit_price: i64,
}

/// Create invoice payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceCreate {
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    #[validate(length(min = 1), nested)]
    pub items: Vec<InvoiceItemInput>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub discount: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub tax: i64,
    pub due_date: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Keep the invoice as a draft instead of issuing it
    #[serde(default)]
    pub draft: bool,
}

/// Update invoice payload (draft/pending only)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct InvoiceUpdate {
    #[validate(length(min = 1), nested)]
    pub items: Option<Vec<InvoiceItemInput>>,
    #[validate(range(min = 0))]
    pub discount: Option<i64>,
    #[validate(range(min = 0))]
    pub tax: Option<i64>,
    pub due_date: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Issue a draft invoice
    #[serde(default)]
    pub issue: bool,
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub tenant_id: String,
    pub invoice_id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub received_by: Option<String>,
    pub paid_at: i64,
}

/// Record payment payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentCreate {
    pub amount: i64,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Result of recording a payment: the payment and the invoice after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: Invoice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_create_requires_items() {
        let payload = InvoiceCreate {
            patient_id: 1,
            appointment_id: None,
            items: vec![],
            discount: 0,
            tax: 0,
            due_date: None,
            notes: None,
            draft: false,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_invoice_item_rejects_zero_quantity() {
        let payload = InvoiceCreate {
            patient_id: 1,
            appointment_id: None,
            items: vec![InvoiceItemInput {
                description: "Consultation".into(),
                quantity: 0,
                unit_price: 5000,
            }],
            discount: 0,
            tax: 0,
            due_date: None,
            notes: None,
            draft: false,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_payment_method_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        let status: InvoiceStatus = serde_json::from_str("\"partially_paid\"").unwrap();
        assert_eq!(status, InvoiceStatus::PartiallyPaid);
    }
}
