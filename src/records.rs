//! Output types: typed financial records and the per-request result.
//!
//! Field names on the wire follow the consuming app's record format
//! (camelCase, `type` for the transaction kind). Identifiers are always
//! generated here, never copied from model output.

use crate::category::DocumentCategory;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction/nature of a transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Credit,
    BillPaid,
}

impl TransactionKind {
    /// Parse the model's `type` string. Case and surrounding whitespace are
    /// ignored; `"bill paid"` and `"bill-paid"` are accepted for `bill_paid`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            "credit" => Some(TransactionKind::Credit),
            "bill_paid" => Some(TransactionKind::BillPaid),
            _ => None,
        }
    }
}

/// Synchronisation marker understood by the consuming app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created locally, not yet synced. Every record built here starts dirty.
    #[default]
    Dirty,
    Synced,
}

/// One line of a bank or card statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub category: Option<String>,
}

/// A recurring bill (utility, phone, internet...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Day of month, 1–31.
    pub due_day: u8,
    pub is_paid: bool,
    /// `YYYY-MM`.
    pub bill_month: String,
    pub sync_status: SyncStatus,
}

/// An outstanding balance (card or loan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: Uuid,
    pub company: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub last_updated: NaiveDate,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub payment_due_day: Option<u8>,
    pub payment_frequency: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub minimum_payment: Option<Decimal>,
    pub sync_status: SyncStatus,
}

/// The outcome of one `/parse` request.
///
/// Either the collections are populated (`success = true`) or `error` is set
/// and every collection is empty. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub success: bool,
    #[serde(rename = "document_type")]
    pub category: DocumentCategory,
    pub transactions: Vec<Transaction>,
    pub bills: Vec<Bill>,
    pub debts: Vec<Debt>,
    pub raw_text: Option<String>,
    pub error: Option<String>,
}

impl NormalizedResult {
    /// An empty successful result for `category`.
    pub fn empty(category: DocumentCategory) -> Self {
        Self {
            success: true,
            category,
            transactions: Vec::new(),
            bills: Vec::new(),
            debts: Vec::new(),
            raw_text: None,
            error: None,
        }
    }

    /// A failed result: no records, only the error message.
    pub fn failed(category: DocumentCategory, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::empty(category)
        }
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.transactions.len() + self.bills.len() + self.debts.len()
    }
}

/// Diagnostic output of the OCR-only path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrReport {
    pub success: bool,
    pub filename: String,
    pub detected_type: DocumentCategory,
    pub text: String,
    pub char_count: usize,
    pub line_count: usize,
}

impl OcrReport {
    pub fn new(filename: impl Into<String>, text: String, detected_type: DocumentCategory) -> Self {
        Self {
            success: true,
            filename: filename.into(),
            detected_type,
            char_count: text.chars().count(),
            line_count: text.split('\n').count(),
            text,
        }
    }
}
