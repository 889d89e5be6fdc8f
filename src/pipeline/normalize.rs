//! Record normalization: extracted JSON → typed financial records.
//!
//! Each category reads a fixed set of keys from the payload:
//!
//! | Category | Reads | Produces |
//! |----------|-------|----------|
//! | `bank_statement` | `transactions[]` | transactions |
//! | `credit_card` | `transactions[]`, `debt{}` | transactions + at most one debt |
//! | `bill` | `bill{}` | at most one bill |
//! | `loan` | `debt{}` | at most one debt |
//!
//! Missing or `null` fields take their defaults. A value that is present but
//! cannot be coerced fails the **whole category**: the result carries the
//! error and no records, never a partial batch. Identifiers are generated
//! here and dates default to the processing day.

use crate::category::DocumentCategory;
use crate::error::NormalizationError;
use crate::records::{Bill, Debt, NormalizedResult, SyncStatus, Transaction, TransactionKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

type Object = Map<String, Value>;

/// Records produced for one payload.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Records {
    pub transactions: Vec<Transaction>,
    pub bills: Vec<Bill>,
    pub debts: Vec<Debt>,
}

/// Map `payload` onto records for `category`, folding any mapping failure
/// into a `success = false` result. Never panics, never returns an error.
///
/// `today` supplies every defaulted date and the default bill month.
pub fn normalize(payload: &Value, category: DocumentCategory, today: NaiveDate) -> NormalizedResult {
    match map_records(payload, category, today) {
        Ok(records) => NormalizedResult {
            transactions: records.transactions,
            bills: records.bills,
            debts: records.debts,
            ..NormalizedResult::empty(category)
        },
        Err(e) => NormalizedResult::failed(category, format!("Conversion error: {e}")),
    }
}

/// Map `payload` onto records for `category`.
pub fn map_records(
    payload: &Value,
    category: DocumentCategory,
    today: NaiveDate,
) -> Result<Records, NormalizationError> {
    let root = as_object(payload, "$")?;
    let mut records = Records::default();

    match category {
        DocumentCategory::BankStatement => {
            records.transactions = transactions(root, today)?;
        }
        DocumentCategory::CreditCard => {
            records.transactions = transactions(root, today)?;
            if let Some(debt) = section(root, "debt")? {
                records.debts.push(debt_record(
                    debt,
                    "Credit Card",
                    DebtFrequency::FixedMonthly,
                    today,
                )?);
            }
        }
        DocumentCategory::Bill => {
            if let Some(bill) = section(root, "bill")? {
                records.bills.push(bill_record(bill, today)?);
            }
        }
        DocumentCategory::Loan => {
            if let Some(debt) = section(root, "debt")? {
                records.debts.push(debt_record(
                    debt,
                    "Loan",
                    DebtFrequency::FromPayload,
                    today,
                )?);
            }
        }
    }

    Ok(records)
}

// ── Per-record mapping ───────────────────────────────────────────────────

fn transactions(root: &Object, today: NaiveDate) -> Result<Vec<Transaction>, NormalizationError> {
    let Some(value) = present(root, "transactions") else {
        return Ok(Vec::new());
    };
    let items = value.as_array().ok_or_else(|| wrong_shape("transactions", "array", value))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("transactions[{i}]");
            let tx = as_object(item, &path)?;
            transaction(tx, &path, today)
        })
        .collect()
}

fn transaction(tx: &Object, path: &str, today: NaiveDate) -> Result<Transaction, NormalizationError> {
    let kind = match string_field(tx, "type", path)? {
        Some(raw) => TransactionKind::parse(&raw).ok_or_else(|| NormalizationError::InvalidValue {
            path: format!("{path}.type"),
            detail: format!("unknown transaction type {raw:?}"),
        })?,
        None => TransactionKind::Expense,
    };

    Ok(Transaction {
        id: Uuid::new_v4(),
        description: string_field(tx, "description", path)?.unwrap_or_else(|| "Unknown".to_string()),
        amount: decimal_field(tx, "amount", path)?.unwrap_or(Decimal::ZERO),
        kind,
        date: date_field(tx, "date", path)?.unwrap_or(today),
        category: string_field(tx, "category", path)?,
    })
}

fn bill_record(bill: &Object, today: NaiveDate) -> Result<Bill, NormalizationError> {
    let path = "bill";
    Ok(Bill {
        id: Uuid::new_v4(),
        name: string_field(bill, "name", path)?.unwrap_or_else(|| "Bill".to_string()),
        amount: decimal_field(bill, "amount", path)?.unwrap_or(Decimal::ZERO),
        due_day: day_field(bill, "dueDay", path)?.unwrap_or(1),
        is_paid: false,
        bill_month: month_field(bill, "billMonth", path)?
            .unwrap_or_else(|| today.format("%Y-%m").to_string()),
        sync_status: SyncStatus::Dirty,
    })
}

/// Where a debt's payment frequency comes from.
#[derive(Debug, Clone, Copy)]
enum DebtFrequency {
    /// Always `"monthly"`, whatever the payload says.
    FixedMonthly,
    /// The payload's `paymentFrequency`, defaulting to `"monthly"`.
    FromPayload,
}

fn debt_record(
    debt: &Object,
    default_company: &str,
    frequency: DebtFrequency,
    today: NaiveDate,
) -> Result<Debt, NormalizationError> {
    let path = "debt";
    let payment_frequency = match frequency {
        DebtFrequency::FixedMonthly => "monthly".to_string(),
        DebtFrequency::FromPayload => {
            string_field(debt, "paymentFrequency", path)?.unwrap_or_else(|| "monthly".to_string())
        }
    };

    Ok(Debt {
        id: Uuid::new_v4(),
        company: string_field(debt, "company", path)?.unwrap_or_else(|| default_company.to_string()),
        balance: decimal_field(debt, "balance", path)?.unwrap_or(Decimal::ZERO),
        last_updated: today,
        notes: string_field(debt, "notes", path)?,
        is_recurring: true,
        payment_due_day: day_field(debt, "paymentDueDay", path)?,
        payment_frequency: Some(payment_frequency),
        minimum_payment: decimal_field(debt, "minimumPayment", path)?,
        sync_status: SyncStatus::Dirty,
    })
}

// ── Field coercion ───────────────────────────────────────────────────────

/// A field that is absent or explicitly `null` counts as missing.
fn present<'a>(obj: &'a Object, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// A nested object section. Absent, `null` or `{}` means "no record".
fn section<'a>(root: &'a Object, key: &str) -> Result<Option<&'a Object>, NormalizationError> {
    match present(root, key) {
        None => Ok(None),
        Some(v) => {
            let obj = as_object(v, key)?;
            Ok((!obj.is_empty()).then_some(obj))
        }
    }
}

fn as_object<'a>(v: &'a Value, path: &str) -> Result<&'a Object, NormalizationError> {
    v.as_object().ok_or_else(|| wrong_shape(path, "object", v))
}

fn string_field(obj: &Object, key: &str, path: &str) -> Result<Option<String>, NormalizationError> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(wrong_shape(&format!("{path}.{key}"), "string", other)),
    }
}

fn decimal_field(obj: &Object, key: &str, path: &str) -> Result<Option<Decimal>, NormalizationError> {
    let Some(v) = present(obj, key) else {
        return Ok(None);
    };
    let field_path = format!("{path}.{key}");
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(wrong_shape(&field_path, "number", other)),
    };
    parse_decimal(&text)
        .map(Some)
        .ok_or_else(|| NormalizationError::InvalidValue {
            path: field_path,
            detail: format!("not a number: {text:?}"),
        })
}

/// Plain decimals (`-12.50`, `3`) and exponent forms (`1.5e3`) are accepted.
/// Currency symbols, thousands separators and digit-group underscores are
/// rejected, as is any value outside what [`Decimal`] can hold at 28
/// fractional digits (e.g. `1e-300`).
fn parse_decimal(text: &str) -> Option<Decimal> {
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
    {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Day of month, 1–31. Fractional numbers are truncated.
fn day_field(obj: &Object, key: &str, path: &str) -> Result<Option<u8>, NormalizationError> {
    let Some(v) = present(obj, key) else {
        return Ok(None);
    };
    let field_path = format!("{path}.{key}");
    let day = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        other => return Err(wrong_shape(&field_path, "integer", other)),
    };
    match day {
        Some(d @ 1..=31) => Ok(Some(d as u8)),
        _ => Err(NormalizationError::InvalidValue {
            path: field_path,
            detail: format!("day of month must be 1-31, got {v}"),
        }),
    }
}

fn date_field(obj: &Object, key: &str, path: &str) -> Result<Option<NaiveDate>, NormalizationError> {
    let Some(raw) = string_field(obj, key, path)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| NormalizationError::InvalidValue {
            path: format!("{path}.{key}"),
            detail: format!("expected YYYY-MM-DD, got {raw:?}"),
        })
}

/// A `YYYY-MM` period, returned in canonical zero-padded form.
fn month_field(obj: &Object, key: &str, path: &str) -> Result<Option<String>, NormalizationError> {
    let Some(raw) = string_field(obj, key, path)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map(|d| Some(d.format("%Y-%m").to_string()))
        .map_err(|_| NormalizationError::InvalidValue {
            path: format!("{path}.{key}"),
            detail: format!("expected YYYY-MM, got {raw:?}"),
        })
}

fn wrong_shape(path: &str, expected: &'static str, found: &Value) -> NormalizationError {
    NormalizationError::WrongShape {
        path: path.to_string(),
        expected,
        found: json_kind(found),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
