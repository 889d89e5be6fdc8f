//! Keyword-based document classification.
//!
//! Keyword sets are tested in a fixed priority order and the first set with
//! any hit wins: credit card, then loan, then bill. Anything else is treated
//! as a bank statement. A statement that mentions both "credit card" and
//! "mortgage" is a credit card statement; match counts are never compared.

use crate::category::DocumentCategory;

/// Phrases that identify a credit card statement.
pub const CREDIT_CARD_KEYWORDS: &[&str] = &[
    "credit card",
    "card ending",
    "minimum payment due",
    "credit limit",
    "available credit",
    "apr",
];

/// Phrases that identify a loan or mortgage statement.
pub const LOAN_KEYWORDS: &[&str] = &[
    "loan",
    "principal balance",
    "payoff amount",
    "mortgage",
    "interest rate",
    "escrow",
];

/// Phrases that identify a utility or service bill.
pub const BILL_KEYWORDS: &[&str] = &[
    "electric",
    "gas bill",
    "water bill",
    "internet",
    "phone bill",
    "service period",
    "meter reading",
    "usage",
    "kwh",
];

/// Ordered classification table; earlier rows take priority.
const RULES: &[(DocumentCategory, &[&str])] = &[
    (DocumentCategory::CreditCard, CREDIT_CARD_KEYWORDS),
    (DocumentCategory::Loan, LOAN_KEYWORDS),
    (DocumentCategory::Bill, BILL_KEYWORDS),
];

/// Infer the category of a transcript. Total and deterministic.
///
/// Matching is plain case-insensitive substring search, so `"apr"` also
/// matches inside words such as "April".
pub fn classify(transcript: &str) -> DocumentCategory {
    let lower = transcript.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(DocumentCategory::BankStatement)
}
