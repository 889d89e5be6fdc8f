//! Document categories.
//!
//! [`DocumentCategory`] only has concrete variants. "Please detect it for
//! me" is not a category; at the request boundary it is represented as
//! `None` by [`parse_requested_category`], so classification and
//! normalization never see a non-concrete value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of financial document being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    BankStatement,
    CreditCard,
    Bill,
    Loan,
}

impl DocumentCategory {
    /// Every concrete category, in declaration order.
    pub const ALL: [DocumentCategory; 4] = [
        DocumentCategory::BankStatement,
        DocumentCategory::CreditCard,
        DocumentCategory::Bill,
        DocumentCategory::Loan,
    ];

    /// Wire name, also used as the prompt template file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::BankStatement => "bank_statement",
            DocumentCategory::CreditCard => "credit_card",
            DocumentCategory::Bill => "bill",
            DocumentCategory::Loan => "loan",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a category name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document type '{0}' (expected auto, bank_statement, credit_card, bill or loan)")]
pub struct UnknownCategory(pub String);

impl FromStr for DocumentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bank_statement" => Ok(DocumentCategory::BankStatement),
            "credit_card" => Ok(DocumentCategory::CreditCard),
            "bill" => Ok(DocumentCategory::Bill),
            "loan" => Ok(DocumentCategory::Loan),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Parse a request-time category option.
///
/// `"auto"` and the empty string mean "detect from the transcript" and map
/// to `None`.
pub fn parse_requested_category(s: &str) -> Result<Option<DocumentCategory>, UnknownCategory> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}
