//! Prompt templates for turning a transcript into category-specific JSON.
//!
//! Each category has one instruction template that describes the exact JSON
//! shape [`crate::pipeline::normalize`] reads. Templates are loaded once at
//! startup into a [`PromptLibrary`]; a category without a template is a
//! configuration defect, reported as
//! [`IngestError::PromptTemplateMissing`] when a request needs it.
//!
//! Operators can override templates with a directory of `<category>.txt`
//! files (see [`crate::config::IngestConfig::prompts_dir`]).

use crate::category::DocumentCategory;
use crate::error::IngestError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Built-in template for bank statements.
pub const BANK_STATEMENT_PROMPT: &str = r#"You are a financial data extraction assistant. The text below is an OCR transcript of a bank statement.

Extract every transaction and return ONLY a JSON object with this exact shape:

{
  "transactions": [
    {
      "description": "merchant or payee as printed",
      "amount": 42.50,
      "type": "income | expense | credit | bill_paid",
      "date": "YYYY-MM-DD",
      "category": "optional spending category or null"
    }
  ]
}

Rules:
- amount is always a positive number without currency symbols or thousands separators
- deposits and salary are "income"; purchases, fees and withdrawals are "expense"
- payments to utilities or service providers are "bill_paid"
- use the statement year when a line only shows month and day
- do not invent transactions; skip running balances and totals
- output the JSON object only, no commentary

Statement text:"#;

/// Built-in template for credit card statements.
pub const CREDIT_CARD_PROMPT: &str = r#"You are a financial data extraction assistant. The text below is an OCR transcript of a credit card statement.

Return ONLY a JSON object with this exact shape:

{
  "transactions": [
    {
      "description": "merchant as printed",
      "amount": 19.99,
      "type": "expense | credit",
      "date": "YYYY-MM-DD",
      "category": "optional spending category or null"
    }
  ],
  "debt": {
    "company": "card issuer name",
    "balance": 1234.56,
    "paymentDueDay": 15,
    "minimumPayment": 35.00
  }
}

Rules:
- purchases and fees are "expense"; payments and refunds are "credit"
- amounts are positive numbers without currency symbols or thousands separators
- balance is the new/statement balance; paymentDueDay is the day of month (1-31) of the payment due date
- use null for anything not printed on the statement
- output the JSON object only, no commentary

Statement text:"#;

/// Built-in template for utility and service bills.
pub const BILL_PROMPT: &str = r#"You are a financial data extraction assistant. The text below is an OCR transcript of a bill (utility, phone, internet or similar service).

Return ONLY a JSON object with this exact shape:

{
  "bill": {
    "name": "provider or service name",
    "amount": 120.50,
    "dueDay": 15,
    "billMonth": "YYYY-MM"
  }
}

Rules:
- amount is the total amount due, a positive number without currency symbols
- dueDay is the day of month (1-31) of the due date
- billMonth is the month the bill is for; omit it if unclear
- output the JSON object only, no commentary

Bill text:"#;

/// Built-in template for loan and mortgage statements.
pub const LOAN_PROMPT: &str = r#"You are a financial data extraction assistant. The text below is an OCR transcript of a loan or mortgage statement.

Return ONLY a JSON object with this exact shape:

{
  "debt": {
    "company": "lender name",
    "balance": 150000.00,
    "paymentDueDay": 1,
    "paymentFrequency": "monthly | biweekly | weekly",
    "minimumPayment": 1250.00
  }
}

Rules:
- balance is the outstanding principal balance, a positive number without currency symbols
- minimumPayment is the regular payment amount due
- paymentDueDay is the day of month (1-31) of the payment due date
- use null for anything not printed on the statement
- output the JSON object only, no commentary

Statement text:"#;

/// Category-indexed prompt templates, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    templates: HashMap<DocumentCategory, String>,
}

impl PromptLibrary {
    /// The built-in templates for every category.
    pub fn builtin() -> Self {
        let templates = DocumentCategory::ALL
            .into_iter()
            .map(|c| (c, builtin_template(c).to_string()))
            .collect();
        Self { templates }
    }

    /// Load `<category>.txt` templates from `dir`.
    ///
    /// Missing files are not an error here: the library simply has no
    /// template for that category and requests that resolve to it fail
    /// with [`IngestError::PromptTemplateMissing`].
    pub fn load_dir(dir: &Path) -> Result<Self, IngestError> {
        if !dir.is_dir() {
            return Err(IngestError::InvalidConfig(format!(
                "prompts directory '{}' does not exist",
                dir.display()
            )));
        }
        let mut templates = HashMap::new();
        for category in DocumentCategory::ALL {
            let path = dir.join(format!("{}.txt", category.as_str()));
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Loaded prompt template {}", path.display());
                    templates.insert(category, text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("No prompt template for {} in {}", category, dir.display());
                }
                Err(e) => {
                    return Err(IngestError::InvalidConfig(format!(
                        "failed to read prompt template '{}': {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(Self { templates })
    }

    /// Build a library from explicit templates.
    pub fn from_templates(templates: impl IntoIterator<Item = (DocumentCategory, String)>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    /// The template for `category`.
    pub fn template(&self, category: DocumentCategory) -> Result<&str, IngestError> {
        self.templates
            .get(&category)
            .map(String::as_str)
            .ok_or_else(|| IngestError::PromptTemplateMissing {
                category: category.to_string(),
            })
    }
}

fn builtin_template(category: DocumentCategory) -> &'static str {
    match category {
        DocumentCategory::BankStatement => BANK_STATEMENT_PROMPT,
        DocumentCategory::CreditCard => CREDIT_CARD_PROMPT,
        DocumentCategory::Bill => BILL_PROMPT,
        DocumentCategory::Loan => LOAN_PROMPT,
    }
}

/// Combine a template with the (already truncated) transcript.
pub fn assemble_prompt(template: &str, transcript: &str) -> String {
    format!("{template}\n\n{transcript}")
}
