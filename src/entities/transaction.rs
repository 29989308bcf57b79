// 💵 Transaction Entity - a single income or expense entry
//
// Identity: UUID (never changes)
// Values: amount, kind, category, description, date

use crate::error::{DashboardError, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in
    Income,

    /// Money going out
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(DashboardError::validation(format!(
                "Unknown transaction type: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// TRANSACTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity (UUID)
    pub id: String,

    /// Always non-negative; the direction lives in `kind`
    pub amount: f64,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub category: String,

    #[serde(default)]
    pub description: Option<String>,

    pub date: NaiveDate,
}

impl Transaction {
    /// Create a transaction dated today
    pub fn new(
        amount: f64,
        kind: TransactionType,
        category: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self> {
        let category = category.into();
        Self::validate(amount, &category)?;

        Ok(Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            kind,
            category,
            description: description.filter(|d| !d.trim().is_empty()),
            date: Local::now().date_naive(),
        })
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    fn validate(amount: f64, category: &str) -> Result<()> {
        if !amount.is_finite() {
            return Err(DashboardError::validation("Amount must be a finite number"));
        }
        if amount < 0.0 {
            return Err(DashboardError::validation("Amount must be positive"));
        }
        if category.trim().is_empty() {
            return Err(DashboardError::validation("Category is required"));
        }
        Ok(())
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    /// Positive for income, negative for expenses
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// `YYYY-MM` bucket used by monthly reports
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    /// Compute idempotency hash for duplicate detection on import
    /// NOTE: identity is `id`; the hash only covers the values
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{:.2}|{}|{}",
            self.date,
            self.kind,
            self.amount,
            self.category,
            self.description.as_deref().unwrap_or("")
        ));
        format!("{:x}", hasher.finalize())
    }
}
