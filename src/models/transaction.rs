use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Income,
    Expense,
}

/// Ledger entry shown on the finance screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub kind: TransactionKind,
    pub amount: f64,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Validate for Transaction {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive("amount", self.amount);
        errors.require("description", &self.description);
        errors.into_result()
    }
}

impl_resource!(Transaction, "billing/transactions", validated);
