use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Cheque,
    Online,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub invoice: i64,
    pub amount: f64,
    #[serde(default)]
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    #[serde(default)]
    pub reference: Option<String>,
}

impl Validate for Payment {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.positive("amount", self.amount);
        errors.into_result()
    }
}

impl_resource!(Payment, "billing/payments", validated);
