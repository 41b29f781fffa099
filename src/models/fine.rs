use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FineStatus {
    #[default]
    Pending,
    Paid,
    Waived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub borrowing: i64,
    pub amount: f64,
    #[serde(default)]
    pub status: FineStatus,
    #[serde(default)]
    pub days_overdue: Option<u32>,
    #[serde(default)]
    pub issued_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Fine {
    pub fn is_outstanding(&self) -> bool {
        self.status == FineStatus::Pending
    }
}

impl Validate for Fine {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.non_negative("amount", self.amount);
        errors.into_result()
    }
}

impl_resource!(Fine, "library/fines", validated);
