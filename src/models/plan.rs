use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl BillingCycle {
    /// Billing periods per year; one-time plans count once
    pub fn periods_per_year(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 12,
            BillingCycle::Quarterly => 4,
            BillingCycle::Yearly | BillingCycle::OneTime => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Plan {
    pub fn yearly_cost(&self) -> f64 {
        self.price * self.billing_cycle.periods_per_year() as f64
    }
}

impl Validate for Plan {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name);
        errors.non_negative("price", self.price);
        errors.into_result()
    }
}

impl_resource!(Plan, "billing/plans", validated);
