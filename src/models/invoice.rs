use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::services::fine_service::round_cents;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    PartiallyPaid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Still expecting money
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl InvoiceItem {
    pub fn line_total(&self) -> f64 {
        round_cents(self.quantity as f64 * self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub customer: Option<i64>,
    #[serde(default)]
    pub student: Option<i64>,
    #[serde(default)]
    pub plan: Option<i64>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    /// Percentage, e.g. 7.5 for 7.5 %
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Invoice {
    pub fn subtotal(&self) -> f64 {
        round_cents(self.items.iter().map(InvoiceItem::line_total).sum())
    }

    pub fn tax(&self) -> f64 {
        round_cents(self.subtotal() * self.tax_rate / 100.0)
    }

    pub fn total(&self) -> f64 {
        round_cents(self.subtotal() + self.tax())
    }

    /// What is still owed, never negative
    pub fn balance(&self) -> f64 {
        round_cents((self.total() - self.amount_paid).max(0.0))
    }

    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.status.is_open() && today > self.due_date
    }
}

impl Validate for Invoice {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.customer.is_none() && self.student.is_none() {
            errors.add("customer", "An invoice needs a customer or a student.");
        }
        errors.date_order("due_date", self.issue_date, self.due_date);
        if self.items.is_empty() {
            errors.add("items", "Add at least one line item.");
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                errors.add(&format!("items[{}].description", index), "This field is required.");
            }
            if item.quantity == 0 {
                errors.add(&format!("items[{}].quantity", index), "Must be greater than zero.");
            }
            errors.non_negative(&format!("items[{}].unit_price", index), item.unit_price);
        }
        if !(0.0..=100.0).contains(&self.tax_rate) {
            errors.add("tax_rate", "Must be between 0 and 100.");
        }
        errors.into_result()
    }
}

impl_resource!(Invoice, "billing/invoices", validated);

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> Invoice {
        Invoice {
            id: Some(1),
            number: Some("INV-0001".to_string()),
            customer: None,
            student: Some(4),
            plan: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            status: InvoiceStatus::Sent,
            items: vec![
                InvoiceItem {
                    id: None,
                    description: "Tuition".to_string(),
                    quantity: 1,
                    unit_price: 400.0,
                },
                InvoiceItem {
                    id: None,
                    description: "Lab fee".to_string(),
                    quantity: 2,
                    unit_price: 12.5,
                },
            ],
            tax_rate: 10.0,
            amount_paid: 100.0,
            notes: None,
        }
    }

    #[test]
    fn test_totals() {
        let invoice = invoice();
        assert_eq!(invoice.subtotal(), 425.0);
        assert_eq!(invoice.tax(), 42.5);
        assert_eq!(invoice.total(), 467.5);
        assert_eq!(invoice.balance(), 367.5);
    }

    #[test]
    fn test_item_checks() {
        let mut invoice = invoice();
        invoice.items[1].quantity = 0;
        invoice.items[0].description.clear();
        let errors = invoice.validate().unwrap_err();
        assert!(errors.has("items[0].description"));
        assert!(errors.has("items[1].quantity"));
    }
}
