//! Billing store - plans, invoices, payments and the ledger

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::{StoreError, StoreResult};
use crate::infrastructure::client::ApiClient;
use crate::models::{
    Invoice, InvoiceStatus, Payment, PaymentMethod, Plan, Transaction, TransactionKind,
};
use crate::services::fine_service::round_cents;
use crate::services::resource_store::ResourceStore;
use crate::utils::validation::ValidationErrors;

/// Cent tolerance when comparing money amounts
const CENT: f64 = 0.005;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    pub income: f64,
    pub expense: f64,
}

impl LedgerTotals {
    pub fn net(&self) -> f64 {
        round_cents(self.income - self.expense)
    }
}

/// Sum income and expense entries
pub fn ledger_totals<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> LedgerTotals {
    let (income, expense) =
        transactions
            .into_iter()
            .fold((0.0, 0.0), |(income, expense), t| match t.kind {
                TransactionKind::Income => (income + t.amount, expense),
                TransactionKind::Expense => (income, expense + t.amount),
            });
    LedgerTotals {
        income: round_cents(income),
        expense: round_cents(expense),
    }
}

/// Status an invoice should carry once `amount_paid` is settled
pub fn status_after_payment(invoice: &Invoice, amount_paid: f64) -> InvoiceStatus {
    if amount_paid + CENT >= invoice.total() {
        InvoiceStatus::Paid
    } else if amount_paid > 0.0 {
        InvoiceStatus::PartiallyPaid
    } else {
        invoice.status
    }
}

pub struct BillingStore {
    plans: Arc<ResourceStore<Plan>>,
    invoices: Arc<ResourceStore<Invoice>>,
    payments: Arc<ResourceStore<Payment>>,
    transactions: Arc<ResourceStore<Transaction>>,
}

impl BillingStore {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            plans: Arc::new(ResourceStore::rest(client)),
            invoices: Arc::new(ResourceStore::rest(client)),
            payments: Arc::new(ResourceStore::rest(client)),
            transactions: Arc::new(ResourceStore::rest(client)),
        }
    }

    pub fn plans(&self) -> &Arc<ResourceStore<Plan>> {
        &self.plans
    }

    pub fn invoices(&self) -> &Arc<ResourceStore<Invoice>> {
        &self.invoices
    }

    pub fn payments(&self) -> &Arc<ResourceStore<Payment>> {
        &self.payments
    }

    pub fn transactions(&self) -> &Arc<ResourceStore<Transaction>> {
        &self.transactions
    }

    // --- Plans ---

    pub async fn set_plan_active(&self, plan_id: i64, active: bool) -> StoreResult<Arc<Plan>> {
        let plan = self
            .plans
            .patch(plan_id, json!({ "is_active": active }))
            .await?;
        tracing::info!(
            "Plan '{}' {}",
            plan.name,
            if active { "activated" } else { "deactivated" }
        );
        Ok(plan)
    }

    // --- Invoices ---

    /// Draft -> sent
    pub async fn send_invoice(&self, invoice_id: i64) -> StoreResult<Arc<Invoice>> {
        let invoice = self.invoices.get_or_retrieve(invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(StoreError::InvalidState(format!(
                "Only draft invoices can be sent (invoice #{} is {:?})",
                invoice_id, invoice.status
            )));
        }
        self.invoices
            .patch(invoice_id, json!({ "status": InvoiceStatus::Sent }))
            .await
    }

    pub async fn cancel_invoice(&self, invoice_id: i64) -> StoreResult<Arc<Invoice>> {
        let invoice = self.invoices.get_or_retrieve(invoice_id).await?;
        match invoice.status {
            InvoiceStatus::Cancelled => {
                return Err(StoreError::InvalidState(format!(
                    "Invoice #{} is already cancelled",
                    invoice_id
                )));
            }
            InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid => {
                return Err(StoreError::InvalidState(format!(
                    "Invoice #{} has payments and cannot be cancelled",
                    invoice_id
                )));
            }
            _ => {}
        }
        self.invoices
            .patch(invoice_id, json!({ "status": InvoiceStatus::Cancelled }))
            .await
    }

    /// Record a payment and move the invoice to paid / partially paid
    pub async fn record_payment(
        &self,
        invoice_id: i64,
        amount: f64,
        method: PaymentMethod,
        paid_on: NaiveDate,
        reference: Option<String>,
    ) -> StoreResult<(Arc<Payment>, Arc<Invoice>)> {
        let invoice = self.invoices.get_or_retrieve(invoice_id).await?;
        if matches!(
            invoice.status,
            InvoiceStatus::Cancelled | InvoiceStatus::Paid
        ) {
            return Err(StoreError::InvalidState(format!(
                "Invoice #{} does not accept payments ({:?})",
                invoice_id, invoice.status
            )));
        }

        let balance = invoice.balance();
        if amount > balance + CENT {
            let mut errors = ValidationErrors::new();
            errors.add(
                "amount",
                &format!("Exceeds the outstanding balance of {:.2}.", balance),
            );
            return Err(errors.into());
        }

        let payment = Payment {
            id: None,
            invoice: invoice_id,
            amount: round_cents(amount),
            method,
            paid_on,
            reference,
        };
        let payment = self.payments.create(&payment).await?;

        let amount_paid = round_cents(invoice.amount_paid + payment.amount);
        let status = status_after_payment(&invoice, amount_paid);
        let invoice = self
            .invoices
            .patch(
                invoice_id,
                json!({ "amount_paid": amount_paid, "status": status }),
            )
            .await?;

        tracing::info!(
            "Payment of {:.2} recorded on invoice #{} ({:?})",
            payment.amount,
            invoice_id,
            invoice.status
        );
        Ok((payment, invoice))
    }

    /// Balance still owed across the cached open invoices
    pub async fn outstanding_balance(&self) -> f64 {
        let total: f64 = self
            .invoices
            .results()
            .await
            .iter()
            .filter(|i| i.status.is_open())
            .map(|i| i.balance())
            .sum();
        round_cents(total)
    }

    /// Cached open invoices past their due date
    pub async fn past_due_invoices(&self, today: NaiveDate) -> Vec<Arc<Invoice>> {
        self.invoices
            .results()
            .await
            .into_iter()
            .filter(|i| i.is_past_due(today))
            .collect()
    }

    // --- Ledger ---

    pub async fn ledger_totals(&self) -> LedgerTotals {
        let rows = self.transactions.results().await;
        ledger_totals(rows.iter().map(|t| t.as_ref()))
    }

    pub async fn reset(&self) {
        self.plans.reset().await;
        self.invoices.reset().await;
        self.payments.reset().await;
        self.transactions.reset().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceItem;

    fn tx(kind: TransactionKind, amount: f64) -> Transaction {
        Transaction {
            id: None,
            kind,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            description: "x".to_string(),
            category: None,
        }
    }

    #[test]
    fn test_ledger_totals() {
        let rows = vec![
            tx(TransactionKind::Income, 120.10),
            tx(TransactionKind::Expense, 20.05),
            tx(TransactionKind::Income, 0.2),
        ];
        let totals = ledger_totals(&rows);
        assert_eq!(totals.income, 120.3);
        assert_eq!(totals.expense, 20.05);
        assert_eq!(totals.net(), 100.25);
    }

    #[test]
    fn test_status_after_payment() {
        let invoice = Invoice {
            id: Some(1),
            number: None,
            customer: Some(1),
            student: None,
            plan: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            status: InvoiceStatus::Sent,
            items: vec![InvoiceItem {
                id: None,
                description: "Tuition".to_string(),
                quantity: 1,
                unit_price: 100.0,
            }],
            tax_rate: 0.0,
            amount_paid: 0.0,
            notes: None,
        };
        assert_eq!(status_after_payment(&invoice, 0.0), InvoiceStatus::Sent);
        assert_eq!(
            status_after_payment(&invoice, 40.0),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(status_after_payment(&invoice, 100.0), InvoiceStatus::Paid);
    }
}
