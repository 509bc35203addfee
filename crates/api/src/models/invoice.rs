use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crm_core::models::Invoice;
use crm_core::{CompanyId, ContactId, InvoiceStatus, QuoteId};

use super::{InputDocument, LineItemInput};
use crate::validation::Validator;

/// Writable invoice fields.
///
/// `paid_amount` and `balance_due` are client-maintained; recording a
/// payment does not touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInput {
    #[serde(default)]
    pub quote_id: Option<QuoteId>,
    pub contact_id: ContactId,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    pub subject: String,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    #[serde(default)]
    pub balance_due: Option<Decimal>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<LineItemInput>>,
}

impl InputDocument for InvoiceInput {
    fn rules(v: &mut Validator) {
        v.field("quote_id").integer();
        v.field("contact_id").required().integer();
        v.field("company_id").integer();
        v.field("subject").required().string().max(255);
        v.field("status").one_of(&InvoiceStatus::labels());
        v.field("invoice_date").required().date();
        v.field("due_date").required().date();
        for money in [
            "subtotal",
            "tax_amount",
            "discount_amount",
            "total",
            "paid_amount",
            "balance_due",
        ] {
            v.field(money).money();
        }
        v.field("currency").string();
        v.field("terms").string();
        v.each("items", LineItemInput::rules);
    }
}

impl From<&Invoice> for InvoiceInput {
    fn from(invoice: &Invoice) -> Self {
        Self {
            quote_id: invoice.quote_id,
            contact_id: invoice.contact_id,
            company_id: invoice.company_id,
            subject: invoice.subject.clone(),
            status: Some(invoice.status),
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            subtotal: Some(invoice.subtotal),
            tax_amount: Some(invoice.tax_amount),
            discount_amount: Some(invoice.discount_amount),
            total: Some(invoice.total),
            currency: Some(invoice.currency.clone()),
            paid_amount: Some(invoice.paid_amount),
            balance_due: Some(invoice.balance_due),
            terms: invoice.terms.clone(),
            items: None,
        }
    }
}

/// `POST /invoices/{id}/payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InputDocument for PaymentInput {
    fn rules(v: &mut Validator) {
        v.field("amount").required().money();
        v.field("payment_date").required().date();
        v.field("payment_method").required().string().max(255);
        v.field("reference").string().max(255);
        v.field("notes").string();
    }
}
