use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crm_core::models::Quote;
use crm_core::{CompanyId, ContactId, DealId, ProductId, QuoteStatus};

use super::{INT_MAX, InputDocument};
use crate::validation::Validator;

/// One quote or invoice line as submitted. `amount` is stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount: Option<Decimal>,
    pub amount: Decimal,
}

impl LineItemInput {
    /// Rules for each element of an `items` array.
    pub fn rules(v: &mut Validator) {
        v.field("product_id").integer();
        v.field("name").required().string().max(255);
        v.field("description").string();
        v.field("quantity").required().integer().between(1, INT_MAX);
        v.field("unit_price").required().money();
        v.field("discount").money();
        v.field("amount").required().money();
    }
}

/// Writable quote fields.
///
/// `items`, when present, replaces every stored line. The money columns are
/// stored as submitted and default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub contact_id: ContactId,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    pub subject: String,
    #[serde(default)]
    pub status: Option<QuoteStatus>,
    pub expiration_date: NaiveDate,
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
    pub terms: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<LineItemInput>>,
}

impl InputDocument for QuoteInput {
    fn rules(v: &mut Validator) {
        v.field("contact_id").required().integer();
        v.field("company_id").integer();
        v.field("deal_id").integer();
        v.field("subject").required().string().max(255);
        v.field("status").one_of(&QuoteStatus::labels());
        v.field("expiration_date").required().date();
        for money in ["subtotal", "tax_amount", "discount_amount", "total"] {
            v.field(money).money();
        }
        v.field("currency").string();
        v.field("terms").string();
        v.each("items", LineItemInput::rules);
    }
}

impl From<&Quote> for QuoteInput {
    fn from(quote: &Quote) -> Self {
        Self {
            contact_id: quote.contact_id,
            company_id: quote.company_id,
            deal_id: quote.deal_id,
            subject: quote.subject.clone(),
            status: Some(quote.status),
            expiration_date: quote.expiration_date,
            subtotal: Some(quote.subtotal),
            tax_amount: Some(quote.tax_amount),
            discount_amount: Some(quote.discount_amount),
            total: Some(quote.total),
            currency: Some(quote.currency.clone()),
            terms: quote.terms.clone(),
            items: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn minimal() -> Value {
        json!({
            "contact_id": 1,
            "subject": "Website rebuild",
            "expiration_date": "2026-11-30",
        })
    }

    #[test]
    fn test_required_fields() {
        let errors = QuoteInput::from_body(body(json!({}))).unwrap_err();
        assert!(errors.has("contact_id"));
        assert!(errors.has("subject"));
        assert!(errors.has("expiration_date"));
    }

    #[test]
    fn test_quote_number_is_not_writable() {
        let mut value = minimal();
        value["quote_number"] = json!("QT-1");
        let input = QuoteInput::from_body(body(value)).unwrap();
        let round = serde_json::to_value(&input).unwrap();
        assert!(round.get("quote_number").is_none());
        assert_eq!(input.items, None);
    }

    #[test]
    fn test_items_are_validated() {
        let mut value = minimal();
        value["items"] = json!([
            {"name": "Design", "quantity": 2, "unit_price": "500", "amount": "1000"},
            {"name": "Build", "quantity": 0, "unit_price": "1", "amount": "0"},
        ]);
        let errors = QuoteInput::from_body(body(value)).unwrap_err();
        assert!(errors.has("items.1.quantity"));
        assert!(!errors.has("items.0.quantity"));
    }

    #[test]
    fn test_items_parse() {
        let mut value = minimal();
        value["total"] = json!(1100);
        value["items"] = json!([
            {"product_id": 3, "name": "Design", "quantity": "2", "unit_price": 500, "discount": 0, "amount": 1000},
        ]);
        let input = QuoteInput::from_body(body(value)).unwrap();
        let items = input.items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].product_id, Some(ProductId::new(3)));
        assert_eq!(input.total, Some(Decimal::new(1100, 0)));
    }

    #[test]
    fn test_merge_without_items_keeps_lines() {
        let stored = QuoteInput::from_body(body(minimal())).unwrap();
        let merged = stored.merge(body(json!({"status": "sent"}))).unwrap();
        assert_eq!(merged.status, Some(QuoteStatus::Sent));
        assert_eq!(merged.items, None);
    }
}
