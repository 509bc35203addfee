use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crm_core::models::Deal;
use crm_core::{CompanyId, ContactId, DealStage};

use super::InputDocument;
use crate::validation::Validator;

/// Writable deal fields. Absent `stage`, `probability` and `currency` take
/// the column defaults (`New`, `10`, `USD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealInput {
    pub name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub stage: Option<DealStage>,
    #[serde(default)]
    pub probability: Option<i32>,
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub description: Option<String>,
}

impl InputDocument for DealInput {
    fn rules(v: &mut Validator) {
        v.field("name").required().string().max(255);
        v.field("amount").required().money();
        v.field("currency").string();
        v.field("stage").one_of(&DealStage::labels());
        v.field("probability").integer().between(0, 100);
        v.field("expected_close_date").date();
        v.field("contact_id").integer();
        v.field("company_id").integer();
        v.field("description").string();
    }
}

impl From<&Deal> for DealInput {
    fn from(deal: &Deal) -> Self {
        Self {
            name: deal.name.clone(),
            amount: deal.amount,
            currency: Some(deal.currency.clone()),
            stage: Some(deal.stage),
            probability: Some(deal.probability),
            expected_close_date: deal.expected_close_date,
            contact_id: deal.contact_id,
            company_id: deal.company_id,
            description: deal.description.clone(),
        }
    }
}

/// `PUT /deals/{id}/stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInput {
    pub stage: DealStage,
}

impl InputDocument for StageInput {
    fn rules(v: &mut Validator) {
        v.field("stage").required().one_of(&DealStage::labels());
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

    #[test]
    fn test_amount_must_be_numeric() {
        let errors = DealInput::from_body(body(json!({"name": "Big", "amount": "lots"}))).unwrap_err();
        assert_eq!(
            errors.get("amount").unwrap(),
            ["The amount field must be a number."]
        );
    }

    #[test]
    fn test_amount_must_fit_money_column() {
        let errors = DealInput::from_body(body(json!({"name": "Huge", "amount": "10000000000000"})))
            .unwrap_err();
        assert!(errors.has("amount"));

        let input =
            DealInput::from_body(body(json!({"name": "Max", "amount": "9999999999999.99"}))).unwrap();
        assert_eq!(input.amount.to_string(), "9999999999999.99");
    }

    #[test]
    fn test_amount_accepts_string_and_number() {
        let from_number = DealInput::from_body(body(json!({"name": "A", "amount": 5000}))).unwrap();
        let from_string = DealInput::from_body(body(json!({"name": "A", "amount": "5000.00"}))).unwrap();
        assert_eq!(from_number.amount, from_string.amount);
        assert_eq!(from_number.stage, None);
    }

    #[test]
    fn test_stage_label_set() {
        let input = DealInput::from_body(body(json!({
            "name": "A",
            "amount": 1,
            "stage": "Closed Won",
            "expected_close_date": "2026-12-01",
        })))
        .unwrap();
        assert_eq!(input.stage, Some(DealStage::ClosedWon));

        let errors = DealInput::from_body(body(json!({"name": "A", "amount": 1, "stage": "Won"}))).unwrap_err();
        assert_eq!(errors.get("stage").unwrap(), ["The selected stage is invalid."]);
    }

    #[test]
    fn test_probability_range() {
        let errors = DealInput::from_body(body(json!({"name": "A", "amount": 1, "probability": 101}))).unwrap_err();
        assert!(errors.has("probability"));
    }

    #[test]
    fn test_expected_close_date_nullable() {
        let input = DealInput::from_body(body(json!({
            "name": "A",
            "amount": 1,
            "expected_close_date": null,
        })))
        .unwrap();
        assert_eq!(input.expected_close_date, None);
    }

    #[test]
    fn test_stage_input() {
        let input = StageInput::from_body(body(json!({"stage": "Negotiation/Review"}))).unwrap();
        assert_eq!(input.stage, DealStage::Negotiation);

        let errors = StageInput::from_body(body(json!({}))).unwrap_err();
        assert_eq!(errors.get("stage").unwrap(), ["The stage field is required."]);
    }
}
