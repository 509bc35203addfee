use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crm_core::models::Product;

use super::{INT_MAX, InputDocument};
use crate::validation::Validator;

/// Writable product fields. `code` uniqueness is enforced by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl InputDocument for ProductInput {
    fn rules(v: &mut Validator) {
        v.field("name").required().string().max(255);
        v.field("code").required().string().max(255);
        v.field("description").string();
        v.field("unit_price").required().money();
        v.field("currency").string();
        v.field("unit").string().max(255);
        v.field("quantity").integer().between(0, INT_MAX);
        v.field("active").boolean();
    }
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            code: product.code.clone(),
            description: product.description.clone(),
            unit_price: product.unit_price,
            currency: Some(product.currency.clone()),
            unit: product.unit.clone(),
            quantity: product.quantity,
            active: Some(product.active),
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

    #[test]
    fn test_required_fields() {
        let errors = ProductInput::from_body(body(json!({"name": "Widget"}))).unwrap_err();
        assert_eq!(errors.get("code").unwrap(), ["The code field is required."]);
        assert_eq!(
            errors.get("unit_price").unwrap(),
            ["The unit price field is required."]
        );
    }

    #[test]
    fn test_active_accepts_string_flag() {
        let input = ProductInput::from_body(body(json!({
            "name": "Widget",
            "code": "W-1",
            "unit_price": "19.99",
            "active": "0",
        })))
        .unwrap();
        assert_eq!(input.active, Some(false));
        assert_eq!(input.unit_price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_merge_keeps_code() {
        let stored = ProductInput::from_body(body(json!({
            "name": "Widget",
            "code": "W-1",
            "unit_price": 10,
        })))
        .unwrap();
        let merged = stored.merge(body(json!({"unit_price": 12.5}))).unwrap();
        assert_eq!(merged.code, "W-1");
        assert_eq!(merged.unit_price, Decimal::new(125, 1));
    }
}
