//! Writable documents accepted by the create and update endpoints.
//!
//! Each input type lists exactly the columns a client may set. Any other key
//! in a request body (`id`, `owner_id`, generated numbers, timestamps) is
//! dropped during deserialization, so it can never reach the database.
//!
//! Updates convert the stored record back into its input type, overlay the
//! keys the client sent, and run the create rules again over the result.

pub mod activity;
pub mod auth;
pub mod company;
pub mod contact;
pub mod deal;
pub mod invoice;
pub mod product;
pub mod quote;
pub mod task;

pub use activity::ActivityInput;
pub use auth::{LoginInput, RegisterInput};
pub use company::CompanyInput;
pub use contact::ContactInput;
pub use deal::{DealInput, StageInput};
pub use invoice::{InvoiceInput, PaymentInput};
pub use product::ProductInput;
pub use quote::{LineItemInput, QuoteInput};
pub use task::TaskInput;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::validation::{ValidationErrors, Validator};

/// Largest value accepted for `INTEGER` columns.
pub(crate) const INT_MAX: i64 = i32::MAX as i64;

/// A validated request document.
pub trait InputDocument: Serialize + DeserializeOwned {
    /// Rules applied on create and, over the merged document, on update.
    fn rules(validator: &mut Validator);

    /// Validate a request body and build the typed input.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    fn from_body(body: Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut validator = Validator::new(body);
        Self::rules(&mut validator);
        let document = validator.finish()?;
        serde_json::from_value(Value::Object(document)).map_err(|e| ValidationErrors::from_serde(&e))
    }

    /// Overlay the writable keys of `patch` onto this document and re-validate.
    ///
    /// # Errors
    ///
    /// Returns every failing field of the merged document.
    fn merge(&self, patch: Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut current = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ValidationErrors::from_serde(&e)),
        };

        for (key, value) in patch {
            if let Some(slot) = current.get_mut(&key) {
                *slot = value;
            }
        }

        Self::from_body(current)
    }
}
