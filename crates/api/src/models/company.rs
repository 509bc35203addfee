use serde::{Deserialize, Serialize};

use crm_core::models::Company;

use super::InputDocument;
use crate::validation::Validator;

/// Writable company fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl InputDocument for CompanyInput {
    fn rules(v: &mut Validator) {
        v.field("name").required().string().max(255);
        for name in [
            "email", "phone", "mobile", "website", "industry", "address", "city", "state",
            "country", "zip_code",
        ] {
            v.field(name).string().max(255);
        }
        v.field("logo").string();
    }
}

impl From<&Company> for CompanyInput {
    fn from(company: &Company) -> Self {
        Self {
            name: company.name.clone(),
            email: company.email.clone(),
            phone: company.phone.clone(),
            mobile: company.mobile.clone(),
            website: company.website.clone(),
            industry: company.industry.clone(),
            address: company.address.clone(),
            city: company.city.clone(),
            state: company.state.clone(),
            country: company.country.clone(),
            zip_code: company.zip_code.clone(),
            logo: company.logo.clone(),
        }
    }
}
