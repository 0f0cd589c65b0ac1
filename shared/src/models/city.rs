use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Collection holding city documents
pub const CITY_COLLECTION: &str = "city";

fn validate_timezone(tz: &str) -> Result<(), ValidationError> {
    tz.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_timezone"))
}

/// A city events can be held in
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct City {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// State, province or region
    #[serde(default)]
    pub region: String,

    /// ISO 3166-1 alpha-2
    #[validate(length(equal = 2))]
    #[serde(rename = "countryCode")]
    pub country_code: String,

    #[serde(default)]
    pub population: u64,

    /// IANA timezone name
    #[validate(custom = "validate_timezone")]
    pub timezone: String,
}

impl City {
    /// "Paris, Île-de-France, FR"
    pub fn label(&self) -> String {
        if self.region.is_empty() {
            format!("{}, {}", self.name, self.country_code)
        } else {
            format!("{}, {}, {}", self.name, self.region, self.country_code)
        }
    }
}
