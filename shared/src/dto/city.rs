use serde::{Deserialize, Serialize};
use crate::models::city::City;

/// City as returned by search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CityDto {
    pub id: String,
    pub name: String,
    pub region: String,
    pub country_code: String,
    pub population: u64,
    pub timezone: String,
    /// Display label for pickers
    pub label: String,
}

impl From<&City> for CityDto {
    fn from(city: &City) -> Self {
        Self {
            id: city.id.clone(),
            name: city.name.clone(),
            region: city.region.clone(),
            country_code: city.country_code.clone(),
            population: city.population,
            timezone: city.timezone.clone(),
            label: city.label(),
        }
    }
}
