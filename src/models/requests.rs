use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Partial update of the filter criteria
///
/// An absent field keeps its current value; an explicit `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFiltersRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[serde(alias = "min_price", rename = "minPrice")]
    pub min_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[serde(alias = "max_price", rename = "maxPrice")]
    pub max_price: Option<Option<f64>>,
    #[serde(default)]
    pub radius: Option<RadiusValue>,
}

impl UpdateFiltersRequest {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.radius.is_none()
    }
}

/// Radius as sent by clients: a number of kilometres or the sentinel text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RadiusValue {
    Km(f64),
    Text(String),
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Outcome of the browser's geolocation request, reported by the client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportPositionRequest {
    pub status: PositionStatus,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(min = 1, max = 120))]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Located,
    Denied,
    Unavailable,
}
