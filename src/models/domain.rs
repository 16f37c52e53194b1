use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a listing is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Woman,
    Man,
    NonBinary,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Woman, Category::Man, Category::NonBinary];

    /// Text form used by the preference store
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Woman => "woman",
            Category::Man => "man",
            Category::NonBinary => "non_binary",
        }
    }

    /// Parse the stored text form, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value))
    }

    /// Map a free-text gender label from the roster store onto a category.
    ///
    /// Unknown labels land in `NonBinary` so the listing stays visible.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "woman" | "women" | "female" | "mulher" | "mulheres" => Category::Woman,
            "man" | "men" | "male" | "homem" | "homens" => Category::Man,
            _ => Category::NonBinary,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// The user's own position, resolved at most once per session
pub type UserPosition = Coordinate;

/// Creator listing as supplied by the roster provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub category: Category,
    pub city: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(rename = "hourlyPrice", default)]
    pub hourly_price: Option<f64>,
    #[serde(default)]
    pub position: Option<Coordinate>,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Listing {
    /// Helper to get the hourly price, treating a missing price as 0
    pub fn price(&self) -> f64 {
        self.hourly_price.unwrap_or(0.0)
    }
}

pub(crate) fn default_rating() -> f64 { 5.0 }

/// Category filter: a single category or the "all" sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub const ALL_SENTINEL: &'static str = "all";

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => Self::ALL_SENTINEL,
            CategoryFilter::Only(category) => category.as_str(),
        }
    }

    /// Parse stored text; anything unrecognized falls back to `All`
    pub fn parse_or_all(value: &str) -> Self {
        Category::parse(value).map_or(CategoryFilter::All, CategoryFilter::Only)
    }
}

/// Radius constraint around the user's position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Radius {
    #[default]
    Unlimited,
    Km(f64),
}

impl Radius {
    pub const UNLIMITED_SENTINEL: &'static str = "unlimited";
}

/// The user's current filter selections
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub city: Option<String>,
    pub category: CategoryFilter,
    #[serde(rename = "minPrice")]
    pub min_price: Option<f64>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<f64>,
    pub radius: Radius,
}

impl FilterCriteria {
    /// Effective lower price bound (unset is 0)
    pub fn min_bound(&self) -> f64 {
        self.min_price.unwrap_or(0.0)
    }

    /// Effective upper price bound (unset is +infinity)
    pub fn max_bound(&self) -> f64 {
        self.max_price.unwrap_or(f64::INFINITY)
    }
}

/// Listings that passed a filtering pass, in roster order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredResult {
    pub listings: Vec<Listing>,
    #[serde(rename = "totalListings")]
    pub total_listings: usize,
}

impl FilteredResult {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.listings.iter().map(|l| l.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("WOMAN"), Some(Category::Woman));
        assert_eq!(Category::parse(" non_binary "), Some(Category::NonBinary));
        assert_eq!(Category::parse("robot"), None);
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(Category::from_label("Mulheres"), Category::Woman);
        assert_eq!(Category::from_label("male"), Category::Man);
        assert_eq!(Category::from_label("Trans"), Category::NonBinary);
    }

    #[test]
    fn test_category_filter_falls_back_to_all() {
        assert_eq!(CategoryFilter::parse_or_all("man"), CategoryFilter::Only(Category::Man));
        assert_eq!(CategoryFilter::parse_or_all("everyone"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse_or_all(""), CategoryFilter::All);
    }

    #[test]
    fn test_default_criteria_bounds() {
        let criteria = FilterCriteria::default();
        assert_eq!(criteria.min_bound(), 0.0);
        assert!(criteria.max_bound().is_infinite());
        assert_eq!(criteria.radius, Radius::Unlimited);
        assert_eq!(criteria.category, CategoryFilter::All);
    }

    #[test]
    fn test_missing_price_is_zero() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "Ana",
            "category": "woman",
            "city": "Curitiba"
        }))
        .unwrap();

        assert_eq!(listing.price(), 0.0);
        assert_eq!(listing.rating, 5.0);
        assert!(listing.position.is_none());
    }
}
