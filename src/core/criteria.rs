use crate::models::{CategoryFilter, FilterCriteria, Radius};
use crate::services::PreferenceStore;
use thiserror::Error;

/// Criteria values that can only come from a caller bug
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CriteriaError {
    #[error("Invalid {field}: {value} (must be a finite non-negative number)")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("Invalid radius: {0} km (must be a finite non-negative number)")]
    InvalidRadius(f64),
}

/// Keys written to the filter preference store
pub struct PreferenceKey;

impl PreferenceKey {
    pub const CITY: &'static str = "filters.city";
    pub const CATEGORY: &'static str = "filters.category";
    pub const MIN_PRICE: &'static str = "filters.min_price";
    pub const MAX_PRICE: &'static str = "filters.max_price";
    pub const RADIUS: &'static str = "filters.radius";

    pub const ALL: [&'static str; 5] = [
        Self::CITY,
        Self::CATEGORY,
        Self::MIN_PRICE,
        Self::MAX_PRICE,
        Self::RADIUS,
    ];
}

fn check_price(field: &'static str, value: Option<f64>) -> Result<(), CriteriaError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(CriteriaError::InvalidPrice { field, value: v }),
        _ => Ok(()),
    }
}

fn check_radius(radius: Radius) -> Result<(), CriteriaError> {
    match radius {
        Radius::Km(km) if !km.is_finite() || km < 0.0 => Err(CriteriaError::InvalidRadius(km)),
        _ => Ok(()),
    }
}

/// Reject criteria no caller should be able to build
///
/// Inverted price bounds are deliberately allowed.
pub fn validate(criteria: &FilterCriteria) -> Result<(), CriteriaError> {
    check_price("minimum price", criteria.min_price)?;
    check_price("maximum price", criteria.max_price)?;
    check_radius(criteria.radius)
}

/// Trim the city filter; blank means unset
pub fn normalize_city(city: Option<&str>) -> Option<String> {
    city.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn parse_price(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse the stored radius text; anything unusable is "unlimited"
pub fn parse_radius(value: &str) -> Radius {
    let value = value.trim();
    if value.eq_ignore_ascii_case(Radius::UNLIMITED_SENTINEL) {
        return Radius::Unlimited;
    }

    match value.parse::<f64>() {
        Ok(km) if km.is_finite() && km >= 0.0 => Radius::Km(km),
        _ => Radius::Unlimited,
    }
}

/// Text written for a radius
pub fn format_radius(radius: Radius) -> String {
    match radius {
        Radius::Unlimited => Radius::UNLIMITED_SENTINEL.to_string(),
        Radius::Km(km) => km.to_string(),
    }
}

/// Serialize the full criteria set into store entries.
///
/// `None` means the key should be removed.
pub fn serialize_criteria(criteria: &FilterCriteria) -> Vec<(&'static str, Option<String>)> {
    vec![
        (PreferenceKey::CITY, criteria.city.clone()),
        (PreferenceKey::CATEGORY, Some(criteria.category.as_str().to_string())),
        (PreferenceKey::MIN_PRICE, criteria.min_price.map(|p| p.to_string())),
        (PreferenceKey::MAX_PRICE, criteria.max_price.map(|p| p.to_string())),
        (PreferenceKey::RADIUS, Some(format_radius(criteria.radius))),
    ]
}

/// Rebuild criteria from stored text
///
/// Missing keys take their default; unparsable prices are unset and an
/// unknown category falls back to "all".
pub fn deserialize_criteria<F>(lookup: F) -> FilterCriteria
where
    F: Fn(&str) -> Option<String>,
{
    FilterCriteria {
        city: normalize_city(lookup(PreferenceKey::CITY).as_deref()),
        category: lookup(PreferenceKey::CATEGORY)
            .map(|v| CategoryFilter::parse_or_all(&v))
            .unwrap_or_default(),
        min_price: lookup(PreferenceKey::MIN_PRICE).and_then(|v| parse_price(&v)),
        max_price: lookup(PreferenceKey::MAX_PRICE).and_then(|v| parse_price(&v)),
        radius: lookup(PreferenceKey::RADIUS)
            .map(|v| parse_radius(&v))
            .unwrap_or_default(),
    }
}

/// Current filter selections with write-through persistence
///
/// Every mutation writes the whole criteria set to the backing store.
/// A failed write is logged and the in-memory value is kept.
#[derive(Debug)]
pub struct FilterStore<S> {
    criteria: FilterCriteria,
    store: S,
}

impl<S: PreferenceStore> FilterStore<S> {
    /// Restore the last persisted criteria (defaults for anything missing)
    pub fn load(store: S) -> Self {
        let criteria = deserialize_criteria(|key| store.get(key));
        tracing::debug!("Restored filter criteria: {:?}", criteria);
        Self { criteria, store }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn city(&self) -> Option<&str> {
        self.criteria.city.as_deref()
    }

    pub fn category(&self) -> CategoryFilter {
        self.criteria.category
    }

    pub fn min_price(&self) -> Option<f64> {
        self.criteria.min_price
    }

    pub fn max_price(&self) -> Option<f64> {
        self.criteria.max_price
    }

    pub fn radius(&self) -> Radius {
        self.criteria.radius
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_city(&mut self, city: Option<&str>) {
        self.criteria.city = normalize_city(city);
        self.persist();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.criteria.category = category;
        self.persist();
    }

    pub fn set_min_price(&mut self, price: Option<f64>) -> Result<(), CriteriaError> {
        check_price("minimum price", price)?;
        self.criteria.min_price = price;
        self.persist();
        Ok(())
    }

    pub fn set_max_price(&mut self, price: Option<f64>) -> Result<(), CriteriaError> {
        check_price("maximum price", price)?;
        self.criteria.max_price = price;
        self.persist();
        Ok(())
    }

    pub fn set_radius(&mut self, radius: Radius) -> Result<(), CriteriaError> {
        check_radius(radius)?;
        self.criteria.radius = radius;
        self.persist();
        Ok(())
    }

    /// Replace every criterion at once (single write)
    pub fn replace(&mut self, mut criteria: FilterCriteria) -> Result<(), CriteriaError> {
        validate(&criteria)?;
        criteria.city = normalize_city(criteria.city.as_deref());
        self.criteria = criteria;
        self.persist();
        Ok(())
    }

    /// Restore engine defaults
    pub fn reset(&mut self) {
        self.criteria = FilterCriteria::default();
        self.persist();
    }

    fn persist(&mut self) {
        let entries = serialize_criteria(&self.criteria);
        if let Err(e) = self.store.write_all(&entries) {
            tracing::warn!("Failed to persist filter criteria, keeping in-memory values: {}", e);
        }
    }
}
