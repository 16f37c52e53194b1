use crate::core::criteria::{normalize_city, validate, CriteriaError};
use crate::core::distance::distance_km;
use crate::models::{CategoryFilter, Coordinate, FilterCriteria, Listing, Radius, UserPosition};

/// City predicate: substring containment, case-insensitive.
///
/// `needle` must already be lowercased.
#[inline]
pub fn matches_city(listing: &Listing, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => listing.city.to_lowercase().contains(needle),
    }
}

/// Category predicate
#[inline]
pub fn matches_category(listing: &Listing, filter: CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(category) => listing.category == category,
    }
}

/// Price predicate. Inverted bounds simply admit nothing.
#[inline]
pub fn matches_price(listing: &Listing, min: f64, max: f64) -> bool {
    let price = listing.price();
    min <= price && price <= max
}

/// Radius predicate
///
/// Unknown positions on either side never exclude a listing.
#[inline]
pub fn matches_radius(listing: &Listing, user: Option<Coordinate>, radius: Radius) -> bool {
    let Radius::Km(radius_km) = radius else {
        return true;
    };

    match (user, listing.position) {
        (Some(user), Some(position)) => distance_km(user, position) <= radius_km,
        _ => true,
    }
}

/// Combined membership test for one set of criteria
///
/// Built once per filtering pass so the city needle is lowercased only once.
#[derive(Debug, Clone)]
pub struct ListingPredicate {
    city: Option<String>,
    category: CategoryFilter,
    min_price: f64,
    max_price: f64,
    radius: Radius,
    position: Option<UserPosition>,
}

impl ListingPredicate {
    /// Compose the per-dimension predicates
    ///
    /// Fails fast on criteria that could only come from a caller bug
    /// (NaN, infinite or negative bounds). Out-of-order bounds are accepted.
    pub fn new(
        criteria: &FilterCriteria,
        position: Option<UserPosition>,
    ) -> Result<Self, CriteriaError> {
        validate(criteria)?;

        Ok(Self {
            city: normalize_city(criteria.city.as_deref()).map(|city| city.to_lowercase()),
            category: criteria.category,
            min_price: criteria.min_bound(),
            max_price: criteria.max_bound(),
            radius: criteria.radius,
            position,
        })
    }

    /// Logical AND of the four predicates
    #[inline]
    pub fn matches(&self, listing: &Listing) -> bool {
        matches_city(listing, self.city.as_deref())
            && matches_category(listing, self.category)
            && matches_price(listing, self.min_price, self.max_price)
            && matches_radius(listing, self.position, self.radius)
    }

    /// Select the matching listings, preserving roster order
    pub fn apply<'a>(&self, roster: &'a [Listing]) -> Vec<&'a Listing> {
        roster.iter().filter(|listing| self.matches(listing)).collect()
    }
}

/// Check whether a single listing passes the criteria
pub fn matches_criteria(
    listing: &Listing,
    criteria: &FilterCriteria,
    position: Option<UserPosition>,
) -> Result<bool, CriteriaError> {
    Ok(ListingPredicate::new(criteria, position)?.matches(listing))
}

/// Run one filtering pass over a roster
///
/// The result is a subsequence of `roster` in its original order.
pub fn filter_listings<'a>(
    roster: &'a [Listing],
    criteria: &FilterCriteria,
    position: Option<UserPosition>,
) -> Result<Vec<&'a Listing>, CriteriaError> {
    let predicate = ListingPredicate::new(criteria, position)?;
    let selected = predicate.apply(roster);

    tracing::debug!(
        "Filtering pass kept {} of {} listings",
        selected.len(),
        roster.len()
    );

    Ok(selected)
}
