//! Property-based tests for the filtering engine using proptest.

use listing_discovery::core::{
    criteria::{deserialize_criteria, serialize_criteria},
    distance::distance_km,
    filter_listings,
    filters::matches_radius,
};
use listing_discovery::models::{Category, CategoryFilter, Coordinate, FilterCriteria, Listing, Radius};
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Strategies
// ============================================================================

fn coordinate_strategy() -> impl Strategy<Value = Coordinate> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
}

fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn category_filter_strategy() -> impl Strategy<Value = CategoryFilter> {
    prop_oneof![
        Just(CategoryFilter::All),
        category_strategy().prop_map(CategoryFilter::Only),
    ]
}

fn radius_strategy() -> impl Strategy<Value = Radius> {
    prop_oneof![Just(Radius::Unlimited), (0.0f64..2000.0).prop_map(Radius::Km)]
}

fn listing_strategy() -> impl Strategy<Value = Listing> {
    (
        "[a-z0-9]{1,8}",
        prop::sample::select(vec!["São Paulo", "Rio de Janeiro", "Recife", "Porto Alegre"]),
        category_strategy(),
        prop::option::of(0.0f64..2000.0),
        prop::option::of(coordinate_strategy()),
    )
        .prop_map(|(id, city, category, hourly_price, position)| Listing {
            id,
            name: "Creator".to_string(),
            username: None,
            category,
            city: city.to_string(),
            area: None,
            hourly_price,
            position,
            rating: 5.0,
            online: true,
            avatar: None,
            created_at: None,
        })
}

fn criteria_strategy() -> impl Strategy<Value = FilterCriteria> {
    (
        prop::option::of("[A-Za-z][A-Za-z ]{0,10}[A-Za-z]"),
        category_filter_strategy(),
        prop::option::of(0.0f64..1_000_000.0),
        prop::option::of(0.0f64..1_000_000.0),
        radius_strategy(),
    )
        .prop_map(|(city, category, min_price, max_price, radius)| FilterCriteria {
            city,
            category,
            min_price,
            max_price,
            radius,
        })
}

fn ids(listings: &[&Listing]) -> Vec<String> {
    listings.iter().map(|l| l.id.clone()).collect()
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Distance does not depend on argument order.
    #[test]
    fn distance_is_symmetric(a in coordinate_strategy(), b in coordinate_strategy()) {
        prop_assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-6);
    }

    /// A point is at distance zero from itself.
    #[test]
    fn distance_to_self_is_zero(a in coordinate_strategy()) {
        prop_assert!(distance_km(a, a).abs() < 1e-9);
    }

    /// Distances never exceed half the Earth's circumference.
    #[test]
    fn distance_is_bounded(a in coordinate_strategy(), b in coordinate_strategy()) {
        let d = distance_km(a, b);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * 6371.0 + 1e-6);
    }

    /// An unlimited radius never excludes a listing.
    #[test]
    fn unlimited_radius_admits_everything(
        listing in listing_strategy(),
        user in prop::option::of(coordinate_strategy()),
    ) {
        prop_assert!(matches_radius(&listing, user, Radius::Unlimited));
    }

    /// The result is an order-preserving subsequence of the roster.
    #[test]
    fn result_is_ordered_subsequence(
        roster in prop::collection::vec(listing_strategy(), 0..50),
        criteria in criteria_strategy(),
        user in prop::option::of(coordinate_strategy()),
    ) {
        let result = filter_listings(&roster, &criteria, user).unwrap();
        prop_assert!(result.len() <= roster.len());

        let mut cursor = roster.iter();
        for selected in &result {
            prop_assert!(cursor.any(|candidate| std::ptr::eq(candidate, *selected)));
        }
    }

    /// Filtering the filtered result changes nothing.
    #[test]
    fn filtering_is_idempotent(
        roster in prop::collection::vec(listing_strategy(), 0..50),
        criteria in criteria_strategy(),
        user in prop::option::of(coordinate_strategy()),
    ) {
        let first: Vec<Listing> = filter_listings(&roster, &criteria, user)
            .unwrap()
            .into_iter()
            .cloned()
            .collect();
        let second = filter_listings(&first, &criteria, user).unwrap();

        prop_assert_eq!(ids(&second), first.iter().map(|l| l.id.clone()).collect::<Vec<_>>());
    }

    /// Default criteria with no position select the whole roster.
    #[test]
    fn default_criteria_select_all(roster in prop::collection::vec(listing_strategy(), 0..50)) {
        let result = filter_listings(&roster, &FilterCriteria::default(), None).unwrap();
        prop_assert_eq!(result.len(), roster.len());
    }

    /// Persisted criteria read back unchanged.
    #[test]
    fn persisted_criteria_round_trip(criteria in criteria_strategy()) {
        let stored: HashMap<&str, String> = serialize_criteria(&criteria)
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        let restored = deserialize_criteria(|key| stored.get(key).cloned());
        prop_assert_eq!(restored, criteria);
    }
}
