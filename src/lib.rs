//! Listing Discovery - filtering engine for the creator marketplace
//!
//! This library decides which creator listings a user sees, given a roster,
//! the user's filter criteria (city, category, price range, radius) and an
//! optional position resolved once per session.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{DiscoveryController, DiscoveryError, CriteriaError, FilterStore, filter_listings, distance::{distance_km, haversine_distance}};
pub use crate::models::{Category, CategoryFilter, Coordinate, FilterCriteria, FilteredResult, Listing, Radius, UserPosition};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let distance = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        assert!(distance > 111.0 && distance < 112.0);
        assert!(filter_listings(&[], &FilterCriteria::default(), None).unwrap().is_empty());
    }
}
