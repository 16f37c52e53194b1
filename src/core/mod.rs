// Core algorithm exports
pub mod criteria;
pub mod discovery;
pub mod distance;
pub mod filters;

pub use criteria::{deserialize_criteria, serialize_criteria, CriteriaError, FilterStore, PreferenceKey};
pub use discovery::{locate_user, DiscoveryController, DiscoveryError, LocateTicket};
pub use distance::{distance_km, haversine_distance, is_within_radius};
pub use filters::{filter_listings, matches_criteria, ListingPredicate};
