// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Category, CategoryFilter, Coordinate, FilterCriteria, FilteredResult, Listing, Radius, UserPosition};
pub use requests::{PositionStatus, RadiusValue, ReportPositionRequest, UpdateFiltersRequest};
pub use responses::{ErrorResponse, HealthResponse, ListingsResponse, PositionResponse};
