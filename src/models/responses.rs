use serde::{Deserialize, Serialize};
use crate::models::domain::{FilterCriteria, Listing, UserPosition};

/// Response for the listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
    #[serde(rename = "totalListings")]
    pub total_listings: usize,
    pub criteria: FilterCriteria,
    pub position: Option<UserPosition>,
    #[serde(rename = "detectedCity")]
    pub detected_city: Option<String>,
}

/// Response for the position report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResponse {
    pub accepted: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
