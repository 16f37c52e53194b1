use crate::models::{Category, Coordinate, Listing};
use crate::models::domain::default_rating;
use async_trait::async_trait;
use reqwest::Client;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching the roster
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of the current listing roster
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Listing>, RosterError>;
}

/// Fetch the roster, treating any failure as an empty roster
pub async fn fetch_roster<R>(provider: &R) -> Vec<Listing>
where
    R: RosterProvider + ?Sized,
{
    match provider.get_all().await {
        Ok(listings) => {
            tracing::debug!("Fetched roster with {} listings", listings.len());
            listings
        }
        Err(e) => {
            tracing::warn!("Failed to fetch roster, proceeding with an empty one: {}", e);
            Vec::new()
        }
    }
}

/// Fixed roster held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    listings: Vec<Listing>,
}

impl StaticRoster {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl RosterProvider for StaticRoster {
    async fn get_all(&self) -> Result<Vec<Listing>, RosterError> {
        Ok(self.listings.clone())
    }
}

/// Row layout of the hosted `creators` table
#[derive(Debug, Deserialize)]
struct CreatorRow {
    id: Value,
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    location_city: Option<String>,
    #[serde(default)]
    location_area: Option<String>,
    #[serde(default)]
    location_lat: Option<f64>,
    #[serde(default)]
    location_lng: Option<f64>,
    #[serde(default)]
    base_rate: Option<f64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    online: Option<bool>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

/// Accept RFC 3339 timestamps and zone-less ones (taken as UTC).
/// Anything else is dropped instead of failing the row.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(text)) = raw else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    let naive = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f"));

    match naive {
        Ok(naive) => Ok(Some(naive.and_utc())),
        Err(e) => {
            tracing::debug!("Ignoring unparsable created_at {:?}: {}", text, e);
            Ok(None)
        }
    }
}

impl CreatorRow {
    fn into_listing(self) -> Option<Listing> {
        let id = match self.id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let position = match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        };

        Some(Listing {
            id,
            name: self.name,
            username: self.username,
            category: self
                .gender
                .as_deref()
                .map_or(Category::NonBinary, Category::from_label),
            city: self.location_city.unwrap_or_default(),
            area: self.location_area,
            hourly_price: self.base_rate,
            position,
            rating: self.rating.unwrap_or_else(default_rating),
            online: self.online.unwrap_or(false),
            avatar: self.avatar,
            created_at: self.created_at,
        })
    }
}

/// Roster provider backed by the hosted data store's REST interface
pub struct RestRosterProvider {
    base_url: String,
    api_key: String,
    table: String,
    client: Client,
}

impl RestRosterProvider {
    /// Create a new REST roster provider
    pub fn new(
        base_url: String,
        api_key: String,
        table: String,
        timeout: Duration,
    ) -> Result<Self, RosterError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            table,
            client,
        })
    }

    fn listing_url(&self) -> String {
        format!(
            "{}/rest/v1/{}?select=*&order=created_at.desc",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }
}

#[async_trait]
impl RosterProvider for RestRosterProvider {
    async fn get_all(&self) -> Result<Vec<Listing>, RosterError> {
        let url = self.listing_url();

        tracing::debug!("Fetching roster from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch roster: {} - {}", status, body);
            return Err(RosterError::ApiError(format!("Failed to fetch roster: {}", status)));
        }

        let json: Value = response.json().await?;

        let rows = json
            .as_array()
            .ok_or_else(|| RosterError::InvalidResponse("Expected an array of rows".into()))?;

        let listings: Vec<Listing> = rows
            .iter()
            .filter_map(|row| match serde_json::from_value::<CreatorRow>(row.clone()) {
                Ok(row) => row.into_listing(),
                Err(e) => {
                    tracing::debug!("Skipping malformed roster row: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!("Parsed {} of {} roster rows", listings.len(), rows.len());

        Ok(listings)
    }
}
