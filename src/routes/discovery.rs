use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::criteria::parse_radius;
use crate::core::{DiscoveryController, DiscoveryError};
use crate::models::{
    CategoryFilter, ErrorResponse, HealthResponse, ListingsResponse, PositionResponse,
    PositionStatus, Radius, RadiusValue, ReportPositionRequest, UpdateFiltersRequest,
    Coordinate,
};
use crate::services::{fetch_roster, LocatedPosition, LocationOutcome, LocationReporter, PreferenceStore, RosterProvider};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Controller shared by all workers; the mutex keeps it to one logical flow
pub type SharedController = Arc<Mutex<DiscoveryController<Box<dyn PreferenceStore>>>>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: SharedController,
    pub roster: Arc<dyn RosterProvider>,
    pub location: Arc<LocationReporter>,
}

/// Configure all discovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/listings", web::get().to(get_listings))
        .route("/listings/refresh", web::post().to(refresh_listings))
        .route("/filters", web::get().to(get_filters))
        .route("/filters", web::put().to(update_filters))
        .route("/filters", web::delete().to(reset_filters))
        .route("/position", web::post().to(report_position));
}

fn listings_response(controller: &DiscoveryController<Box<dyn PreferenceStore>>) -> ListingsResponse {
    let result = controller.result();
    ListingsResponse {
        listings: result.listings.clone(),
        total_listings: result.total_listings,
        criteria: controller.criteria().clone(),
        position: controller.position(),
        detected_city: controller.detected_city().map(str::to_string),
    }
}

fn error_response(err: DiscoveryError) -> HttpResponse {
    match err {
        DiscoveryError::Disposed => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "Discovery unavailable".to_string(),
            message: err.to_string(),
            status_code: 503,
        }),
        DiscoveryError::InvalidCriteria(_) => bad_request("Invalid filter criteria", err.to_string()),
    }
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let disposed = state.controller.lock().await.is_disposed();
    let status = if disposed { "stopping" } else { "healthy" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Current filtered result
///
/// GET /api/v1/listings
async fn get_listings(state: web::Data<AppState>) -> impl Responder {
    let controller = state.controller.lock().await;
    HttpResponse::Ok().json(listings_response(&controller))
}

/// Fetch a fresh roster and recompute
///
/// POST /api/v1/listings/refresh
async fn refresh_listings(state: web::Data<AppState>) -> impl Responder {
    // Fetch outside the lock so a slow store doesn't stall other requests
    let roster = fetch_roster(state.roster.as_ref()).await;

    let mut controller = state.controller.lock().await;
    if let Err(e) = controller.set_roster(roster) {
        return error_response(e);
    }

    let result = controller.result();
    tracing::info!("Roster refreshed: {} of {} listings visible", result.len(), result.total_listings);
    HttpResponse::Ok().json(listings_response(&controller))
}

/// Current criteria
///
/// GET /api/v1/filters
async fn get_filters(state: web::Data<AppState>) -> impl Responder {
    let controller = state.controller.lock().await;
    HttpResponse::Ok().json(controller.criteria())
}

/// Update some or all criteria
///
/// PUT /api/v1/filters
///
/// Request body (every field optional, `null` clears):
/// ```json
/// {
///   "city": "string",
///   "category": "all" | "woman" | "man" | "non_binary",
///   "minPrice": 0,
///   "maxPrice": 500,
///   "radius": 25 | "unlimited"
/// }
/// ```
async fn update_filters(
    state: web::Data<AppState>,
    req: web::Json<UpdateFiltersRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let mut controller = state.controller.lock().await;

    if req.is_empty() {
        return HttpResponse::Ok().json(listings_response(&controller));
    }

    let mut criteria = controller.criteria().clone();
    if let Some(city) = req.city {
        criteria.city = city;
    }
    if let Some(category) = req.category {
        criteria.category = CategoryFilter::parse_or_all(&category);
    }
    if let Some(min_price) = req.min_price {
        criteria.min_price = min_price;
    }
    if let Some(max_price) = req.max_price {
        criteria.max_price = max_price;
    }
    if let Some(radius) = req.radius {
        criteria.radius = match radius {
            RadiusValue::Km(km) => Radius::Km(km),
            RadiusValue::Text(text) => parse_radius(&text),
        };
    }

    tracing::debug!("Updating filter criteria: {:?}", criteria);

    if let Err(e) = controller.replace_criteria(criteria) {
        return error_response(e);
    }
    HttpResponse::Ok().json(listings_response(&controller))
}

/// Restore default criteria
///
/// DELETE /api/v1/filters
async fn reset_filters(state: web::Data<AppState>) -> impl Responder {
    let mut controller = state.controller.lock().await;
    if let Err(e) = controller.reset_criteria() {
        return error_response(e);
    }
    HttpResponse::Ok().json(listings_response(&controller))
}

/// Report the outcome of the client's geolocation request
///
/// POST /api/v1/position
async fn report_position(
    state: web::Data<AppState>,
    req: web::Json<ReportPositionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for position report: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let outcome = match req.status {
        PositionStatus::Located => match (req.latitude, req.longitude) {
            (Some(latitude), Some(longitude)) => LocationOutcome::Located(LocatedPosition {
                position: Coordinate::new(latitude, longitude),
                city: req.city,
            }),
            _ => {
                return bad_request(
                    "Validation failed",
                    "latitude and longitude are required when status is located".to_string(),
                )
            }
        },
        PositionStatus::Denied => LocationOutcome::Denied,
        PositionStatus::Unavailable => LocationOutcome::Unavailable,
    };

    let accepted = state.location.report(outcome);
    if !accepted {
        tracing::debug!("Position already reported, ignoring");
    }

    HttpResponse::Ok().json(PositionResponse { accepted })
}
