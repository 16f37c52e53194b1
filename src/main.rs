use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use listing_discovery::config::{LoggingSettings, Settings};
use listing_discovery::core::{locate_user, DiscoveryController};
use listing_discovery::routes::{self, AppState, SharedController};
use listing_discovery::services::{
    fetch_roster, FilePreferenceStore, PreferenceStore, ReportedLocation, RestRosterProvider,
    RosterProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(logging: &LoggingSettings) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    info!("Starting listing discovery service...");

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::other(format!("Configuration error: {}", e)));
        }
    };

    info!("Configuration loaded successfully");

    // Restore the last-used criteria
    let store = FilePreferenceStore::open(&settings.preferences.path);
    info!("Filter preferences loaded from {}", store.path().display());

    let controller: SharedController = Arc::new(Mutex::new(DiscoveryController::new(
        Box::new(store) as Box<dyn PreferenceStore>,
    )));

    let timeout = Duration::from_secs(settings.roster.timeout_secs.unwrap_or(30));
    let roster: Arc<dyn RosterProvider> = match RestRosterProvider::new(
        settings.roster.endpoint.clone(),
        settings.roster.api_key.clone(),
        settings.roster.table.clone(),
        timeout,
    ) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Failed to create roster client: {}", e);
            return Err(std::io::Error::other(format!("Roster client error: {}", e)));
        }
    };

    info!("Roster provider initialized ({} / {})", settings.roster.endpoint, settings.roster.table);

    // Initial roster; a failed fetch starts from an empty one
    let initial = fetch_roster(roster.as_ref()).await;
    if let Err(e) = controller.lock().await.set_roster(initial) {
        error!("Failed to apply initial roster: {}", e);
    }

    // Single location request, resolved when a client reports its position
    let (location_service, reporter) = ReportedLocation::channel();
    let weak = Arc::downgrade(&controller);
    actix_web::rt::spawn(async move {
        if locate_user(weak, &location_service).await {
            info!("Location outcome applied");
        }
    });

    let app_state = AppState {
        controller: controller.clone(),
        roster,
        location: Arc::new(reporter),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    // Any location outcome arriving after this point is dropped
    controller.lock().await.dispose();
    info!("Discovery controller disposed");

    result
}
