use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{DeRegDependencies, DeRegDeviceService, DeRegDocumentService};
use persistence::reference::ReferenceData;
use persistence::repositories::{
    DeRegDetailsRepository, DeRegDeviceRepository, DocumentRepository, RegistryRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{deregistration, documents, health, reference_data};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub reference: ReferenceData,
    pub devices: Arc<DeRegDeviceService>,
    pub documents: Arc<DeRegDocumentService>,
}

impl AppState {
    /// Wires repositories, reference caches and services over one pool.
    pub fn new(config: Arc<Config>, pool: PgPool) -> Self {
        let reference =
            ReferenceData::new(pool.clone(), config.deregistration.reference_cache_size);
        let requests = Arc::new(DeRegDetailsRepository::new(pool.clone()));

        let devices = DeRegDeviceService::new(
            DeRegDependencies {
                requests: requests.clone(),
                registry: Arc::new(RegistryRepository::new(pool.clone())),
                devices: Arc::new(DeRegDeviceRepository::new(pool.clone())),
                statuses: reference.statuses.clone(),
                device_types: reference.device_types.clone(),
            },
            config.deregistration.settings(),
        );

        let documents = DeRegDocumentService::new(
            requests,
            Arc::new(DocumentRepository::new(pool.clone())),
            config.deregistration.document_settings(),
        );

        Self {
            pool,
            config,
            reference,
            devices: Arc::new(devices),
            documents: Arc::new(documents),
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);
    let state = AppState::new(config.clone(), pool);

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let deregistration_routes = Router::new()
        .route(
            "/api/v1/deregistration/:dereg_id/devices",
            get(deregistration::get_devices),
        )
        .route(
            "/api/v1/deregistration/devices",
            post(deregistration::create_devices).put(deregistration::update_devices),
        )
        .route(
            "/api/v1/deregistration/:dereg_id/documents",
            get(documents::get_documents),
        )
        .route(
            "/api/v1/deregistration/documents",
            axum::routing::put(documents::update_documents),
        );

    let reference_routes = Router::new()
        .route("/api/v1/device-types", get(reference_data::list_device_types))
        .route(
            "/api/v1/reference-data/invalidate",
            post(reference_data::invalidate),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(deregistration_routes)
        .merge(reference_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
