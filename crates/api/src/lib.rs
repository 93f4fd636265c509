//! Climate Observation API Server
//!
//! Read-only REST API over historical station precipitation and
//! temperature observations.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use storage::{DerivedConstants, StorageError, WeatherStore};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod dates;
mod error;
pub mod routes;

pub use crate::config::{LoggingConfig, ServiceConfig};
pub use error::{ApiError, ErrorBody};

/// Immutable state shared by every handler
pub struct ServiceContext {
    /// Read-only dataset
    pub store: WeatherStore,
    /// Values computed once at startup
    pub constants: DerivedConstants,
}

impl ServiceContext {
    /// Compute the startup constants from the store
    pub async fn init(store: WeatherStore) -> Result<Self, StorageError> {
        let constants = store.derive_constants().await?;

        info!("Most recent measurement date: {}", constants.most_recent_date);
        info!("Date one year before latest: {}", constants.one_year_ago);
        info!("Most active station: {}", constants.most_active_station);

        Ok(Self { store, constants })
    }
}

/// Create the application router
pub fn create_router(ctx: Arc<ServiceContext>, metrics: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/", get(routes::index::get_index))
        .route(
            "/api/v1.0/precipitation",
            get(routes::precipitation::get_precipitation),
        )
        .route("/api/v1.0/stations", get(routes::stations::get_stations))
        .route("/api/v1.0/tobs", get(routes::temperature::get_tobs))
        .route("/api/v1.0/:start", get(routes::temperature::get_summary_from))
        .route(
            "/api/v1.0/:start/:end",
            get(routes::temperature::get_summary_between),
        );

    if let Some(handle) = metrics {
        router = router.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    router.layer(TraceLayer::new_for_http()).with_state(ctx)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ApiError::Logging(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Open the dataset and serve until Ctrl-C
pub async fn run_server(config: ServiceConfig) -> Result<(), ApiError> {
    let store = WeatherStore::open(&config.database).await?;
    let stations = store.station_count().await?;
    let measurements = store.measurement_count().await?;
    info!("Loaded {} stations and {} measurements", stations, measurements);

    let ctx = Arc::new(ServiceContext::init(store.clone()).await?);

    let metrics = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| ApiError::Metrics(e.to_string()))?;
        Some(handle)
    } else {
        None
    };

    let app = create_router(ctx, metrics);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use storage::fixtures::{self, FixtureDatabase};
    use tower::ServiceExt;

    async fn test_app() -> (FixtureDatabase, Router) {
        let fixture = FixtureDatabase::seeded().await.unwrap();
        let store = WeatherStore::open(&fixture.config()).await.unwrap();
        let ctx = ServiceContext::init(store).await.unwrap();
        (fixture, create_router(Arc::new(ctx), None))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, "GET", uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_index_lists_routes() {
        let (_fixture, app) = test_app().await;

        let (status, body) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);

        let html = String::from_utf8(body.to_vec()).unwrap();
        for route in routes::index::ROUTES {
            assert!(html.contains(route), "missing {route}");
        }
    }

    #[tokio::test]
    async fn test_precipitation_last_year() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/precipitation").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "2016-08-23": 0.02,
                "2017-01-01": 0.05,
                "2017-05-10": 0.1,
                "2017-08-23": 0.01,
            })
        );

        let map = json.as_object().unwrap();
        assert!(map.keys().all(|date| date.as_str() >= "2016-08-23"));
        assert!(map.values().all(Value::is_number));
    }

    #[tokio::test]
    async fn test_stations() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/stations").await;
        assert_eq!(status, StatusCode::OK);

        let stations = json.as_array().unwrap();
        assert_eq!(stations.len(), 3);
        assert_eq!(
            stations[0],
            json!({"station_id": fixtures::WAIKIKI, "name": "WAIKIKI 717.2, HI US"})
        );
        let ids: Vec<_> = stations.iter().map(|s| s["station_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec![fixtures::WAIKIKI, fixtures::KANEOHE, fixtures::WAIHEE]);
    }

    #[tokio::test]
    async fn test_tobs_most_active_station() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/tobs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!([
                {"date": "2016-08-23", "temperature": 77.0},
                {"date": "2017-01-01", "temperature": 62.0},
                {"date": "2017-08-23", "temperature": 76.0},
            ])
        );
    }

    #[tokio::test]
    async fn test_summary_from_start() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/2017-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([62.0, 72.0, 81.0]));
    }

    #[tokio::test]
    async fn test_summary_between_dates() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/2016-08-01/2016-12-31").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([66.0, 75.25, 81.0]));

        let (status, json) = get_json(&app, "/api/v1.0/2017-08-23/2017-08-23").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([76.0, 78.5, 81.0]));
    }

    #[tokio::test]
    async fn test_summary_with_no_rows_is_null() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/2018-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([null, null, null]));

        let (status, json) = get_json(&app, "/api/v1.0/2017-08-23/2017-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([null, null, null]));

        let (status, json) = get_json(&app, "/api/v1.0/2017-06-01/2017-06-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([null, null, null]));
    }

    #[tokio::test]
    async fn test_malformed_date_is_bad_request() {
        let (_fixture, app) = test_app().await;

        let (status, json) = get_json(&app, "/api/v1.0/not-a-date").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
        assert!(json["error"].as_str().unwrap().contains("not-a-date"));

        let (status, _) = get_json(&app, "/api/v1.0/2017-01-01/2017-02-30").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_get_is_method_not_allowed() {
        let (_fixture, app) = test_app().await;

        let (status, _) = send(&app, "POST", "/api/v1.0/stations").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(&app, "DELETE", "/api/v1.0/2017-01-01").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (_fixture, app) = test_app().await;

        let (status, _) = send(&app, "GET", "/api/v2.0/stations").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let (_fixture, app) = test_app().await;

        for uri in ["/api/v1.0/precipitation", "/api/v1.0/tobs", "/api/v1.0/2016-08-23"] {
            let (_, first) = send(&app, "GET", uri).await;
            let (_, second) = send(&app, "GET", uri).await;
            assert_eq!(first, second, "{uri} changed between requests");
        }
    }

    #[tokio::test]
    async fn test_metrics_route_only_when_enabled() {
        let fixture = FixtureDatabase::seeded().await.unwrap();
        let store = WeatherStore::open(&fixture.config()).await.unwrap();
        let ctx = Arc::new(ServiceContext::init(store).await.unwrap());

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let with_metrics = create_router(ctx.clone(), Some(handle));
        let (status, _) = send(&with_metrics, "GET", "/metrics").await;
        assert_eq!(status, StatusCode::OK);

        let without = create_router(ctx, None);
        let (status, _) = send(&without, "GET", "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
