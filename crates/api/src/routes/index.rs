//! API index

use axum::response::Html;

/// Paths served under `/api/v1.0`
pub const ROUTES: [&str; 5] = [
    "/api/v1.0/precipitation",
    "/api/v1.0/stations",
    "/api/v1.0/tobs",
    "/api/v1.0/&lt;iso_start_date&gt;",
    "/api/v1.0/&lt;iso_start_date&gt;/&lt;iso_end_date&gt;",
];

/// List the available routes
pub async fn get_index() -> Html<String> {
    Html(format!("Available Routes:<br/><br>{}", ROUTES.join("<br/>")))
}
