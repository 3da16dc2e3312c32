use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS layer for browser editors: any origin, the methods the API routes
/// use, and the bearer/JSON headers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
