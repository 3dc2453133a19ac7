use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Builds the CORS layer from `CORS_ALLOWED_ORIGINS`. An empty list allows
/// any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_origins_are_skipped() {
        // Must not panic on a header value containing a newline.
        let _ = cors_layer(&["https://ats.example.com".into(), "bad\norigin".into()]);
        let _ = cors_layer(&[]);
    }
}
