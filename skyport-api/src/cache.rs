use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Cached view key for a list endpoint. The raw query string is part of the
/// key so each filter combination is cached independently.
pub fn view_key(resource: &str, raw_query: Option<&str>) -> String {
    format!("view:{}:{}", resource, raw_query.unwrap_or(""))
}

/// Which cached views a write to `resource` makes stale. Mirrors the
/// relational reach of each entity: an airport rename, for example, shows up
/// in route, flight and ticket listings.
pub fn dependent_views(resource: &str) -> &'static [&'static str] {
    match resource {
        "airport" => &["airports", "routes", "flights", "tickets"],
        "airplane_type" => &["airplane-types", "airplanes", "flights"],
        "airplane" => &["airplanes", "flights"],
        "crew" => &["crew", "flights"],
        "route" => &["routes", "flights", "tickets"],
        "flight" => &["flights", "crew"],
        "order" => &["orders", "tickets"],
        "ticket" => &["tickets", "flights", "orders"],
        _ => &[],
    }
}

/// Drop every cached view affected by a write to `resource`. Failures are
/// logged and swallowed: a stale cache entry expires on its TTL anyway.
pub async fn invalidate(state: &AppState, resource: &str) {
    for view in dependent_views(resource) {
        let pattern = format!("view:{}:*", view);
        if let Err(e) = state.redis.invalidate_pattern(&pattern).await {
            tracing::warn!("Cache invalidation failed for {}: {}", pattern, e);
        }
    }
}

pub async fn lookup(state: &AppState, key: &str) -> Option<String> {
    match state.redis.cache_get(key).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

pub async fn store(state: &AppState, key: &str, body: &str) {
    if let Err(e) = state.redis.cache_put(key, body, state.cache_ttl_seconds).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }
}

pub fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_key_includes_the_query_string() {
        assert_eq!(view_key("airports", Some("name=hea")), "view:airports:name=hea");
        assert_eq!(view_key("airports", None), "view:airports:");
    }

    #[test]
    fn ticket_writes_reach_flight_and_order_views() {
        let views = dependent_views("ticket");
        assert!(views.contains(&"tickets"));
        assert!(views.contains(&"flights"));
        assert!(views.contains(&"orders"));
    }

    #[test]
    fn unknown_resource_invalidates_nothing() {
        assert!(dependent_views("unknown").is_empty());
    }
}
