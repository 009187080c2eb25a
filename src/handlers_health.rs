use serde_json::json;
use std::convert::Infallible;
use warp::{reject, Filter, Rejection, Reply};

use crate::db::PhotoStore;
use crate::warp_helpers::{with_store, DatabaseError};

pub async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn ready_check(store: PhotoStore) -> Result<impl Reply, Rejection> {
    match store.ping().await {
        Ok(_) => Ok(warp::reply::json(&json!({
            "status": "ready",
            "database": "connected",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))),
        Err(e) => {
            log::error!("Database connection failed: {}", e);
            Err(reject::custom(DatabaseError {
                message: "Database connection failed".to_string(),
            }))
        }
    }
}

pub fn build_health_routes(
    store: PhotoStore,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_store(store))
        .and_then(ready_check);

    health.or(ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::create_test_store;
    use crate::warp_helpers::handle_rejection;

    #[tokio::test]
    async fn test_ready_reports_database_state() {
        let store = create_test_store().await;
        let routes = build_health_routes(store.clone()).recover(handle_rejection);

        let res = warp::test::request().path("/ready").reply(&routes).await;
        assert_eq!(res.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["database"], "connected");

        store.pool().close().await;
        let res = warp::test::request().path("/ready").reply(&routes).await;
        assert_eq!(res.status(), 500);
    }

    #[tokio::test]
    async fn test_health_is_always_healthy() {
        let store = create_test_store().await;
        let res = warp::test::request()
            .path("/health")
            .reply(&build_health_routes(store))
            .await;
        assert_eq!(res.status(), 200);
    }
}
