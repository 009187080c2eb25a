use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use warp::{reject, Filter, Rejection, Reply};

use crate::db::{ImageDocument, PhotoStore, StoreError};
use crate::doc_update::{apply_edits, UpdateStatus};
use crate::filter::views::MonthCounter;
use crate::filter::{
    bounding_box, build_pipelines, feature_collection, image_counts, intersect_facets,
    resolve_year, BoundingBox, FeatureCollection, FilterCriteria, FilterError, Selectables,
};
use crate::warp_helpers::{
    with_admin_token, with_store, DatabaseError, NotFoundError, UnauthorizedError,
    ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum DiaryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl DiaryError {
    fn into_rejection(self) -> Rejection {
        match self {
            DiaryError::Filter(FilterError::YearNotFound(year)) => reject::custom(NotFoundError {
                message: format!("No collection for year '{}'", year),
            }),
            other => {
                error!("Photo diary request failed: {}", other);
                reject::custom(DatabaseError {
                    message: other.to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryResponse {
    pub years: Vec<String>,
    pub counter: MonthCounter,
    pub filter_selectables: Selectables,
    pub filtered_selectables: Selectables,
    pub docs: Vec<ImageDocument>,
    pub feature_collection: FeatureCollection,
    pub bounds: Option<BoundingBox>,
}

/// Resolves the owner and year, runs the requested facets and assembles every
/// derived view the diary page needs.
pub async fn build_diary_response(
    store: &PhotoStore,
    query: &HashMap<String, String>,
    user: Option<&str>,
) -> Result<DiaryResponse, DiaryError> {
    let owner = store.resolve_owner(user).await?;
    let years = store.collections(&owner.id).await?;
    let year = resolve_year(query.get("year").map(String::as_str), &years)?;
    let criteria = FilterCriteria::from_query(query);

    // Selectables always cover the whole year, whatever the filters.
    let year_docs = store.find_all(&year, &owner.id).await?;
    let filter_selectables = Selectables::collect(&year_docs);

    let docs = if criteria.is_empty() {
        year_docs
    } else {
        let pipelines = build_pipelines(&criteria);
        let results = store.run_facets(&year, &owner.id, &pipelines).await?;
        intersect_facets(results)
    };

    debug!(
        "Diary query year={} facets={} docs={}",
        year,
        criteria.constrained_count(),
        docs.len()
    );

    let counter = image_counts(&docs)?;
    let filtered_selectables = if criteria.month().is_some() {
        Selectables::collect(&docs)
    } else {
        Selectables::default()
    };
    let feature_collection = feature_collection(&docs);
    let bounds = bounding_box(&docs);

    Ok(DiaryResponse {
        years,
        counter,
        filter_selectables,
        filtered_selectables,
        docs,
        feature_collection,
        bounds,
    })
}

pub async fn get_diary_data(
    query: HashMap<String, String>,
    user: Option<String>,
    store: PhotoStore,
) -> Result<impl Reply, Rejection> {
    match build_diary_response(&store, &query, user.as_deref()).await {
        Ok(response) => Ok(warp::reply::json(&response)),
        Err(e) => Err(e.into_rejection()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub id: String,
    pub collection: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub update_status: UpdateStatus,
    pub updated_doc: ImageDocument,
    pub update_message: &'static str,
}

pub fn is_authorized(authorization: Option<&str>, admin_token: Option<&str>) -> bool {
    match (authorization, admin_token) {
        (Some(header), Some(token)) => header.strip_prefix("Bearer ").map(str::trim) == Some(token),
        _ => false,
    }
}

/// Applies the edits to a stored document. `None` when the document does not exist.
pub async fn apply_update(
    store: &PhotoStore,
    request: &UpdateRequest,
) -> Result<Option<UpdateResponse>, StoreError> {
    let Some(mut doc) = store.find_by_id(&request.collection, &request.id).await? else {
        return Ok(None);
    };

    let outcome = apply_edits(&mut doc, &request.fields);
    if !outcome.applied.is_empty() && !store.update_document(&request.collection, &doc).await? {
        return Ok(None);
    }

    let status = outcome.status();
    info!(
        "Updated {} in {}: {} applied, {} skipped",
        doc.id,
        request.collection,
        outcome.applied.len(),
        outcome.skipped.len()
    );

    Ok(Some(UpdateResponse {
        update_status: status,
        updated_doc: doc,
        update_message: status.message(),
    }))
}

pub async fn update_document(
    authorization: Option<String>,
    admin_token: Option<String>,
    request: UpdateRequest,
    store: PhotoStore,
) -> Result<impl Reply, Rejection> {
    if !is_authorized(authorization.as_deref(), admin_token.as_deref()) {
        return Err(reject::custom(UnauthorizedError));
    }
    if request.id.trim().is_empty() || request.fields.is_empty() {
        return Err(reject::custom(ValidationError {
            message: "Update needs a document id and at least one field".to_string(),
        }));
    }

    match apply_update(&store, &request).await {
        Ok(Some(response)) => Ok(warp::reply::json(&response)),
        Ok(None) => Err(reject::custom(NotFoundError {
            message: format!("Photo {} not found in {}", request.id, request.collection),
        })),
        Err(e) => {
            error!("Failed to update {}: {}", request.id, e);
            Err(reject::custom(DatabaseError {
                message: format!("Database error: {}", e),
            }))
        }
    }
}

pub fn build_diary_routes(
    store: PhotoStore,
    admin_token: Option<String>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let get_data = warp::path("photo-diary")
        .and(warp::path("get-data"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::cookie::optional::<String>("user"))
        .and(with_store(store.clone()))
        .and_then(get_diary_data);

    let update = warp::path("photo-diary")
        .and(warp::path("update"))
        .and(warp::path::end())
        .and(warp::patch())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_admin_token(admin_token))
        .and(warp::body::content_length_limit(64 * 1024))
        .and(warp::body::json())
        .and(with_store(store))
        .and_then(update_document);

    get_data.or(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{create_test_store, test_document, ADMIN_ID};
    use crate::db::{Account, AccountRole};
    use crate::warp_helpers::handle_rejection;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn seeded_store() -> PhotoStore {
        let store = create_test_store().await;

        let mut a = test_document("a", 2022, 1);
        a.tags = vec!["sunset".into(), "beach".into()];
        let mut b = test_document("b", 2022, 1);
        b.make = Some("Canon".into());
        b.model = Some("5D".into());
        b.gps = Default::default();
        let mut c = test_document("c", 2022, 3);
        c.gps = crate::db_types::GpsPosition::from_signed(-33.9, 151.2);
        let old = test_document("old", 2021, 6);

        for doc in [&a, &b, &c] {
            store.insert("2022", doc).await.unwrap();
        }
        store.insert("2021", &old).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_default_year_returns_whole_collection() {
        let store = seeded_store().await;
        let response = build_diary_response(&store, &query(&[("year", "default")]), None)
            .await
            .unwrap();

        assert_eq!(response.years, vec!["2021", "2022"]);
        assert_eq!(response.docs.len(), 3);
        assert_eq!(response.counter["all"], 3);
        assert_eq!(response.counter["jan"], 2);
        assert_eq!(response.counter["mar"], 1);
        assert!(response.filtered_selectables.is_empty());
        assert_eq!(response.filter_selectables.camera, vec!["Canon 5D", "Nikon D90"]);
        assert_eq!(response.feature_collection.features.len(), 2);

        let bounds = response.bounds.unwrap();
        assert_eq!(bounds.lat, [-33.9, 35.0]);
        assert_eq!(bounds.lng, [139.0, 151.2]);
    }

    #[tokio::test]
    async fn test_unknown_year_fails_fast() {
        let store = seeded_store().await;
        let err = build_diary_response(&store, &query(&[("year", "1999")]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DiaryError::Filter(FilterError::YearNotFound(ref y)) if y == "1999"));
    }

    #[tokio::test]
    async fn test_month_and_camera_filters_intersect() {
        let store = seeded_store().await;
        let response = build_diary_response(
            &store,
            &query(&[("year", "2022"), ("month", "1"), ("camera", "Nikon_D90")]),
            None,
        )
        .await
        .unwrap();

        let ids: Vec<&str> = response.docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(response.counter["all"], 1);
        assert_eq!(response.filtered_selectables.camera, vec!["Nikon D90"]);
        assert_eq!(response.filtered_selectables.tags, vec!["beach", "sunset"]);
        assert_eq!(response.filter_selectables.camera.len(), 2);
    }

    #[tokio::test]
    async fn test_filters_without_month_leave_filtered_selectables_empty() {
        let store = seeded_store().await;
        let response = build_diary_response(&store, &query(&[("tags", "sunset")]), None)
            .await
            .unwrap();
        assert_eq!(response.docs.len(), 1);
        assert!(response.filtered_selectables.is_empty());
    }

    #[tokio::test]
    async fn test_no_matches_yields_empty_views() {
        let store = seeded_store().await;
        let response = build_diary_response(&store, &query(&[("month", "12")]), None)
            .await
            .unwrap();

        assert!(response.docs.is_empty());
        assert_eq!(response.counter.len(), 1);
        assert!(response.bounds.is_none());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["bounds"], Value::Null);
        assert_eq!(value["featureCollection"]["features"], json!([]));
        for key in ["years", "counter", "filterSelectables", "filteredSelectables", "docs"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn test_user_sees_own_collections() {
        let store = seeded_store().await;
        store
            .upsert_account(&Account {
                id: "viewer-1".to_string(),
                email: "viewer@example.com".to_string(),
                role: AccountRole::Viewer,
            })
            .await
            .unwrap();
        let mut doc = test_document("v", 2020, 2);
        doc.owner = "viewer-1".to_string();
        store.insert("2020", &doc).await.unwrap();

        let response = build_diary_response(&store, &query(&[]), Some("viewer@example.com"))
            .await
            .unwrap();
        assert_eq!(response.years, vec!["2020"]);
        assert_eq!(response.docs[0].id, "v");

        let visitor = build_diary_response(&store, &query(&[]), Some("visitor"))
            .await
            .unwrap();
        assert_eq!(visitor.years, vec!["2021", "2022"]);
    }

    #[test]
    fn test_is_authorized() {
        assert!(is_authorized(Some("Bearer secret"), Some("secret")));
        assert!(!is_authorized(Some("Bearer wrong"), Some("secret")));
        assert!(!is_authorized(Some("secret"), Some("secret")));
        assert!(!is_authorized(None, Some("secret")));
        assert!(!is_authorized(Some("Bearer secret"), None));
    }

    #[tokio::test]
    async fn test_apply_update_persists_edits() {
        let store = seeded_store().await;
        let request: UpdateRequest = serde_json::from_value(json!({
            "id": "a",
            "collection": "2022",
            "fields": {"Title": "Evening", "ISO": "fast", "Tags": "Dusk"}
        }))
        .unwrap();

        let response = apply_update(&store, &request).await.unwrap().unwrap();
        assert_eq!(response.update_status, UpdateStatus::PassedWithError);
        assert_eq!(response.update_message, "Some edit(s) in wrong format.");
        assert_eq!(response.updated_doc.tags, vec!["dusk"]);

        let stored = store.find_by_id("2022", "a").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Evening"));
        assert_eq!(stored.owner, ADMIN_ID);
    }

    #[tokio::test]
    async fn test_apply_update_unknown_document() {
        let store = seeded_store().await;
        let request = UpdateRequest {
            id: "missing".to_string(),
            collection: "2022".to_string(),
            fields: BTreeMap::new(),
        };
        assert!(apply_update(&store, &request).await.unwrap().is_none());
    }

    // ===== ROUTES =====

    const TOKEN: &str = "secret";

    fn body<B: AsRef<[u8]>>(res: &warp::http::Response<B>) -> Value {
        serde_json::from_slice(res.body().as_ref()).unwrap()
    }

    fn doc_ids(body: &Value) -> Vec<String> {
        body["docs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_get_data_accepts_both_plus_encodings() {
        let routes = build_diary_routes(seeded_store().await, None).recover(handle_rejection);

        for path in [
            "/photo-diary/get-data?year=2022&tags=sunset+beach",
            "/photo-diary/get-data?year=2022&tags=sunset%2Bbeach",
        ] {
            let res = warp::test::request().path(path).reply(&routes).await;
            assert_eq!(res.status(), 200, "{}", path);
            assert_eq!(doc_ids(&body(&res)), vec!["a"], "{}", path);
        }
    }

    #[tokio::test]
    async fn test_get_data_unknown_year_is_404() {
        let routes = build_diary_routes(seeded_store().await, None).recover(handle_rejection);
        let res = warp::test::request()
            .path("/photo-diary/get-data?year=1999")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);
        assert_eq!(body(&res)["code"], 404);
    }

    #[tokio::test]
    async fn test_get_data_scopes_by_user_cookie() {
        let store = seeded_store().await;
        store
            .upsert_account(&Account {
                id: "viewer-1".to_string(),
                email: "viewer@example.com".to_string(),
                role: AccountRole::Viewer,
            })
            .await
            .unwrap();
        let mut doc = test_document("v", 2020, 2);
        doc.owner = "viewer-1".to_string();
        store.insert("2020", &doc).await.unwrap();
        let routes = build_diary_routes(store, None).recover(handle_rejection);

        let res = warp::test::request()
            .path("/photo-diary/get-data?year=default")
            .header("cookie", "user=viewer@example.com")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(&res)["years"], json!(["2020"]));
        assert_eq!(doc_ids(&body(&res)), vec!["v"]);

        let res = warp::test::request()
            .path("/photo-diary/get-data?year=default")
            .reply(&routes)
            .await;
        assert_eq!(body(&res)["years"], json!(["2021", "2022"]));
    }

    #[tokio::test]
    async fn test_update_requires_matching_token() {
        let store = seeded_store().await;
        let request = json!({"id": "a", "collection": "2022", "fields": {"Title": "Evening"}});

        let routes = build_diary_routes(store.clone(), Some(TOKEN.to_string()))
            .recover(handle_rejection);
        for auth in [Some("Bearer wrong"), Some(TOKEN), None] {
            let mut req = warp::test::request()
                .method("PATCH")
                .path("/photo-diary/update")
                .json(&request);
            if let Some(auth) = auth {
                req = req.header("authorization", auth);
            }
            let res = req.reply(&routes).await;
            assert_eq!(res.status(), 401, "{:?}", auth);
        }

        let disabled = build_diary_routes(store, None).recover(handle_rejection);
        let res = warp::test::request()
            .method("PATCH")
            .path("/photo-diary/update")
            .header("authorization", "Bearer secret")
            .json(&request)
            .reply(&disabled)
            .await;
        assert_eq!(res.status(), 401);
    }

    #[tokio::test]
    async fn test_update_route_statuses() {
        let store = seeded_store().await;
        let routes = build_diary_routes(store.clone(), Some(TOKEN.to_string()))
            .recover(handle_rejection);
        let patch = |request: Value| {
            warp::test::request()
                .method("PATCH")
                .path("/photo-diary/update")
                .header("authorization", "Bearer secret")
                .json(&request)
        };

        let res = patch(json!({"id": "a", "collection": "2022", "fields": {}}))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 400);

        let res = patch(json!({"id": "nope", "collection": "2022", "fields": {"Title": "x"}}))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 404);

        let res = patch(json!({"id": "a", "collection": "2022", "fields": {"Title": "Evening"}}))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
        let reply = body(&res);
        assert_eq!(reply["updateStatus"], "successful");
        assert_eq!(reply["updateMessage"], "All edits OK!");
        assert_eq!(reply["updatedDoc"]["title"], "Evening");

        let stored = store.find_by_id("2022", "a").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Evening"));
    }
}
