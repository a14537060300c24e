use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use sqlx::SqlitePool;

use crate::db::PatientRepository;
use crate::error::{insert_header, ApiError, APPLICATION_NAME};

/// Resolve search hits to entities, skipping ids that no longer exist
macro_rules! resolve_hits {
    ($repo:expr, $hits:expr) => {{
        let mut content = Vec::with_capacity($hits.content.len());
        for id in &$hits.content {
            if let Some(entity) = $repo.find_one(*id).await? {
                content.push(entity);
            }
        }
        content
    }};
}

pub mod booking;
pub mod care;
pub mod patient;
pub mod reference;
pub mod system;
pub mod user;

/// Raw query pairs; repeated keys are kept
pub type QueryParams = Query<Vec<(String, String)>>;

pub type Created<T> = (StatusCode, HeaderMap, Json<T>);

/// JSON request body; an unreadable body is a 400 `invalidpayload` alert
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path parameters; a malformed segment is a 400 `invalidpath` alert
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// `X-promsApp-alert` / `X-promsApp-params` headers announcing a change
pub(crate) fn alert(entity_name: &str, action: &str, param: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_header(
        &mut headers,
        &format!("X-{}-alert", APPLICATION_NAME),
        &format!("{}.{}.{}", APPLICATION_NAME, entity_name, action),
    );
    insert_header(
        &mut headers,
        &format!("X-{}-params", APPLICATION_NAME),
        param,
    );
    headers
}

fn id_param(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

/// 201 with alert and `Location: <base>/<id>`
pub(crate) fn created<T>(entity_name: &str, base: &str, id: Option<i64>, body: T) -> Created<T> {
    let param = id_param(id);
    let mut headers = alert(entity_name, "created", &param);
    if let Ok(location) = HeaderValue::from_str(&format!("{}/{}", base, param)) {
        headers.insert(header::LOCATION, location);
    }
    (StatusCode::CREATED, headers, Json(body))
}

pub(crate) fn updated<T>(entity_name: &str, id: Option<i64>, body: T) -> (HeaderMap, Json<T>) {
    (alert(entity_name, "updated", &id_param(id)), Json(body))
}

pub(crate) fn deleted(entity_name: &str, id: i64) -> (StatusCode, HeaderMap) {
    (StatusCode::OK, alert(entity_name, "deleted", &id.to_string()))
}

pub(crate) fn id_exists(entity_name: &str) -> ApiError {
    ApiError::bad_request(
        format!("A new {} cannot already have an ID", entity_name),
        entity_name,
        "idexists",
    )
}

pub(crate) fn id_null(entity_name: &str) -> ApiError {
    ApiError::bad_request("Invalid id", entity_name, "idnull")
}

/// The `query` parameter of a search request; empty matches everything
pub(crate) fn search_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

/// 400 `notfound` unless the patient exists. The connection is released
/// before returning.
pub(crate) async fn ensure_patient(pool: &SqlitePool, patient_id: i64) -> Result<(), ApiError> {
    let mut conn = pool.acquire().await?;
    if PatientRepository::new(&mut conn).exists(patient_id).await? {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            format!("Patient {} not found", patient_id),
            "patient",
            "notfound",
        ))
    }
}
