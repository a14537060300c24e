use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use json_patch::Patch;

use super::{
    created, deleted, id_exists, id_null, search_query, updated, Created, JsonBody, PathParam,
    QueryParams,
};
use crate::criteria::{AddressCriteria, Criteria, PatientCriteria};
use crate::db::{AddressRepository, PatientRepository};
use crate::error::ApiError;
use crate::models::{Address, Patient};
use crate::pagination::{pagination_headers, search_pagination_headers, Pageable};
use crate::AppState;

const ENTITY_NAME: &str = "patient";

/// POST /api/patients
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    JsonBody(patient): JsonBody<Patient>,
) -> Result<Created<Patient>, ApiError> {
    tracing::debug!("REST request to save Patient : {:?}", patient);
    if patient.id.is_some() {
        return Err(id_exists(ENTITY_NAME));
    }
    let saved = state.patients.save(&patient).await?;
    Ok(created(ENTITY_NAME, "/api/patients", saved.id, saved))
}

/// PUT /api/patients
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    JsonBody(patient): JsonBody<Patient>,
) -> Result<(HeaderMap, Json<Patient>), ApiError> {
    tracing::debug!("REST request to update Patient : {:?}", patient);
    if patient.id.is_none() {
        return Err(id_null(ENTITY_NAME));
    }
    let saved = state.patients.save(&patient).await?;
    Ok(updated(ENTITY_NAME, saved.id, saved))
}

/// PATCH /api/patients/:id with an RFC 6902 JSON Patch document
pub async fn patch_patient(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
    JsonBody(patch): JsonBody<Patch>,
) -> Result<(HeaderMap, Json<Patient>), ApiError> {
    tracing::debug!("REST request to patch Patient : {}", id);

    let existing = {
        let mut conn = state.pool.acquire().await?;
        PatientRepository::new(&mut conn)
            .find_one(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Patient", id))?
    };

    let mut value = serde_json::to_value(&existing)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize patient: {}", e)))?;
    json_patch::patch(&mut value, &patch).map_err(|e| {
        ApiError::bad_request(
            format!("Failed to apply patch: {}", e),
            ENTITY_NAME,
            "invalidpatch",
        )
    })?;
    let mut patched: Patient = serde_json::from_value(value).map_err(|e| {
        ApiError::bad_request(
            format!("Patch results in an invalid patient: {}", e),
            ENTITY_NAME,
            "invalidpatch",
        )
    })?;

    if patched.id.is_some_and(|patched_id| patched_id != id) {
        return Err(ApiError::bad_request(
            "Patient id cannot be changed",
            ENTITY_NAME,
            "idchanged",
        ));
    }
    patched.id = Some(id);

    let saved = state.patients.save(&patched).await?;
    Ok(updated(ENTITY_NAME, saved.id, saved))
}

/// GET /api/patients
pub async fn get_all_patients(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Patient>>), ApiError> {
    let criteria = PatientCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, PatientRepository::SORTABLE)?;
    tracing::debug!("REST request to get Patients by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = PatientRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((pagination_headers(&page, "/api/patients"), Json(page.content)))
}

/// GET /api/patients/:id
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Patient>, ApiError> {
    tracing::debug!("REST request to get Patient : {}", id);
    let mut conn = state.pool.acquire().await?;
    PatientRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Patient", id))
}

/// DELETE /api/patients/:id
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete Patient : {}", id);
    if !state.patients.delete(id).await? {
        return Err(ApiError::not_found("Patient", id));
    }
    Ok(deleted(ENTITY_NAME, id))
}

/// GET /api/_search/patients?query=
pub async fn search_patients(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Patient>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of Patients for query {}", query);

    let hits = state.search.search::<Patient>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = PatientRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/patients"),
        Json(content),
    ))
}

/// GET /api/addresses
pub async fn get_all_addresses(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Address>>), ApiError> {
    let criteria = AddressCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, AddressRepository::SORTABLE)?;
    tracing::debug!("REST request to get Addresses by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = AddressRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((pagination_headers(&page, "/api/addresses"), Json(page.content)))
}

/// GET /api/addresses/:id
pub async fn get_address(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Address>, ApiError> {
    tracing::debug!("REST request to get Address : {}", id);
    let mut conn = state.pool.acquire().await?;
    AddressRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Address", id))
}
