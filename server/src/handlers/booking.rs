use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{
    created, deleted, ensure_patient, id_exists, search_query, updated, Created, JsonBody,
    PathParam, QueryParams,
};
use crate::criteria::{Criteria, ProcedureBookingCriteria};
use crate::db::ProcedureBookingRepository;
use crate::error::ApiError;
use crate::models::{FollowupPlan, ProcedureBooking};
use crate::pagination::{pagination_headers, search_pagination_headers, Pageable};
use crate::AppState;

const ENTITY_NAME: &str = "procedureBooking";

/// POST /api/patient/:patient_id/procedure-bookings
pub async fn create_procedure_booking(
    State(state): State<Arc<AppState>>,
    PathParam(patient_id): PathParam<i64>,
    JsonBody(booking): JsonBody<ProcedureBooking>,
) -> Result<Created<ProcedureBooking>, ApiError> {
    tracing::debug!("REST request to save ProcedureBooking : {:?}", booking);
    if booking.id.is_some() {
        return Err(id_exists(ENTITY_NAME));
    }
    ensure_patient(&state.pool, patient_id).await?;

    let saved = state.bookings.save(patient_id, &booking).await?;
    Ok(created(ENTITY_NAME, "/api/procedure-bookings", saved.id, saved))
}

/// PUT /api/patient/:patient_id/procedure-bookings
///
/// A booking without an id is created instead.
pub async fn update_procedure_booking(
    State(state): State<Arc<AppState>>,
    PathParam(patient_id): PathParam<i64>,
    JsonBody(booking): JsonBody<ProcedureBooking>,
) -> Result<Response, ApiError> {
    tracing::debug!("REST request to update ProcedureBooking : {:?}", booking);
    if booking.id.is_none() {
        return create_procedure_booking(State(state), PathParam(patient_id), JsonBody(booking))
            .await
            .map(IntoResponse::into_response);
    }
    ensure_patient(&state.pool, patient_id).await?;

    let saved = state.bookings.save(patient_id, &booking).await?;
    Ok(updated(ENTITY_NAME, saved.id, saved).into_response())
}

/// GET /api/procedure-bookings
pub async fn get_all_procedure_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<ProcedureBooking>>), ApiError> {
    let criteria = ProcedureBookingCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, ProcedureBookingRepository::SORTABLE)?;
    tracing::debug!("REST request to get ProcedureBookings by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = ProcedureBookingRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    let headers = pagination_headers(&page, "/api/procedure-bookings");
    Ok((headers, Json(page.content)))
}

/// GET /api/procedure-bookings/:id
pub async fn get_procedure_booking(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ProcedureBooking>, ApiError> {
    tracing::debug!("REST request to get ProcedureBooking : {}", id);
    let mut conn = state.pool.acquire().await?;
    ProcedureBookingRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("ProcedureBooking", id))
}

/// GET /api/patient/:patient_id/procedure-bookings
pub async fn get_patient_procedure_bookings(
    State(state): State<Arc<AppState>>,
    PathParam(patient_id): PathParam<i64>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<ProcedureBooking>>), ApiError> {
    tracing::debug!("REST request to get ProcedureBookings for Patient : {}", patient_id);
    let pageable = Pageable::from_params(&params, ProcedureBookingRepository::SORTABLE)?;
    ensure_patient(&state.pool, patient_id).await?;

    let mut conn = state.pool.acquire().await?;
    let page = ProcedureBookingRepository::new(&mut conn)
        .find_all_by_patient(patient_id, &pageable)
        .await?;
    let base = format!("/api/patient/{}/procedure-bookings", patient_id);
    Ok((pagination_headers(&page, &base), Json(page.content)))
}

/// GET /api/patient/:patient_id/primaryProcedure/:code/followup-plan
pub async fn get_followup_plan_by_primary_procedure(
    State(state): State<Arc<AppState>>,
    PathParam((patient_id, code)): PathParam<(i64, String)>,
) -> Result<Json<FollowupPlan>, ApiError> {
    tracing::debug!(
        "REST request to get FollowupPlan for Patient {} and primary procedure {}",
        patient_id,
        code
    );
    state
        .bookings
        .find_one_by_patient_id_and_primary_procedure(patient_id, &code)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::bad_request(
                format!(
                    "No followup plan for patient {} and procedure {}",
                    patient_id, code
                ),
                "followupPlan",
                "notfound",
            )
        })
}

/// DELETE /api/procedure-bookings/:id
pub async fn delete_procedure_booking(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete ProcedureBooking : {}", id);
    if !state.bookings.delete(id).await? {
        return Err(ApiError::not_found("ProcedureBooking", id));
    }
    Ok(deleted(ENTITY_NAME, id))
}

/// GET /api/_search/procedure-bookings?query=
pub async fn search_procedure_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<ProcedureBooking>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of ProcedureBookings for query {}", query);

    let hits = state.search.search::<ProcedureBooking>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = ProcedureBookingRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);

    let headers = search_pagination_headers(&query, &hits, "/api/_search/procedure-bookings");
    Ok((headers, Json(content)))
}
