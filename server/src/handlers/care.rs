use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{
    created, deleted, ensure_patient, id_exists, id_null, search_query, updated, Created,
    JsonBody, PathParam, QueryParams,
};
use crate::criteria::{CareEventCriteria, Criteria, FollowupPlanCriteria};
use crate::db::{CareEventRepository, FollowupPlanRepository};
use crate::error::ApiError;
use crate::models::{CareEvent, FollowupPlan};
use crate::pagination::{pagination_headers, search_pagination_headers, Pageable};
use crate::AppState;

/// GET /api/followup-plans
pub async fn get_all_followup_plans(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<FollowupPlan>>), ApiError> {
    let criteria = FollowupPlanCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, FollowupPlanRepository::SORTABLE)?;
    tracing::debug!("REST request to get FollowupPlans by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = FollowupPlanRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((
        pagination_headers(&page, "/api/followup-plans"),
        Json(page.content),
    ))
}

/// GET /api/followup-plans/:id
pub async fn get_followup_plan(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<FollowupPlan>, ApiError> {
    tracing::debug!("REST request to get FollowupPlan : {}", id);
    let mut conn = state.pool.acquire().await?;
    FollowupPlanRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("FollowupPlan", id))
}

/// GET /api/followup-plans/:id/care-events
pub async fn get_followup_plan_care_events(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Vec<CareEvent>>, ApiError> {
    tracing::debug!("REST request to get CareEvents of FollowupPlan : {}", id);
    let mut conn = state.pool.acquire().await?;
    if FollowupPlanRepository::new(&mut conn).find_one(id).await?.is_none() {
        return Err(ApiError::not_found("FollowupPlan", id));
    }
    let events = CareEventRepository::new(&mut conn)
        .find_all_by_followup_plan_id(id)
        .await?;
    Ok(Json(events))
}

/// DELETE /api/followup-plans/:id
pub async fn delete_followup_plan(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete FollowupPlan : {}", id);

    let mut tx = state.pool.begin().await?;
    let event_ids: Vec<i64> = CareEventRepository::new(&mut tx)
        .find_all_by_followup_plan_id(id)
        .await?
        .into_iter()
        .filter_map(|e| e.id)
        .collect();
    let found = FollowupPlanRepository::new(&mut tx).delete(id).await?;
    tx.commit().await?;

    if !found {
        return Err(ApiError::not_found("FollowupPlan", id));
    }
    state.search.remove::<FollowupPlan>(id);
    state.search.remove_all::<CareEvent>(event_ids);
    Ok(deleted("followupPlan", id))
}

/// GET /api/_search/followup-plans?query=
pub async fn search_followup_plans(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<FollowupPlan>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of FollowupPlans for query {}", query);

    let hits = state.search.search::<FollowupPlan>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = FollowupPlanRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/followup-plans"),
        Json(content),
    ))
}

/// POST /api/care-events
pub async fn create_care_event(
    State(state): State<Arc<AppState>>,
    JsonBody(mut event): JsonBody<CareEvent>,
) -> Result<Created<CareEvent>, ApiError> {
    tracing::debug!("REST request to save CareEvent : {:?}", event);
    if event.id.is_some() {
        return Err(id_exists("careEvent"));
    }
    let mut conn = state.pool.acquire().await?;
    event.id = Some(CareEventRepository::new(&mut conn).insert(&event).await?);
    state.search.index(&event);
    Ok(created("careEvent", "/api/care-events", event.id, event))
}

/// PUT /api/care-events
pub async fn update_care_event(
    State(state): State<Arc<AppState>>,
    JsonBody(event): JsonBody<CareEvent>,
) -> Result<(HeaderMap, Json<CareEvent>), ApiError> {
    tracing::debug!("REST request to update CareEvent : {:?}", event);
    let Some(id) = event.id else {
        return Err(id_null("careEvent"));
    };
    let mut conn = state.pool.acquire().await?;
    if !CareEventRepository::new(&mut conn).update(id, &event).await? {
        return Err(ApiError::not_found("CareEvent", id));
    }
    state.search.index(&event);
    Ok(updated("careEvent", event.id, event))
}

/// GET /api/care-events
pub async fn get_all_care_events(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<CareEvent>>), ApiError> {
    let criteria = CareEventCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, CareEventRepository::SORTABLE)?;
    tracing::debug!("REST request to get CareEvents by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = CareEventRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((pagination_headers(&page, "/api/care-events"), Json(page.content)))
}

/// GET /api/care-events/:id
pub async fn get_care_event(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<CareEvent>, ApiError> {
    tracing::debug!("REST request to get CareEvent : {}", id);
    let mut conn = state.pool.acquire().await?;
    CareEventRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("CareEvent", id))
}

/// DELETE /api/care-events/:id
pub async fn delete_care_event(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete CareEvent : {}", id);
    let mut conn = state.pool.acquire().await?;
    if !CareEventRepository::new(&mut conn).delete(id).await? {
        return Err(ApiError::not_found("CareEvent", id));
    }
    state.search.remove::<CareEvent>(id);
    Ok(deleted("careEvent", id))
}

/// GET /api/_search/care-events?query=
pub async fn search_care_events(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<CareEvent>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of CareEvents for query {}", query);

    let hits = state.search.search::<CareEvent>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = CareEventRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/care-events"),
        Json(content),
    ))
}

/// GET /api/patient/:patient_id/care-events
pub async fn get_patient_care_events(
    State(state): State<Arc<AppState>>,
    PathParam(patient_id): PathParam<i64>,
) -> Result<Json<Vec<CareEvent>>, ApiError> {
    tracing::debug!("REST request to get CareEvents for Patient : {}", patient_id);
    ensure_patient(&state.pool, patient_id).await?;

    let mut conn = state.pool.acquire().await?;
    let events = CareEventRepository::new(&mut conn)
        .find_all_by_patient_id(patient_id)
        .await?;
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::handlers::test_support::{create_patient, send, test_app};

    async fn book(app: &axum::Router, patient_id: i64) -> Value {
        let uri = format!("/api/patient/{}/procedure-bookings", patient_id);
        let (status, _, body) = send(
            app,
            Method::POST,
            &uri,
            Some(json!({
                "consultantName": "Ms Jones",
                "hospitalSite": "RVI",
                "scheduledDate": null,
                "performedDate": null,
                "primaryProcedure": "1234",
                "otherProcedures": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_plan_and_its_care_events() {
        let (app, _) = test_app().await;
        let patient_id = create_patient(&app, "Ada", 1001).await;
        let booking = book(&app, patient_id).await;
        let plan_id = booking["followupPlanId"].as_i64().unwrap();

        let (status, _, plan) =
            send(&app, Method::GET, &format!("/api/followup-plans/{}", plan_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["procedureBookingId"], booking["id"]);

        let uri = format!("/api/followup-plans/{}/care-events", plan_id);
        let (status, _, events) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "PREOPERATIVE");
        assert!(events[1..].iter().all(|e| e["type"] == "FOLLOWUP"));

        let (status, _, _) =
            send(&app, Method::GET, "/api/followup-plans/999/care-events", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/patient/{}/care-events", patient_id);
        let (status, _, events) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.as_array().unwrap().len(), 4);

        let (status, _, _) = send(&app, Method::GET, "/api/patient/999/care-events", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plan_criteria_and_delete() {
        let (app, _) = test_app().await;
        let first = create_patient(&app, "Ada", 1001).await;
        let second = create_patient(&app, "Grace", 1002).await;
        let booking = book(&app, first).await;
        book(&app, second).await;
        let plan_id = booking["followupPlanId"].as_i64().unwrap();

        let uri = format!("/api/followup-plans?patientId.equals={}", first);
        let (status, headers, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("X-Total-Count").unwrap(), "1");
        assert_eq!(body[0]["id"], plan_id);

        let (_, headers, _) =
            send(&app, Method::GET, "/api/followup-plans?careEventsId.specified=true", None).await;
        assert_eq!(headers.get("X-Total-Count").unwrap(), "2");

        let uri = format!("/api/followup-plans/{}", plan_id);
        let (status, headers, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers.get("X-promsApp-alert").unwrap(),
            "promsApp.followupPlan.deleted"
        );
        let (status, _, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/care-events?followupPlanId.equals={}", plan_id);
        let (_, headers, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(headers.get("X-Total-Count").unwrap(), "0");

        let (_, headers, _) = send(&app, Method::GET, "/api/_search/care-events?query=*", None).await;
        assert_eq!(headers.get("X-Total-Count").unwrap(), "4");
        let (_, headers, _) =
            send(&app, Method::GET, "/api/_search/followup-plans?query=", None).await;
        assert_eq!(headers.get("X-Total-Count").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_care_event_crud() {
        let (app, _) = test_app().await;
        let patient_id = create_patient(&app, "Ada", 1001).await;

        let (status, headers, created) = send(
            &app,
            Method::POST,
            "/api/care-events",
            Some(json!({
                "type": "POSTOPERATIVE",
                "timepointId": 2,
                "patientId": patient_id,
                "followupPlanId": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(
            headers.get("X-promsApp-alert").unwrap(),
            "promsApp.careEvent.created"
        );

        let mut changed = created.clone();
        changed["type"] = json!("FOLLOWUP");
        let (status, _, body) = send(&app, Method::PUT, "/api/care-events", Some(changed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "FOLLOWUP");

        let (status, _, body) =
            send(&app, Method::GET, "/api/care-events?type.equals=FOLLOWUP", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], id);

        let (status, _, body) =
            send(&app, Method::GET, "/api/care-events?type.equals=LUNCH", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKey"], "invalidcriteria");

        let (_, _, body) =
            send(&app, Method::GET, "/api/_search/care-events?query=type:followup", None).await;
        assert_eq!(body[0]["id"], id);

        let uri = format!("/api/care-events/{}", id);
        let (status, _, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_care_event_with_unknown_patient() {
        let (app, _) = test_app().await;

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/api/care-events",
            Some(json!({
                "type": "FOLLOWUP",
                "timepointId": null,
                "patientId": 999,
                "followupPlanId": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorKey"], "invalidreference");
    }

    #[tokio::test]
    async fn test_care_event_with_unknown_type() {
        let (app, _) = test_app().await;

        let (status, headers, body) = send(
            &app,
            Method::POST,
            "/api/care-events",
            Some(json!({"type": "LUNCH"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers.get("X-promsApp-error").unwrap(), "error.invalidpayload");
        assert_eq!(body["errorKey"], "invalidpayload");
    }
}
