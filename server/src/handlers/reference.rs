use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{
    created, deleted, id_exists, id_null, search_query, updated, Created, JsonBody, PathParam,
    QueryParams,
};
use crate::criteria::{Criteria, ProcedureCriteria, QuestionnaireCriteria};
use crate::db::{ProcedureRepository, QuestionnaireRepository, TimepointRepository};
use crate::error::ApiError;
use crate::models::{Procedure, Questionnaire, Timepoint};
use crate::pagination::{pagination_headers, search_pagination_headers, Pageable};
use crate::AppState;

pub async fn create_procedure(
    State(state): State<Arc<AppState>>,
    JsonBody(mut procedure): JsonBody<Procedure>,
) -> Result<Created<Procedure>, ApiError> {
    tracing::debug!("REST request to save Procedure : {:?}", procedure);
    if procedure.id.is_some() {
        return Err(id_exists("procedure"));
    }
    let mut conn = state.pool.acquire().await?;
    procedure.id = Some(ProcedureRepository::new(&mut conn).insert(&procedure).await?);
    state.search.index(&procedure);
    Ok(created("procedure", "/api/procedures", procedure.id, procedure))
}

pub async fn update_procedure(
    State(state): State<Arc<AppState>>,
    JsonBody(procedure): JsonBody<Procedure>,
) -> Result<(HeaderMap, Json<Procedure>), ApiError> {
    tracing::debug!("REST request to update Procedure : {:?}", procedure);
    let Some(id) = procedure.id else {
        return Err(id_null("procedure"));
    };
    let mut conn = state.pool.acquire().await?;
    if !ProcedureRepository::new(&mut conn).update(id, &procedure).await? {
        return Err(ApiError::not_found("Procedure", id));
    }
    state.search.index(&procedure);
    Ok(updated("procedure", procedure.id, procedure))
}

pub async fn get_all_procedures(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Procedure>>), ApiError> {
    let criteria = ProcedureCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, ProcedureRepository::SORTABLE)?;
    tracing::debug!("REST request to get Procedures by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = ProcedureRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((pagination_headers(&page, "/api/procedures"), Json(page.content)))
}

pub async fn get_procedure(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Procedure>, ApiError> {
    tracing::debug!("REST request to get Procedure : {}", id);
    let mut conn = state.pool.acquire().await?;
    ProcedureRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Procedure", id))
}

pub async fn delete_procedure(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete Procedure : {}", id);
    let mut conn = state.pool.acquire().await?;
    if !ProcedureRepository::new(&mut conn).delete(id).await? {
        return Err(ApiError::not_found("Procedure", id));
    }
    state.search.remove::<Procedure>(id);
    Ok(deleted("procedure", id))
}

pub async fn search_procedures(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Procedure>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of Procedures for query {}", query);

    let hits = state.search.search::<Procedure>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = ProcedureRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/procedures"),
        Json(content),
    ))
}

pub async fn create_questionnaire(
    State(state): State<Arc<AppState>>,
    JsonBody(mut questionnaire): JsonBody<Questionnaire>,
) -> Result<Created<Questionnaire>, ApiError> {
    tracing::debug!("REST request to save Questionnaire : {:?}", questionnaire);
    if questionnaire.id.is_some() {
        return Err(id_exists("questionnaire"));
    }
    let mut conn = state.pool.acquire().await?;
    questionnaire.id = Some(
        QuestionnaireRepository::new(&mut conn)
            .insert(&questionnaire)
            .await?,
    );
    state.search.index(&questionnaire);
    Ok(created(
        "questionnaire",
        "/api/questionnaires",
        questionnaire.id,
        questionnaire,
    ))
}

pub async fn update_questionnaire(
    State(state): State<Arc<AppState>>,
    JsonBody(questionnaire): JsonBody<Questionnaire>,
) -> Result<(HeaderMap, Json<Questionnaire>), ApiError> {
    tracing::debug!("REST request to update Questionnaire : {:?}", questionnaire);
    let Some(id) = questionnaire.id else {
        return Err(id_null("questionnaire"));
    };
    let mut conn = state.pool.acquire().await?;
    if !QuestionnaireRepository::new(&mut conn)
        .update(id, &questionnaire)
        .await?
    {
        return Err(ApiError::not_found("Questionnaire", id));
    }
    state.search.index(&questionnaire);
    Ok(updated("questionnaire", questionnaire.id, questionnaire))
}

pub async fn get_all_questionnaires(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Questionnaire>>), ApiError> {
    let criteria = QuestionnaireCriteria::from_params(&params)?;
    let pageable = Pageable::from_params(&params, QuestionnaireRepository::SORTABLE)?;
    tracing::debug!("REST request to get Questionnaires by criteria: {}", criteria);

    let mut conn = state.pool.acquire().await?;
    let page = QuestionnaireRepository::new(&mut conn)
        .find_by_criteria(&criteria, &pageable)
        .await?;
    Ok((
        pagination_headers(&page, "/api/questionnaires"),
        Json(page.content),
    ))
}

pub async fn get_questionnaire(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Questionnaire>, ApiError> {
    tracing::debug!("REST request to get Questionnaire : {}", id);
    let mut conn = state.pool.acquire().await?;
    QuestionnaireRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Questionnaire", id))
}

pub async fn delete_questionnaire(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    tracing::debug!("REST request to delete Questionnaire : {}", id);
    let mut conn = state.pool.acquire().await?;
    if !QuestionnaireRepository::new(&mut conn).delete(id).await? {
        return Err(ApiError::not_found("Questionnaire", id));
    }
    state.search.remove::<Questionnaire>(id);
    Ok(deleted("questionnaire", id))
}

pub async fn search_questionnaires(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Questionnaire>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of Questionnaires for query {}", query);

    let hits = state.search.search::<Questionnaire>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = QuestionnaireRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/questionnaires"),
        Json(content),
    ))
}

/// GET /api/timepoints
pub async fn get_all_timepoints(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<Timepoint>>), ApiError> {
    tracing::debug!("REST request to get a page of Timepoints");
    let pageable = Pageable::from_params(&params, &[])?;
    let mut conn = state.pool.acquire().await?;
    let page = TimepointRepository::new(&mut conn).find_all(&pageable).await?;
    Ok((pagination_headers(&page, "/api/timepoints"), Json(page.content)))
}

/// GET /api/timepoints/:id
pub async fn get_timepoint(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Timepoint>, ApiError> {
    tracing::debug!("REST request to get Timepoint : {}", id);
    let mut conn = state.pool.acquire().await?;
    TimepointRepository::new(&mut conn)
        .find_one(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Timepoint", id))
}
