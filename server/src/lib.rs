pub mod bootstrap;
pub mod config;
pub mod criteria;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod search;
pub mod security;
pub mod service;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use handlers::{booking, care, patient, reference, system, user};
use search::SearchIndex;
use service::{PatientService, ProcedureBookingService};

/// Shared state handed to every handler
pub struct AppState {
    pub pool: SqlitePool,
    pub search: Arc<SearchIndex>,
    pub bookings: ProcedureBookingService,
    pub patients: PatientService,
}

impl AppState {
    pub fn new(pool: SqlitePool, search: Arc<SearchIndex>) -> Self {
        Self {
            bookings: ProcedureBookingService::new(pool.clone(), search.clone()),
            patients: PatientService::new(pool.clone(), search.clone()),
            pool,
            search,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/patient/:patient_id/procedure-bookings",
            post(booking::create_procedure_booking)
                .put(booking::update_procedure_booking)
                .get(booking::get_patient_procedure_bookings),
        )
        .route(
            "/api/patient/:patient_id/primaryProcedure/:code/followup-plan",
            get(booking::get_followup_plan_by_primary_procedure),
        )
        .route(
            "/api/patient/:patient_id/care-events",
            get(care::get_patient_care_events),
        )
        .route(
            "/api/procedure-bookings",
            get(booking::get_all_procedure_bookings),
        )
        .route(
            "/api/procedure-bookings/:id",
            get(booking::get_procedure_booking).delete(booking::delete_procedure_booking),
        )
        .route(
            "/api/_search/procedure-bookings",
            get(booking::search_procedure_bookings),
        )
        .route(
            "/api/patients",
            post(patient::create_patient)
                .put(patient::update_patient)
                .get(patient::get_all_patients),
        )
        .route(
            "/api/patients/:id",
            get(patient::get_patient)
                .patch(patient::patch_patient)
                .delete(patient::delete_patient),
        )
        .route("/api/_search/patients", get(patient::search_patients))
        .route("/api/addresses", get(patient::get_all_addresses))
        .route("/api/addresses/:id", get(patient::get_address))
        .route(
            "/api/procedures",
            post(reference::create_procedure)
                .put(reference::update_procedure)
                .get(reference::get_all_procedures),
        )
        .route(
            "/api/procedures/:id",
            get(reference::get_procedure).delete(reference::delete_procedure),
        )
        .route("/api/_search/procedures", get(reference::search_procedures))
        .route(
            "/api/questionnaires",
            post(reference::create_questionnaire)
                .put(reference::update_questionnaire)
                .get(reference::get_all_questionnaires),
        )
        .route(
            "/api/questionnaires/:id",
            get(reference::get_questionnaire).delete(reference::delete_questionnaire),
        )
        .route(
            "/api/_search/questionnaires",
            get(reference::search_questionnaires),
        )
        .route("/api/timepoints", get(reference::get_all_timepoints))
        .route("/api/timepoints/:id", get(reference::get_timepoint))
        .route("/api/followup-plans", get(care::get_all_followup_plans))
        .route(
            "/api/followup-plans/:id",
            get(care::get_followup_plan).delete(care::delete_followup_plan),
        )
        .route(
            "/api/followup-plans/:id/care-events",
            get(care::get_followup_plan_care_events),
        )
        .route(
            "/api/_search/followup-plans",
            get(care::search_followup_plans),
        )
        .route(
            "/api/care-events",
            post(care::create_care_event)
                .put(care::update_care_event)
                .get(care::get_all_care_events),
        )
        .route(
            "/api/care-events/:id",
            get(care::get_care_event).delete(care::delete_care_event),
        )
        .route("/api/_search/care-events", get(care::search_care_events))
        .route("/api/users", get(user::get_all_users))
        .route("/api/users/:login", get(user::get_user))
        .route("/api/_search/users", get(user::search_users))
        .route("/api/_reindex", post(system::reindex))
        .route("/health", get(system::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
