use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};

use crate::db::{
    CareEventRepository, FollowupPlanRepository, ProcedureBookingRepository, TimepointRepository,
};
use crate::error::DbError;
use crate::models::{CareEvent, EventType, FollowupPlan, ProcedureBooking};
use crate::search::SearchIndex;

/// Booking workflow: saving a booking creates its follow-up plan and the
/// plan's scheduled care events.
#[derive(Clone)]
pub struct ProcedureBookingService {
    pool: SqlitePool,
    search: Arc<SearchIndex>,
}

impl ProcedureBookingService {
    pub fn new(pool: SqlitePool, search: Arc<SearchIndex>) -> Self {
        Self { pool, search }
    }

    /// Insert or update a booking for `patient_id`.
    ///
    /// When the booking has no follow-up plan yet, one is created and
    /// processed in the same transaction. Moving a booking to another patient
    /// moves its plan and care events with it. Updating an id that does not
    /// exist fails with `RowNotFound`.
    pub async fn save(
        &self,
        patient_id: i64,
        booking: &ProcedureBooking,
    ) -> Result<ProcedureBooking, DbError> {
        tracing::debug!("Request to save ProcedureBooking : {:?}", booking);

        let mut tx = self.pool.begin().await?;

        let id = match booking.id {
            Some(id) => {
                let updated = ProcedureBookingRepository::new(&mut tx)
                    .update(id, patient_id, booking)
                    .await?;
                if !updated {
                    return Err(sqlx::Error::RowNotFound.into());
                }
                id
            }
            None => {
                ProcedureBookingRepository::new(&mut tx)
                    .insert(patient_id, booking)
                    .await?
            }
        };

        let existing = FollowupPlanRepository::new(&mut tx)
            .find_one_by_procedure_booking_id(id)
            .await?;
        let touched = match existing {
            Some(plan) if plan.patient_id == patient_id => None,
            Some(mut plan) => {
                let plan_id = plan.id.ok_or(sqlx::Error::RowNotFound)?;
                tracing::debug!(
                    "Moving FollowupPlan {} from patient {} to patient {}",
                    plan_id,
                    plan.patient_id,
                    patient_id
                );
                FollowupPlanRepository::new(&mut tx)
                    .update_patient(plan_id, patient_id)
                    .await?;
                CareEventRepository::new(&mut tx)
                    .update_patient_for_plan(plan_id, patient_id)
                    .await?;
                plan.patient_id = patient_id;
                let events = CareEventRepository::new(&mut tx)
                    .find_all_by_followup_plan_id(plan_id)
                    .await?;
                Some((plan, events))
            }
            None => {
                let plan = FollowupPlanRepository::new(&mut tx)
                    .insert(id, patient_id)
                    .await?;
                let events = process_followup_plan(&mut tx, &plan).await?;
                tracing::debug!(
                    "Created FollowupPlan {:?} with {} care events for ProcedureBooking {}",
                    plan.id,
                    events.len(),
                    id
                );
                Some((plan, events))
            }
        };

        let saved = ProcedureBookingRepository::new(&mut tx)
            .find_one(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;

        self.search.index(&saved);
        if let Some((plan, events)) = &touched {
            self.search.index(plan);
            self.search.index_all(events);
        }

        Ok(saved)
    }

    /// Delete a booking with its follow-up plan and care events
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        tracing::debug!("Request to delete ProcedureBooking : {}", id);

        let mut tx = self.pool.begin().await?;
        let plan = FollowupPlanRepository::new(&mut tx)
            .find_one_by_procedure_booking_id(id)
            .await?;
        let event_ids = match plan.as_ref().and_then(|p| p.id) {
            Some(plan_id) => CareEventRepository::new(&mut tx)
                .find_all_by_followup_plan_id(plan_id)
                .await?
                .into_iter()
                .filter_map(|e| e.id)
                .collect(),
            None => Vec::new(),
        };
        let deleted = ProcedureBookingRepository::new(&mut tx).delete(id).await?;
        tx.commit().await?;

        if deleted {
            self.search.remove::<ProcedureBooking>(id);
            if let Some(plan_id) = plan.and_then(|p| p.id) {
                self.search.remove::<FollowupPlan>(plan_id);
            }
            self.search.remove_all::<CareEvent>(event_ids);
        }
        Ok(deleted)
    }

    /// Plan of the patient's most recent booking for a procedure code
    pub async fn find_one_by_patient_id_and_primary_procedure(
        &self,
        patient_id: i64,
        primary_procedure: &str,
    ) -> Result<Option<FollowupPlan>, DbError> {
        let mut conn = self.pool.acquire().await?;
        FollowupPlanRepository::new(&mut conn)
            .find_one_by_patient_id_and_primary_procedure(patient_id, primary_procedure)
            .await
    }
}

/// Create one care event per timepoint of the schedule: timepoints at zero
/// are pre-operative, the rest are follow-ups.
async fn process_followup_plan(
    conn: &mut SqliteConnection,
    plan: &FollowupPlan,
) -> Result<Vec<CareEvent>, DbError> {
    let timepoints = TimepointRepository::new(&mut *conn).find_all_unpaged().await?;

    let mut events = Vec::with_capacity(timepoints.len());
    for timepoint in timepoints {
        let mut event = CareEvent {
            id: None,
            event_type: if timepoint.is_preoperative() {
                EventType::Preoperative
            } else {
                EventType::Followup
            },
            timepoint_id: timepoint.id,
            patient_id: Some(plan.patient_id),
            followup_plan_id: plan.id,
        };
        event.id = Some(CareEventRepository::new(&mut *conn).insert(&event).await?);
        events.push(event);
    }
    Ok(events)
}
