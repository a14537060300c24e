use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::{
    AddressRepository, CareEventRepository, FollowupPlanRepository, PatientRepository,
    ProcedureBookingRepository,
};
use crate::error::DbError;
use crate::models::{Address, CareEvent, FollowupPlan, Patient, ProcedureBooking};
use crate::search::SearchIndex;

/// Patient writes: a patient and its addresses are saved together
#[derive(Clone)]
pub struct PatientService {
    pool: SqlitePool,
    search: Arc<SearchIndex>,
}

impl PatientService {
    pub fn new(pool: SqlitePool, search: Arc<SearchIndex>) -> Self {
        Self { pool, search }
    }

    /// Insert or update a patient and replace its addresses. Updating an id
    /// that does not exist fails with `RowNotFound`.
    pub async fn save(&self, patient: &Patient) -> Result<Patient, DbError> {
        tracing::debug!("Request to save Patient : {:?}", patient);

        let mut tx = self.pool.begin().await?;

        let (id, stale_addresses) = match patient.id {
            Some(id) => {
                let updated = PatientRepository::new(&mut tx).update(id, patient).await?;
                if !updated {
                    return Err(sqlx::Error::RowNotFound.into());
                }
                let old: Vec<i64> = AddressRepository::new(&mut tx)
                    .find_all_by_patient_id(id)
                    .await?
                    .into_iter()
                    .filter_map(|a| a.id)
                    .collect();
                (id, old)
            }
            None => (PatientRepository::new(&mut tx).insert(patient).await?, Vec::new()),
        };

        let addresses = AddressRepository::new(&mut tx)
            .replace_for_patient(id, &patient.addresses)
            .await?;
        tx.commit().await?;

        let saved = Patient {
            id: Some(id),
            addresses,
            ..patient.clone()
        };

        self.search.remove_all::<Address>(stale_addresses);
        self.search.index_all(&saved.addresses);
        self.search.index(&saved);
        Ok(saved)
    }

    /// Delete a patient and everything that hangs off it
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        tracing::debug!("Request to delete Patient : {}", id);

        let mut tx = self.pool.begin().await?;
        let address_ids: Vec<i64> = AddressRepository::new(&mut tx)
            .find_all_by_patient_id(id)
            .await?
            .into_iter()
            .filter_map(|a| a.id)
            .collect();
        let booking_ids = ProcedureBookingRepository::new(&mut tx)
            .find_ids_by_patient(id)
            .await?;
        let plan_ids: Vec<i64> = FollowupPlanRepository::new(&mut tx)
            .find_all_by_patient_id(id)
            .await?
            .into_iter()
            .filter_map(|p| p.id)
            .collect();
        let event_ids: Vec<i64> = CareEventRepository::new(&mut tx)
            .find_all_by_patient_id(id)
            .await?
            .into_iter()
            .filter_map(|e| e.id)
            .collect();
        let deleted = PatientRepository::new(&mut tx).delete(id).await?;
        tx.commit().await?;

        if deleted {
            self.search.remove::<Patient>(id);
            self.search.remove_all::<Address>(address_ids);
            self.search.remove_all::<ProcedureBooking>(booking_ids);
            self.search.remove_all::<FollowupPlan>(plan_ids);
            self.search.remove_all::<CareEvent>(event_ids);
        }
        Ok(deleted)
    }
}
