use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::FollowupPlanCriteria;
use crate::error::DbError;
use crate::models::FollowupPlan;
use crate::pagination::{Page, Pageable};

const SELECT_PLAN: &str = "SELECT followup_plan.id, followup_plan.procedure_booking_id, \
     followup_plan.patient_id FROM followup_plan";
const COUNT_PLAN: &str = "SELECT COUNT(*) FROM followup_plan";

pub struct FollowupPlanRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> FollowupPlanRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "followup_plan.id"),
        ("procedureBookingId", "followup_plan.procedure_booking_id"),
        ("patientId", "followup_plan.patient_id"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&mut self, procedure_booking_id: i64, patient_id: i64) -> Result<FollowupPlan, DbError> {
        let result = sqlx::query("INSERT INTO followup_plan (procedure_booking_id, patient_id) VALUES (?, ?)")
            .bind(procedure_booking_id)
            .bind(patient_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(FollowupPlan {
            id: Some(result.last_insert_rowid()),
            procedure_booking_id,
            patient_id,
        })
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<FollowupPlan>, DbError> {
        let sql = format!("{} WHERE followup_plan.id = ?", SELECT_PLAN);
        let plan = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(plan)
    }

    /// The plan created for a booking, if any. There is at most one.
    pub async fn find_one_by_procedure_booking_id(
        &mut self,
        procedure_booking_id: i64,
    ) -> Result<Option<FollowupPlan>, DbError> {
        let sql = format!("{} WHERE followup_plan.procedure_booking_id = ?", SELECT_PLAN);
        let plan = sqlx::query_as(&sql)
            .bind(procedure_booking_id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(plan)
    }

    /// The plan of the patient's most recent booking with the given primary procedure
    pub async fn find_one_by_patient_id_and_primary_procedure(
        &mut self,
        patient_id: i64,
        primary_procedure: &str,
    ) -> Result<Option<FollowupPlan>, DbError> {
        let sql = format!(
            "{} JOIN procedure_booking pb ON pb.id = followup_plan.procedure_booking_id \
             WHERE followup_plan.patient_id = ? AND pb.primary_procedure = ? \
             ORDER BY COALESCE(pb.scheduled_date, '') DESC, pb.id DESC LIMIT 1",
            SELECT_PLAN
        );
        let plan = sqlx::query_as(&sql)
            .bind(patient_id)
            .bind(primary_procedure)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(plan)
    }

    pub async fn find_all_by_patient_id(&mut self, patient_id: i64) -> Result<Vec<FollowupPlan>, DbError> {
        let sql = format!("{} WHERE followup_plan.patient_id = ? ORDER BY followup_plan.id", SELECT_PLAN);
        let plans = sqlx::query_as(&sql)
            .bind(patient_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(plans)
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &FollowupPlanCriteria,
        pageable: &Pageable,
    ) -> Result<Page<FollowupPlan>, DbError> {
        let (content, total) = fetch_page(
            &mut *self.conn,
            SELECT_PLAN,
            COUNT_PLAN,
            "followup_plan.id",
            criteria,
            pageable,
        )
        .await?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<FollowupPlan>, DbError> {
        let sql = format!("{} ORDER BY followup_plan.id", SELECT_PLAN);
        let plans = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        Ok(plans)
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_PLAN)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Hand plan `id` over to another patient; returns false when it does not exist
    pub async fn update_patient(&mut self, id: i64, patient_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE followup_plan SET patient_id = ? WHERE id = ?")
            .bind(patient_id)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a plan; its care events cascade
    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM followup_plan WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn insert_patient(conn: &mut SqliteConnection) -> i64 {
        sqlx::query(
            "INSERT INTO patient (given_name, family_name, birth_date, gender, nhs_number) \
             VALUES ('Grace', 'Hopper', '1906-12-09T00:00:00Z', 'FEMALE', 1)",
        )
        .execute(conn)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    async fn insert_booking(
        conn: &mut SqliteConnection,
        patient_id: i64,
        procedure: &str,
        scheduled: &str,
    ) -> i64 {
        sqlx::query(
            "INSERT INTO procedure_booking \
             (consultant_name, hospital_site, scheduled_date, primary_procedure, patient_id) \
             VALUES ('Mr Smith', 'RVI', ?, ?, ?)",
        )
        .bind(scheduled)
        .bind(procedure)
        .bind(patient_id)
        .execute(conn)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_one_plan_per_booking() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let patient_id = insert_patient(&mut conn).await;
        let booking_id = insert_booking(&mut conn, patient_id, "1234", "2018-01-01T09:00:00+00:00").await;
        let mut repo = FollowupPlanRepository::new(&mut conn);

        let plan = repo.insert(booking_id, patient_id).await.unwrap();
        assert_eq!(
            repo.find_one_by_procedure_booking_id(booking_id).await.unwrap(),
            Some(plan.clone())
        );

        let err = repo.insert(booking_id, patient_id).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::Database(ref e)) if e.is_unique_violation()));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_most_recent_booking_wins() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let patient_id = insert_patient(&mut conn).await;
        let older = insert_booking(&mut conn, patient_id, "1234", "2017-01-01T09:00:00+00:00").await;
        let newer = insert_booking(&mut conn, patient_id, "1234", "2018-01-01T09:00:00+00:00").await;
        let other = insert_booking(&mut conn, patient_id, "9999", "2019-01-01T09:00:00+00:00").await;
        let mut repo = FollowupPlanRepository::new(&mut conn);

        repo.insert(newer, patient_id).await.unwrap();
        repo.insert(older, patient_id).await.unwrap();
        repo.insert(other, patient_id).await.unwrap();

        let plan = repo
            .find_one_by_patient_id_and_primary_procedure(patient_id, "1234")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.procedure_booking_id, newer);

        assert!(repo
            .find_one_by_patient_id_and_primary_procedure(patient_id, "0000")
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.find_all_by_patient_id(patient_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_plan_cascades_with_booking() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let patient_id = insert_patient(&mut conn).await;
        let booking_id = insert_booking(&mut conn, patient_id, "1234", "2018-01-01T09:00:00+00:00").await;
        FollowupPlanRepository::new(&mut conn)
            .insert(booking_id, patient_id)
            .await
            .unwrap();

        sqlx::query("DELETE FROM procedure_booking WHERE id = ?")
            .bind(booking_id)
            .execute(&mut *conn)
            .await
            .unwrap();

        assert_eq!(FollowupPlanRepository::new(&mut conn).count().await.unwrap(), 0);
    }
}
