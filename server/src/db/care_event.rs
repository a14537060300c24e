use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::CareEventCriteria;
use crate::error::DbError;
use crate::models::{CareEvent, CareEventRow};
use crate::pagination::{Page, Pageable};

const SELECT_EVENT: &str = "SELECT care_event.id, care_event.event_type, care_event.timepoint_id, \
     care_event.patient_id, care_event.followup_plan_id FROM care_event";
const COUNT_EVENT: &str = "SELECT COUNT(*) FROM care_event";

pub struct CareEventRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CareEventRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "care_event.id"),
        ("type", "care_event.event_type"),
        ("timepointId", "care_event.timepoint_id"),
        ("patientId", "care_event.patient_id"),
        ("followupPlanId", "care_event.followup_plan_id"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&mut self, event: &CareEvent) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO care_event (event_type, timepoint_id, patient_id, followup_plan_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.timepoint_id)
        .bind(event.patient_id)
        .bind(event.followup_plan_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update(&mut self, id: i64, event: &CareEvent) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE care_event
            SET event_type = ?, timepoint_id = ?, patient_id = ?, followup_plan_id = ?
            WHERE id = ?
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(event.timepoint_id)
        .bind(event.patient_id)
        .bind(event.followup_plan_id)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Point every care event of a plan at `patient_id`; returns the number moved
    pub async fn update_patient_for_plan(&mut self, plan_id: i64, patient_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("UPDATE care_event SET patient_id = ? WHERE followup_plan_id = ?")
            .bind(patient_id)
            .bind(plan_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<CareEvent>, DbError> {
        let sql = format!("{} WHERE care_event.id = ?", SELECT_EVENT);
        let row: Option<CareEventRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(CareEvent::try_from).transpose()
    }

    pub async fn find_all_by_followup_plan_id(&mut self, plan_id: i64) -> Result<Vec<CareEvent>, DbError> {
        self.find_all_where("care_event.followup_plan_id", plan_id).await
    }

    pub async fn find_all_by_patient_id(&mut self, patient_id: i64) -> Result<Vec<CareEvent>, DbError> {
        self.find_all_where("care_event.patient_id", patient_id).await
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &CareEventCriteria,
        pageable: &Pageable,
    ) -> Result<Page<CareEvent>, DbError> {
        let (rows, total) = fetch_page::<CareEventRow, _>(
            &mut *self.conn,
            SELECT_EVENT,
            COUNT_EVENT,
            "care_event.id",
            criteria,
            pageable,
        )
        .await?;

        let content = rows
            .into_iter()
            .map(CareEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<CareEvent>, DbError> {
        let sql = format!("{} ORDER BY care_event.id", SELECT_EVENT);
        let rows: Vec<CareEventRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(CareEvent::try_from).collect()
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_EVENT)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM care_event WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_all_where(&mut self, column: &str, id: i64) -> Result<Vec<CareEvent>, DbError> {
        let sql = format!("{} WHERE {} = ? ORDER BY care_event.id", SELECT_EVENT, column);
        let rows: Vec<CareEventRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(CareEvent::try_from).collect()
    }
}
