use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::{LongFilter, ProcedureBookingCriteria};
use crate::error::DbError;
use crate::models::ProcedureBooking;
use crate::pagination::{Page, Pageable};

// followup_plan_id is derived from the plan that points back at the booking
const SELECT_BOOKING: &str = "SELECT procedure_booking.id, procedure_booking.consultant_name, \
     procedure_booking.hospital_site, procedure_booking.scheduled_date, \
     procedure_booking.performed_date, procedure_booking.primary_procedure, \
     procedure_booking.other_procedures, procedure_booking.patient_id, \
     booking_plan.id AS followup_plan_id \
     FROM procedure_booking \
     LEFT JOIN followup_plan booking_plan ON booking_plan.procedure_booking_id = procedure_booking.id";
const COUNT_BOOKING: &str = "SELECT COUNT(*) FROM procedure_booking";

pub struct ProcedureBookingRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProcedureBookingRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "procedure_booking.id"),
        ("consultantName", "procedure_booking.consultant_name"),
        ("hospitalSite", "procedure_booking.hospital_site"),
        ("scheduledDate", "procedure_booking.scheduled_date"),
        ("performedDate", "procedure_booking.performed_date"),
        ("primaryProcedure", "procedure_booking.primary_procedure"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a booking for `patient_id`
    pub async fn insert(&mut self, patient_id: i64, booking: &ProcedureBooking) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO procedure_booking (
                consultant_name, hospital_site, scheduled_date, performed_date,
                primary_procedure, other_procedures, patient_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.consultant_name)
        .bind(&booking.hospital_site)
        .bind(booking.scheduled_date)
        .bind(booking.performed_date)
        .bind(&booking.primary_procedure)
        .bind(&booking.other_procedures)
        .bind(patient_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite booking `id`; returns false when it does not exist
    pub async fn update(
        &mut self,
        id: i64,
        patient_id: i64,
        booking: &ProcedureBooking,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE procedure_booking
            SET consultant_name = ?, hospital_site = ?, scheduled_date = ?, performed_date = ?,
                primary_procedure = ?, other_procedures = ?, patient_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&booking.consultant_name)
        .bind(&booking.hospital_site)
        .bind(booking.scheduled_date)
        .bind(booking.performed_date)
        .bind(&booking.primary_procedure)
        .bind(&booking.other_procedures)
        .bind(patient_id)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<ProcedureBooking>, DbError> {
        let sql = format!("{} WHERE procedure_booking.id = ?", SELECT_BOOKING);
        let booking = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(booking)
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &ProcedureBookingCriteria,
        pageable: &Pageable,
    ) -> Result<Page<ProcedureBooking>, DbError> {
        let (content, total) = fetch_page(
            &mut *self.conn,
            SELECT_BOOKING,
            COUNT_BOOKING,
            "procedure_booking.id",
            criteria,
            pageable,
        )
        .await?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_by_patient(
        &mut self,
        patient_id: i64,
        pageable: &Pageable,
    ) -> Result<Page<ProcedureBooking>, DbError> {
        let criteria = ProcedureBookingCriteria {
            patient_id: Some(LongFilter::equal_to(patient_id)),
            ..ProcedureBookingCriteria::default()
        };
        self.find_by_criteria(&criteria, pageable).await
    }

    /// Ids of every booking of a patient
    pub async fn find_ids_by_patient(&mut self, patient_id: i64) -> Result<Vec<i64>, DbError> {
        let ids = sqlx::query_scalar("SELECT id FROM procedure_booking WHERE patient_id = ? ORDER BY id")
            .bind(patient_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(ids)
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<ProcedureBooking>, DbError> {
        let sql = format!("{} ORDER BY procedure_booking.id", SELECT_BOOKING);
        let bookings = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        Ok(bookings)
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_BOOKING)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Delete a booking; its follow-up plan and care events cascade
    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM procedure_booking WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
