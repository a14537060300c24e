use sqlx::SqliteConnection;

use super::{fetch_page, AddressRepository};
use crate::criteria::PatientCriteria;
use crate::error::DbError;
use crate::models::{Patient, PatientRow};
use crate::pagination::{Page, Pageable};

const SELECT_PATIENT: &str = "SELECT patient.id, patient.given_name, patient.family_name, \
     patient.birth_date, patient.gender, patient.nhs_number, patient.email FROM patient";
const COUNT_PATIENT: &str = "SELECT COUNT(*) FROM patient";

/// Patient repository. Addresses are loaded alongside every patient.
pub struct PatientRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PatientRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "patient.id"),
        ("givenName", "patient.given_name"),
        ("familyName", "patient.family_name"),
        ("birthDate", "patient.birth_date"),
        ("gender", "patient.gender"),
        ("nhsNumber", "patient.nhs_number"),
        ("email", "patient.email"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a patient row and return its new id. Addresses are not touched.
    pub async fn insert(&mut self, patient: &Patient) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO patient (given_name, family_name, birth_date, gender, nhs_number, email)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&patient.given_name)
        .bind(&patient.family_name)
        .bind(patient.birth_date)
        .bind(patient.gender.as_str())
        .bind(patient.nhs_number)
        .bind(&patient.email)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Update the patient row with `id`; returns false when no such row exists
    pub async fn update(&mut self, id: i64, patient: &Patient) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE patient
            SET given_name = ?, family_name = ?, birth_date = ?, gender = ?, nhs_number = ?, email = ?
            WHERE id = ?
            "#,
        )
        .bind(&patient.given_name)
        .bind(&patient.family_name)
        .bind(patient.birth_date)
        .bind(patient.gender.as_str())
        .bind(patient.nhs_number)
        .bind(&patient.email)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<Patient>, DbError> {
        let sql = format!("{} WHERE patient.id = ?", SELECT_PATIENT);
        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        match row {
            Some(row) => Ok(self.with_addresses(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn exists(&mut self, id: i64) -> Result<bool, DbError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM patient WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn find_all(&mut self, pageable: &Pageable) -> Result<Page<Patient>, DbError> {
        self.find_by_criteria(&PatientCriteria::default(), pageable)
            .await
    }

    /// Page of patients matching every filter in `criteria`
    pub async fn find_by_criteria(
        &mut self,
        criteria: &PatientCriteria,
        pageable: &Pageable,
    ) -> Result<Page<Patient>, DbError> {
        let (rows, total) = fetch_page::<PatientRow, _>(
            &mut *self.conn,
            SELECT_PATIENT,
            COUNT_PATIENT,
            "patient.id",
            criteria,
            pageable,
        )
        .await?;

        let content = self.with_addresses(rows).await?;
        Ok(Page::new(content, pageable, total))
    }

    /// Every patient, for rebuilding the search index
    pub async fn find_all_unpaged(&mut self) -> Result<Vec<Patient>, DbError> {
        let sql = format!("{} ORDER BY patient.id", SELECT_PATIENT);
        let rows: Vec<PatientRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        self.with_addresses(rows).await
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_PATIENT)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Delete a patient; addresses, bookings, plans and care events cascade
    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM patient WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn with_addresses(&mut self, rows: Vec<PatientRow>) -> Result<Vec<Patient>, DbError> {
        let mut patients = Vec::with_capacity(rows.len());
        for row in rows {
            let mut patient = Patient::try_from(row)?;
            if let Some(id) = patient.id {
                patient.addresses = AddressRepository::new(&mut *self.conn)
                    .find_all_by_patient_id(id)
                    .await?;
            }
            patients.push(patient);
        }
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{Criteria, StringFilter};
    use crate::db::connect_in_memory;
    use crate::models::{Address, GenderType};

    fn sample_patient(nhs_number: i64, family_name: &str) -> Patient {
        Patient {
            id: None,
            given_name: "Jane".to_string(),
            family_name: family_name.to_string(),
            birth_date: "1970-03-01T00:00:00Z".parse().unwrap(),
            gender: GenderType::Female,
            nhs_number,
            email: None,
            addresses: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PatientRepository::new(&mut conn);

        let id = repo.insert(&sample_patient(9434765919, "Smith")).await.unwrap();
        let found = repo.find_one(id).await.unwrap().unwrap();

        assert_eq!(found.id, Some(id));
        assert_eq!(found.family_name, "Smith");
        assert_eq!(found.gender, GenderType::Female);
        assert!(found.addresses.is_empty());
        assert!(repo.find_one(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_one_loads_addresses() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = PatientRepository::new(&mut conn)
            .insert(&sample_patient(1, "Smith"))
            .await
            .unwrap();
        let mut address = Address::with_street("1 High Street");
        address.add_line("Jesmond");
        AddressRepository::new(&mut conn)
            .insert(id, &address)
            .await
            .unwrap();

        let found = PatientRepository::new(&mut conn)
            .find_one(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.addresses.len(), 1);
        assert_eq!(found.addresses[0].lines, vec!["Jesmond".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_nhs_number_is_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PatientRepository::new(&mut conn);

        repo.insert(&sample_patient(42, "Smith")).await.unwrap();
        let err = repo.insert(&sample_patient(42, "Jones")).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::Database(ref e)) if e.is_unique_violation()));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PatientRepository::new(&mut conn);

        let id = repo.insert(&sample_patient(1, "Smith")).await.unwrap();
        let mut changed = sample_patient(1, "Smyth");
        changed.email = Some("jane@example.com".to_string());
        assert!(repo.update(id, &changed).await.unwrap());
        assert!(!repo.update(id + 100, &changed).await.unwrap());

        let found = repo.find_one(id).await.unwrap().unwrap();
        assert_eq!(found.family_name, "Smyth");
        assert_eq!(found.email.as_deref(), Some("jane@example.com"));

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_criteria_and_paging() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = PatientRepository::new(&mut conn);

        for (nhs, name) in [(1, "Smith"), (2, "Smithson"), (3, "Jones")] {
            repo.insert(&sample_patient(nhs, name)).await.unwrap();
        }

        let criteria = PatientCriteria {
            family_name: Some(StringFilter::containing("SMITH")),
            ..PatientCriteria::default()
        };
        let page = repo
            .find_by_criteria(&criteria, &Pageable::of(0, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].family_name, "Smith");

        let params = vec![("nhsNumber.greaterThan".to_string(), "1".to_string())];
        let criteria = PatientCriteria::from_params(&params).unwrap();
        let page = repo.find_by_criteria(&criteria, &Pageable::default()).await.unwrap();
        assert_eq!(page.total, 2);

        let all = repo.find_all(&Pageable::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }
}
