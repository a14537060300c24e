use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::AddressCriteria;
use crate::error::DbError;
use crate::models::{Address, AddressRow};
use crate::pagination::{Page, Pageable};

const SELECT_ADDRESS: &str = "SELECT address.id, address.street, address.lines, address.city, \
     address.county, address.postal_code, address.country, address.patient_id FROM address";
const COUNT_ADDRESS: &str = "SELECT COUNT(*) FROM address";

pub struct AddressRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AddressRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "address.id"),
        ("street", "address.street"),
        ("city", "address.city"),
        ("county", "address.county"),
        ("postalCode", "address.postal_code"),
        ("country", "address.country"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert an address owned by `patient_id`
    pub async fn insert(&mut self, patient_id: i64, address: &Address) -> Result<i64, DbError> {
        let lines = serde_json::to_string(&address.lines)?;
        let result = sqlx::query(
            r#"
            INSERT INTO address (street, lines, city, county, postal_code, country, patient_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&address.street)
        .bind(lines)
        .bind(&address.city)
        .bind(&address.county)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(patient_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Drop every address of the patient and store `addresses` in their place
    pub async fn replace_for_patient(
        &mut self,
        patient_id: i64,
        addresses: &[Address],
    ) -> Result<Vec<Address>, DbError> {
        sqlx::query("DELETE FROM address WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *self.conn)
            .await?;

        let mut saved = Vec::with_capacity(addresses.len());
        for address in addresses {
            let id = self.insert(patient_id, address).await?;
            saved.push(Address {
                id: Some(id),
                patient_id: Some(patient_id),
                ..address.clone()
            });
        }
        Ok(saved)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<Address>, DbError> {
        let sql = format!("{} WHERE address.id = ?", SELECT_ADDRESS);
        let row: Option<AddressRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(Address::try_from).transpose()
    }

    pub async fn find_all_by_patient_id(&mut self, patient_id: i64) -> Result<Vec<Address>, DbError> {
        let sql = format!("{} WHERE address.patient_id = ? ORDER BY address.id", SELECT_ADDRESS);
        let rows: Vec<AddressRow> = sqlx::query_as(&sql)
            .bind(patient_id)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(Address::try_from).collect()
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &AddressCriteria,
        pageable: &Pageable,
    ) -> Result<Page<Address>, DbError> {
        let (rows, total) = fetch_page::<AddressRow, _>(
            &mut *self.conn,
            SELECT_ADDRESS,
            COUNT_ADDRESS,
            "address.id",
            criteria,
            pageable,
        )
        .await?;

        let content = rows
            .into_iter()
            .map(Address::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<Address>, DbError> {
        let sql = format!("{} ORDER BY address.id", SELECT_ADDRESS);
        let rows: Vec<AddressRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(Address::try_from).collect()
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_ADDRESS)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
