use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::ProcedureCriteria;
use crate::error::DbError;
use crate::models::Procedure;
use crate::pagination::{Page, Pageable};

const SELECT_PROCEDURE: &str =
    "SELECT procedure.id, procedure.local_code, procedure.name FROM procedure";
const COUNT_PROCEDURE: &str = "SELECT COUNT(*) FROM procedure";

pub struct ProcedureRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProcedureRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "procedure.id"),
        ("localCode", "procedure.local_code"),
        ("name", "procedure.name"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&mut self, procedure: &Procedure) -> Result<i64, DbError> {
        let result = sqlx::query("INSERT INTO procedure (local_code, name) VALUES (?, ?)")
            .bind(procedure.local_code)
            .bind(&procedure.name)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(&mut self, id: i64, procedure: &Procedure) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE procedure SET local_code = ?, name = ? WHERE id = ?")
            .bind(procedure.local_code)
            .bind(&procedure.name)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<Procedure>, DbError> {
        let sql = format!("{} WHERE procedure.id = ?", SELECT_PROCEDURE);
        let procedure = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(procedure)
    }

    pub async fn find_one_by_local_code(&mut self, code: i32) -> Result<Option<Procedure>, DbError> {
        let sql = format!("{} WHERE procedure.local_code = ?", SELECT_PROCEDURE);
        let procedure = sqlx::query_as(&sql)
            .bind(code)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(procedure)
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &ProcedureCriteria,
        pageable: &Pageable,
    ) -> Result<Page<Procedure>, DbError> {
        let (content, total) = fetch_page(
            &mut *self.conn,
            SELECT_PROCEDURE,
            COUNT_PROCEDURE,
            "procedure.id",
            criteria,
            pageable,
        )
        .await?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<Procedure>, DbError> {
        let sql = format!("{} ORDER BY procedure.id", SELECT_PROCEDURE);
        let procedures = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        Ok(procedures)
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_PROCEDURE)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM procedure WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
