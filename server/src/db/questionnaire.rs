use sqlx::SqliteConnection;

use super::fetch_page;
use crate::criteria::QuestionnaireCriteria;
use crate::error::DbError;
use crate::models::Questionnaire;
use crate::pagination::{Page, Pageable};

const SELECT_QUESTIONNAIRE: &str = "SELECT questionnaire.id, questionnaire.name, \
     questionnaire.copyright FROM questionnaire";
const COUNT_QUESTIONNAIRE: &str = "SELECT COUNT(*) FROM questionnaire";

pub struct QuestionnaireRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> QuestionnaireRepository<'c> {
    pub const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "questionnaire.id"),
        ("name", "questionnaire.name"),
        ("copyright", "questionnaire.copyright"),
    ];

    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&mut self, questionnaire: &Questionnaire) -> Result<i64, DbError> {
        let result = sqlx::query("INSERT INTO questionnaire (name, copyright) VALUES (?, ?)")
            .bind(&questionnaire.name)
            .bind(&questionnaire.copyright)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(&mut self, id: i64, questionnaire: &Questionnaire) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE questionnaire SET name = ?, copyright = ? WHERE id = ?")
            .bind(&questionnaire.name)
            .bind(&questionnaire.copyright)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<Questionnaire>, DbError> {
        let sql = format!("{} WHERE questionnaire.id = ?", SELECT_QUESTIONNAIRE);
        let questionnaire = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(questionnaire)
    }

    pub async fn find_by_criteria(
        &mut self,
        criteria: &QuestionnaireCriteria,
        pageable: &Pageable,
    ) -> Result<Page<Questionnaire>, DbError> {
        let (content, total) = fetch_page(
            &mut *self.conn,
            SELECT_QUESTIONNAIRE,
            COUNT_QUESTIONNAIRE,
            "questionnaire.id",
            criteria,
            pageable,
        )
        .await?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<Questionnaire>, DbError> {
        let sql = format!("{} ORDER BY questionnaire.id", SELECT_QUESTIONNAIRE);
        let questionnaires = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        Ok(questionnaires)
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(COUNT_QUESTIONNAIRE)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM questionnaire WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
