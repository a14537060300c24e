use sqlx::SqliteConnection;

use crate::error::DbError;
use crate::models::{Timepoint, TimepointRow};
use crate::pagination::{Page, Pageable};

const SELECT_TIMEPOINT: &str =
    "SELECT timepoint.id, timepoint.name, timepoint.value, timepoint.unit FROM timepoint";

/// Read access to the follow-up schedule seeded by migration
pub struct TimepointRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TimepointRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<Timepoint>, DbError> {
        let sql = format!("{} WHERE timepoint.id = ?", SELECT_TIMEPOINT);
        let row: Option<TimepointRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(Timepoint::try_from).transpose()
    }

    pub async fn find_all(&mut self, pageable: &Pageable) -> Result<Page<Timepoint>, DbError> {
        let sql = format!("{} ORDER BY timepoint.id LIMIT ? OFFSET ?", SELECT_TIMEPOINT);
        let rows: Vec<TimepointRow> = sqlx::query_as(&sql)
            .bind(i64::from(pageable.size))
            .bind(pageable.offset())
            .fetch_all(&mut *self.conn)
            .await?;
        let content = rows
            .into_iter()
            .map(Timepoint::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = self.count().await?;
        Ok(Page::new(content, pageable, total))
    }

    /// The whole schedule in id order
    pub async fn find_all_unpaged(&mut self) -> Result<Vec<Timepoint>, DbError> {
        let sql = format!("{} ORDER BY timepoint.id", SELECT_TIMEPOINT);
        let rows: Vec<TimepointRow> = sqlx::query_as(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        rows.into_iter().map(Timepoint::try_from).collect()
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timepoint")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::TimeUnit;

    #[tokio::test]
    async fn test_default_schedule() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TimepointRepository::new(&mut conn);

        let timepoints = repo.find_all_unpaged().await.unwrap();
        let schedule: Vec<(i32, TimeUnit)> = timepoints.iter().map(|t| (t.value, t.unit)).collect();
        assert_eq!(
            schedule,
            vec![
                (0, TimeUnit::Days),
                (6, TimeUnit::Weeks),
                (6, TimeUnit::Months),
                (1, TimeUnit::Years),
            ]
        );
        assert!(timepoints[0].is_preoperative());
        assert_eq!(timepoints[0].name, "Pre-operative");
    }

    #[tokio::test]
    async fn test_paged_and_single_lookup() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = TimepointRepository::new(&mut conn);

        let page = repo.find_all(&Pageable::of(1, 2)).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.content[0].name, "6 months");

        let first = page.content[0].id.unwrap();
        assert_eq!(repo.find_one(first).await.unwrap().unwrap().name, "6 months");
        assert!(repo.find_one(999).await.unwrap().is_none());
    }
}
