use sqlx::SqliteConnection;

use crate::error::DbError;
use crate::models::User;
use crate::pagination::{Page, Pageable};

const SELECT_USER: &str = "SELECT app_user.id, app_user.login, app_user.title, app_user.first_name, \
     app_user.last_name, app_user.email, app_user.password_hash, app_user.activated, \
     app_user.lang_key, app_user.reset_key, app_user.reset_date FROM app_user";

/// Users and their authorities
pub struct UserRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a user together with its authority links
    pub async fn insert(&mut self, user: &User) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO app_user (
                login, title, first_name, last_name, email, password_hash,
                activated, lang_key, reset_key, reset_date
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.login)
        .bind(&user.title)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.activated)
        .bind(&user.lang_key)
        .bind(&user.reset_key)
        .bind(user.reset_date)
        .execute(&mut *self.conn)
        .await?;
        let id = result.last_insert_rowid();

        for authority in &user.authorities {
            sqlx::query("INSERT INTO user_authority (user_id, authority_name) VALUES (?, ?)")
                .bind(id)
                .bind(authority)
                .execute(&mut *self.conn)
                .await?;
        }

        Ok(id)
    }

    pub async fn find_one(&mut self, id: i64) -> Result<Option<User>, DbError> {
        let sql = format!("{} WHERE app_user.id = ?", SELECT_USER);
        let user: Option<User> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        match user {
            Some(user) => Ok(self.with_authorities(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_one_by_login(&mut self, login: &str) -> Result<Option<User>, DbError> {
        let sql = format!("{} WHERE app_user.login = ?", SELECT_USER);
        let user: Option<User> = sqlx::query_as(&sql)
            .bind(login.to_lowercase())
            .fetch_optional(&mut *self.conn)
            .await?;

        match user {
            Some(user) => Ok(self.with_authorities(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_all(&mut self, pageable: &Pageable) -> Result<Page<User>, DbError> {
        let sql = format!("{} ORDER BY app_user.id LIMIT ? OFFSET ?", SELECT_USER);
        let users: Vec<User> = sqlx::query_as(&sql)
            .bind(i64::from(pageable.size))
            .bind(pageable.offset())
            .fetch_all(&mut *self.conn)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user")
            .fetch_one(&mut *self.conn)
            .await?;

        let content = self.with_authorities(users).await?;
        Ok(Page::new(content, pageable, total))
    }

    /// Page of users holding `authority`
    pub async fn find_all_by_authority(
        &mut self,
        authority: &str,
        pageable: &Pageable,
    ) -> Result<Page<User>, DbError> {
        let sql = format!(
            "{} JOIN user_authority ua ON ua.user_id = app_user.id \
             WHERE ua.authority_name = ? ORDER BY app_user.id LIMIT ? OFFSET ?",
            SELECT_USER
        );
        let users: Vec<User> = sqlx::query_as(&sql)
            .bind(authority)
            .bind(i64::from(pageable.size))
            .bind(pageable.offset())
            .fetch_all(&mut *self.conn)
            .await?;
        let total = self.count_by_authority(authority).await?;

        let content = self.with_authorities(users).await?;
        Ok(Page::new(content, pageable, total))
    }

    pub async fn count_by_authority(&mut self, authority: &str) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_authority WHERE authority_name = ?")
                .bind(authority)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(count)
    }

    pub async fn find_all_unpaged(&mut self) -> Result<Vec<User>, DbError> {
        let sql = format!("{} ORDER BY app_user.id", SELECT_USER);
        let users: Vec<User> = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        self.with_authorities(users).await
    }

    pub async fn count(&mut self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_user")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    async fn with_authorities(&mut self, mut users: Vec<User>) -> Result<Vec<User>, DbError> {
        for user in &mut users {
            if let Some(id) = user.id {
                user.authorities = sqlx::query_scalar(
                    "SELECT authority_name FROM user_authority WHERE user_id = ? ORDER BY authority_name",
                )
                .bind(id)
                .fetch_all(&mut *self.conn)
                .await?;
            }
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::{ROLE_CONSULTANT, ROLE_USER};

    fn consultant(login: &str) -> User {
        let mut user = User::new(login);
        user.email = Some(format!("{}@promsapp.com", login.to_lowercase()));
        user.password_hash = "hash".to_string();
        user.activated = true;
        user.add_authority(ROLE_CONSULTANT);
        user
    }

    #[tokio::test]
    async fn test_insert_and_find_by_login() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserRepository::new(&mut conn);

        let mut user = consultant("jsmith");
        user.add_authority(ROLE_USER);
        let id = repo.insert(&user).await.unwrap();

        let found = repo.find_one_by_login("JSmith").await.unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert!(found.activated);
        assert_eq!(found.password_hash, "hash");
        assert_eq!(
            found.authorities,
            vec![ROLE_CONSULTANT.to_string(), ROLE_USER.to_string()]
        );
        assert!(repo.find_one_by_login("nobody").await.unwrap().is_none());
        assert_eq!(repo.find_one(id).await.unwrap().unwrap().login, "jsmith");
    }

    #[tokio::test]
    async fn test_count_and_find_by_authority() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserRepository::new(&mut conn);

        assert_eq!(repo.count_by_authority(ROLE_CONSULTANT).await.unwrap(), 0);
        repo.insert(&consultant("a")).await.unwrap();
        repo.insert(&consultant("b")).await.unwrap();
        let mut plain = User::new("c");
        plain.password_hash = "hash".to_string();
        plain.add_authority(ROLE_USER);
        repo.insert(&plain).await.unwrap();

        assert_eq!(repo.count_by_authority(ROLE_CONSULTANT).await.unwrap(), 2);
        let page = repo
            .find_all_by_authority(ROLE_CONSULTANT, &Pageable::of(0, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].login, "a");

        assert_eq!(repo.find_all(&Pageable::default()).await.unwrap().total, 3);
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserRepository::new(&mut conn);

        repo.insert(&consultant("dup")).await.unwrap();
        assert!(repo.insert(&consultant("dup")).await.is_err());
    }
}
