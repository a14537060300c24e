use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_CONSULTANT: &str = "ROLE_CONSULTANT";

pub const DEFAULT_LANGUAGE: &str = "en";

/// A login identity. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub login: String,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub activated: bool,
    pub lang_key: String,
    #[serde(skip)]
    pub reset_key: Option<String>,
    pub reset_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            id: None,
            login: login.into().to_lowercase(),
            title: None,
            first_name: None,
            last_name: None,
            email: None,
            password_hash: String::new(),
            activated: false,
            lang_key: DEFAULT_LANGUAGE.to_string(),
            reset_key: None,
            reset_date: None,
            authorities: Vec::new(),
        }
    }

    pub fn add_authority(&mut self, authority: impl Into<String>) {
        let authority = authority.into();
        if !self.authorities.contains(&authority) {
            self.authorities.push(authority);
        }
    }
}
