use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::TimeUnit;
use crate::error::DbError;

/// A surgical procedure identified by its local code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub local_code: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

/// Offset after a procedure at which a care event falls due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timepoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub value: i32,
    pub unit: TimeUnit,
}

impl Timepoint {
    pub fn is_preoperative(&self) -> bool {
        self.value == 0
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TimepointRow {
    pub id: i64,
    pub name: String,
    pub value: i32,
    pub unit: String,
}

impl TryFrom<TimepointRow> for Timepoint {
    type Error = DbError;

    fn try_from(row: TimepointRow) -> Result<Self, Self::Error> {
        let unit = row.unit.parse().map_err(|_| DbError::InvalidEnum {
            field: "timepoint.unit".to_string(),
            value: row.unit.clone(),
        })?;
        Ok(Timepoint {
            id: Some(row.id),
            name: row.name,
            value: row.value,
            unit,
        })
    }
}
