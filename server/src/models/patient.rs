use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::GenderType;
use crate::error::DbError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub given_name: String,
    pub family_name: String,
    pub birth_date: DateTime<Utc>,
    pub gender: GenderType,
    pub nhs_number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub street: Option<String>,
    #[serde(default)]
    pub lines: Vec<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<i64>,
}

impl Address {
    pub fn with_street(street: impl Into<String>) -> Self {
        Self {
            street: Some(street.into()),
            ..Self::default()
        }
    }

    pub fn add_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PatientRow {
    pub id: i64,
    pub given_name: String,
    pub family_name: String,
    pub birth_date: DateTime<Utc>,
    pub gender: String,
    pub nhs_number: i64,
    pub email: Option<String>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row.gender.parse().map_err(|_| DbError::InvalidEnum {
            field: "patient.gender".to_string(),
            value: row.gender.clone(),
        })?;

        Ok(Patient {
            id: Some(row.id),
            given_name: row.given_name,
            family_name: row.family_name,
            birth_date: row.birth_date,
            gender,
            nhs_number: row.nhs_number,
            email: row.email,
            addresses: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AddressRow {
    pub id: i64,
    pub street: Option<String>,
    pub lines: String,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub patient_id: i64,
}

impl TryFrom<AddressRow> for Address {
    type Error = DbError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let lines: Vec<String> = serde_json::from_str(&row.lines)?;
        Ok(Address {
            id: Some(row.id),
            street: row.street,
            lines,
            city: row.city,
            county: row.county,
            postal_code: row.postal_code,
            country: row.country,
            patient_id: Some(row.patient_id),
        })
    }
}
