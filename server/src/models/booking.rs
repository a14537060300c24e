use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::EventType;
use crate::error::DbError;

/// A booked procedure for a patient. Saving one creates its follow-up plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureBooking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub consultant_name: String,
    pub hospital_site: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub performed_date: Option<DateTime<Utc>>,
    pub primary_procedure: String,
    pub other_procedures: Option<String>,
    #[serde(default)]
    pub patient_id: Option<i64>,
    /// Read-only; derived from the plan that references this booking.
    #[serde(default)]
    pub followup_plan_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FollowupPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub procedure_booking_id: i64,
    pub patient_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timepoint_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub followup_plan_id: Option<i64>,
}

#[derive(Debug, FromRow)]
pub(crate) struct CareEventRow {
    pub id: i64,
    pub event_type: String,
    pub timepoint_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub followup_plan_id: Option<i64>,
}

impl TryFrom<CareEventRow> for CareEvent {
    type Error = DbError;

    fn try_from(row: CareEventRow) -> Result<Self, Self::Error> {
        let event_type = row.event_type.parse().map_err(|_| DbError::InvalidEnum {
            field: "care_event.event_type".to_string(),
            value: row.event_type.clone(),
        })?;
        Ok(CareEvent {
            id: Some(row.id),
            event_type,
            timepoint_id: row.timepoint_id,
            patient_id: row.patient_id,
            followup_plan_id: row.followup_plan_id,
        })
    }
}
