//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Request bodies accept `null` or a missing key for
//! every field so that validation, not deserialisation, reports what is missing.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: DateTime<FixedOffset>,
    pub nhs_number: String,
    pub postcode: String,
}

/// Body for creating or replacing a patient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientReq {
    pub name: Option<String>,
    pub date_of_birth: Option<DateTime<FixedOffset>>,
    pub nhs_number: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatusDto {
    Scheduled,
    Attended,
    Missed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatusDto,
    pub scheduled_at: DateTime<FixedOffset>,
    /// Compact duration such as `1h30m`.
    pub duration: String,
    pub attended: bool,
    pub clinician: String,
    pub department: String,
    pub postcode: String,
}

/// Body for booking an appointment. Any supplied `status` is ignored; new bookings are
/// always `scheduled`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAppointmentReq {
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatusDto>,
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    pub duration: Option<String>,
    pub attended: Option<bool>,
    pub clinician: Option<String>,
    pub department: Option<String>,
    pub postcode: Option<String>,
}

/// Body for changing an appointment. The patient cannot be changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAppointmentReq {
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    pub duration: Option<String>,
    pub attended: Option<bool>,
    pub clinician: Option<String>,
    pub department: Option<String>,
    pub postcode: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MissedAppointmentSummaryDto {
    pub clinician: String,
    pub department: String,
    pub missed_count: u64,
    pub total_seconds_missed: u64,
    pub most_recent_missed: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorItem {
    pub field: String,
    pub message: String,
}

/// 400 body listing every failed rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorRes {
    pub errors: Vec<ValidationErrorItem>,
}

/// Body for 404 and 500 responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requests_accept_nulls_and_missing_fields() {
        let req: CreateAppointmentReq = serde_json::from_value(json!({
            "patientId": null,
            "clinician": "Dr Jekyll",
        }))
        .expect("deserialise should succeed");

        assert_eq!(req.patient_id, None);
        assert_eq!(req.clinician.as_deref(), Some("Dr Jekyll"));
        assert_eq!(req.scheduled_at, None);
    }

    #[test]
    fn test_appointment_serialises_camel_case() {
        let dto = AppointmentDto {
            id: Uuid::nil(),
            patient_id: Uuid::nil(),
            status: AppointmentStatusDto::Missed,
            scheduled_at: DateTime::parse_from_rfc3339("2025-07-21T09:30:00+01:00").unwrap(),
            duration: "1h".into(),
            attended: false,
            clinician: "Dr Jekyll".into(),
            department: "Cardiology".into(),
            postcode: "M1 1AE".into(),
        };

        let value = serde_json::to_value(&dto).expect("serialise should succeed");
        assert_eq!(value["patientId"], json!(Uuid::nil()));
        assert_eq!(value["status"], json!("missed"));
        assert_eq!(value["scheduledAt"], json!("2025-07-21T09:30:00+01:00"));
    }
}
