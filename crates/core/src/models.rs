//! Domain records held by the stores and returned by the engines.
//!
//! `*Input` types are what callers hand to the engines. They are deliberately loose
//! (missing dates are `None`, missing text is empty) so that validation can report every
//! missing or malformed field at once instead of failing at deserialisation.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    /// Full name, stored exactly as given.
    pub name: String,
    pub date_of_birth: DateTime<FixedOffset>,
    pub nhs_number: String,
    pub postcode: String,
}

/// Caller-supplied patient fields for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInput {
    pub name: String,
    pub date_of_birth: Option<DateTime<FixedOffset>>,
    pub nhs_number: String,
    pub postcode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Attended,
    Missed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Attended => "attended",
            Self::Missed => "missed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown appointment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "attended" => Ok(Self::Attended),
            "missed" => Ok(Self::Missed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
    pub scheduled_at: DateTime<FixedOffset>,
    /// Compact duration such as `1h30m`, kept as entered.
    pub duration: String,
    pub attended: bool,
    pub clinician: String,
    pub department: String,
    pub postcode: String,
}

/// Caller-supplied appointment fields for create and update.
///
/// `status` is accepted for wire compatibility but never applied: creation always starts
/// at `scheduled` and later states are reached through attendance, cancellation or
/// missed derivation. `patient_id` is only read on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentInput {
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    pub duration: String,
    pub attended: bool,
    pub clinician: String,
    pub department: String,
    pub postcode: String,
}

/// Missed appointments rolled up per clinician and department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedAppointmentSummary {
    pub clinician: String,
    pub department: String,
    pub missed_count: u64,
    pub total_seconds_missed: u64,
    pub most_recent_missed: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Attended,
            AppointmentStatus::Missed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
        }
        assert_eq!(
            "Scheduled".parse::<AppointmentStatus>(),
            Err(UnknownStatus("Scheduled".into()))
        );
    }

    #[test]
    fn test_appointment_input_defaults_missing_fields() {
        let input: AppointmentInput =
            serde_json::from_str(r#"{"clinician":"Dr Who","status":"attended"}"#)
                .expect("partial input should deserialise");

        assert_eq!(input.clinician, "Dr Who");
        assert_eq!(input.status, Some(AppointmentStatus::Attended));
        assert_eq!(input.patient_id, None);
        assert_eq!(input.scheduled_at, None);
        assert!(input.duration.is_empty());
        assert!(!input.attended);
    }

    #[test]
    fn test_patient_serialises_camel_case() {
        let patient = Patient {
            id: Uuid::nil(),
            name: "Ada Lovelace".into(),
            date_of_birth: DateTime::parse_from_rfc3339("1990-01-15T00:00:00+01:00").unwrap(),
            nhs_number: "1373645350".into(),
            postcode: "EC1A 1BB".into(),
        };

        let json = serde_json::to_value(&patient).expect("patient should serialise");
        assert_eq!(json["nhsNumber"], "1373645350");
        assert_eq!(json["dateOfBirth"], "1990-01-15T00:00:00+01:00");
    }
}
