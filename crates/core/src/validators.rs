//! Entity validators.
//!
//! A [`Validator`] inspects an input and returns every rule it breaks. An empty list means
//! the input is valid. Validators never short-circuit, so callers can report all problems
//! in one response.

use crate::clock::Clock;
use crate::constants::{MAX_POSTCODE_LENGTH, MAX_TEXT_LENGTH, SCHEDULING_GRACE_MINUTES};
use crate::error::FieldError;
use crate::models::{AppointmentInput, PatientInput};
use crate::validation::{
    is_valid_nhs_number, is_valid_postcode, normalise_postcode, parse_duration_to_seconds,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub trait Validator<T>: Send + Sync {
    fn validate(&self, entity: &T) -> Vec<FieldError>;
}

fn check_required_text(field: &str, label: &str, value: &str, failures: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        failures.push(FieldError::new(field, format!("{label} must not be empty.")));
    } else if value.chars().count() > MAX_TEXT_LENGTH {
        failures.push(FieldError::new(
            field,
            format!("{label} must be {MAX_TEXT_LENGTH} characters or fewer."),
        ));
    }
}

fn check_postcode(value: &str, failures: &mut Vec<FieldError>) {
    if !is_valid_postcode(value) {
        failures.push(FieldError::new(
            "postcode",
            "Postcode is not a valid UK postcode.",
        ));
    } else if normalise_postcode(value).chars().count() > MAX_POSTCODE_LENGTH {
        failures.push(FieldError::new(
            "postcode",
            format!("Postcode must be {MAX_POSTCODE_LENGTH} characters or fewer."),
        ));
    }
}

/// Rules for patient create and update.
#[derive(Clone)]
pub struct PatientValidator {
    clock: Arc<dyn Clock>,
}

impl PatientValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Validator<PatientInput> for PatientValidator {
    fn validate(&self, patient: &PatientInput) -> Vec<FieldError> {
        let mut failures = Vec::new();

        check_required_text("name", "Name", &patient.name, &mut failures);

        match patient.date_of_birth {
            None => failures.push(FieldError::new("dateOfBirth", "Date of birth is required.")),
            Some(dob) if dob.with_timezone(&Utc) >= self.clock.now() => failures.push(FieldError::new(
                "dateOfBirth",
                "Date of birth must be in the past.",
            )),
            Some(_) => {}
        }

        if !is_valid_nhs_number(&patient.nhs_number) {
            failures.push(FieldError::new("nhsNumber", "NHS number is not valid."));
        }

        check_postcode(&patient.postcode, &mut failures);

        failures
    }
}

/// Field rules for appointment create and update.
///
/// Whether the referenced patient exists is a store lookup, so the appointment engine
/// checks that itself and merges the result with these failures.
#[derive(Clone)]
pub struct AppointmentValidator {
    clock: Arc<dyn Clock>,
}

impl AppointmentValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Validator<AppointmentInput> for AppointmentValidator {
    fn validate(&self, appointment: &AppointmentInput) -> Vec<FieldError> {
        let mut failures = Vec::new();

        let earliest = self.clock.now() - Duration::minutes(SCHEDULING_GRACE_MINUTES);
        match appointment.scheduled_at {
            None => failures.push(FieldError::new(
                "scheduledAt",
                "Scheduled time is required.",
            )),
            Some(at) if at.with_timezone(&Utc) < earliest => failures.push(FieldError::new(
                "scheduledAt",
                "Appointment must be scheduled now or in the future.",
            )),
            Some(_) => {}
        }

        match parse_duration_to_seconds(&appointment.duration) {
            Ok(0) => failures.push(FieldError::new(
                "duration",
                "Duration must be greater than zero.",
            )),
            Ok(_) => {}
            Err(e) => failures.push(FieldError::new(
                "duration",
                format!("Duration must look like 1h30m ({e})."),
            )),
        }

        check_required_text("clinician", "Clinician", &appointment.clinician, &mut failures);
        check_required_text("department", "Department", &appointment.department, &mut failures);
        check_postcode(&appointment.postcode, &mut failures);

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 7, 21, 12, 0, 0).unwrap(),
        ))
    }

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).expect("test timestamp should parse")
    }

    fn fields(failures: &[FieldError]) -> Vec<&str> {
        failures.iter().map(|f| f.field.as_str()).collect()
    }

    fn valid_patient() -> PatientInput {
        PatientInput {
            name: "Ada Lovelace".into(),
            date_of_birth: Some(at("1990-01-15T00:00:00+00:00")),
            nhs_number: "1373645350".into(),
            postcode: "EC1A 1BB".into(),
        }
    }

    fn valid_appointment() -> AppointmentInput {
        AppointmentInput {
            patient_id: Some(uuid::Uuid::new_v4()),
            status: None,
            scheduled_at: Some(at("2025-07-22T09:00:00+01:00")),
            duration: "1h30m".into(),
            attended: false,
            clinician: "Dr Jekyll".into(),
            department: "Cardiology".into(),
            postcode: "M1 1AE".into(),
        }
    }

    #[test]
    fn test_valid_patient_has_no_failures() {
        let validator = PatientValidator::new(clock());
        assert!(validator.validate(&valid_patient()).is_empty());
    }

    #[test]
    fn test_patient_reports_every_failure() {
        let validator = PatientValidator::new(clock());
        let patient = PatientInput {
            name: "   ".into(),
            date_of_birth: Some(at("2030-01-01T00:00:00+00:00")),
            nhs_number: "1373645351".into(),
            postcode: "123456".into(),
        };

        let failures = validator.validate(&patient);
        assert_eq!(
            fields(&failures),
            vec!["name", "dateOfBirth", "nhsNumber", "postcode"]
        );
    }

    #[test]
    fn test_patient_missing_fields_are_reported() {
        let validator = PatientValidator::new(clock());
        let failures = validator.validate(&PatientInput::default());
        assert_eq!(
            fields(&failures),
            vec!["name", "dateOfBirth", "nhsNumber", "postcode"]
        );
    }

    #[test]
    fn test_patient_name_length_limit() {
        let validator = PatientValidator::new(clock());
        let mut patient = valid_patient();

        patient.name = "é".repeat(MAX_TEXT_LENGTH);
        assert!(validator.validate(&patient).is_empty());

        patient.name = "é".repeat(MAX_TEXT_LENGTH + 1);
        assert_eq!(fields(&validator.validate(&patient)), vec!["name"]);
    }

    #[test]
    fn test_date_of_birth_equal_to_now_is_rejected() {
        let clock = clock();
        let validator = PatientValidator::new(clock.clone());
        let mut patient = valid_patient();
        patient.date_of_birth = Some(clock.now().fixed_offset());

        assert_eq!(fields(&validator.validate(&patient)), vec!["dateOfBirth"]);
    }

    #[test]
    fn test_valid_appointment_has_no_failures() {
        let validator = AppointmentValidator::new(clock());
        assert!(validator.validate(&valid_appointment()).is_empty());
    }

    #[test]
    fn test_appointment_grace_window() {
        let clock = clock();
        let validator = AppointmentValidator::new(clock.clone());
        let mut appointment = valid_appointment();

        appointment.scheduled_at = Some((clock.now() - Duration::minutes(4)).fixed_offset());
        assert!(validator.validate(&appointment).is_empty());

        appointment.scheduled_at = Some((clock.now() - Duration::minutes(5)).fixed_offset());
        assert!(validator.validate(&appointment).is_empty());

        appointment.scheduled_at = Some((clock.now() - Duration::minutes(6)).fixed_offset());
        assert_eq!(fields(&validator.validate(&appointment)), vec!["scheduledAt"]);
    }

    #[test]
    fn test_appointment_duration_rules() {
        let validator = AppointmentValidator::new(clock());
        let mut appointment = valid_appointment();

        appointment.duration = "0h0m".into();
        assert_eq!(fields(&validator.validate(&appointment)), vec!["duration"]);

        appointment.duration = "1hour".into();
        let failures = validator.validate(&appointment);
        assert_eq!(fields(&failures), vec!["duration"]);
        assert!(failures[0].message.contains("unexpected character 'o'"));
    }

    #[test]
    fn test_appointment_reports_every_failure() {
        let validator = AppointmentValidator::new(clock());
        let failures = validator.validate(&AppointmentInput::default());
        assert_eq!(
            fields(&failures),
            vec!["scheduledAt", "duration", "clinician", "department", "postcode"]
        );
    }
}
