//! Persistence contracts and their implementations.
//!
//! The engines only see the [`PatientRepository`] and [`AppointmentRepository`] traits:
//! - [`sqlite::SqliteStore`] is the production store
//! - [`memory::InMemoryStore`] is a fake with the same constraints, used by tests
//!
//! Both stores enforce NHS-number uniqueness, reject appointments for unknown patients and
//! delete a patient's appointments along with the patient.

pub mod memory;
pub mod sqlite;

use crate::models::{Appointment, Patient};
use uuid::Uuid;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("NHS number {0} is already registered")]
    DuplicateNhsNumber(String),
    #[error("patient {0} does not exist")]
    UnknownPatient(Uuid),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait PatientRepository: Send + Sync {
    fn get_all(&self) -> StoreResult<Vec<Patient>>;
    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    fn add(&self, patient: Patient) -> StoreResult<Patient>;
    /// Replaces the stored record with the same id. Fails with `NotFound` if there is none.
    fn update(&self, patient: &Patient) -> StoreResult<()>;
    fn delete(&self, patient: &Patient) -> StoreResult<()>;
}

pub trait AppointmentRepository: Send + Sync {
    fn get_all(&self) -> StoreResult<Vec<Appointment>>;
    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    fn add(&self, appointment: Appointment) -> StoreResult<Appointment>;
    /// Replaces the stored record with the same id. Fails with `NotFound` if there is none.
    fn update(&self, appointment: &Appointment) -> StoreResult<()>;
    fn delete(&self, appointment: &Appointment) -> StoreResult<()>;
    /// Every stored appointment, unfiltered, as persisted.
    fn query(&self) -> StoreResult<Box<dyn Iterator<Item = Appointment> + Send>>;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every store must share, run against each implementation.

    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::DateTime;

    pub fn patient(nhs_number: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            date_of_birth: DateTime::parse_from_rfc3339("1990-01-15T08:30:00+02:00").unwrap(),
            nhs_number: nhs_number.into(),
            postcode: "EC1A 1BB".into(),
        }
    }

    pub fn appointment(patient_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            status: AppointmentStatus::Scheduled,
            scheduled_at: DateTime::parse_from_rfc3339("2025-07-22T09:00:00+01:00").unwrap(),
            duration: "1h30m".into(),
            attended: false,
            clinician: "Dr Jekyll".into(),
            department: "Cardiology".into(),
            postcode: "M1 1AE".into(),
        }
    }

    pub fn patients_round_trip<S: PatientRepository>(store: &S) {
        let ada = patient("1373645350");
        let added = store.add(ada.clone()).expect("add should succeed");
        assert_eq!(added, ada);

        let fetched = store
            .get_by_id(ada.id)
            .expect("get_by_id should succeed")
            .expect("patient should exist");
        assert_eq!(fetched, ada, "offset and every field should survive storage");

        let mut renamed = ada.clone();
        renamed.name = "Augusta Ada King".into();
        store.update(&renamed).expect("update should succeed");
        assert_eq!(
            store.get_by_id(ada.id).expect("get_by_id should succeed"),
            Some(renamed.clone())
        );

        assert_eq!(store.get_all().expect("get_all should succeed"), vec![renamed.clone()]);

        store.delete(&renamed).expect("delete should succeed");
        assert_eq!(store.get_by_id(ada.id).expect("get_by_id should succeed"), None);
    }

    pub fn duplicate_nhs_number_is_rejected<S: PatientRepository>(store: &S) {
        store.add(patient("1373645350")).expect("first add should succeed");

        let err = store
            .add(patient("1373645350"))
            .expect_err("second add with the same NHS number should fail");
        assert!(matches!(err, StoreError::DuplicateNhsNumber(ref n) if n == "1373645350"));

        let other = store.add(patient("9434765919")).expect("add should succeed");
        let mut clash = other.clone();
        clash.nhs_number = "1373645350".into();
        let err = store.update(&clash).expect_err("update into a clash should fail");
        assert!(matches!(err, StoreError::DuplicateNhsNumber(_)));
    }

    pub fn missing_records_are_not_found<S: PatientRepository + AppointmentRepository>(store: &S) {
        let ghost = patient("1373645350");
        assert!(matches!(
            PatientRepository::update(store, &ghost),
            Err(StoreError::NotFound { entity: "patient", .. })
        ));
        assert!(matches!(
            PatientRepository::delete(store, &ghost),
            Err(StoreError::NotFound { entity: "patient", .. })
        ));

        let ghost_appointment = appointment(ghost.id);
        assert!(matches!(
            AppointmentRepository::update(store, &ghost_appointment),
            Err(StoreError::NotFound { entity: "appointment", .. })
        ));
    }

    pub fn appointments_round_trip<S: PatientRepository + AppointmentRepository>(store: &S) {
        let owner = PatientRepository::add(store, patient("1373645350")).expect("add should succeed");
        let booked = appointment(owner.id);
        AppointmentRepository::add(store, booked.clone()).expect("add should succeed");

        let mut changed = booked.clone();
        changed.status = AppointmentStatus::Missed;
        changed.attended = false;
        changed.duration = "45m".into();
        AppointmentRepository::update(store, &changed).expect("update should succeed");

        assert_eq!(
            AppointmentRepository::get_by_id(store, booked.id).expect("get_by_id should succeed"),
            Some(changed.clone())
        );
        assert_eq!(
            store.query().expect("query should succeed").collect::<Vec<_>>(),
            vec![changed]
        );
    }

    pub fn appointment_requires_existing_patient<S: AppointmentRepository>(store: &S) {
        let orphan = appointment(Uuid::new_v4());
        let err = store.add(orphan.clone()).expect_err("orphan appointment should be rejected");
        assert!(matches!(err, StoreError::UnknownPatient(id) if id == orphan.patient_id));
    }

    pub fn deleting_patient_cascades<S: PatientRepository + AppointmentRepository>(store: &S) {
        let owner = PatientRepository::add(store, patient("1373645350")).expect("add should succeed");
        let other = PatientRepository::add(store, patient("9434765919")).expect("add should succeed");
        AppointmentRepository::add(store, appointment(owner.id)).expect("add should succeed");
        AppointmentRepository::add(store, appointment(owner.id)).expect("add should succeed");
        let kept = AppointmentRepository::add(store, appointment(other.id)).expect("add should succeed");

        PatientRepository::delete(store, &owner).expect("delete should succeed");

        let remaining: Vec<_> = AppointmentRepository::get_all(store).expect("get_all should succeed");
        assert_eq!(remaining, vec![kept]);
    }
}
