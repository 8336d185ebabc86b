//! Patient lifecycle engine.
//!
//! Plain CRUD behind a validation gate. NHS numbers are stored without spaces and postcodes
//! without surrounding whitespace. NHS-number uniqueness is enforced by the store on that
//! stored form and surfaces here as a validation failure on `nhsNumber`.

use crate::clock::Clock;
use crate::error::{PandaError, PandaResult};
use crate::models::{Patient, PatientInput};
use crate::repositories::{PatientRepository, StoreError};
use crate::validation::{normalise_nhs_number, normalise_postcode};
use crate::validators::{PatientValidator, Validator};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientRepository>,
    validator: Arc<dyn Validator<PatientInput>>,
}

impl PatientService {
    /// Creates a service using the standard [`PatientValidator`].
    pub fn new(store: Arc<dyn PatientRepository>, clock: Arc<dyn Clock>) -> Self {
        Self::with_validator(store, Arc::new(PatientValidator::new(clock)))
    }

    pub fn with_validator(
        store: Arc<dyn PatientRepository>,
        validator: Arc<dyn Validator<PatientInput>>,
    ) -> Self {
        Self { store, validator }
    }

    pub fn get_all(&self) -> PandaResult<Vec<Patient>> {
        Ok(self.store.get_all()?)
    }

    pub fn get_by_id(&self, id: Uuid) -> PandaResult<Option<Patient>> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Validates `input` and stores it as a new patient with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`PandaError::Validation`] listing every broken rule, or if the NHS number
    /// is already registered.
    pub fn create(&self, input: PatientInput) -> PandaResult<Patient> {
        let date_of_birth = self.validate(&input)?;

        let patient = Patient {
            id: Uuid::new_v4(),
            name: input.name,
            date_of_birth,
            nhs_number: normalise_nhs_number(&input.nhs_number),
            postcode: normalise_postcode(&input.postcode),
        };

        let created = self.store.add(patient)?;
        tracing::info!(patient_id = %created.id, "created patient");
        Ok(created)
    }

    /// Replaces every mutable field of patient `id`.
    ///
    /// Returns `Ok(None)` if there is no such patient.
    pub fn update(&self, id: Uuid, input: PatientInput) -> PandaResult<Option<Patient>> {
        let date_of_birth = self.validate(&input)?;

        let Some(mut existing) = self.store.get_by_id(id)? else {
            tracing::warn!(patient_id = %id, "attempted to update non-existent patient");
            return Ok(None);
        };

        existing.name = input.name;
        existing.date_of_birth = date_of_birth;
        existing.nhs_number = normalise_nhs_number(&input.nhs_number);
        existing.postcode = normalise_postcode(&input.postcode);

        match self.store.update(&existing) {
            Err(StoreError::NotFound { .. }) => return Ok(None),
            result => result?,
        }

        tracing::info!(patient_id = %existing.id, "updated patient");
        Ok(Some(existing))
    }

    /// Permanently removes patient `id`. Returns `false` if there is no such patient.
    pub fn delete(&self, id: Uuid) -> PandaResult<bool> {
        let Some(existing) = self.store.get_by_id(id)? else {
            return Ok(false);
        };

        match self.store.delete(&existing) {
            Err(StoreError::NotFound { .. }) => return Ok(false),
            result => result?,
        }

        tracing::info!(patient_id = %id, "deleted patient");
        Ok(true)
    }

    fn validate(&self, input: &PatientInput) -> PandaResult<DateTime<FixedOffset>> {
        let failures = self.validator.validate(input);
        if !failures.is_empty() {
            return Err(PandaError::Validation(failures));
        }
        input
            .date_of_birth
            .ok_or_else(|| PandaError::invalid("dateOfBirth", "Date of birth is required."))
    }
}
