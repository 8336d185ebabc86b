//! Appointment lifecycle engine.
//!
//! Owns the create/update/cancel rules, the write-back of derived missed status on read,
//! and the missed-impact report. State rules themselves live in [`crate::lifecycle`].
//!
//! ## Consistency
//!
//! Every read-check-write sequence (update, cancel, missed write-back) runs under one
//! in-process write gate. A cancel can therefore never be overwritten by a concurrent
//! update or by a stale missed write-back.

use crate::clock::Clock;
use crate::error::{FieldError, PandaError, PandaResult};
use crate::lifecycle;
use crate::models::{Appointment, AppointmentInput, AppointmentStatus, MissedAppointmentSummary};
use crate::repositories::{AppointmentRepository, PatientRepository, StoreError};
use crate::validation::normalise_postcode;
use crate::validators::{AppointmentValidator, Validator};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppointmentService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<dyn PatientRepository>,
    validator: Arc<dyn Validator<AppointmentInput>>,
    clock: Arc<dyn Clock>,
    write_gate: Arc<Mutex<()>>,
}

impl AppointmentService {
    /// Creates a service using the standard [`AppointmentValidator`].
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let validator = Arc::new(AppointmentValidator::new(clock.clone()));
        Self::with_validator(appointments, patients, validator, clock)
    }

    pub fn with_validator(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientRepository>,
        validator: Arc<dyn Validator<AppointmentInput>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            patients,
            validator,
            clock,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The gate guards no data, so a poisoned lock is still safe to reuse.
        self.write_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists every appointment, marking and persisting any that are now missed.
    pub fn get_all(&self) -> PandaResult<Vec<Appointment>> {
        let now = self.clock.now();
        let _gate = self.lock_writes();

        let mut appointments = self.appointments.get_all()?;
        for appointment in &mut appointments {
            self.refresh_missed(appointment, now)?;
        }
        Ok(appointments)
    }

    /// Fetches one appointment, marking and persisting it as missed if it is overdue.
    pub fn get_by_id(&self, id: Uuid) -> PandaResult<Option<Appointment>> {
        let now = self.clock.now();
        let _gate = self.lock_writes();

        let Some(mut appointment) = self.appointments.get_by_id(id)? else {
            return Ok(None);
        };
        self.refresh_missed(&mut appointment, now)?;
        Ok(Some(appointment))
    }

    /// Books a new appointment. It always starts `scheduled`, whatever status was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`PandaError::Validation`] listing every broken field rule, including a
    /// missing or unknown `patientId`.
    pub fn create(&self, input: AppointmentInput) -> PandaResult<Appointment> {
        let mut failures = self.validator.validate(&input);

        match input.patient_id {
            None => failures.push(FieldError::new("patientId", "Patient is required.")),
            Some(id) if self.patients.get_by_id(id)?.is_none() => {
                failures.push(FieldError::new("patientId", "Patient does not exist."))
            }
            Some(_) => {}
        }

        if !failures.is_empty() {
            return Err(PandaError::Validation(failures));
        }

        let patient_id = input
            .patient_id
            .ok_or_else(|| PandaError::invalid("patientId", "Patient is required."))?;
        let scheduled_at = input
            .scheduled_at
            .ok_or_else(|| PandaError::invalid("scheduledAt", "Scheduled time is required."))?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            status: AppointmentStatus::Scheduled,
            scheduled_at,
            duration: input.duration,
            attended: input.attended,
            clinician: input.clinician,
            department: input.department,
            postcode: normalise_postcode(&input.postcode),
        };

        let created = self.appointments.add(appointment)?;
        tracing::info!(
            appointment_id = %created.id,
            patient_id = %created.patient_id,
            "created appointment"
        );
        Ok(created)
    }

    /// Replaces the mutable fields of appointment `id`.
    ///
    /// `patientId` and `status` on the input are ignored. Setting `attended` moves the
    /// appointment to `attended`.
    ///
    /// Returns `Ok(None)` if there is no such appointment.
    ///
    /// # Errors
    ///
    /// Returns [`PandaError::Validation`] if the input breaks a rule or the appointment
    /// has been cancelled. Nothing is written in either case.
    pub fn update(&self, id: Uuid, input: AppointmentInput) -> PandaResult<Option<Appointment>> {
        let failures = self.validator.validate(&input);
        if !failures.is_empty() {
            return Err(PandaError::Validation(failures));
        }
        let scheduled_at = input
            .scheduled_at
            .ok_or_else(|| PandaError::invalid("scheduledAt", "Scheduled time is required."))?;

        let _gate = self.lock_writes();

        let Some(mut existing) = self.appointments.get_by_id(id)? else {
            tracing::warn!(appointment_id = %id, "attempted to update non-existent appointment");
            return Ok(None);
        };

        if existing.status == AppointmentStatus::Cancelled {
            return Err(PandaError::invalid(
                "status",
                "Cannot update a cancelled appointment.",
            ));
        }

        existing.scheduled_at = scheduled_at;
        existing.duration = input.duration;
        existing.department = input.department;
        existing.clinician = input.clinician;
        existing.attended = input.attended;
        existing.postcode = normalise_postcode(&input.postcode);
        if existing.attended {
            existing.status = AppointmentStatus::Attended;
        }

        match self.appointments.update(&existing) {
            Err(StoreError::NotFound { .. }) => return Ok(None),
            result => result?,
        }

        tracing::info!(appointment_id = %existing.id, status = %existing.status, "updated appointment");
        Ok(Some(existing))
    }

    /// Cancels appointment `id`.
    ///
    /// Returns `false` without writing if the appointment does not exist or is already
    /// cancelled.
    pub fn cancel(&self, id: Uuid) -> PandaResult<bool> {
        let _gate = self.lock_writes();

        let mut existing = match self.appointments.get_by_id(id)? {
            Some(a) if a.status != AppointmentStatus::Cancelled => a,
            Some(_) => {
                tracing::warn!(appointment_id = %id, "appointment already cancelled");
                return Ok(false);
            }
            None => {
                tracing::warn!(appointment_id = %id, "attempted to cancel non-existent appointment");
                return Ok(false);
            }
        };

        existing.status = AppointmentStatus::Cancelled;
        match self.appointments.update(&existing) {
            Err(StoreError::NotFound { .. }) => return Ok(false),
            result => result?,
        }

        tracing::info!(appointment_id = %id, "cancelled appointment");
        Ok(true)
    }

    /// Missed appointments per clinician and department, most recent miss first.
    ///
    /// Re-derives missed status from the clock, so appointments that became overdue since
    /// they were last read are included. Nothing is written.
    pub fn get_missed_impact(&self) -> PandaResult<Vec<MissedAppointmentSummary>> {
        let now = self.clock.now();
        Ok(lifecycle::summarise_missed(self.appointments.query()?, now))
    }

    /// Applies missed derivation and writes the change back. Caller must hold the write gate.
    fn refresh_missed(&self, appointment: &mut Appointment, now: DateTime<Utc>) -> PandaResult<()> {
        match lifecycle::derive_missed(appointment, now) {
            Ok(true) => {
                tracing::debug!(appointment_id = %appointment.id, "marking appointment as missed");
                self.appointments.update(appointment)?;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    duration = %appointment.duration,
                    error = %e,
                    "cannot derive missed status from malformed duration"
                );
            }
        }
        Ok(())
    }
}
