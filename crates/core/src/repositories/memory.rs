//! In-memory store.
//!
//! Mirrors the SQLite store's constraints (unique NHS number, no orphan appointments,
//! cascading patient delete) so tests written against it hold for production too.
//! Records are kept in insertion order.

use super::{AppointmentRepository, PatientRepository, StoreError, StoreResult};
use crate::models::{Appointment, Patient};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Tables {
    fn nhs_number_taken(&self, nhs_number: &str, except: Uuid) -> bool {
        self.patients
            .iter()
            .any(|p| p.id != except && p.nhs_number == nhs_number)
    }
}

impl PatientRepository for InMemoryStore {
    fn get_all(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.read()?.patients.clone())
    }

    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.read()?.patients.iter().find(|p| p.id == id).cloned())
    }

    fn add(&self, patient: Patient) -> StoreResult<Patient> {
        let mut tables = self.write()?;
        if tables.nhs_number_taken(&patient.nhs_number, patient.id) {
            return Err(StoreError::DuplicateNhsNumber(patient.nhs_number));
        }
        tables.patients.push(patient.clone());
        Ok(patient)
    }

    fn update(&self, patient: &Patient) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.nhs_number_taken(&patient.nhs_number, patient.id) {
            return Err(StoreError::DuplicateNhsNumber(patient.nhs_number.clone()));
        }
        let slot = tables
            .patients
            .iter_mut()
            .find(|p| p.id == patient.id)
            .ok_or(StoreError::NotFound {
                entity: "patient",
                id: patient.id,
            })?;
        *slot = patient.clone();
        Ok(())
    }

    fn delete(&self, patient: &Patient) -> StoreResult<()> {
        let mut tables = self.write()?;
        let before = tables.patients.len();
        tables.patients.retain(|p| p.id != patient.id);
        if tables.patients.len() == before {
            return Err(StoreError::NotFound {
                entity: "patient",
                id: patient.id,
            });
        }
        tables.appointments.retain(|a| a.patient_id != patient.id);
        Ok(())
    }
}

impl AppointmentRepository for InMemoryStore {
    fn get_all(&self) -> StoreResult<Vec<Appointment>> {
        Ok(self.read()?.appointments.clone())
    }

    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.read()?.appointments.iter().find(|a| a.id == id).cloned())
    }

    fn add(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let mut tables = self.write()?;
        if !tables.patients.iter().any(|p| p.id == appointment.patient_id) {
            return Err(StoreError::UnknownPatient(appointment.patient_id));
        }
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    fn update(&self, appointment: &Appointment) -> StoreResult<()> {
        let mut tables = self.write()?;
        let slot = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or(StoreError::NotFound {
                entity: "appointment",
                id: appointment.id,
            })?;
        let patient_id = slot.patient_id;
        *slot = Appointment {
            patient_id,
            ..appointment.clone()
        };
        Ok(())
    }

    fn delete(&self, appointment: &Appointment) -> StoreResult<()> {
        let mut tables = self.write()?;
        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != appointment.id);
        if tables.appointments.len() == before {
            return Err(StoreError::NotFound {
                entity: "appointment",
                id: appointment.id,
            });
        }
        Ok(())
    }

    fn query(&self) -> StoreResult<Box<dyn Iterator<Item = Appointment> + Send>> {
        Ok(Box::new(self.read()?.appointments.clone().into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::contract;

    #[test]
    fn test_patients_round_trip() {
        contract::patients_round_trip(&InMemoryStore::new());
    }

    #[test]
    fn test_duplicate_nhs_number_is_rejected() {
        contract::duplicate_nhs_number_is_rejected(&InMemoryStore::new());
    }

    #[test]
    fn test_missing_records_are_not_found() {
        contract::missing_records_are_not_found(&InMemoryStore::new());
    }

    #[test]
    fn test_appointments_round_trip() {
        contract::appointments_round_trip(&InMemoryStore::new());
    }

    #[test]
    fn test_appointment_requires_existing_patient() {
        contract::appointment_requires_existing_patient(&InMemoryStore::new());
    }

    #[test]
    fn test_deleting_patient_cascades() {
        contract::deleting_patient_cascades(&InMemoryStore::new());
    }
}
