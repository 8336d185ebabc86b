//! SQLite-backed store.
//!
//! One connection serves both tables and is guarded by a mutex, so every statement is
//! serialised. The schema is created on open.
//!
//! Timestamps are stored as RFC 3339 text so the caller's UTC offset survives a round trip.

use super::{
    AppointmentRepository, PatientRepository, StoreError, StoreResult,
};
use crate::config::CoreConfig;
use crate::constants::IN_MEMORY_DATABASE_PATH;
use crate::models::{Appointment, AppointmentStatus, Patient};
use chrono::DateTime;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    nhs_number TEXT NOT NULL,
    postcode TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_nhs_number ON patients(nhs_number);

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY NOT NULL,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    status TEXT NOT NULL CHECK (status IN ('scheduled', 'attended', 'missed', 'cancelled')),
    scheduled_at TEXT NOT NULL,
    duration TEXT NOT NULL,
    attended INTEGER NOT NULL DEFAULT 0,
    clinician TEXT NOT NULL,
    department TEXT NOT NULL,
    postcode TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
"#;

const PATIENT_COLUMNS: &str = "id, name, date_of_birth, nhs_number, postcode";
const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, status, scheduled_at, duration, attended, clinician, department, postcode";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `path`, creating it and its schema if needed.
    ///
    /// `:memory:` opens a private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if path.as_ref() == Path::new(IN_MEMORY_DATABASE_PATH) {
            return Self::open_in_memory();
        }
        Self::initialise(Connection::open(path)?)
    }

    /// Open the database named by the configuration.
    pub fn from_config(cfg: &CoreConfig) -> StoreResult<Self> {
        Self::open(cfg.database_path())
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialise(Connection::open_in_memory()?)
    }

    fn initialise(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn parse_text<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: parse_text(row, 0, Uuid::parse_str)?,
        name: row.get(1)?,
        date_of_birth: parse_text(row, 2, DateTime::parse_from_rfc3339)?,
        nhs_number: row.get(3)?,
        postcode: row.get(4)?,
    })
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_text(row, 0, Uuid::parse_str)?,
        patient_id: parse_text(row, 1, Uuid::parse_str)?,
        status: parse_text(row, 2, str::parse::<AppointmentStatus>)?,
        scheduled_at: parse_text(row, 3, DateTime::parse_from_rfc3339)?,
        duration: row.get(4)?,
        attended: row.get(5)?,
        clinician: row.get(6)?,
        department: row.get(7)?,
        postcode: row.get(8)?,
    })
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn patient_write_error(err: rusqlite::Error, patient: &Patient) -> StoreError {
    match constraint_code(&err) {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            StoreError::DuplicateNhsNumber(patient.nhs_number.clone())
        }
        _ => err.into(),
    }
}

fn appointment_write_error(err: rusqlite::Error, appointment: &Appointment) -> StoreError {
    match constraint_code(&err) {
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            StoreError::UnknownPatient(appointment.patient_id)
        }
        _ => err.into(),
    }
}

fn not_found(entity: &'static str, id: Uuid) -> StoreError {
    StoreError::NotFound { entity, id }
}

impl PatientRepository for SqliteStore {
    fn get_all(&self) -> StoreResult<Vec<Patient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY rowid"
        ))?;
        let patients = stmt
            .query_map([], patient_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(patients)
    }

    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            [id.to_string()],
            patient_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn add(&self, patient: Patient) -> StoreResult<Patient> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO patients (id, name, date_of_birth, nhs_number, postcode)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                patient.id.to_string(),
                patient.name,
                patient.date_of_birth.to_rfc3339(),
                patient.nhs_number,
                patient.postcode,
            ],
        )
        .map_err(|e| patient_write_error(e, &patient))?;
        Ok(patient)
    }

    fn update(&self, patient: &Patient) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute(
                r#"
                UPDATE patients SET
                    name = ?2,
                    date_of_birth = ?3,
                    nhs_number = ?4,
                    postcode = ?5
                WHERE id = ?1
                "#,
                params![
                    patient.id.to_string(),
                    patient.name,
                    patient.date_of_birth.to_rfc3339(),
                    patient.nhs_number,
                    patient.postcode,
                ],
            )
            .map_err(|e| patient_write_error(e, patient))?;
        if rows == 0 {
            return Err(not_found("patient", patient.id));
        }
        Ok(())
    }

    fn delete(&self, patient: &Patient) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM patients WHERE id = ?1", [patient.id.to_string()])?;
        if rows == 0 {
            return Err(not_found("patient", patient.id));
        }
        Ok(())
    }
}

impl SqliteStore {
    fn select_appointments(&self) -> StoreResult<Vec<Appointment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY rowid"
        ))?;
        let appointments = stmt
            .query_map([], appointment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(appointments)
    }
}

impl AppointmentRepository for SqliteStore {
    fn get_all(&self) -> StoreResult<Vec<Appointment>> {
        self.select_appointments()
    }

    fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            [id.to_string()],
            appointment_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    fn add(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO appointments (
                id, patient_id, status, scheduled_at, duration,
                attended, clinician, department, postcode
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                appointment.id.to_string(),
                appointment.patient_id.to_string(),
                appointment.status.as_str(),
                appointment.scheduled_at.to_rfc3339(),
                appointment.duration,
                appointment.attended,
                appointment.clinician,
                appointment.department,
                appointment.postcode,
            ],
        )
        .map_err(|e| appointment_write_error(e, &appointment))?;
        Ok(appointment)
    }

    fn update(&self, appointment: &Appointment) -> StoreResult<()> {
        let conn = self.conn()?;
        // patient_id is never rewritten: an appointment belongs to one patient for life.
        let rows = conn.execute(
            r#"
            UPDATE appointments SET
                status = ?2,
                scheduled_at = ?3,
                duration = ?4,
                attended = ?5,
                clinician = ?6,
                department = ?7,
                postcode = ?8
            WHERE id = ?1
            "#,
            params![
                appointment.id.to_string(),
                appointment.status.as_str(),
                appointment.scheduled_at.to_rfc3339(),
                appointment.duration,
                appointment.attended,
                appointment.clinician,
                appointment.department,
                appointment.postcode,
            ],
        )?;
        if rows == 0 {
            return Err(not_found("appointment", appointment.id));
        }
        Ok(())
    }

    fn delete(&self, appointment: &Appointment) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM appointments WHERE id = ?1",
            [appointment.id.to_string()],
        )?;
        if rows == 0 {
            return Err(not_found("appointment", appointment.id));
        }
        Ok(())
    }

    fn query(&self) -> StoreResult<Box<dyn Iterator<Item = Appointment> + Send>> {
        Ok(Box::new(self.select_appointments()?.into_iter()))
    }
}
