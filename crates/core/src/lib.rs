//! # Panda Core
//!
//! Core business logic for the Panda patient appointment system.
//!
//! This crate contains the domain rules and persistence:
//! - Field validation (NHS numbers, UK postcodes, `1h30m` durations)
//! - Patient registration with NHS number uniqueness
//! - The appointment lifecycle, including missed-appointment derivation and the
//!   missed-impact report
//! - SQLite and in-memory stores behind repository traits
//!
//! **No API concerns**: HTTP routing, DTOs and OpenAPI docs belong in `api-rest` and
//! `api-shared`.

pub mod appointment;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod patient;
pub mod repositories;
pub mod validation;
pub mod validators;

pub use appointment::AppointmentService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use error::{FieldError, PandaError, PandaResult};
pub use models::{
    Appointment, AppointmentInput, AppointmentStatus, MissedAppointmentSummary, Patient,
    PatientInput,
};
pub use patient::PatientService;
pub use repositories::{
    AppointmentRepository, InMemoryStore, PatientRepository, SqliteStore, StoreError,
};
