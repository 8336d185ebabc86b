//! # API REST
//!
//! REST API implementation for Panda.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Uses `api-shared` for wire types and `panda-core` for every domain rule.

#![warn(rust_2018_idioms)]

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{
    AppointmentDto, AppointmentStatusDto, CreateAppointmentReq, HealthRes, HealthService,
    MessageRes, MissedAppointmentSummaryDto, PatientDto, PatientReq, UpdateAppointmentReq,
    ValidationErrorItem, ValidationErrorRes,
};
use panda_core::{
    Appointment, AppointmentInput, AppointmentRepository, AppointmentService, AppointmentStatus,
    Clock, FieldError, MissedAppointmentSummary, PandaError, Patient, PatientInput,
    PatientRepository, PatientService,
};

/// Application state for the REST API server
///
/// Holds the domain services every handler delegates to. Both services share one store
/// and one clock.
#[derive(Clone)]
pub struct AppState {
    patients: PatientService,
    appointments: AppointmentService,
}

impl AppState {
    pub fn new(patients: PatientService, appointments: AppointmentService) -> Self {
        Self {
            patients,
            appointments,
        }
    }

    /// Builds both services over a single store that holds patients and appointments.
    pub fn with_store<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: PatientRepository + AppointmentRepository + 'static,
    {
        Self::new(
            PatientService::new(store.clone(), clock.clone()),
            AppointmentService::new(store.clone(), store, clock),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        get_patient,
        create_patient,
        update_patient,
        delete_patient,
        list_appointments,
        get_appointment,
        create_appointment,
        update_appointment,
        cancel_appointment,
        missed_impact,
    ),
    components(schemas(
        HealthRes,
        PatientDto,
        PatientReq,
        AppointmentDto,
        AppointmentStatusDto,
        CreateAppointmentReq,
        UpdateAppointmentReq,
        MissedAppointmentSummaryDto,
        ValidationErrorItem,
        ValidationErrorRes,
        MessageRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router, including Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/patients", get(list_patients).post(create_patient))
        .route(
            "/api/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route(
            "/api/appointment",
            get(list_appointments).post(create_appointment),
        )
        .route("/api/appointment/analytics/missed", get(missed_impact))
        .route(
            "/api/appointment/:id",
            get(get_appointment).put(update_appointment),
        )
        .route("/api/appointment/:id/cancel", post(cancel_appointment))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error responses shared by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with every failed field rule.
    Validation(Vec<FieldError>),
    /// 404 naming the missing resource.
    NotFound(&'static str),
    /// 500; details are logged, never returned.
    Internal,
}

impl From<PandaError> for ApiError {
    fn from(err: PandaError) -> Self {
        match err {
            PandaError::Validation(failures) => Self::Validation(failures),
            PandaError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(failures) => {
                let errors = failures
                    .into_iter()
                    .map(|f| ValidationErrorItem {
                        field: f.field,
                        message: f.message,
                    })
                    .collect();
                (StatusCode::BAD_REQUEST, Json(ValidationErrorRes { errors })).into_response()
            }
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(MessageRes {
                    message: format!("{what} not found"),
                }),
            )
                .into_response(),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageRes {
                    message: "Internal error".into(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    /// A body that is not JSON, or has a field of the wrong type, is a client error like any
    /// other validation failure.
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        Self::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Validation(vec![FieldError::new("id", "Id must be a valid UUID.")])
    })
}

fn patient_dto(p: Patient) -> PatientDto {
    PatientDto {
        id: p.id,
        name: p.name,
        date_of_birth: p.date_of_birth,
        nhs_number: p.nhs_number,
        postcode: p.postcode,
    }
}

fn patient_input(req: PatientReq) -> PatientInput {
    PatientInput {
        name: req.name.unwrap_or_default(),
        date_of_birth: req.date_of_birth,
        nhs_number: req.nhs_number.unwrap_or_default(),
        postcode: req.postcode.unwrap_or_default(),
    }
}

fn status_dto(status: AppointmentStatus) -> AppointmentStatusDto {
    match status {
        AppointmentStatus::Scheduled => AppointmentStatusDto::Scheduled,
        AppointmentStatus::Attended => AppointmentStatusDto::Attended,
        AppointmentStatus::Missed => AppointmentStatusDto::Missed,
        AppointmentStatus::Cancelled => AppointmentStatusDto::Cancelled,
    }
}

fn status_from_dto(status: AppointmentStatusDto) -> AppointmentStatus {
    match status {
        AppointmentStatusDto::Scheduled => AppointmentStatus::Scheduled,
        AppointmentStatusDto::Attended => AppointmentStatus::Attended,
        AppointmentStatusDto::Missed => AppointmentStatus::Missed,
        AppointmentStatusDto::Cancelled => AppointmentStatus::Cancelled,
    }
}

fn appointment_dto(a: Appointment) -> AppointmentDto {
    AppointmentDto {
        id: a.id,
        patient_id: a.patient_id,
        status: status_dto(a.status),
        scheduled_at: a.scheduled_at,
        duration: a.duration,
        attended: a.attended,
        clinician: a.clinician,
        department: a.department,
        postcode: a.postcode,
    }
}

fn create_appointment_input(req: CreateAppointmentReq) -> AppointmentInput {
    AppointmentInput {
        patient_id: req.patient_id,
        status: req.status.map(status_from_dto),
        scheduled_at: req.scheduled_at,
        duration: req.duration.unwrap_or_default(),
        attended: req.attended.unwrap_or_default(),
        clinician: req.clinician.unwrap_or_default(),
        department: req.department.unwrap_or_default(),
        postcode: req.postcode.unwrap_or_default(),
    }
}

fn update_appointment_input(req: UpdateAppointmentReq) -> AppointmentInput {
    AppointmentInput {
        patient_id: None,
        status: None,
        scheduled_at: req.scheduled_at,
        duration: req.duration.unwrap_or_default(),
        attended: req.attended.unwrap_or_default(),
        clinician: req.clinician.unwrap_or_default(),
        department: req.department.unwrap_or_default(),
        postcode: req.postcode.unwrap_or_default(),
    }
}

fn summary_dto(s: MissedAppointmentSummary) -> MissedAppointmentSummaryDto {
    MissedAppointmentSummaryDto {
        clinician: s.clinician,
        department: s.department,
        missed_count: s.missed_count,
        total_seconds_missed: s.total_seconds_missed,
        most_recent_missed: s.most_recent_missed,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/patients",
    responses(
        (status = 200, description = "All patients", body = [PatientDto]),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// List all patients in the system
///
/// # Returns
/// * `Ok(Json<Vec<PatientDto>>)` - Every patient, in registration order
///
/// # Errors
/// Returns `500 Internal Server Error` if the store cannot be read.
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<PatientDto>>> {
    let patients = state.patients.get_all()?;
    Ok(Json(patients.into_iter().map(patient_dto).collect()))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient found", body = PatientDto),
        (status = 400, description = "Malformed id", body = ValidationErrorRes),
        (status = 404, description = "No such patient", body = MessageRes)
    )
)]
/// Fetch a single patient
///
/// # Errors
/// Returns:
/// - `400 Bad Request` if `id` is not a UUID,
/// - `404 Not Found` if there is no such patient.
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<PatientDto>> {
    let id = parse_id(&id)?;
    match state.patients.get_by_id(id)? {
        Some(patient) => Ok(Json(patient_dto(patient))),
        None => Err(ApiError::NotFound("Patient")),
    }
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientDto),
        (status = 400, description = "Validation failed", body = ValidationErrorRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Registers a new patient
///
/// Every field is validated and all failures are returned together. A duplicate NHS
/// number is reported against `nhsNumber`.
///
/// # Returns
/// * `Ok((201, Json<PatientDto>))` - The patient as stored
///
/// # Errors
/// Returns `400 Bad Request` listing every failed rule, or if the body is malformed.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<PatientReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PatientDto>)> {
    let Json(req) = payload?;
    let patient = state.patients.create(patient_input(req))?;
    Ok((StatusCode::CREATED, Json(patient_dto(patient))))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientDto),
        (status = 400, description = "Validation failed", body = ValidationErrorRes),
        (status = 404, description = "No such patient", body = MessageRes)
    )
)]
/// Replace every field of a patient
///
/// # Returns
/// * `Ok(Json<PatientDto>)` - The patient as stored
///
/// # Errors
/// Returns:
/// - `400 Bad Request` listing every failed rule, or for a malformed id or body,
/// - `404 Not Found` if there is no such patient.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<PatientReq>, JsonRejection>,
) -> ApiResult<Json<PatientDto>> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    match state.patients.update(id, patient_input(req))? {
        Some(patient) => Ok(Json(patient_dto(patient))),
        None => Err(ApiError::NotFound("Patient")),
    }
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and their appointments deleted"),
        (status = 404, description = "No such patient", body = MessageRes)
    )
)]
/// Delete a patient and, through the store, their appointments
///
/// # Errors
/// Returns `404 Not Found` if there is no such patient.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if state.patients.delete(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Patient"))
    }
}

#[utoipa::path(
    get,
    path = "/api/appointment",
    responses(
        (status = 200, description = "All appointments, with overdue ones marked missed", body = [AppointmentDto]),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// List all appointments
///
/// Appointments that have run past their end without being attended are returned, and
/// stored, as `missed`.
///
/// # Errors
/// Returns `500 Internal Server Error` if the store cannot be read or written.
#[axum::debug_handler]
async fn list_appointments(State(state): State<AppState>) -> ApiResult<Json<Vec<AppointmentDto>>> {
    let appointments = state.appointments.get_all()?;
    Ok(Json(appointments.into_iter().map(appointment_dto).collect()))
}

#[utoipa::path(
    get,
    path = "/api/appointment/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment found", body = AppointmentDto),
        (status = 400, description = "Malformed id", body = ValidationErrorRes),
        (status = 404, description = "No such appointment", body = MessageRes)
    )
)]
/// Fetch a single appointment, deriving `missed` if it is overdue
///
/// # Errors
/// Returns:
/// - `400 Bad Request` if `id` is not a UUID,
/// - `404 Not Found` if there is no such appointment.
#[axum::debug_handler]
async fn get_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<AppointmentDto>> {
    let id = parse_id(&id)?;
    match state.appointments.get_by_id(id)? {
        Some(appointment) => Ok(Json(appointment_dto(appointment))),
        None => Err(ApiError::NotFound("Appointment")),
    }
}

#[utoipa::path(
    post,
    path = "/api/appointment",
    request_body = CreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentDto),
        (status = 400, description = "Validation failed", body = ValidationErrorRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Book a new appointment
///
/// The appointment always starts `scheduled`.
///
/// # Returns
/// * `Ok((201, Json<AppointmentDto>))` - The booked appointment
///
/// # Errors
/// Returns `400 Bad Request` listing every failed rule, including an unknown `patientId`,
/// or if the body is malformed.
#[axum::debug_handler]
async fn create_appointment(
    State(state): State<AppState>,
    payload: Result<Json<CreateAppointmentReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AppointmentDto>)> {
    let Json(req) = payload?;
    let appointment = state.appointments.create(create_appointment_input(req))?;
    Ok((StatusCode::CREATED, Json(appointment_dto(appointment))))
}

#[utoipa::path(
    put,
    path = "/api/appointment/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateAppointmentReq,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentDto),
        (status = 400, description = "Validation failed or appointment cancelled", body = ValidationErrorRes),
        (status = 404, description = "No such appointment", body = MessageRes)
    )
)]
/// Replaces the details of an appointment
///
/// Setting `attended` marks the appointment attended. Cancelled appointments cannot be
/// updated.
///
/// # Errors
/// Returns:
/// - `400 Bad Request` listing every failed rule, for a cancelled appointment, or for a
///   malformed id or body,
/// - `404 Not Found` if there is no such appointment.
#[axum::debug_handler]
async fn update_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<UpdateAppointmentReq>, JsonRejection>,
) -> ApiResult<Json<AppointmentDto>> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    match state.appointments.update(id, update_appointment_input(req))? {
        Some(appointment) => Ok(Json(appointment_dto(appointment))),
        None => Err(ApiError::NotFound("Appointment")),
    }
}

#[utoipa::path(
    post,
    path = "/api/appointment/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 204, description = "Appointment cancelled"),
        (status = 404, description = "No such appointment, or already cancelled", body = MessageRes)
    )
)]
/// Cancel an appointment
///
/// # Returns
/// * `Ok(204)` - The appointment is now cancelled
///
/// # Errors
/// Returns `404 Not Found` if there is no such appointment or it was already cancelled.
#[axum::debug_handler]
async fn cancel_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if state.appointments.cancel(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Appointment"))
    }
}

#[utoipa::path(
    get,
    path = "/api/appointment/analytics/missed",
    responses(
        (status = 200, description = "Missed appointments per clinician and department", body = [MissedAppointmentSummaryDto]),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Missed-appointment impact report
///
/// Most recent miss first.
#[axum::debug_handler]
async fn missed_impact(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MissedAppointmentSummaryDto>>> {
    let report = state.appointments.get_missed_impact()?;
    Ok(Json(report.into_iter().map(summary_dto).collect()))
}
