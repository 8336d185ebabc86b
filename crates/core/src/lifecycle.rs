//! Appointment lifecycle rules.
//!
//! ```text
//! scheduled --attended=true--> attended
//! scheduled --end has passed, not attended--> missed   (derived on read)
//! scheduled | attended | missed --cancel--> cancelled  (terminal)
//! ```
//!
//! Missed status is never set by callers. It is derived from the clock whenever an
//! appointment is read, and every reader (single fetch, listing, aggregation) goes
//! through [`is_missed`] so they cannot disagree.

use crate::models::{Appointment, AppointmentStatus, MissedAppointmentSummary};
use crate::validation::{parse_duration_to_seconds, DurationError};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use std::collections::HashMap;

/// When the appointment is due to finish: `scheduled_at + duration`.
pub fn appointment_end(appointment: &Appointment) -> Result<DateTime<FixedOffset>, DurationError> {
    let seconds = parse_duration_to_seconds(&appointment.duration)?;
    let delta = i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or(DurationError::Overflow)?;
    appointment
        .scheduled_at
        .checked_add_signed(delta)
        .ok_or(DurationError::Overflow)
}

/// Whether a still-scheduled, unattended appointment has run past its end.
///
/// Only parses the duration when status and attendance allow a miss, so a cancelled or
/// attended appointment with a malformed duration is simply not missed.
pub fn is_missed(appointment: &Appointment, now: DateTime<Utc>) -> Result<bool, DurationError> {
    if appointment.status != AppointmentStatus::Scheduled || appointment.attended {
        return Ok(false);
    }
    Ok(appointment_end(appointment)?.with_timezone(&Utc) <= now)
}

/// The status a reader should see at `now`.
pub fn effective_status(
    appointment: &Appointment,
    now: DateTime<Utc>,
) -> Result<AppointmentStatus, DurationError> {
    if is_missed(appointment, now)? {
        Ok(AppointmentStatus::Missed)
    } else {
        Ok(appointment.status)
    }
}

/// Flips the appointment to missed if it is overdue. Returns whether it changed.
pub fn derive_missed(appointment: &mut Appointment, now: DateTime<Utc>) -> Result<bool, DurationError> {
    if is_missed(appointment, now)? {
        appointment.status = AppointmentStatus::Missed;
        return Ok(true);
    }
    Ok(false)
}

/// Rolls up missed appointments per `(clinician, department)`.
///
/// An appointment counts if its [`effective_status`] is missed, whether that was written
/// back by an earlier read or is only now overdue. Records whose duration cannot be parsed
/// are logged and skipped rather than failing the whole report.
///
/// Output is ordered by most recent miss first, then clinician, then department.
pub fn summarise_missed<I>(appointments: I, now: DateTime<Utc>) -> Vec<MissedAppointmentSummary>
where
    I: IntoIterator<Item = Appointment>,
{
    let mut groups: HashMap<(String, String), MissedAppointmentSummary> = HashMap::new();

    for appointment in appointments {
        let seconds = match missed_seconds(&appointment, now) {
            Ok(Some(seconds)) => seconds,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    duration = %appointment.duration,
                    error = %e,
                    "skipping appointment with malformed duration in missed report"
                );
                continue;
            }
        };

        let summary = groups
            .entry((appointment.clinician.clone(), appointment.department.clone()))
            .or_insert_with(|| MissedAppointmentSummary {
                clinician: appointment.clinician.clone(),
                department: appointment.department.clone(),
                missed_count: 0,
                total_seconds_missed: 0,
                most_recent_missed: appointment.scheduled_at,
            });

        summary.missed_count += 1;
        summary.total_seconds_missed = summary.total_seconds_missed.saturating_add(seconds);
        if appointment.scheduled_at > summary.most_recent_missed {
            summary.most_recent_missed = appointment.scheduled_at;
        }
    }

    let mut summaries: Vec<_> = groups.into_values().collect();
    summaries.sort_by(|a, b| {
        b.most_recent_missed
            .cmp(&a.most_recent_missed)
            .then_with(|| a.clinician.cmp(&b.clinician))
            .then_with(|| a.department.cmp(&b.department))
    });
    summaries
}

fn missed_seconds(appointment: &Appointment, now: DateTime<Utc>) -> Result<Option<u64>, DurationError> {
    match effective_status(appointment, now)? {
        AppointmentStatus::Missed => Ok(Some(parse_duration_to_seconds(&appointment.duration)?)),
        _ => Ok(None),
    }
}
