use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use panda_core::{
    config::database_path_from_env_value,
    validation::{is_valid_nhs_number, is_valid_postcode, parse_duration_to_seconds},
    AppointmentService, CoreConfig, PatientService, SqliteStore, SystemClock,
};

#[derive(Parser)]
#[command(name = "panda")]
#[command(about = "Panda patient appointment system CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "PANDA_DATABASE_PATH")]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an NHS number's MOD 11 check digit
    CheckNhs {
        /// Ten-digit NHS number
        number: String,
    },
    /// Check a UK postcode's format
    CheckPostcode {
        /// Postcode, e.g. "EC1A 1BB"
        postcode: String,
    },
    /// Convert a duration such as 1h30m to seconds
    ParseDuration {
        /// Duration text
        duration: String,
    },
    /// List all patients
    Patients,
    /// List all appointments, marking overdue ones as missed
    Appointments,
    /// Show missed appointments per clinician and department
    Missed,
}

fn open_services(database: Option<String>) -> Result<(PatientService, AppointmentService), Box<dyn std::error::Error>> {
    let path: PathBuf = database_path_from_env_value(database);
    let cfg = CoreConfig::new(path)?;
    let store = Arc::new(SqliteStore::from_config(&cfg)?);
    let clock = Arc::new(SystemClock);
    Ok((
        PatientService::new(store.clone(), clock.clone()),
        AppointmentService::new(store.clone(), store, clock),
    ))
}

/// Renders a duration as seconds, failing on malformed input so the CLI exits non-zero.
fn describe_duration(duration: &str) -> Result<String, Box<dyn std::error::Error>> {
    let seconds = parse_duration_to_seconds(duration)
        .map_err(|e| format!("invalid duration {duration:?}: {e}"))?;
    Ok(format!("{duration} = {seconds} seconds"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckNhs { number }) => {
            if is_valid_nhs_number(&number) {
                println!("{number} is a valid NHS number");
            } else {
                println!("{number} is not a valid NHS number");
            }
        }
        Some(Commands::CheckPostcode { postcode }) => {
            if is_valid_postcode(&postcode) {
                println!("{postcode} is a valid UK postcode");
            } else {
                println!("{postcode} is not a valid UK postcode");
            }
        }
        Some(Commands::ParseDuration { duration }) => {
            println!("{}", describe_duration(&duration)?);
        }
        Some(Commands::Patients) => {
            let (patients, _) = open_services(cli.database)?;
            let all = patients.get_all()?;
            if all.is_empty() {
                println!("No patients found.");
            }
            for p in all {
                println!(
                    "ID: {}, Name: {}, NHS: {}, DOB: {}, Postcode: {}",
                    p.id,
                    p.name,
                    p.nhs_number,
                    p.date_of_birth.date_naive(),
                    p.postcode
                );
            }
        }
        Some(Commands::Appointments) => {
            let (_, appointments) = open_services(cli.database)?;
            let all = appointments.get_all()?;
            if all.is_empty() {
                println!("No appointments found.");
            }
            for a in all {
                println!(
                    "ID: {}, Patient: {}, Status: {}, At: {}, Duration: {}, Clinician: {}, Department: {}",
                    a.id,
                    a.patient_id,
                    a.status,
                    a.scheduled_at.to_rfc3339(),
                    a.duration,
                    a.clinician,
                    a.department
                );
            }
        }
        Some(Commands::Missed) => {
            let (_, appointments) = open_services(cli.database)?;
            let report = appointments.get_missed_impact()?;
            if report.is_empty() {
                println!("No missed appointments.");
            }
            for s in report {
                println!(
                    "{} / {}: {} missed, {} seconds, most recent {}",
                    s.clinician,
                    s.department,
                    s.missed_count,
                    s.total_seconds_missed,
                    s.most_recent_missed.to_rfc3339()
                );
            }
        }
        None => {
            println!("Use --help for usage");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_duration() {
        assert_eq!(
            describe_duration("1h30m").expect("parse should succeed"),
            "1h30m = 5400 seconds"
        );
    }

    #[test]
    fn test_describe_duration_fails_on_malformed_input() {
        let err = describe_duration("1x30m").expect_err("malformed duration should fail");
        assert!(err.to_string().starts_with("invalid duration \"1x30m\""));
    }
}
