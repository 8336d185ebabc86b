//! Constants used throughout the PANDA core crate.
//!
//! Business limits live here so that validators, stores and the REST layer
//! agree on the same values.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "panda.db";

/// Special database path that opens a private in-memory SQLite database.
pub const IN_MEMORY_DATABASE_PATH: &str = ":memory:";

/// How far in the past an appointment may be scheduled, in minutes.
///
/// Absorbs request latency and small clock differences between client and server.
pub const SCHEDULING_GRACE_MINUTES: i64 = 5;

/// Maximum length (in characters) of names, clinicians and departments.
pub const MAX_TEXT_LENGTH: usize = 100;

/// Maximum stored length of a postcode, including the optional space.
pub const MAX_POSTCODE_LENGTH: usize = 8;

/// Number of digits in an NHS number once spaces are removed.
pub const NHS_NUMBER_LENGTH: usize = 10;
