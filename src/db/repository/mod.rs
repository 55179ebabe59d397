//! Repository layer — table-scoped database operations.
//!
//! Artifact and trace tables only expose insert and read functions;
//! run rows are updated exclusively through `update_run_state`.

mod artifact;
mod stage;
mod trace;
mod workflow_run;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use artifact::*;
pub use stage::*;
pub use trace::*;
pub use workflow_run::*;

/// Timestamps are stored as fixed-width RFC 3339 so text ordering is chronological.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp '{raw}': {e}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trip_preserves_micros() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(&now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn bad_uuid_is_constraint_violation() {
        assert!(matches!(
            parse_uuid("not-a-uuid"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }
}
