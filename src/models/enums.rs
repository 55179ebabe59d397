use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The database string doubles as the JSON representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Stage {
    Extraction => "EXTRACTION",
    Normalization => "NORMALIZATION",
    Prescription => "PRESCRIPTION",
    Done => "DONE",
    Error => "ERROR",
});

impl Stage {
    /// Position in the forward order. Terminal stages sort last.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Extraction => 0,
            Self::Normalization => 1,
            Self::Prescription => 2,
            Self::Done => 3,
            Self::Error => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// The stage that follows a successful run of `self`.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Extraction => Some(Self::Normalization),
            Self::Normalization => Some(Self::Prescription),
            Self::Prescription => Some(Self::Done),
            Self::Done | Self::Error => None,
        }
    }
}

str_enum!(RunStatus {
    Running => "RUNNING",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

str_enum!(GuardrailStatus {
    Ok => "OK",
    Blocked => "BLOCKED",
});

str_enum!(NormalizationMethod {
    Llm => "llm",
    Deterministic => "deterministic",
});

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn stage_round_trips_through_db_string() {
        for stage in [
            Stage::Extraction,
            Stage::Normalization,
            Stage::Prescription,
            Stage::Done,
            Stage::Error,
        ] {
            assert_eq!(Stage::from_str(stage.as_str()).unwrap(), stage);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = RunStatus::from_str("PAUSED").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn forward_order_ends_at_done() {
        assert_eq!(Stage::Extraction.next(), Some(Stage::Normalization));
        assert_eq!(Stage::Normalization.next(), Some(Stage::Prescription));
        assert_eq!(Stage::Prescription.next(), Some(Stage::Done));
        assert_eq!(Stage::Done.next(), None);
        assert_eq!(Stage::Error.next(), None);
    }

    #[test]
    fn serde_uses_db_strings() {
        let json = serde_json::to_string(&GuardrailStatus::Blocked).unwrap();
        assert_eq!(json, "\"BLOCKED\"");
        let stage: Stage = serde_json::from_str("\"PRESCRIPTION\"").unwrap();
        assert_eq!(stage, Stage::Prescription);
    }
}
