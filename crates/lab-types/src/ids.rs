//! Numeric identifier newtypes.
//!
//! The laboratory backend keys every record with a positive integer. Wrapping each family of
//! identifier in its own type stops a genotype id from being passed where a marker id is
//! expected. On the wire an identifier is a JSON number, but numeric strings are accepted too
//! because the backend echoes some ids back as object keys.

use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an identifier from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier is not a number: {0:?}")]
    NotNumeric(String),
    #[error("identifier must be positive, got {0}")]
    NotPositive(i64),
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_positive(s).map(Self)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a reference SNP.
    MarkerId
);
numeric_id!(
    /// Identifier of a genotype result value.
    GenotypeId
);
numeric_id!(
    /// Identifier of a persisted report.
    ReportId
);
numeric_id!(
    /// Identifier of the laboratory client a report belongs to.
    SubjectId
);

fn parse_positive(s: &str) -> Result<i64, IdError> {
    let trimmed = s.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| IdError::NotNumeric(trimmed.to_string()))?;
    check_positive(value)
}

fn check_positive(value: i64) -> Result<i64, IdError> {
    if value <= 0 {
        return Err(IdError::NotPositive(value));
    }
    Ok(value)
}

struct IdVisitor;

impl serde::de::Visitor<'_> for IdVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer identifier or a numeric string")
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<i64, E> {
        check_positive(v).map_err(E::custom)
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<i64, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(format!("identifier {v} out of range")))?;
        check_positive(v).map_err(E::custom)
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<i64, E> {
        parse_positive(v).map_err(E::custom)
    }
}
