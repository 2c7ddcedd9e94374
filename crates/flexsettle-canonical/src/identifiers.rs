use crate::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: String) -> Self {
                Self(value)
            }

            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                static PATTERN: Lazy<Regex> =
                    Lazy::new(|| Regex::new($pattern).expect("invalid regex"));
                let s = value.into();
                if !PATTERN.is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// Borrows the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

newtype!(
    EventId,
    "Operator-chosen identifier of a load-reduction event.",
    r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,127}$"
);
newtype!(
    SiteId,
    "Identifier of a participating site (meter aggregation point).",
    r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,127}$"
);
newtype!(
    ActorId,
    "Already-authenticated caller identity, used for ownership checks.",
    r"^[A-Za-z0-9][A-Za-z0-9_.:@-]{0,127}$"
);
newtype!(
    MethodTag,
    "Tag naming the baseline method that produced `baseline_kwh` (e.g. `simple`).",
    r"^[a-z][a-z0-9_-]{0,31}$"
);
newtype!(
    TxHandle,
    "Opaque reference to one action recorded on the settlement ledger.",
    r"^[A-Za-z0-9_:.-]{1,256}$"
);
