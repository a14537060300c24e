pub mod booking;
pub mod patient;
pub mod reference;
pub mod user;

pub use booking::*;
pub use patient::*;
pub use reference::*;
pub use user::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == upper)
                    .ok_or_else(|| format!("unknown {} value '{}'", stringify!($name), s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Administrative gender of a patient
    GenderType {
        Male => "MALE",
        Female => "FEMALE",
        Other => "OTHER",
        Unknown => "UNKNOWN",
    }
);

text_enum!(
    /// Kind of care event generated for a follow-up plan
    EventType {
        Preoperative => "PREOPERATIVE",
        Postoperative => "POSTOPERATIVE",
        Followup => "FOLLOWUP",
    }
);

text_enum!(
    TimeUnit {
        Days => "DAYS",
        Weeks => "WEEKS",
        Months => "MONTHS",
        Years => "YEARS",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("male".parse::<GenderType>().unwrap(), GenderType::Male);
        assert_eq!("FOLLOWUP".parse::<EventType>().unwrap(), EventType::Followup);
        assert_eq!(" Weeks ".parse::<TimeUnit>().unwrap(), TimeUnit::Weeks);
    }

    #[test]
    fn test_enum_parsing_rejects_unknown() {
        let err = "alien".parse::<GenderType>().unwrap_err();
        assert!(err.contains("GenderType"));
    }

    #[test]
    fn test_enum_serialization() {
        let json = serde_json::to_string(&EventType::Preoperative).unwrap();
        assert_eq!(json, "\"PREOPERATIVE\"");

        let gender: GenderType = serde_json::from_str("\"FEMALE\"").unwrap();
        assert_eq!(gender, GenderType::Female);
    }
}
