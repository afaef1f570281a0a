//! Macro for implementing Display and FromStr for status enums
//!
//! Status enums in this crate are persisted and logged as lowercase strings
//! (`"success"`, `"partial"`, `"authenticated"`). This macro keeps the string
//! mapping in a single place for both directions.
//!
//! # Example
//!
//! ```rust
//! use innoverse_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ProbeStatus {
//!     Reachable,
//!     Unreachable,
//! }
//!
//! impl_domain_status_conversions!(ProbeStatus {
//!     Reachable => "reachable",
//!     Unreachable => "unreachable",
//! });
//!
//! assert_eq!(ProbeStatus::Reachable.to_string(), "reachable");
//! assert_eq!("UNREACHABLE".parse::<ProbeStatus>(), Ok(ProbeStatus::Unreachable));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// - Display writes the lowercase string for each variant
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => std::result::Result::Ok(Self::$variant),)+
                    _ => std::result::Result::Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
