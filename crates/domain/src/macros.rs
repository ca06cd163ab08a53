//! Macro for implementing Display and FromStr for status enums
//!
//! Status columns are stored and transported as lowercase snake_case strings.
//! The macro keeps the textual mapping in one place so the database layer,
//! the API layer and log fields always agree.
//!
//! # Example
//!
//! ```rust
//! use careline_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum RoomState {
//!     Free,
//!     Occupied,
//! }
//!
//! impl_domain_status_conversions!(RoomState {
//!     Free => "free",
//!     Occupied => "occupied",
//! });
//!
//! assert_eq!(RoomState::Free.to_string(), "free");
//! assert_eq!("OCCUPIED".parse::<RoomState>(), Ok(RoomState::Occupied));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// Parsing is case-insensitive and ignores surrounding whitespace; display
/// always yields the canonical lowercase form.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
