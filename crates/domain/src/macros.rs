//! Wire-string conversions for status and priority enums
//!
//! The backend stores statuses as lowercase, hyphenated strings
//! (`"in-progress"`). This macro gives an enum `as_str`, `Display` and a
//! case-insensitive `FromStr` from a single mapping table.
//!
//! # Example
//!
//! ```rust
//! use propdesk_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum TaskStatus {
//!     Pending,
//!     InProgress,
//!     Completed,
//! }
//!
//! impl_domain_status_conversions!(TaskStatus {
//!     Pending => "pending",
//!     InProgress => "in-progress",
//!     Completed => "completed",
//! });
//!
//! assert_eq!(TaskStatus::InProgress.to_string(), "in-progress");
//! assert_eq!("IN-PROGRESS".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire representation of this value
            pub const fn as_str(&self) -> &'static str {
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
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
