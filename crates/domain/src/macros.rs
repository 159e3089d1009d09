//! Macro for string-backed enums
//!
//! Generates `as_str`, `Display` and `FromStr` for enums that are stored in the
//! database or sent over the wire as lowercase strings.
//!
//! # Example
//!
//! ```rust
//! use overtrakt_domain::impl_str_enum;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Webhook,
//!     Pushover,
//! }
//!
//! impl_str_enum!(Channel {
//!     Webhook => "webhook",
//!     Pushover => "pushover",
//! });
//!
//! assert_eq!(Channel::Pushover.as_str(), "pushover");
//! assert_eq!("WEBHOOK".parse::<Channel>().unwrap(), Channel::Webhook);
//! ```

/// Implements `as_str`, `Display` and case-insensitive `FromStr`.
#[macro_export]
macro_rules! impl_str_enum {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase representation.
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
            type Err = $crate::OvertraktError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err($crate::OvertraktError::Precondition(format!(
                        "invalid {}: {}",
                        stringify!($enum_name),
                        s
                    ))),
                }
            }
        }
    };
}
