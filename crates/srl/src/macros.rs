//! Utility macros.
//!
//! This module is declared with `#[macro_use]`, so every macro defined in here is in-scope by
//! default in every other module of this crate.

/// Defines an "ID" type backed by an opaque string.
///
/// # Example
///
/// ```ignore
/// define_id_type! {
///     /// Useful documentation.
///     pub struct MyId;
/// }
/// ```
macro_rules! define_id_type {
    {
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;

        $($item:item)*
    } => {
        $(#[$meta])*
        #[derive(
            Debug,
            Display,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        $vis struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(value))
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        $($item)*
    };
}
