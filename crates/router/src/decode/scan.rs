use crate::decode::{BoxError, RawValue};

/// Custom decoding for field types the built-in coercions do not cover.
///
/// A type implementing `Scan` receives the raw external value unchanged, whether it is a
/// single string or the values of a repeated key, and owns the whole interpretation. It takes
/// precedence over every built-in rule, and is also used for each element of a `Vec<T>` field
/// (in that case the element type must be `Default` as well).
///
/// ```
/// use micro_router::decode::{BoxError, RawValue, Scan};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Upper(String);
///
/// impl Scan for Upper {
///     fn scan(&mut self, value: RawValue<'_>) -> Result<(), BoxError> {
///         self.0 = value.first().unwrap_or_default().to_uppercase();
///         Ok(())
///     }
/// }
/// ```
pub trait Scan {
    fn scan(&mut self, value: RawValue<'_>) -> Result<(), BoxError>;
}
