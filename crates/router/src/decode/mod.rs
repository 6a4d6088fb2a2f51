//! Tag driven decoding of flat form and query values into records.
//!
//! A record opts in with `#[derive(Decode)]`, which describes every named field: its name, its
//! tags and a setter. At decode time each field resolves its external key with this
//! precedence:
//!
//! 1. the tag named by the caller (`form` for bodies, `query` for query strings),
//! 2. the `json` tag, taken from `#[serde(rename = "...")]`,
//! 3. the field name converted to snake case.
//!
//! A tag value is a comma separated list whose first element is the key. The `required`
//! modifier (or `#[decode(required)]`) makes a missing key an error.
//!
//! ```
//! use micro_router::decode::{self, Decode, FormValues, FORM_TAG};
//!
//! #[derive(Decode, Default)]
//! struct Signup {
//!     #[form = "name,required"]
//!     name: String,
//!     age: u32,
//!     tags: Vec<String>,
//! }
//!
//! let values: FormValues = [("name", "jane"), ("age", "41"), ("tags", "a, b")].into_iter().collect();
//! let mut signup = Signup::default();
//! decode::decode(&values, &mut signup, FORM_TAG).unwrap();
//!
//! assert_eq!(signup.name, "jane");
//! assert_eq!(signup.age, 41);
//! assert_eq!(signup.tags, vec!["a", "b"]);
//! ```

mod coerce;
mod content;
mod document;
mod error;
#[doc(hidden)]
pub mod probe;
mod scan;
mod value;

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

pub use coerce::{FormElement, FormField, parse_bool};
pub(crate) use content::multipart_boundary;
pub use content::{
    ContentKind, FormFile, MultipartForm, decode_body, decode_query, parse_multipart, parse_multipart_files,
    parse_urlencoded,
};
pub use error::{BoxError, DecodeError, DecodeErrorKind, FieldError};
pub use micro_router_macros::Decode;
pub use scan::Scan;
pub use value::{FormValue, FormValues, RawValue};

use tracing::trace;

pub const FORM_TAG: &str = "form";
pub const QUERY_TAG: &str = "query";
pub const JSON_TAG: &str = "json";

pub type FieldSetter<T> = fn(&mut T, RawValue<'_>) -> Result<(), FieldError>;

/// A record whose named fields can be filled from [`FormValues`].
///
/// Use `#[derive(Decode)]` rather than implementing this by hand.
pub trait Decode: Sized + 'static {
    /// False for types without named fields, which every decode call rejects.
    const NAMED_FIELDS: bool = true;

    fn fields() -> &'static [FieldDescriptor<Self>];
}

/// Static description of one decodable field.
pub struct FieldDescriptor<T: 'static> {
    name: &'static str,
    tags: &'static [(&'static str, &'static str)],
    required: bool,
    setter: FieldSetter<T>,
}

impl<T> FieldDescriptor<T> {
    pub const fn new(
        name: &'static str,
        tags: &'static [(&'static str, &'static str)],
        required: bool,
        setter: FieldSetter<T>,
    ) -> Self {
        Self { name, tags, required, setter }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The first non-empty value of the tag called `tag`.
    pub fn tag(&self, tag: &str) -> Option<&'static str> {
        self.tags.iter().find(|(name, value)| *name == tag && !value.is_empty()).map(|(_, value)| *value)
    }

    /// Resolves the external key and the required flag for the given tag preference.
    pub fn resolve(&self, preference: &str) -> (Cow<'static, str>, bool) {
        let Some(tag) = self.tag(preference).or_else(|| self.tag(JSON_TAG)) else {
            return (Cow::Owned(snake_case(self.name)), self.required);
        };

        let mut parts = tag.split(',').map(str::trim);
        let key = parts.next().unwrap_or_default();
        let required = self.required || parts.any(|modifier| modifier == "required");
        if key.is_empty() { (Cow::Owned(snake_case(self.name)), required) } else { (Cow::Borrowed(key), required) }
    }

    pub fn set(&self, dest: &mut T, value: RawValue<'_>) -> Result<(), FieldError> {
        (self.setter)(dest, value)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// `UserName` becomes `user_name`, `HTTPServer` becomes `h_t_t_p_server`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i > 0 && ch.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(ch);
    }
    out.to_lowercase()
}

pub(crate) fn ensure_record<T: Decode>() -> Result<(), DecodeError> {
    if T::NAMED_FIELDS { Ok(()) } else { Err(DecodeError::InvalidStructPointer { type_name: type_name::<T>() }) }
}

/// Fills `dest` from `values`, resolving keys with `preference` first.
///
/// Keys are resolved and required fields checked before any field is written, so a
/// [`DecodeErrorKind::RequiredFieldMissing`] leaves `dest` untouched. Setters then run in
/// declaration order and the first failure stops the decode; fields assigned before it keep
/// their new values.
///
/// Because of that split, a missing required key is reported even when an earlier field
/// holds a value that would fail to parse: the error is `RequiredFieldMissing`, not
/// `ParseError`, whatever the declaration order.
pub fn decode<T: Decode>(values: &FormValues, dest: &mut T, preference: &str) -> Result<(), DecodeError> {
    ensure_record::<T>()?;

    let fields = T::fields();
    let mut present = Vec::with_capacity(fields.len());
    for field in fields {
        let (key, required) = field.resolve(preference);
        match values.get(&key) {
            Some(value) => present.push((field, key, value)),
            None if required => return Err(DecodeError::RequiredFieldMissing { key: key.into_owned() }),
            None => {}
        }
    }

    for (field, key, value) in present {
        trace!(field = field.name(), key = %key, "decode field");
        field.set(dest, value.as_raw()).map_err(|e| e.with_key(&key))?;
    }
    Ok(())
}
