//! Built-in coercion rules from external strings into field types.

use chrono::{DateTime, FixedOffset, Utc};

use crate::decode::{FieldError, RawValue, Scan};

/// A field type the decoder knows how to assign from a [`RawValue`].
///
/// Implemented for strings, integers, floats, `bool`, RFC 3339 timestamps, `Vec<T>` of any
/// [`FormElement`], `Option<T>`, and every [`Scan`] type. A blank single value leaves the field
/// untouched.
pub trait FormField {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError>;
}

/// A type that can be produced from one string, as a list element or a scalar field.
pub trait FormElement: Sized {
    fn decode_element(raw: &str) -> Result<Self, FieldError>;
}

fn decode_single<T: FormElement>(slot: &mut T, value: RawValue<'_>) -> Result<(), FieldError> {
    match value.first() {
        Some(raw) if !raw.is_empty() => {
            *slot = T::decode_element(raw)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

macro_rules! from_str_coercion {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FormElement for $ty {
                fn decode_element(raw: &str) -> Result<Self, FieldError> {
                    raw.parse::<$ty>().map_err(FieldError::parse)
                }
            }

            impl FormField for $ty {
                fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
                    decode_single(self, value)
                }
            }
        )+
    };
}

from_str_coercion!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl FormElement for String {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        Ok(raw.to_owned())
    }
}

impl FormField for String {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        decode_single(self, value)
    }
}

/// Accepts `1 t T TRUE true True on` and `0 f F FALSE false False off`.
pub fn parse_bool(raw: &str) -> Result<bool, FieldError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" | "on" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" | "off" => Ok(false),
        other => Err(FieldError::parse(format!("invalid boolean {other:?}"))),
    }
}

impl FormElement for bool {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        parse_bool(raw)
    }
}

impl FormField for bool {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        decode_single(self, value)
    }
}

impl FormElement for DateTime<FixedOffset> {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        DateTime::parse_from_rfc3339(raw).map_err(FieldError::parse)
    }
}

impl FormField for DateTime<FixedOffset> {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        decode_single(self, value)
    }
}

impl FormElement for DateTime<Utc> {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        DateTime::parse_from_rfc3339(raw).map(|time| time.with_timezone(&Utc)).map_err(FieldError::parse)
    }
}

impl FormField for DateTime<Utc> {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        decode_single(self, value)
    }
}

impl<T: FormElement> FormField for Vec<T> {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        let items = value.items();
        if items.is_empty() {
            return Ok(());
        }

        *self = items.into_iter().map(T::decode_element).collect::<Result<_, _>>()?;
        Ok(())
    }
}

impl<T: FormField + Default> FormField for Option<T> {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        if value.is_blank() {
            return Ok(());
        }

        let was_set = self.is_some();
        let result = self.get_or_insert_with(T::default).decode_field(value);
        if result.is_err() && !was_set {
            *self = None;
        }
        result
    }
}

impl<T: FormElement> FormElement for Option<T> {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        if raw.is_empty() { Ok(None) } else { T::decode_element(raw).map(Some) }
    }
}

impl<T: Scan> FormField for T {
    fn decode_field(&mut self, value: RawValue<'_>) -> Result<(), FieldError> {
        self.scan(value).map_err(FieldError::Parse)
    }
}

impl<T: Scan + Default> FormElement for T {
    fn decode_element(raw: &str) -> Result<Self, FieldError> {
        let mut element = T::default();
        element.scan(RawValue::One(raw)).map_err(FieldError::Parse)?;
        Ok(element)
    }
}
