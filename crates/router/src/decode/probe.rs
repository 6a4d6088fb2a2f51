//! Setter selection used by `#[derive(Decode)]`.
//!
//! The derive cannot know whether a field type implements [`FormField`], so it asks a
//! [`FieldProbe`] for a setter through method resolution: `(&FieldProbe::<T>::new()).setter()`
//! picks [`ViaFormField`] when `T: FormField` and falls back to [`ViaUnsupported`] otherwise.
//! The fallback setter reports [`FieldError::Unsupported`] only when a value for the field is
//! actually present.

use std::any::type_name;
use std::marker::PhantomData;

use crate::decode::{FieldError, FieldSetter, FormField, RawValue};

#[derive(Debug)]
pub struct FieldProbe<T>(PhantomData<fn() -> T>);

impl<T> FieldProbe<T> {
    #[allow(clippy::new_without_default, reason = "only constructed by generated code")]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

pub trait ViaFormField {
    type Target;

    fn setter(&self) -> FieldSetter<Self::Target>;
}

impl<T: FormField> ViaFormField for FieldProbe<T> {
    type Target = T;

    fn setter(&self) -> FieldSetter<T> {
        T::decode_field
    }
}

pub trait ViaUnsupported {
    type Target;

    fn setter(&self) -> FieldSetter<Self::Target>;
}

impl<T> ViaUnsupported for &FieldProbe<T> {
    type Target = T;

    fn setter(&self) -> FieldSetter<T> {
        unsupported::<T>
    }
}

fn unsupported<T>(_: &mut T, _: RawValue<'_>) -> Result<(), FieldError> {
    Err(FieldError::Unsupported(type_name::<T>()))
}
