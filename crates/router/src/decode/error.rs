use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The coarse classification every [`DecodeError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    InvalidContentType,
    InvalidStructPointer,
    RequiredFieldMissing,
    UnsupportedType,
    ParseError,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content type: {content_type:?}")]
    InvalidContentType { content_type: String },

    #[error("{type_name} is not a record with named fields")]
    InvalidStructPointer { type_name: &'static str },

    #[error("required field {key} not found")]
    RequiredFieldMissing { key: String },

    #[error("unsupported type {type_name} for field {key}, implement Scan to decode it")]
    UnsupportedType { key: String, type_name: &'static str },

    #[error("invalid value for field {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid body: {source}")]
    InvalidBody {
        #[source]
        source: BoxError,
    },
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::InvalidContentType { .. } => DecodeErrorKind::InvalidContentType,
            DecodeError::InvalidStructPointer { .. } => DecodeErrorKind::InvalidStructPointer,
            DecodeError::RequiredFieldMissing { .. } => DecodeErrorKind::RequiredFieldMissing,
            DecodeError::UnsupportedType { .. } => DecodeErrorKind::UnsupportedType,
            DecodeError::InvalidValue { .. } | DecodeError::InvalidBody { .. } => DecodeErrorKind::ParseError,
        }
    }

    /// The external key the error is about, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            DecodeError::RequiredFieldMissing { key }
            | DecodeError::UnsupportedType { key, .. }
            | DecodeError::InvalidValue { key, .. } => Some(key),
            _ => None,
        }
    }

    pub(crate) fn invalid_body<E: Into<BoxError>>(source: E) -> Self {
        DecodeError::InvalidBody { source: source.into() }
    }
}

/// Failure of a single field setter, before it is tied to an external key.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("{0}")]
    Parse(BoxError),

    #[error("unsupported type {0}")]
    Unsupported(&'static str),
}

impl FieldError {
    pub fn parse<E: Into<BoxError>>(source: E) -> Self {
        FieldError::Parse(source.into())
    }

    pub(crate) fn with_key(self, key: &str) -> DecodeError {
        match self {
            FieldError::Parse(source) => DecodeError::InvalidValue { key: key.to_owned(), source },
            FieldError::Unsupported(type_name) => DecodeError::UnsupportedType { key: key.to_owned(), type_name },
        }
    }
}
