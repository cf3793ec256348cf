//! Request-time failures raised by argument checks and provider methods.
//!
//! A [`Failure`] is either opaque ([`Failure::Generic`]), in which case the client only ever
//! sees a `500` with a fixed body, or it carries an explicit status ([`Failure::Status`]), in
//! which case its code and message are written to the client as-is. Redirect codes
//! (`301`, `302`, `303`) additionally carry the target location.

use http::StatusCode;
use std::error::Error;
use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::str::ParseBoolError;
use thiserror::Error;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Failure {
    /// An opaque failure, its message is only ever logged server-side.
    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A failure the provider author chose to expose to the client.
    #[error("{message}")]
    Status { code: StatusCode, message: String, location: Option<String> },
}

impl Failure {
    pub fn generic<S: ToString>(message: S) -> Self {
        Self::Generic { message: message.to_string(), source: None }
    }

    pub fn from_error<E: Into<BoxError>>(error: E) -> Self {
        let source = error.into();
        Self::Generic { message: source.to_string(), source: Some(source) }
    }

    pub fn status<S: ToString>(code: StatusCode, message: S) -> Self {
        Self::Status { code, message: message.to_string(), location: None }
    }

    /// A failure with an explicit code and a target location.
    ///
    /// The location is only written to the response when `code` is one of
    /// `301`, `302` or `303`.
    pub fn redirect<S: ToString, L: Into<String>>(code: StatusCode, message: S, location: L) -> Self {
        Self::Status { code, message: message.to_string(), location: Some(location.into()) }
    }

    pub fn moved_permanently<L: Into<String>>(location: L) -> Self {
        Self::redirect(StatusCode::MOVED_PERMANENTLY, "Moved Permanently", location)
    }

    pub fn found<L: Into<String>>(location: L) -> Self {
        Self::redirect(StatusCode::FOUND, "Found", location)
    }

    pub fn see_other<L: Into<String>>(location: L) -> Self {
        Self::redirect(StatusCode::SEE_OTHER, "See Other", location)
    }

    /// The status this failure is answered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Failure::Generic { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Failure::Status { code, .. } => *code,
        }
    }

    /// Whether this failure carries an explicit status code.
    pub fn is_classified(&self) -> bool {
        matches!(self, Failure::Status { .. })
    }

    /// The location that would be sent with this failure, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            Failure::Status { code, location: Some(location), .. } if is_redirect(*code) => Some(location),
            _ => None,
        }
    }
}

pub(crate) fn is_redirect(code: StatusCode) -> bool {
    code == StatusCode::MOVED_PERMANENTLY || code == StatusCode::FOUND || code == StatusCode::SEE_OTHER
}

macro_rules! impl_from_error_for_failure {
    ($($error:ty),*) => {
        $(
        impl From<$error> for Failure {
            fn from(error: $error) -> Self {
                Failure::from_error(error)
            }
        }
        )*
    };
}

impl_from_error_for_failure!(io::Error, ParseIntError, ParseFloatError, ParseBoolError);
