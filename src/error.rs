//! Failures seen while talking to the chat backend.
//!
//! An [`Error`] comes from one of three places: the backend refused a request
//! ([`Error::Api`]), the bytes never arrived or stopped arriving (the
//! transport variants), or the crate was handed something it cannot use
//! ([`Error::Validation`], [`Error::Url`]).  Only chat exchange failures are
//! written into the transcript; follow-up and liveness failures are logged.

use std::error;
use std::fmt;
use std::str::Utf8Error;
use std::sync::Arc;
use std::time::Duration;

/// An underlying failure, shared so that [`Error`] stays `Clone`.
pub type Cause = Arc<dyn error::Error + Send + Sync>;

/// Everything that can go wrong between a session and its backend.
#[derive(Clone, Debug)]
pub enum Error {
    /// The backend answered with a non-success HTTP status.
    Api {
        status_code: u16,
        /// The body's `detail`, the raw body, or the canonical reason.
        message: String,
    },

    /// No connection could be made.
    Connection { message: String, source: Option<Cause> },

    /// Connecting or pinging took longer than allowed.
    Timeout { message: String, after: Duration },

    /// A request could not be sent for some other reason.
    HttpClient { message: String, source: Option<Cause> },

    /// A JSON response body did not have the expected shape.
    Serialization { message: String, source: Option<Cause> },

    /// The chat body broke off mid-stream.
    Streaming { message: String, source: Option<Cause> },

    /// The chat body was not valid UTF-8.
    Encoding { message: String, source: Utf8Error },

    /// A setting or argument was rejected before any request was made.
    Validation {
        message: String,
        /// Name of the offending setting.
        param: Option<String>,
    },

    /// The backend URL did not parse.
    Url { message: String, source: url::ParseError },
}

impl Error {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn timeout(message: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            message: message.into(),
            after,
        }
    }

    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Cause::from),
        }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// True when the failure happened on the wire rather than in the backend.
    ///
    /// A body that fails to decode counts as a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. }
                | Error::Timeout { .. }
                | Error::HttpClient { .. }
                | Error::Streaming { .. }
                | Error::Encoding { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// The HTTP status the backend answered with, if it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                message,
            } => write!(f, "HTTP {status_code}: {message}"),
            Error::Connection { message, .. } => write!(f, "cannot reach backend: {message}"),
            Error::Timeout { message, after } => {
                write!(f, "gave up after {}s: {message}", after.as_secs_f64())
            }
            Error::HttpClient { message, .. } => write!(f, "request not sent: {message}"),
            Error::Serialization { message, .. } => write!(f, "unexpected payload: {message}"),
            Error::Streaming { message, .. } => write!(f, "answer interrupted: {message}"),
            Error::Encoding { message, .. } => write!(f, "undecodable answer: {message}"),
            Error::Validation {
                message,
                param: Some(param),
            } => write!(f, "invalid {param}: {message}"),
            Error::Validation {
                message,
                param: None,
            } => write!(f, "invalid setting: {message}"),
            Error::Url { message, .. } => write!(f, "bad backend URL: {message}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::Streaming { source, .. } => source
                .as_deref()
                .map(|cause| cause as &(dyn error::Error + 'static)),
            Error::Encoding { source, .. } => Some(source),
            Error::Url { source, .. } => Some(source),
            Error::Api { .. } | Error::Timeout { .. } | Error::Validation { .. } => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Url {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::Encoding {
            message: format!("invalid UTF-8 in response body: {err}"),
            source: err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
