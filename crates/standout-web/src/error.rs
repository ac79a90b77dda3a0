//! Error types for the web layer.
//!
//! [`Error`] is what every render entry point returns. It converts into an
//! HTTP response through [`IntoResponse`]: handler-raised [`HttpError`]s keep
//! their status, everything else is a server fault and becomes a `500` whose
//! body is the diagnostic text (or a generic message with diagnostics off).
//!
//! Responses built with the diagnostic text are marked, and the innermost
//! scope installed by [`setup`](crate::setup) replaces their body when its
//! environment has diagnostics off. `err.into_response()` inside a handler is
//! therefore as safe as the responses the decorator builds.

use std::fmt;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use standout_web_render::RenderError;

/// Result alias for the web layer.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Body used for 500 responses when diagnostics are off.
const GENERIC_FAILURE: &str = "Internal Server Error";

/// Response extension marking a body that carries the failure reason.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiagnosticBody;

/// Strips the [`DiagnosticBody`] marker, hiding the reason when `diagnostics` is off.
pub(crate) fn redact(mut response: Response, diagnostics: bool) -> Response {
    if response.extensions_mut().remove::<DiagnosticBody>().is_some() && !diagnostics {
        response.headers_mut().remove(header::CONTENT_LENGTH);
        *response.body_mut() = Body::from(GENERIC_FAILURE);
    }
    response
}

/// Errors produced while turning a handler result into a response.
#[derive(Debug)]
pub enum Error {
    /// No render environment is installed under this key for the request.
    NotInitialized {
        /// Key that was looked up
        app_key: String,
    },

    /// Template lookup, context validation or rendering failed.
    Render(RenderError),

    /// A context processor returned an error.
    Processor(anyhow::Error),

    /// The wrapped handler returned an error.
    Handler(anyhow::Error),
}

impl Error {
    /// The status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Handler(err) => err
                .downcast_ref::<HttpError>()
                .map(|http| http.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the response for this error.
    ///
    /// With `diagnostics` off, server faults get a generic body; the full
    /// reason is still logged. A body with the reason is still hidden by the
    /// enclosing scope when its environment has diagnostics off.
    pub fn to_response(&self, diagnostics: bool) -> Response {
        if let Error::Handler(err) = self {
            if let Some(http) = err.downcast_ref::<HttpError>() {
                return http.clone().into_response();
            }
        }

        tracing::error!(error = %self, "request failed while rendering");

        let body = if diagnostics {
            self.to_string()
        } else {
            GENERIC_FAILURE.to_string()
        };
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response();
        if diagnostics {
            response.extensions_mut().insert(DiagnosticBody);
        }
        response
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized { app_key } => write!(
                f,
                "Template engine is not initialized, call standout_web::setup(..., app_key={}) first",
                app_key
            ),
            Error::Render(err) => write!(f, "{}", err),
            Error::Processor(err) => write!(f, "context processor failed: {:#}", err),
            Error::Handler(err) => write!(f, "{:#}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotInitialized { .. } => None,
            Error::Render(err) => Some(err),
            Error::Processor(err) | Error::Handler(err) => Some(&**err),
        }
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::Render(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.to_response(true)
    }
}

/// An error carrying its own HTTP status.
///
/// Handlers return it (through `anyhow`) to answer with something other than
/// a rendered page:
///
/// ```rust
/// use standout_web::{handler_fn, HttpError, Rendered};
///
/// let view = handler_fn(|_req| async {
///     Err::<Rendered, _>(HttpError::forbidden())
/// });
/// # let _ = view;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    /// Response status
    pub status: StatusCode,
    /// Response body
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Bare status with its canonical reason as the body.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or_default())
    }

    pub fn forbidden() -> Self {
        Self::from_status(StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::from_status(StatusCode::NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}
