//! Core error types for cbvtoolkit.
//!
//! [`ToolkitError`] covers the failures a view can surface: HTTP-level
//! rejections, configuration mistakes in a view definition, data-source
//! contract violations, template failures and I/O. Each variant maps to an
//! HTTP status code via [`ToolkitError::status_code`].

use thiserror::Error;

/// The primary error type for cbvtoolkit.
///
/// Configuration and lookup errors signal programming mistakes in a view
/// definition or its data source. They are propagated to the dispatch
/// boundary and surface as server errors; they are never recovered inside a
/// view.
#[derive(Error, Debug)]
pub enum ToolkitError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 403 Forbidden / Permission Denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// HTTP 413 Payload Too Large.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings file or value could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A view is missing required static configuration.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Data sources ─────────────────────────────────────────────────

    /// A record handed to a tabular view lacks one of the declared columns.
    #[error("Record {row} is missing column '{column}'")]
    MissingColumn {
        /// The declared column that was absent.
        column: String,
        /// Zero-based index of the offending record.
        row: usize,
    },

    /// Writing delimited output failed.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    // ── Templates ────────────────────────────────────────────────────

    /// The requested template was not found.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    /// Rendering a template failed.
    #[error("Template error: {0}")]
    TemplateError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ToolkitError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `BadRequest` -> 400
    /// - `PermissionDenied` -> 403
    /// - `NotFound` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - `PayloadTooLarge` -> 413
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::PayloadTooLarge(_) => 413,
            Self::InternalServerError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::MissingColumn { .. }
            | Self::EncodingError(_)
            | Self::TemplateDoesNotExist(_)
            | Self::TemplateError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for errors caused by a mistake in a view definition
    /// rather than by the request.
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::ImproperlyConfigured(_) | Self::MissingColumn { .. }
        )
    }
}

/// A convenience type alias for `Result<T, ToolkitError>`.
pub type ToolkitResult<T> = Result<T, ToolkitError>;
