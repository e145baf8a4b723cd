//! Core error types for webplus-rs.
//!
//! [`WebplusError`] covers template lookup and syntax failures, locale
//! loading failures, missing configuration keys and environment variables,
//! and the handful of HTTP-level conditions the demo server produces.

use thiserror::Error;

/// The primary error type for webplus-rs.
///
/// Each variant maps to an HTTP status code via [`WebplusError::status_code`].
/// A missing translation key is deliberately absent from this enum: lookups
/// fall back to a sentinel string instead of failing.
#[derive(Error, Debug)]
pub enum WebplusError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The application is improperly configured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A required key is absent from the site configuration file.
    #[error("Missing configuration key: {0}")]
    ConfigKeyMissing(String),

    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    EnvVarMissing(String),

    // ── Templates ────────────────────────────────────────────────────

    /// A template contains invalid syntax.
    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(String),

    /// The requested template was not found in any search directory.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Locales ──────────────────────────────────────────────────────

    /// A locale file line could not be split into a key and a value.
    #[error("Malformed locale file {file}, line {line}: {content:?}")]
    LocaleFileMalformed {
        /// The offending file.
        file: String,
        /// One-based line number.
        line: usize,
        /// The line as read.
        content: String,
    },

    // ── IO ───────────────────────────────────────────────────────────

    /// A file was not valid text in the expected encoding.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WebplusError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `NotFound` -> 404
    /// - Everything else -> 500
    ///
    /// `TemplateDoesNotExist` stays a server error: a view asking for a
    /// template that is not installed is a deployment fault, not a bad URL.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InternalServerError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::ConfigKeyMissing(_)
            | Self::EnvVarMissing(_)
            | Self::TemplateSyntaxError(_)
            | Self::TemplateDoesNotExist(_)
            | Self::LocaleFileMalformed { .. }
            | Self::EncodingError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` if this error reports a template missing from every
    /// search directory.
    pub const fn is_template_not_found(&self) -> bool {
        matches!(self, Self::TemplateDoesNotExist(_))
    }
}

/// A convenience type alias for `Result<T, WebplusError>`.
pub type WebplusResult<T> = Result<T, WebplusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebplusError::NotFound("x".into()).status_code(), 404);
        assert_eq!(
            WebplusError::InternalServerError("x".into()).status_code(),
            500
        );
        assert_eq!(WebplusError::ConfigKeyMissing("x".into()).status_code(), 500);
        assert_eq!(WebplusError::EnvVarMissing("x".into()).status_code(), 500);
        assert_eq!(
            WebplusError::TemplateSyntaxError("x".into()).status_code(),
            500
        );
        assert_eq!(
            WebplusError::TemplateDoesNotExist("x".into()).status_code(),
            500
        );
    }

    #[test]
    fn test_display() {
        let err = WebplusError::NotFound("page".into());
        assert_eq!(err.to_string(), "Not found: page");

        let err = WebplusError::EnvVarMissing("WP_APP_ID".into());
        assert_eq!(err.to_string(), "Missing environment variable: WP_APP_ID");
    }

    #[test]
    fn test_locale_malformed_display() {
        let err = WebplusError::LocaleFileMalformed {
            file: "locales/en.properties".into(),
            line: 3,
            content: "no separator".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("locales/en.properties"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("no separator"));
    }

    #[test]
    fn test_template_not_found_is_distinguishable() {
        assert!(WebplusError::TemplateDoesNotExist("index".into()).is_template_not_found());
        assert!(!WebplusError::TemplateSyntaxError("index".into()).is_template_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: WebplusError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }
}
