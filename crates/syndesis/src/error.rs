//! Binding error types.
//!
//! Every failure surfaced by the binder is a [`BindError`]. The error records
//! which source was being bound, which field and raw value were involved,
//! and keeps the underlying cause reachable through
//! [`std::error::Error::source`] so callers can inspect codec or custom
//! unmarshal errors without string matching.

use http::StatusCode;
use std::error::Error as StdError;
use std::fmt;

use crate::coerce::CoerceError;
use crate::source::SourceKind;

/// Boxed error used for causes and custom unmarshal failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Category of a binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindErrorKind {
    /// The declared body content type has no registered codec.
    UnsupportedMediaType,
    /// The body exceeds the configured size limit.
    PayloadTooLarge,
    /// The body could not be parsed at all (syntax error, truncated input).
    MalformedBody,
    /// The body parsed but a value does not fit the destination type.
    TypeMismatch,
    /// A path, query, header or form value could not be coerced.
    FieldCoercion,
    /// The destination shape cannot be bound as declared.
    Configuration,
}

/// Error returned by every binder entry point.
///
/// # Example
///
/// ```rust
/// use syndesis::{BindError, BindErrorKind};
/// use http::StatusCode;
///
/// let err = BindError::unsupported_media_type(Some("text/plain"));
/// assert_eq!(err.kind(), BindErrorKind::UnsupportedMediaType);
/// assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
/// assert!(err.to_string().contains("text/plain"));
/// ```
#[derive(Debug)]
pub struct BindError {
    kind: BindErrorKind,
    source_kind: Option<SourceKind>,
    field: Option<String>,
    value: Option<String>,
    position: Option<(usize, usize)>,
    message: String,
    cause: Option<BoxError>,
}

impl BindError {
    fn new(kind: BindErrorKind, message: String) -> Self {
        Self {
            kind,
            source_kind: None,
            field: None,
            value: None,
            position: None,
            message,
            cause: None,
        }
    }

    fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Creates an error for a body whose content type has no codec.
    #[must_use]
    pub fn unsupported_media_type(actual: Option<&str>) -> Self {
        let actual = actual.filter(|s| !s.is_empty()).unwrap_or("none");
        Self::new(
            BindErrorKind::UnsupportedMediaType,
            format!("unsupported content type '{actual}'"),
        )
    }

    /// Creates an error for a body larger than the configured limit.
    #[must_use]
    pub fn payload_too_large(max_size: usize, actual_size: usize) -> Self {
        Self::new(
            BindErrorKind::PayloadTooLarge,
            format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
        )
    }

    /// Creates an error for a body that could not be parsed.
    #[must_use]
    pub fn malformed_body(details: impl fmt::Display, cause: impl Into<BoxError>) -> Self {
        Self::new(
            BindErrorKind::MalformedBody,
            format!("malformed request body: {details}"),
        )
        .with_cause(cause)
    }

    /// Creates an error for a decoded body value that does not fit its field.
    ///
    /// `field` is the codec's path to the offending value, empty when the
    /// mismatch is at the document root.
    #[must_use]
    pub fn type_mismatch(
        field: impl Into<String>,
        details: impl fmt::Display,
        cause: Option<BoxError>,
    ) -> Self {
        let field = field.into();
        let mut err = if field.is_empty() || field == "." {
            Self::new(
                BindErrorKind::TypeMismatch,
                format!("type mismatch in request body: {details}"),
            )
        } else {
            let mut err = Self::new(
                BindErrorKind::TypeMismatch,
                format!("type mismatch for field '{field}': {details}"),
            );
            err.field = Some(field);
            err
        };
        err.cause = cause;
        err
    }

    /// Creates an error for a raw string value that failed coercion.
    #[must_use]
    pub fn field_coercion(
        source: SourceKind,
        field: impl Into<String>,
        values: &[String],
        cause: CoerceError,
    ) -> Self {
        let field = field.into();
        let value = match values {
            [single] => single.clone(),
            many => many.join(","),
        };
        let message = if cause.mentions_value() {
            format!("invalid {source} parameter '{field}': {cause}")
        } else {
            format!("invalid {source} parameter '{field}' (value {value:?}): {cause}")
        };
        Self {
            kind: BindErrorKind::FieldCoercion,
            source_kind: Some(source),
            field: Some(field),
            value: Some(value),
            position: None,
            message,
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates an error for a destination that cannot be bound as declared.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(BindErrorKind::Configuration, message.into())
    }

    pub(crate) fn in_source(mut self, source: SourceKind) -> Self {
        self.source_kind = Some(source);
        self
    }

    pub(crate) fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub(crate) fn at_position(mut self, line: usize, column: usize) -> Self {
        self.message = format!("{} at line {line} column {column}", self.message);
        self.position = Some((line, column));
        self
    }

    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> BindErrorKind {
        self.kind
    }

    /// Returns the source kind being bound when the error occurred.
    ///
    /// `None` for body-level failures.
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source_kind
    }

    /// Returns the field name or codec path, if known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the raw input value that failed coercion, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the 1-based line and column in the body where a type
    /// mismatch was found, when the codec reports one.
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        self.position
    }

    /// Returns the HTTP status this error should be rendered with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            BindErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BindErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BindErrorKind::MalformedBody
            | BindErrorKind::TypeMismatch
            | BindErrorKind::FieldCoercion
            | BindErrorKind::Configuration => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            BindErrorKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            BindErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            BindErrorKind::MalformedBody => "MALFORMED_BODY",
            BindErrorKind::TypeMismatch => "TYPE_MISMATCH",
            BindErrorKind::FieldCoercion => "INVALID_PARAMETER",
            BindErrorKind::Configuration => "BINDING_CONFIGURATION",
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for BindError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_media_type_error() {
        let err = BindError::unsupported_media_type(Some("text/plain"));

        assert_eq!(err.kind(), BindErrorKind::UnsupportedMediaType);
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.error_code(), "UNSUPPORTED_MEDIA_TYPE");
        assert!(err.to_string().contains("text/plain"));
        assert!(err.source_kind().is_none());

        let missing = BindError::unsupported_media_type(None);
        assert!(missing.to_string().contains("none"));
    }

    #[test]
    fn test_payload_too_large_error() {
        let err = BindError::payload_too_large(1024, 2048);

        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn test_field_coercion_error_names_raw_value() {
        let cause = CoerceError::Int {
            value: "nope".to_string(),
            source: "nope".parse::<i32>().unwrap_err(),
        };
        let err = BindError::field_coercion(SourceKind::Query, "id", &["nope".to_string()], cause);

        assert_eq!(err.kind(), BindErrorKind::FieldCoercion);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.source_kind(), Some(SourceKind::Query));
        assert_eq!(err.field(), Some("id"));
        assert_eq!(err.value(), Some("nope"));
        assert!(err.to_string().contains("\"nope\""));
        assert!(err.to_string().contains("query"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_custom_coercion_error_appends_value() {
        let cause = CoerceError::Custom("not a timestamp".into());
        let values = vec!["a".to_string(), "b".to_string()];
        let err = BindError::field_coercion(SourceKind::Header, "ts", &values, cause);

        assert_eq!(err.value(), Some("a,b"));
        assert!(err.to_string().contains("not a timestamp"));
        assert!(err.to_string().contains("\"a,b\""));
    }

    #[test]
    fn test_type_mismatch_error() {
        let err = BindError::type_mismatch("id", "invalid type: string \"text\", expected i64", None);

        assert_eq!(err.kind(), BindErrorKind::TypeMismatch);
        assert_eq!(err.field(), Some("id"));
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
        assert!(err.to_string().contains("'id'"));

        let root = BindError::type_mismatch(".", "expected object", None);
        assert_eq!(root.field(), None);
        assert_eq!(root.position(), None);

        let placed = err.at_position(1, 13);
        assert_eq!(placed.position(), Some((1, 13)));
        assert!(placed.to_string().ends_with("at line 1 column 13"));
    }

    #[test]
    fn test_malformed_body_keeps_cause() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = BindError::malformed_body(&cause, cause.to_string());

        assert_eq!(err.kind(), BindErrorKind::MalformedBody);
        assert_eq!(err.error_code(), "MALFORMED_BODY");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_configuration_error() {
        let err = BindError::configuration("unsupported field type `Foo`")
            .in_source(SourceKind::Form)
            .on_field("foo");

        assert_eq!(err.kind(), BindErrorKind::Configuration);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.source_kind(), Some(SourceKind::Form));
        assert_eq!(err.field(), Some("foo"));
    }
}
