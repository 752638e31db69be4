//! Binder configuration.
//!
//! [`BinderConfig`] controls the method gate on query binding and the body
//! size limits. It deserializes from TOML with unknown keys rejected:
//!
//! ```toml
//! query_binding = "always"
//! max_body_size = 2097152
//!
//! [multipart]
//! max_body_size = 52428800
//! max_field_size = 10485760
//! max_fields = 100
//! ```

use http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum body size for JSON, XML and URL-encoded bodies (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default maximum total body size for multipart (50 MB).
pub const DEFAULT_MULTIPART_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum size per multipart field (10 MB).
pub const DEFAULT_MULTIPART_MAX_FIELD_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum number of multipart fields.
pub const DEFAULT_MULTIPART_MAX_FIELDS: usize = 100;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// When [`DefaultBinder::bind`](crate::DefaultBinder::bind) reads the query
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryBinding {
    /// Only for GET, DELETE and HEAD requests.
    ///
    /// A request such as `POST /nodes?id=1` with body `{"id":100}` would
    /// otherwise bind the query value first and leave it in place for any
    /// field the body omits.
    #[default]
    SafeMethods,
    /// For every method.
    Always,
    /// Never; query values are only bound through `bind_query_params`.
    Never,
}

impl QueryBinding {
    /// Whether query parameters are bound for `method`.
    #[must_use]
    pub fn applies_to(self, method: &Method) -> bool {
        match self {
            Self::SafeMethods => {
                method == Method::GET || method == Method::DELETE || method == Method::HEAD
            }
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Limits applied by [`MultipartForm::parse`](crate::MultipartForm::parse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum size per field in bytes.
    pub max_field_size: usize,
    /// Maximum number of fields allowed.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MULTIPART_MAX_BODY_SIZE,
            max_field_size: DEFAULT_MULTIPART_MAX_FIELD_SIZE,
            max_fields: DEFAULT_MULTIPART_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the maximum field size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// Configuration for [`DefaultBinder`](crate::DefaultBinder).
///
/// # Example
///
/// ```
/// use syndesis::{BinderConfig, QueryBinding};
///
/// let config = BinderConfig::from_toml_str(r#"query_binding = "always""#).unwrap();
/// assert_eq!(config.query_binding, QueryBinding::Always);
/// assert_eq!(config.max_body_size, syndesis::config::DEFAULT_MAX_BODY_SIZE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BinderConfig {
    /// Method gate for query binding inside `bind`.
    pub query_binding: QueryBinding,
    /// Maximum size of JSON, XML and URL-encoded bodies in bytes.
    pub max_body_size: usize,
    /// Multipart parsing limits.
    pub multipart: MultipartConfig,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            query_binding: QueryBinding::default(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            multipart: MultipartConfig::default(),
        }
    }
}

impl BinderConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the query binding policy.
    #[must_use]
    pub fn query_binding(mut self, policy: QueryBinding) -> Self {
        self.query_binding = policy;
        self
    }

    /// Set the body size limit.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the multipart limits.
    #[must_use]
    pub fn multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a size limit is zero or the
    /// per-field multipart limit exceeds the total limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_size == 0 {
            return Err(ConfigError::invalid_value("max_body_size", "must be greater than 0"));
        }
        if self.multipart.max_body_size == 0 {
            return Err(ConfigError::invalid_value(
                "multipart.max_body_size",
                "must be greater than 0",
            ));
        }
        if self.multipart.max_field_size > self.multipart.max_body_size {
            return Err(ConfigError::invalid_value(
                "multipart.max_field_size",
                "must not exceed multipart.max_body_size",
            ));
        }
        if self.multipart.max_fields == 0 {
            return Err(ConfigError::invalid_value(
                "multipart.max_fields",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
