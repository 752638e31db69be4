//! The request binder.
//!
//! [`DefaultBinder`] sequences the individual sources onto one destination.
//! Each step overlays the previous ones field by field, and a failing step
//! leaves earlier writes in place.
//!
//! | Step | Source | Runs in `bind` |
//! |------|--------|----------------|
//! | 1 | path parameters | always |
//! | 2 | query string | per [`QueryBinding`](crate::QueryBinding) |
//! | 3 | body | always |
//!
//! Headers are never bound by `bind`; call [`DefaultBinder::bind_headers`]
//! separately.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::body::{self, BodyCodec};
use crate::config::BinderConfig;
use crate::context::BindContext;
use crate::error::BindError;
use crate::multipart::FileMap;
use crate::resolve::Resolver;
use crate::shape::{Target, TargetMut};
use crate::source::{SourceKind, SourceMap};

/// Binds request data onto [`Target`] destinations.
///
/// The binder keeps no state between calls and can be shared freely.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use syndesis::{Bind, BindContext, DefaultBinder};
/// use http::Method;
///
/// #[derive(Debug, Default, Serialize, Deserialize, Bind)]
/// #[serde(default)]
/// struct Node {
///     #[bind(path = "node", query = "node")]
///     node: String,
/// }
///
/// let ctx = BindContext::builder()
///     .method(Method::POST)
///     .uri("/nodes/real_node?node=xxx".parse().unwrap())
///     .path_param("node", "real_node")
///     .header("content-type", "application/json")
///     .body(r#"{"node":"zzz"}"#)
///     .build();
///
/// let mut node = Node::default();
/// DefaultBinder::new().bind(&mut node, &ctx).unwrap();
/// assert_eq!(node.node, "zzz");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultBinder {
    config: BinderConfig,
}

impl DefaultBinder {
    /// Creates a binder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a binder with the given configuration.
    #[must_use]
    pub fn with_config(config: BinderConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Binds path parameters, then query parameters, then the body.
    ///
    /// Sequence destinations skip straight to the body.
    ///
    /// # Errors
    ///
    /// Returns the first error in step order. Fields written by earlier
    /// steps keep their values.
    pub fn bind<T>(&self, dest: &mut T, ctx: &BindContext) -> Result<(), BindError>
    where
        T: Target + Serialize + DeserializeOwned,
    {
        if matches!(dest.target_mut(), TargetMut::Sequence) {
            debug!("sequence destination, binding body only");
            return self.bind_body(dest, ctx);
        }

        self.bind_path_params(dest, ctx)?;

        if self.config.query_binding.applies_to(ctx.method()) {
            self.bind_query_params(dest, ctx)?;
        } else {
            debug!(method = %ctx.method(), "query binding skipped for method");
        }

        self.bind_body(dest, ctx)
    }

    /// Binds the request body only.
    ///
    /// An empty body leaves the destination unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported or missing content types, oversized
    /// bodies, malformed bodies, and values that do not fit their fields.
    pub fn bind_body<T>(&self, dest: &mut T, ctx: &BindContext) -> Result<(), BindError>
    where
        T: Target + Serialize + DeserializeOwned,
    {
        if ctx.body().is_empty() && ctx.multipart().is_none() {
            debug!("empty body, nothing to bind");
            return Ok(());
        }

        let content_type = ctx.content_type();
        let codec = content_type
            .and_then(BodyCodec::detect)
            .ok_or_else(|| BindError::unsupported_media_type(content_type))?;

        if codec != BodyCodec::Multipart && ctx.body().len() > self.config.max_body_size {
            return Err(BindError::payload_too_large(
                self.config.max_body_size,
                ctx.body().len(),
            ));
        }

        debug!(?codec, bytes = ctx.body().len(), "binding body");
        match codec {
            BodyCodec::Json => body::decode_json(ctx.body(), dest),
            BodyCodec::Xml => body::decode_xml(ctx.body(), dest),
            BodyCodec::Form => {
                let values = body::form_values(ctx, codec)?;
                Self::bind_form(dest, &values, None)
            }
            BodyCodec::Multipart => {
                let form = ctx.multipart().ok_or_else(|| {
                    BindError::malformed_body(
                        "multipart form has not been parsed",
                        "call BindContext::parse_multipart before binding",
                    )
                })?;
                let values = body::form_values(ctx, codec)?;
                Self::bind_form(dest, &values, Some(form.files()))
            }
        }
    }

    /// Binds request headers only.
    ///
    /// # Errors
    ///
    /// Returns an error when a header value does not coerce into its field.
    pub fn bind_headers<T: Target>(&self, dest: &mut T, ctx: &BindContext) -> Result<(), BindError> {
        let values = SourceMap::from_headers(ctx.headers());
        Self::bind_source(dest, &values, SourceKind::Header)
    }

    /// Binds path parameters only.
    ///
    /// # Errors
    ///
    /// Returns an error when a parameter does not coerce into its field.
    pub fn bind_path_params<T: Target>(
        &self,
        dest: &mut T,
        ctx: &BindContext,
    ) -> Result<(), BindError> {
        let values = SourceMap::from_params(ctx.path_params());
        Self::bind_source(dest, &values, SourceKind::Path)
    }

    /// Binds query parameters only, regardless of method.
    ///
    /// # Errors
    ///
    /// Returns an error for an undecodable query string or when a parameter
    /// does not coerce into its field.
    pub fn bind_query_params<T: Target>(
        &self,
        dest: &mut T,
        ctx: &BindContext,
    ) -> Result<(), BindError> {
        let values = match ctx.query_string() {
            Some(query) => SourceMap::from_query(query)?,
            None => SourceMap::new(),
        };
        Self::bind_source(dest, &values, SourceKind::Query)
    }

    fn bind_source<T: Target>(
        dest: &mut T,
        values: &SourceMap,
        kind: SourceKind,
    ) -> Result<(), BindError> {
        debug!(source = %kind, keys = values.len(), "binding source");
        let resolver = Resolver::new(kind, values);
        match dest.target_mut() {
            TargetMut::Struct(target) => resolver.bind_struct(target),
            TargetMut::Map(target) => {
                resolver.bind_map(target);
                Ok(())
            }
            TargetMut::Sequence => Ok(()),
        }
    }

    fn bind_form<T: Target>(
        dest: &mut T,
        values: &SourceMap,
        files: Option<&FileMap>,
    ) -> Result<(), BindError> {
        debug!(source = %SourceKind::Form, keys = values.len(), "binding source");
        let mut resolver = Resolver::new(SourceKind::Form, values);
        if let Some(files) = files {
            resolver = resolver.with_files(files);
        }
        match dest.target_mut() {
            TargetMut::Struct(target) => resolver.bind_struct(target),
            TargetMut::Map(target) => {
                resolver.bind_map(target);
                Ok(())
            }
            TargetMut::Sequence if resolver.is_empty() => Ok(()),
            TargetMut::Sequence => Err(BindError::configuration(
                "binding element must be a struct",
            )
            .in_source(SourceKind::Form)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryBinding;
    use crate::BindErrorKind;
    use http::Method;
    use std::collections::HashMap;

    fn post_json(body: &'static str) -> BindContext {
        BindContext::builder()
            .method(Method::POST)
            .header("content-type", "application/json")
            .body(body)
            .build()
    }

    #[test]
    fn test_unsupported_media_type() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .header("content-type", "text/plain")
            .body("hello")
            .build();
        let mut dest: HashMap<String, String> = HashMap::new();

        let err = DefaultBinder::new().bind_body(&mut dest, &ctx).unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::UnsupportedMediaType);
        assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_missing_content_type_with_body() {
        let ctx = BindContext::builder().method(Method::POST).body("x").build();
        let mut dest: HashMap<String, String> = HashMap::new();

        let err = DefaultBinder::new().bind_body(&mut dest, &ctx).unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::UnsupportedMediaType);
    }

    #[test]
    fn test_empty_body_is_ok() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .header("content-type", "text/plain")
            .build();
        let mut dest: Vec<i32> = vec![1];

        DefaultBinder::new().bind_body(&mut dest, &ctx).unwrap();
        assert_eq!(dest, vec![1]);
    }

    #[test]
    fn test_body_limit() {
        let binder = DefaultBinder::with_config(BinderConfig::default().max_body_size(4));
        let mut dest: HashMap<String, String> = HashMap::new();

        let err = binder.bind_body(&mut dest, &post_json(r#"{"a":"b"}"#)).unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::PayloadTooLarge);
        assert!(dest.is_empty());
    }

    #[test]
    fn test_map_destination_from_query() {
        let ctx = BindContext::builder()
            .uri("/?id=1&id=2&name=jon".parse().unwrap())
            .build();
        let mut dest: HashMap<String, Vec<String>> = HashMap::new();

        DefaultBinder::new().bind(&mut dest, &ctx).unwrap();
        assert_eq!(dest["id"], vec!["1", "2"]);
        assert_eq!(dest["name"], vec!["jon"]);
    }

    #[test]
    fn test_sequence_ignores_path_and_query() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .uri("/?id=9".parse().unwrap())
            .path_param("id", "8")
            .header("content-type", "application/json")
            .body("[1,2]")
            .build();
        let mut dest: Vec<i64> = Vec::new();

        DefaultBinder::new().bind(&mut dest, &ctx).unwrap();
        assert_eq!(dest, vec![1, 2]);
    }

    #[test]
    fn test_form_onto_sequence_is_rejected() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .header("content-type", "application/x-www-form-urlencoded")
            .body("id=1")
            .build();
        let mut dest: Vec<i64> = Vec::new();

        let err = DefaultBinder::new().bind_body(&mut dest, &ctx).unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::Configuration);
        assert_eq!(err.to_string(), "binding element must be a struct");
    }

    #[test]
    fn test_query_gate_follows_config() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .uri("/?id=1".parse().unwrap())
            .build();

        let mut gated: HashMap<String, String> = HashMap::new();
        DefaultBinder::new().bind(&mut gated, &ctx).unwrap();
        assert!(gated.is_empty());

        let mut always: HashMap<String, String> = HashMap::new();
        DefaultBinder::with_config(BinderConfig::default().query_binding(QueryBinding::Always))
            .bind(&mut always, &ctx)
            .unwrap();
        assert_eq!(always["id"], "1");
    }

    #[test]
    fn test_unparsed_multipart_is_malformed() {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .header("content-type", "multipart/form-data; boundary=B")
            .body("--B--\r\n")
            .build();
        let mut dest: HashMap<String, String> = HashMap::new();

        let err = DefaultBinder::new().bind_body(&mut dest, &ctx).unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::MalformedBody);
    }
}
