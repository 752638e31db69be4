//! Request view consumed by the binder.
//!
//! The [`BindContext`] carries exactly what binding needs from a request:
//! method, URI (for the query string), headers, body bytes, matched path
//! parameters and, for multipart requests, the parsed form.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, Uri};

use crate::config::MultipartConfig;
use crate::error::BindError;
use crate::multipart::MultipartForm;
use crate::params::Params;

/// Request data available to a bind call.
///
/// # Example
///
/// ```rust
/// use syndesis::BindContext;
/// use http::Method;
///
/// let ctx = BindContext::builder()
///     .method(Method::POST)
///     .uri("/nodes/real_node?node=xxx".parse().unwrap())
///     .path_param("node", "real_node")
///     .header("content-type", "application/json")
///     .body(r#"{"node":"zzz"}"#)
///     .build();
///
/// assert_eq!(ctx.query_string(), Some("node=xxx"));
/// assert_eq!(ctx.content_type(), Some("application/json"));
/// assert_eq!(ctx.path_params().get("node"), Some("real_node"));
/// ```
#[derive(Debug, Clone)]
pub struct BindContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
    multipart: Option<MultipartForm>,
}

impl BindContext {
    /// Creates a context without a parsed multipart form.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes, path_params: Params) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            path_params,
            multipart: None,
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> BindContextBuilder {
        BindContextBuilder::default()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the raw query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the matched path parameters.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns the parsed multipart form, if one was attached.
    #[must_use]
    pub fn multipart(&self) -> Option<&MultipartForm> {
        self.multipart.as_ref()
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Parses a `multipart/form-data` body and attaches the result.
    ///
    /// Does nothing for other content types or when a form is already
    /// attached.
    pub async fn parse_multipart(&mut self, config: &MultipartConfig) -> Result<(), BindError> {
        if self.multipart.is_some() {
            return Ok(());
        }
        let Some(content_type) = self.content_type().map(str::to_owned) else {
            return Ok(());
        };
        if !content_type
            .to_ascii_lowercase()
            .starts_with(mime::MULTIPART_FORM_DATA.as_ref())
        {
            return Ok(());
        }
        let form = MultipartForm::parse(&content_type, self.body.clone(), config).await?;
        self.multipart = Some(form);
        Ok(())
    }
}

/// Builder for [`BindContext`].
///
/// Method defaults to GET and URI to `/`.
#[derive(Debug)]
pub struct BindContextBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
    multipart: Option<MultipartForm>,
}

impl Default for BindContextBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: Params::new(),
            multipart: None,
        }
    }
}

impl BindContextBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn path_params(mut self, params: Params) -> Self {
        self.path_params = params;
        self
    }

    /// Appends a single path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Attaches a parsed multipart form.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.multipart = Some(form);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> BindContext {
        BindContext {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            path_params: self.path_params,
            multipart: self.multipart,
        }
    }
}
