//! Multipart form collaborator.
//!
//! Parsing `multipart/form-data` is asynchronous and happens before binding:
//! [`MultipartForm::parse`] drains the body with `multer` into text values
//! and [`FileHeader`]s, and the parsed form is attached to the
//! [`BindContext`](crate::BindContext). The binder itself only reads the
//! parsed form.
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http::Method;
//! use syndesis::{BindContext, BindError, BinderConfig, MultipartForm};
//!
//! async fn upload_context(content_type: &str, body: Bytes) -> Result<BindContext, BindError> {
//!     let config = BinderConfig::default();
//!     let form = MultipartForm::parse(content_type, body, &config.multipart).await?;
//!     Ok(BindContext::builder()
//!         .method(Method::POST)
//!         .header("content-type", content_type)
//!         .multipart(form)
//!         .build())
//! }
//! ```

use bytes::Bytes;
use indexmap::IndexMap;
use std::io::Cursor;
use tracing::debug;

use crate::config::MultipartConfig;
use crate::error::BindError;
use crate::source::SourceMap;

/// Metadata and contents of one uploaded file part.
///
/// Cloning is cheap: the contents are reference counted and shared with the
/// parsed form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHeader {
    field_name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FileHeader {
    /// Creates a file part.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        filename: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            filename: filename.map(str::to_owned),
            content_type: content_type.map(str::to_owned),
            data,
        }
    }

    /// Returns the form field name the part was sent under.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns the client-supplied file name.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the part's declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the size of the contents in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the contents.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Opens the contents for reading.
    #[must_use]
    pub fn open(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }
}

/// Uploaded files grouped by field name, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMap {
    entries: IndexMap<String, Vec<FileHeader>>,
}

impl FileMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a file under its field name.
    pub fn push(&mut self, file: FileHeader) {
        self.entries
            .entry(file.field_name.clone())
            .or_default()
            .push(file);
    }

    /// Returns the files sent under exactly `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[FileHeader]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Returns true if no files were uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A fully parsed `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    values: SourceMap,
    files: FileMap,
}

impl MultipartForm {
    /// Creates a form from already-separated values and files.
    #[must_use]
    pub fn new(values: SourceMap, files: FileMap) -> Self {
        Self { values, files }
    }

    /// Returns the text fields.
    #[must_use]
    pub fn values(&self) -> &SourceMap {
        &self.values
    }

    /// Returns the uploaded files.
    #[must_use]
    pub fn files(&self) -> &FileMap {
        &self.files
    }

    /// Parses a multipart body.
    ///
    /// Parts carrying a file name become [`FileHeader`]s; every other part
    /// is read as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBody` when the boundary is missing or the body is
    /// not valid multipart, and `PayloadTooLarge` when a configured limit is
    /// exceeded.
    pub async fn parse(
        content_type: &str,
        body: Bytes,
        config: &MultipartConfig,
    ) -> Result<Self, BindError> {
        let boundary = multer::parse_boundary(content_type).map_err(|e| {
            BindError::malformed_body("missing or invalid multipart boundary", e)
        })?;

        if body.len() > config.max_body_size {
            return Err(BindError::payload_too_large(
                config.max_body_size,
                body.len(),
            ));
        }

        let stream =
            futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut form = Self::default();
        let mut field_count = 0_usize;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| BindError::malformed_body(format!("multipart parse error: {e}"), e))?
        {
            field_count += 1;
            if field_count > config.max_fields {
                return Err(BindError::malformed_body(
                    format!("too many multipart fields (max {})", config.max_fields),
                    "field limit exceeded",
                ));
            }

            let name = field.name().unwrap_or_default().to_owned();
            let filename = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(|e| {
                BindError::malformed_body(format!("failed to read field '{name}': {e}"), e)
            })?;

            if data.len() > config.max_field_size {
                return Err(BindError::payload_too_large(
                    config.max_field_size,
                    data.len(),
                ));
            }

            match filename {
                Some(filename) => form.files.push(FileHeader::new(
                    name,
                    Some(&filename),
                    content_type.as_deref(),
                    data,
                )),
                None => {
                    let text = String::from_utf8(data.to_vec()).map_err(|e| {
                        BindError::malformed_body(format!("field '{name}' is not valid UTF-8"), e)
                    })?;
                    form.values.push(name, text);
                }
            }
        }

        debug!(
            values = form.values.len(),
            files = form.files.len(),
            "parsed multipart form"
        );
        Ok(form)
    }
}
