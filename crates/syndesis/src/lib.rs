//! # Syndesis
//!
//! Multi-source request binding: populate one typed destination from the
//! path parameters, query string, headers, form fields, uploaded files and
//! body of a request.
//!
//! Destinations declare their shape once with `#[derive(Bind)]`; the
//! derive records which key each field answers to for every source and
//! picks, at compile time, how raw strings are converted into each field.
//!
//! ## Sources
//!
//! | Source | Attribute | Bound by |
//! |--------|-----------|----------|
//! | Path parameters | `#[bind(path = "..")]` | [`DefaultBinder::bind`], [`DefaultBinder::bind_path_params`] |
//! | Query string | `#[bind(query = "..")]` | [`DefaultBinder::bind`], [`DefaultBinder::bind_query_params`] |
//! | Headers | `#[bind(header = "..")]` | [`DefaultBinder::bind_headers`] |
//! | Form fields and files | `#[bind(form = "..")]` | [`DefaultBinder::bind`], [`DefaultBinder::bind_body`] |
//! | JSON / XML body | serde attributes | [`DefaultBinder::bind`], [`DefaultBinder::bind_body`] |
//!
//! `#[bind(name = "..")]` sets one key for every source. Untagged fields
//! match query keys by field name as long as no field declares a query tag.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use serde::{Deserialize, Serialize};
//! use syndesis::{Bind, BindContext, DefaultBinder};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Bind)]
//! #[serde(default)]
//! struct Search {
//!     #[bind(query = "q")]
//!     term: String,
//!     #[bind(query = "page")]
//!     page: Option<u32>,
//!     #[bind(query = "tag")]
//!     tags: Vec<String>,
//! }
//!
//! let ctx = BindContext::builder()
//!     .method(Method::GET)
//!     .uri("/search?q=rust&page=2&tag=a&tag=b".parse().unwrap())
//!     .build();
//!
//! let mut search = Search::default();
//! DefaultBinder::new().bind(&mut search, &ctx).unwrap();
//!
//! assert_eq!(search.term, "rust");
//! assert_eq!(search.page, Some(2));
//! assert_eq!(search.tags, vec!["a", "b"]);
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`BindError`] carrying its [`BindErrorKind`], the
//! source and field involved, the offending raw value and the underlying
//! cause.
//!
//! ```rust
//! use syndesis::{BindError, BindErrorKind};
//!
//! let err = BindError::unsupported_media_type(Some("text/plain"));
//! assert_eq!(err.kind(), BindErrorKind::UnsupportedMediaType);
//! assert_eq!(err.status_code(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
//! ```

#![doc(html_root_url = "https://docs.rs/syndesis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as syndesis;

mod binder;
mod body;
mod coerce;
pub mod config;
mod context;
mod error;
mod leaf;
mod multipart;
mod params;
mod probe;
mod resolve;
mod shape;
mod source;

pub use binder::DefaultBinder;
pub use body::BodyCodec;
pub use coerce::{Coerce, CoerceError, UnmarshalParam, UnmarshalParams, DATE_FORMAT};
pub use config::{BinderConfig, ConfigError, MultipartConfig, QueryBinding};
pub use context::{BindContext, BindContextBuilder};
pub use error::{BindError, BindErrorKind, BoxError};
pub use leaf::LeafSlot;
pub use multipart::{FileHeader, FileMap, MultipartForm};
pub use params::Params;
pub use resolve::Resolver;
pub use shape::{
    Bindable, FieldInfo, FieldKind, MapValue, OptionalStruct, ParamMap, Shape, Tags, Target,
    TargetMut,
};
pub use source::{SourceKind, SourceMap};

/// Derives [`Bindable`] and [`Target`] for a struct.
///
/// See the crate documentation for the `#[bind(..)]` attribute keys.
pub use syndesis_macros::Bind;

#[doc(hidden)]
pub mod __private {
    pub use crate::leaf::{Leaf, LeafSlot, Optional, OptionalSeq, Seq, SeqOfOptional, Value};
    pub use crate::probe::{
        ElementProbe, ElementUnsupported, ElementViaCoerce, ElementViaFromStr, ElementViaParam,
        FieldProbe, FieldUnsupported, FieldViaCoerce, FieldViaFromStr, FieldViaParam,
        FieldViaParams, FileNone, FileProbe, FileViaTarget, ShapeOpaque, ShapeProbe,
        ShapeViaMap, ShapeViaStruct,
    };
    pub use crate::shape::{
        restore_field, Bindable, FieldInfo, FieldKind, OptionalStruct, ParamMap, Shape, Tags,
        Target, TargetMut,
    };
    pub use std::any::Any;
    pub use std::boxed::Box;
    pub use std::mem::swap;
    pub use std::option::Option;
    pub use std::sync::OnceLock;
    pub use std::vec::Vec;
}
