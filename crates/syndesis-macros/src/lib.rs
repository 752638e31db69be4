//! Derive macro for Syndesis binding destinations.
//!
//! `#[derive(Bind)]` is the one-time registration step for a destination
//! struct: it records the struct's fields with their source tags and
//! generates typed accessors the binder drives at runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use syndesis::Bind;
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Bind)]
//! #[serde(default)]
//! struct ListNodes {
//!     #[bind(path = "cluster")]
//!     cluster: String,
//!     #[bind(query = "limit")]
//!     limit: Option<u32>,
//!     #[bind(header = "x-request-id")]
//!     request_id: String,
//!     #[bind(embed)]
//!     paging: Paging,
//! }
//! ```
//!
//! # Field attributes
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `path = ".."` (or `param`) | key in the matched path parameters |
//! | `query = ".."` | key in the query string |
//! | `header = ".."` | header name |
//! | `form = ".."` | form field or file part name |
//! | `name = ".."` | key for every source without its own tag |
//! | `embed` | promote the inner fields onto this struct (also `#[serde(flatten)]`) |
//! | `skip` | never bind this field |
//!
//! Fields marked `#[serde(skip)]` or `#[serde(skip_deserializing)]` are
//! never written by a JSON or XML body; whatever they held before the body
//! was decoded is kept.

mod derive;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `Bindable` and `Target` for a struct with named fields.
///
/// Generic structs, enums and tuple structs are rejected, as are unknown or
/// repeated attribute keys and source tags on embedded fields.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
