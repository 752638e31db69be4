//! Request body decoding.
//!
//! The declared content type selects a [`BodyCodec`] by prefix. JSON and
//! XML bodies are overlaid onto the destination's current state: only the
//! members the document contains are replaced, so values bound from path
//! and query survive unless the body sets them. Fields serde never
//! deserializes keep their previous values. Form bodies are turned back
//! into a [`SourceMap`] and bound field by field.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::context::BindContext;
use crate::error::BindError;
use crate::shape::{Target, TargetMut};
use crate::source::SourceMap;

const APPLICATION_XML: &str = "application/xml";

/// Body codecs selectable by content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyCodec {
    /// `application/json`
    Json,
    /// `application/xml` or `text/xml`
    Xml,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `multipart/form-data`
    Multipart,
}

impl BodyCodec {
    /// Selects the codec whose media type prefixes `content_type`,
    /// ignoring ASCII case.
    #[must_use]
    pub fn detect(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim_start().to_ascii_lowercase();
        [
            (mime::APPLICATION_JSON.as_ref(), Self::Json),
            (APPLICATION_XML, Self::Xml),
            (mime::TEXT_XML.as_ref(), Self::Xml),
            (mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(), Self::Form),
            (mime::MULTIPART_FORM_DATA.as_ref(), Self::Multipart),
        ]
        .into_iter()
        .find(|(prefix, _)| content_type.starts_with(prefix))
        .map(|(_, codec)| codec)
    }

    /// Returns true if the codec is bound field by field.
    #[must_use]
    pub fn is_form(self) -> bool {
        matches!(self, Self::Form | Self::Multipart)
    }
}

/// Decodes a JSON body onto `dest`.
///
/// Struct and map destinations receive a merge: objects merge key by key,
/// everything else in the body replaces the current value. Sequence
/// destinations are replaced. Type mismatches carry the line and column of
/// the offending value.
pub fn decode_json<T>(body: &[u8], dest: &mut T) -> Result<(), BindError>
where
    T: Target + Serialize + DeserializeOwned,
{
    let incoming: Value = serde_json::from_slice(body).map_err(|err| {
        let details = err.to_string();
        BindError::malformed_body(details, err)
    })?;

    let document = if is_sequence(dest) {
        incoming
    } else {
        if !incoming.is_object() {
            return Err(BindError::type_mismatch(
                "",
                format_args!("expected a JSON object, got {}", json_kind(&incoming)),
                None,
            ));
        }
        let mut current = snapshot(&*dest)?;
        merge(&mut current, incoming);
        current
    };

    overlay(dest, document).map_err(|err| {
        let position = json_position::<T>(body, err.field());
        match position {
            Some((line, column)) => err.at_position(line, column),
            None => err,
        }
    })
}

/// Decodes an XML body onto `dest`.
///
/// The document is decoded whole for type checking; only the elements and
/// attributes it contains then replace the destination's values. Nested
/// elements are overlaid the same way. Sequence destinations are replaced.
pub fn decode_xml<T>(body: &[u8], dest: &mut T) -> Result<(), BindError>
where
    T: Target + Serialize + DeserializeOwned,
{
    let text = std::str::from_utf8(body)
        .map_err(|err| BindError::malformed_body("body is not valid UTF-8", err))?;
    let present = scan_xml(text)?;

    let mut deserializer = quick_xml::de::Deserializer::from_str(text);
    let decoded: T = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let details = inner.to_string();
        BindError::type_mismatch(path, details, Some(Box::new(inner)))
    })?;

    if is_sequence(dest) {
        *dest = decoded;
        return Ok(());
    }

    let incoming = snapshot(&decoded)?;
    let mut document = snapshot(&*dest)?;
    overlay_present(&mut document, incoming, &present);
    overlay(dest, document)
}

fn is_sequence<T: Target>(dest: &mut T) -> bool {
    matches!(dest.target_mut(), TargetMut::Sequence)
}

fn snapshot<T: Serialize>(value: &T) -> Result<Value, BindError> {
    serde_json::to_value(value).map_err(|err| {
        BindError::configuration(format!("destination cannot be serialized: {err}"))
    })
}

/// Decodes the merged `document` and replaces `dest` with it, carrying over
/// the fields serde skips.
fn overlay<T>(dest: &mut T, document: Value) -> Result<(), BindError>
where
    T: Target + DeserializeOwned,
{
    let mut decoded: T = serde_path_to_error::deserialize(document).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let details = inner.to_string();
        BindError::type_mismatch(path, details, Some(Box::new(inner)))
    })?;

    if let (TargetMut::Struct(fresh), TargetMut::Struct(previous)) =
        (decoded.target_mut(), dest.target_mut())
    {
        fresh.restore_skipped(previous);
    }
    *dest = decoded;
    Ok(())
}

/// Locates the value at `field` in the raw body by decoding it directly.
fn json_position<T: DeserializeOwned>(body: &[u8], field: Option<&str>) -> Option<(usize, usize)> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let result: Result<T, _> = serde_path_to_error::deserialize(&mut deserializer);
    let err = result.err()?;

    let path = err.path().to_string();
    let same_field = match field {
        Some(field) => path == field,
        None => path == "." || path.is_empty(),
    };
    let inner = err.inner();
    (same_field && inner.line() > 0).then(|| (inner.line(), inner.column()))
}

/// Collects the form values bound for a URL-encoded or multipart body.
///
/// URL-encoded bodies are only read for POST, PUT and PATCH, and their
/// values precede the query values. Multipart text fields follow the query
/// values.
pub fn form_values(ctx: &BindContext, codec: BodyCodec) -> Result<SourceMap, BindError> {
    let mut values = SourceMap::new();
    match codec {
        BodyCodec::Form => {
            if reads_form_body(ctx.method()) {
                let body = SourceMap::from_urlencoded(ctx.body()).map_err(|err| {
                    let details = format!("invalid form body: {err}");
                    BindError::malformed_body(details, err)
                })?;
                values.merge(&body);
            }
            values.merge(&query_values(ctx)?);
        }
        BodyCodec::Multipart => {
            values.merge(&query_values(ctx)?);
            if let Some(form) = ctx.multipart() {
                values.merge(form.values());
            }
        }
        BodyCodec::Json | BodyCodec::Xml => {}
    }
    debug!(keys = values.len(), "collected form values");
    Ok(values)
}

fn reads_form_body(method: &http::Method) -> bool {
    method == http::Method::POST || method == http::Method::PUT || method == http::Method::PATCH
}

fn query_values(ctx: &BindContext) -> Result<SourceMap, BindError> {
    ctx.query_string()
        .map_or_else(|| Ok(SourceMap::new()), SourceMap::from_query)
}

/// Names of the elements and attributes found under one XML element, keyed
/// the way the XML deserializer names fields.
#[derive(Debug, Default)]
struct Present(IndexMap<String, Present>);

impl Present {
    fn child(&mut self, path: &[String]) -> &mut Self {
        path.iter()
            .fold(self, |node, name| node.0.entry(name.clone()).or_default())
    }
}

/// Checks XML syntax and records which elements and attributes appear below
/// the root element.
fn scan_xml(text: &str) -> Result<Present, BindError> {
    let mut reader = Reader::from_str(text);
    let mut root = Present::default();
    let mut path: Vec<String> = Vec::new();
    let mut depth = 0_usize;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                let details = format!("{err} at byte {}", reader.error_position());
                return Err(BindError::malformed_body(details, err));
            }
        };
        match event {
            Event::Start(start) => {
                enter(&mut root, &mut path, depth, &start)?;
                depth += 1;
            }
            Event::Empty(start) => {
                if enter(&mut root, &mut path, depth, &start)? {
                    path.pop();
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth > 0 {
                    path.pop();
                }
            }
            Event::Text(content) if depth > 0 && !content.iter().all(u8::is_ascii_whitespace) => {
                mark_text(root.child(&path));
            }
            Event::CData(_) if depth > 0 => mark_text(root.child(&path)),
            Event::Eof => return Ok(root),
            _ => {}
        }
    }
}

/// Records an opening tag and its attributes. Returns true if the element
/// was pushed onto `path` (every element but the root).
fn enter(
    root: &mut Present,
    path: &mut Vec<String>,
    depth: usize,
    start: &BytesStart<'_>,
) -> Result<bool, BindError> {
    let pushed = depth > 0;
    if pushed {
        path.push(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
    }
    let node = root.child(path.as_slice());
    for attr in start.attributes() {
        let attr = attr.map_err(|err| {
            let details = format!("invalid attribute: {err}");
            BindError::malformed_body(details, err)
        })?;
        let key = if attr.key.as_namespace_binding().is_some() {
            String::from_utf8_lossy(attr.key.as_ref()).into_owned()
        } else {
            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned()
        };
        node.0.entry(format!("@{key}")).or_default();
    }
    Ok(pushed)
}

fn mark_text(node: &mut Present) {
    node.0.entry("$text".to_owned()).or_default();
    node.0.entry("$value".to_owned()).or_default();
}

/// Copies the members of `decoded` named in `present` onto `current`.
/// Objects are descended into where the document has child elements;
/// anything else is replaced.
fn overlay_present(current: &mut Value, decoded: Value, present: &Present) {
    match (current, decoded) {
        (Value::Object(current), Value::Object(mut decoded)) => {
            for (name, children) in &present.0 {
                let Some(value) = decoded.remove(name) else {
                    continue;
                };
                match current.get_mut(name) {
                    Some(slot) if !children.0.is_empty() => overlay_present(slot, value, children),
                    Some(slot) => *slot = value,
                    None => {
                        current.insert(name.clone(), value);
                    }
                }
            }
        }
        (current, decoded) => *current = decoded,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn merge(current: &mut Value, incoming: Value) {
    match (current, incoming) {
        (Value::Object(current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match current.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        current.insert(key, value);
                    }
                }
            }
        }
        (current, incoming) => *current = incoming,
    }
}
