//! Field resolution: matching source keys to destination fields.
//!
//! A [`Resolver`] binds one [`SourceMap`] (plus, for multipart forms, the
//! uploaded files) of a single [`SourceKind`] onto a destination. For every
//! field it picks the key to read (kind tag, then shared tag, then the field
//! name when name matching is enabled), looks the key up exactly and then
//! ignoring case, and hands the raw values to the field's leaf writer.
//! Embedded structs are walked as if their fields were declared on the
//! parent; untagged nested structs are descended into with name matching
//! disabled.

use tracing::{trace, warn};

use crate::error::BindError;
use crate::multipart::FileMap;
use crate::shape::{Bindable, FieldInfo, FieldKind, ParamMap, Shape};
use crate::source::{SourceKind, SourceMap};

/// Binds one source map onto struct and map destinations.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    kind: SourceKind,
    data: &'s SourceMap,
    files: Option<&'s FileMap>,
}

impl<'s> Resolver<'s> {
    /// Creates a resolver for `data` read from a `kind` source.
    #[must_use]
    pub fn new(kind: SourceKind, data: &'s SourceMap) -> Self {
        Self {
            kind,
            data,
            files: None,
        }
    }

    /// Adds uploaded files to bind alongside the values.
    #[must_use]
    pub fn with_files(mut self, files: &'s FileMap) -> Self {
        self.files = Some(files).filter(|f| !f.is_empty());
        self
    }

    /// Returns true if there is nothing to bind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.files.is_none()
    }

    /// Binds onto a struct destination.
    ///
    /// Name matching applies to the struct's own and promoted fields, and
    /// only when the source kind allows it and none of those fields carries
    /// a tag for this kind.
    pub fn bind_struct(&self, dest: &mut dyn Bindable) -> Result<(), BindError> {
        if self.is_empty() {
            return Ok(());
        }
        let shape = dest.shape();
        let by_name = self.kind.allows_name_fallback() && !shape.declares_tag(self.kind);
        trace!(
            source = %self.kind,
            target = shape.type_name(),
            by_name,
            "resolving fields"
        );
        self.bind_fields(dest, by_name)
    }

    /// Binds onto a map destination: one entry per source key.
    pub fn bind_map(&self, dest: &mut dyn ParamMap) {
        for (key, values) in self.data.iter() {
            if !dest.insert_values(key, values) {
                trace!(source = %self.kind, key, "skipping map key with unconvertible value");
            }
        }
    }

    fn bind_fields(&self, dest: &mut dyn Bindable, by_name: bool) -> Result<(), BindError> {
        let shape = dest.shape();
        for (index, field) in shape.fields().iter().enumerate() {
            let tag = field.tags.for_kind(self.kind);

            if field.kind.is_embedded() && tag.is_some() {
                warn!(
                    source = %self.kind,
                    target = shape.type_name(),
                    field = field.ident,
                    "tag on embedded field"
                );
                return Err(BindError::configuration(format!(
                    "{} tags are not allowed with embedded field `{}` of `{}`",
                    self.kind,
                    field.ident,
                    shape.type_name()
                ))
                .in_source(self.kind)
                .on_field(field.ident));
            }

            match field.kind {
                FieldKind::Embedded(_) => {
                    if let Some(inner) = dest.struct_mut(index) {
                        self.bind_fields(inner, by_name)?;
                    }
                }
                FieldKind::EmbeddedOptional(inner_shape) => {
                    let Some(slot) = dest.optional_mut(index) else {
                        continue;
                    };
                    if !slot.is_set() && !self.shape_matches(inner_shape(), by_name) {
                        continue;
                    }
                    self.bind_fields(slot.ensure(), by_name)?;
                }
                FieldKind::EmbeddedMap => {
                    if let Some(map) = dest.map_mut(index) {
                        self.bind_map(map);
                    }
                }
                FieldKind::EmbeddedInvalid => {
                    return Err(BindError::configuration(format!(
                        "embedded field `{}` of `{}` must be a bindable struct or a map",
                        field.ident,
                        shape.type_name()
                    ))
                    .in_source(self.kind)
                    .on_field(field.ident));
                }
                FieldKind::Nested(_) if tag.is_none() => {
                    if let Some(inner) = dest.struct_mut(index) {
                        self.bind_fields(inner, false)?;
                    }
                }
                FieldKind::Leaf | FieldKind::Nested(_) => {
                    let key = match tag {
                        Some(tag) => tag,
                        None if by_name => field.ident,
                        None => continue,
                    };
                    self.bind_leaf(dest, index, field, key)?;
                }
            }
        }
        Ok(())
    }

    fn bind_leaf(
        &self,
        dest: &mut dyn Bindable,
        index: usize,
        field: &FieldInfo,
        key: &str,
    ) -> Result<(), BindError> {
        let Some(mut slot) = dest.leaf_mut(index) else {
            return Ok(());
        };

        if let Some(files) = self.files {
            if slot.accepts_files() {
                let parts = files.get(key).unwrap_or_default();
                let written = slot
                    .assign_files(parts)
                    .map_err(|err| self.leaf_error(field, key, &[], err))?;
                if written {
                    trace!(field = field.ident, key, files = parts.len(), "bound files");
                    return Ok(());
                }
            }
        }

        let Some(values) = self.data.get_ignore_case(key) else {
            return Ok(());
        };
        slot.assign(values)
            .map_err(|err| self.leaf_error(field, key, values, err))?;
        trace!(field = field.ident, key, values = values.len(), "bound field");
        Ok(())
    }

    fn leaf_error(
        &self,
        field: &FieldInfo,
        key: &str,
        values: &[String],
        err: crate::coerce::CoerceError,
    ) -> BindError {
        if err.is_configuration() {
            warn!(source = %self.kind, field = field.ident, error = %err, "unbindable field");
            BindError::configuration(format!("cannot bind field `{}`: {err}", field.ident))
                .in_source(self.kind)
                .on_field(key)
        } else {
            BindError::field_coercion(self.kind, key, values, err)
        }
    }

    /// Whether binding `shape` would write at least one field.
    fn shape_matches(&self, shape: &Shape, by_name: bool) -> bool {
        shape.fields().iter().any(|field| {
            let tag = field.tags.for_kind(self.kind);
            match field.kind {
                _ if field.kind.is_embedded() && tag.is_some() => true,
                FieldKind::Embedded(inner) | FieldKind::EmbeddedOptional(inner) => {
                    self.shape_matches(inner(), by_name)
                }
                FieldKind::EmbeddedMap => !self.data.is_empty(),
                FieldKind::EmbeddedInvalid => true,
                FieldKind::Nested(inner) if tag.is_none() => self.shape_matches(inner(), false),
                FieldKind::Leaf | FieldKind::Nested(_) => match tag {
                    Some(key) => self.has_key(key),
                    None if by_name => self.has_key(field.ident),
                    None => false,
                },
            }
        })
    }

    fn has_key(&self, key: &str) -> bool {
        self.data.contains_ignore_case(key)
            || self.files.is_some_and(|files| files.get(key).is_some())
    }
}
