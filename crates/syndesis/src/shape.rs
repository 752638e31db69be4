//! Structural descriptors for bindable destinations.
//!
//! `#[derive(Bind)]` describes a struct once as a [`Shape`]: its fields in
//! declaration order with their source tags and how each one is reached
//! (plain leaf, nested struct, embedded struct, embedded map). The shape is
//! built on first use and cached for the life of the process. The
//! [`Bindable`] trait then hands out mutable, type-erased views of
//! individual fields by index.

use indexmap::IndexMap;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::coerce::Coerce;
use crate::leaf::LeafSlot;
use crate::source::SourceKind;

/// Per-source tag names declared on a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tags {
    /// `#[bind(path = "...")]`
    pub path: Option<&'static str>,
    /// `#[bind(query = "...")]`
    pub query: Option<&'static str>,
    /// `#[bind(header = "...")]`
    pub header: Option<&'static str>,
    /// `#[bind(form = "...")]`
    pub form: Option<&'static str>,
    /// `#[bind(name = "...")]`, shared by every source kind.
    pub name: Option<&'static str>,
}

impl Tags {
    /// Returns the key this field binds from for `kind`: the kind-specific
    /// tag, otherwise the shared one.
    #[must_use]
    pub fn for_kind(&self, kind: SourceKind) -> Option<&'static str> {
        let specific = match kind {
            SourceKind::Path => self.path,
            SourceKind::Query => self.query,
            SourceKind::Header => self.header,
            SourceKind::Form => self.form,
        };
        specific.or(self.name)
    }
}

/// How a field is reached from its parent.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A value converted from raw strings.
    Leaf,
    /// A field whose type is itself bindable. Untagged nested fields are
    /// descended into; tagged ones are treated as leaves.
    Nested(fn() -> &'static Shape),
    /// An embedded struct whose fields are promoted onto the parent.
    Embedded(fn() -> &'static Shape),
    /// An embedded `Option<T>`, allocated on the first inner match.
    EmbeddedOptional(fn() -> &'static Shape),
    /// An embedded string-keyed map receiving every source key.
    EmbeddedMap,
    /// An embedded field whose type is neither a struct nor a map.
    EmbeddedInvalid,
}

impl FieldKind {
    /// Whether the field is embedded (its contents are promoted).
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(
            self,
            Self::Embedded(_) | Self::EmbeddedOptional(_) | Self::EmbeddedMap | Self::EmbeddedInvalid
        )
    }
}

/// Descriptor of one struct field.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust field name, used for name matching.
    pub ident: &'static str,
    /// Declared source tags.
    pub tags: Tags,
    /// How the field is reached.
    pub kind: FieldKind,
}

/// Descriptor of a bindable struct.
#[derive(Debug)]
pub struct Shape {
    type_name: &'static str,
    fields: Vec<FieldInfo>,
}

impl Shape {
    /// Creates a shape. Field indices are positions in `fields`.
    #[must_use]
    pub fn new(type_name: &'static str, fields: Vec<FieldInfo>) -> Self {
        Self { type_name, fields }
    }

    /// Returns the Rust type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Whether any own or promoted field declares a tag for `kind`.
    ///
    /// Fields of nested (non-embedded) structs are not considered.
    #[must_use]
    pub fn declares_tag(&self, kind: SourceKind) -> bool {
        self.fields.iter().any(|field| {
            field.tags.for_kind(kind).is_some()
                || match field.kind {
                    FieldKind::Embedded(inner) | FieldKind::EmbeddedOptional(inner) => {
                        inner().declares_tag(kind)
                    }
                    _ => false,
                }
        })
    }
}

/// A struct whose fields can be bound from request sources.
///
/// Implemented by `#[derive(Bind)]`; the methods are not meant to be called
/// directly.
pub trait Bindable {
    /// Returns the cached shape of `Self`.
    fn static_shape() -> &'static Shape
    where
        Self: Sized;

    /// Returns the cached shape of this value's type.
    fn shape(&self) -> &'static Shape;

    /// Borrows field `index` as a leaf.
    fn leaf_mut(&mut self, index: usize) -> Option<Box<dyn LeafSlot + '_>>;

    /// Borrows field `index` as a nested or embedded struct.
    fn struct_mut(&mut self, index: usize) -> Option<&mut dyn Bindable>;

    /// Borrows field `index` as an embedded optional struct.
    fn optional_mut(&mut self, index: usize) -> Option<&mut dyn OptionalStruct>;

    /// Borrows field `index` as an embedded map.
    fn map_mut(&mut self, index: usize) -> Option<&mut dyn ParamMap>;

    /// Borrows `self` for downcasting to its concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Moves the fields body decoding never populates (`#[serde(skip)]`
    /// and `#[serde(skip_deserializing)]`) from `previous` into `self`,
    /// descending into nested and embedded structs.
    ///
    /// Does nothing when `previous` is not of the same type.
    fn restore_skipped(&mut self, _previous: &mut dyn Bindable) {}
}

/// Restores skipped fields inside field `index` of two values of the same
/// type, when that field is a struct in both.
pub fn restore_field(decoded: &mut dyn Bindable, previous: &mut dyn Bindable, index: usize) {
    if let (Some(current), Some(earlier)) = (decoded.struct_mut(index), previous.struct_mut(index)) {
        current.restore_skipped(earlier);
        return;
    }
    if let (Some(current), Some(earlier)) =
        (decoded.optional_mut(index), previous.optional_mut(index))
    {
        if current.is_set() && earlier.is_set() {
            current.ensure().restore_skipped(earlier.ensure());
        }
    }
}

impl<T: Bindable> Bindable for Box<T> {
    fn static_shape() -> &'static Shape {
        T::static_shape()
    }

    fn shape(&self) -> &'static Shape {
        (**self).shape()
    }

    fn leaf_mut(&mut self, index: usize) -> Option<Box<dyn LeafSlot + '_>> {
        (**self).leaf_mut(index)
    }

    fn struct_mut(&mut self, index: usize) -> Option<&mut dyn Bindable> {
        (**self).struct_mut(index)
    }

    fn optional_mut(&mut self, index: usize) -> Option<&mut dyn OptionalStruct> {
        (**self).optional_mut(index)
    }

    fn map_mut(&mut self, index: usize) -> Option<&mut dyn ParamMap> {
        (**self).map_mut(index)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    fn restore_skipped(&mut self, previous: &mut dyn Bindable) {
        (**self).restore_skipped(previous);
    }
}

/// An embedded `Option<T>` (or `Option<Box<T>>`) struct field.
pub trait OptionalStruct {
    /// Returns the shape of the inner struct.
    fn inner_static_shape() -> &'static Shape
    where
        Self: Sized;

    /// Returns true if the inner struct is allocated.
    fn is_set(&self) -> bool;

    /// Borrows the inner struct, allocating a default one if unset.
    fn ensure(&mut self) -> &mut dyn Bindable;
}

impl<T: Bindable + Default> OptionalStruct for Option<T> {
    fn inner_static_shape() -> &'static Shape {
        T::static_shape()
    }

    fn is_set(&self) -> bool {
        self.is_some()
    }

    fn ensure(&mut self) -> &mut dyn Bindable {
        self.get_or_insert_with(T::default)
    }
}

/// A string-keyed map receiving one entry per source key.
pub trait ParamMap {
    /// Stores `values` under `key`. Returns false when the values do not
    /// convert to the map's value type and the key was skipped.
    fn insert_values(&mut self, key: &str, values: &[String]) -> bool;
}

/// Map value types convertible from a key's raw values.
pub trait MapValue: Sized {
    /// Converts `values`, or `None` to skip the key.
    fn from_values(values: &[String]) -> Option<Self>;
}

impl MapValue for String {
    fn from_values(values: &[String]) -> Option<Self> {
        values.first().cloned()
    }
}

impl MapValue for Vec<String> {
    fn from_values(values: &[String]) -> Option<Self> {
        Some(values.to_vec())
    }
}

impl MapValue for serde_json::Value {
    fn from_values(values: &[String]) -> Option<Self> {
        values.first().cloned().map(serde_json::Value::String)
    }
}

macro_rules! map_value_via_coerce {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapValue for $ty {
                fn from_values(values: &[String]) -> Option<Self> {
                    values.first().and_then(|v| <$ty as Coerce>::coerce(v).ok())
                }
            }
        )*
    };
}

map_value_via_coerce!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool
);

impl<V: MapValue, S: BuildHasher> ParamMap for HashMap<String, V, S> {
    fn insert_values(&mut self, key: &str, values: &[String]) -> bool {
        V::from_values(values)
            .map(|value| self.insert(key.to_owned(), value))
            .is_some()
    }
}

impl<V: MapValue> ParamMap for BTreeMap<String, V> {
    fn insert_values(&mut self, key: &str, values: &[String]) -> bool {
        V::from_values(values)
            .map(|value| self.insert(key.to_owned(), value))
            .is_some()
    }
}

impl<V: MapValue, S: BuildHasher> ParamMap for IndexMap<String, V, S> {
    fn insert_values(&mut self, key: &str, values: &[String]) -> bool {
        V::from_values(values)
            .map(|value| self.insert(key.to_owned(), value))
            .is_some()
    }
}

/// Top-level view of a bind destination.
pub enum TargetMut<'a> {
    /// A struct bound field by field.
    Struct(&'a mut dyn Bindable),
    /// A map receiving one entry per source key.
    Map(&'a mut dyn ParamMap),
    /// A sequence, populated only by whole-body decoding.
    Sequence,
}

/// A value the binder can populate.
///
/// Implemented by `#[derive(Bind)]` for structs, and here for vectors and
/// string-keyed maps.
pub trait Target {
    /// Returns the destination view.
    fn target_mut(&mut self) -> TargetMut<'_>;
}

impl<T> Target for Vec<T> {
    fn target_mut(&mut self) -> TargetMut<'_> {
        TargetMut::Sequence
    }
}

impl<V: MapValue, S: BuildHasher> Target for HashMap<String, V, S> {
    fn target_mut(&mut self) -> TargetMut<'_> {
        TargetMut::Map(self)
    }
}

impl<V: MapValue> Target for BTreeMap<String, V> {
    fn target_mut(&mut self) -> TargetMut<'_> {
        TargetMut::Map(self)
    }
}

impl<V: MapValue, S: BuildHasher> Target for IndexMap<String, V, S> {
    fn target_mut(&mut self) -> TargetMut<'_> {
        TargetMut::Map(self)
    }
}
