//! Compile-time capability selection for derived code.
//!
//! Each probe is a zero-sized marker over a concrete field type. Traits are
//! implemented at decreasing reference depth with increasingly permissive
//! bounds, and derived code calls the probe method through the deepest
//! reference. Method resolution then settles on the most specific impl
//! whose bounds hold for that concrete type.
//!
//! ```text
//! (&&&&&FieldProbe::<T>::new()).field_strategy()
//!     &&&&  T: UnmarshalParams  -> ViaParams
//!     &&&   T: UnmarshalParam   -> ViaParam
//!     &&    T: Coerce           -> ViaCoerce
//!     &     T: FromStr          -> ViaFromStr
//!           any T               -> Unsupported
//! ```

use std::error::Error as StdError;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::coerce::{
    Coerce, UnmarshalParam, UnmarshalParams, Unsupported, ViaCoerce, ViaFromStr, ViaParam,
    ViaParams,
};
use crate::leaf::{FileTarget, FilesFn};
use crate::shape::{Bindable, FieldKind, ParamMap};

macro_rules! probe {
    ($name:ident) => {
        #[doc(hidden)]
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T> $name<T> {
            #[doc(hidden)]
            #[must_use]
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

probe!(FieldProbe);
probe!(ElementProbe);
probe!(FileProbe);
probe!(ShapeProbe);

#[doc(hidden)]
pub trait FieldViaParams {
    fn field_strategy(&self) -> ViaParams {
        ViaParams
    }
}

impl<T: UnmarshalParams> FieldViaParams for &&&&FieldProbe<T> {}

#[doc(hidden)]
pub trait FieldViaParam {
    fn field_strategy(&self) -> ViaParam {
        ViaParam
    }
}

impl<T: UnmarshalParam> FieldViaParam for &&&FieldProbe<T> {}

#[doc(hidden)]
pub trait FieldViaCoerce {
    fn field_strategy(&self) -> ViaCoerce {
        ViaCoerce
    }
}

impl<T: Coerce> FieldViaCoerce for &&FieldProbe<T> {}

#[doc(hidden)]
pub trait FieldViaFromStr {
    fn field_strategy(&self) -> ViaFromStr {
        ViaFromStr
    }
}

impl<T> FieldViaFromStr for &FieldProbe<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
}

#[doc(hidden)]
pub trait FieldUnsupported {
    fn field_strategy(&self) -> Unsupported {
        Unsupported
    }
}

impl<T> FieldUnsupported for FieldProbe<T> {}

#[doc(hidden)]
pub trait ElementViaParam {
    fn element_strategy(&self) -> ViaParam {
        ViaParam
    }
}

impl<T: UnmarshalParam> ElementViaParam for &&&ElementProbe<T> {}

#[doc(hidden)]
pub trait ElementViaCoerce {
    fn element_strategy(&self) -> ViaCoerce {
        ViaCoerce
    }
}

impl<T: Coerce> ElementViaCoerce for &&ElementProbe<T> {}

#[doc(hidden)]
pub trait ElementViaFromStr {
    fn element_strategy(&self) -> ViaFromStr {
        ViaFromStr
    }
}

impl<T> ElementViaFromStr for &ElementProbe<T>
where
    T: FromStr,
    T::Err: StdError + Send + Sync + 'static,
{
}

#[doc(hidden)]
pub trait ElementUnsupported {
    fn element_strategy(&self) -> Unsupported {
        Unsupported
    }
}

impl<T> ElementUnsupported for ElementProbe<T> {}

#[doc(hidden)]
pub trait FileViaTarget {
    type Field;
    fn file_assign(&self) -> Option<FilesFn<Self::Field>>;
}

impl<F: FileTarget> FileViaTarget for &FileProbe<F> {
    type Field = F;

    fn file_assign(&self) -> Option<FilesFn<F>> {
        Some(F::assign_files)
    }
}

#[doc(hidden)]
pub trait FileNone {
    type Field;
    fn file_assign(&self) -> Option<FilesFn<Self::Field>>;
}

impl<F> FileNone for FileProbe<F> {
    type Field = F;

    fn file_assign(&self) -> Option<FilesFn<F>> {
        None
    }
}

#[doc(hidden)]
pub trait ShapeViaStruct {
    type Field;
    fn nested_kind(&self) -> FieldKind;
    fn embed_kind(&self) -> FieldKind;
    fn as_struct<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn Bindable>;
    fn as_map<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn ParamMap>;
}

impl<F: Bindable> ShapeViaStruct for &&ShapeProbe<F> {
    type Field = F;

    fn nested_kind(&self) -> FieldKind {
        FieldKind::Nested(F::static_shape)
    }

    fn embed_kind(&self) -> FieldKind {
        FieldKind::Embedded(F::static_shape)
    }

    fn as_struct<'a>(&self, value: &'a mut F) -> Option<&'a mut dyn Bindable> {
        Some(value)
    }

    fn as_map<'a>(&self, _value: &'a mut F) -> Option<&'a mut dyn ParamMap> {
        None
    }
}

#[doc(hidden)]
pub trait ShapeViaMap {
    type Field;
    fn nested_kind(&self) -> FieldKind;
    fn embed_kind(&self) -> FieldKind;
    fn as_struct<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn Bindable>;
    fn as_map<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn ParamMap>;
}

impl<F: ParamMap> ShapeViaMap for &ShapeProbe<F> {
    type Field = F;

    fn nested_kind(&self) -> FieldKind {
        FieldKind::Leaf
    }

    fn embed_kind(&self) -> FieldKind {
        FieldKind::EmbeddedMap
    }

    fn as_struct<'a>(&self, _value: &'a mut F) -> Option<&'a mut dyn Bindable> {
        None
    }

    fn as_map<'a>(&self, value: &'a mut F) -> Option<&'a mut dyn ParamMap> {
        Some(value)
    }
}

#[doc(hidden)]
pub trait ShapeOpaque {
    type Field;
    fn nested_kind(&self) -> FieldKind;
    fn embed_kind(&self) -> FieldKind;
    fn as_struct<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn Bindable>;
    fn as_map<'a>(&self, value: &'a mut Self::Field) -> Option<&'a mut dyn ParamMap>;
}

impl<F> ShapeOpaque for ShapeProbe<F> {
    type Field = F;

    fn nested_kind(&self) -> FieldKind {
        FieldKind::Leaf
    }

    fn embed_kind(&self) -> FieldKind {
        FieldKind::EmbeddedInvalid
    }

    fn as_struct<'a>(&self, _value: &'a mut F) -> Option<&'a mut dyn Bindable> {
        None
    }

    fn as_map<'a>(&self, _value: &'a mut F) -> Option<&'a mut dyn ParamMap> {
        None
    }
}
