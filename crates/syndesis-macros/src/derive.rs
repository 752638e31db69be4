//! Expansion of `#[derive(Bind)]`.
//!
//! The generated `Bindable` impl caches a `Shape` for the struct and hands
//! out typed views of fields by index. Each view picks its conversion
//! through the probe types in `syndesis::__private`; the choice is made by
//! method resolution on the concrete field type.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{BindField, BindStruct, LeafShape};

/// Expands the derive for one struct.
pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let parsed = BindStruct::parse(input)?;
    Ok(generate(&parsed))
}

fn generate(parsed: &BindStruct) -> TokenStream {
    let ident = &parsed.ident;
    let type_name = ident.to_string();

    let field_infos = parsed.fields.iter().map(field_info);
    let leaf_arms = arms(parsed, |field| !field.attrs.embed, leaf_arm);
    let struct_arms = arms(
        parsed,
        |field| !(field.attrs.embed && field.is_option()),
        |field| {
            let name = &field.ident;
            let ty = &field.ty;
            quote! {
                (&&&::syndesis::__private::ShapeProbe::<#ty>::new()).as_struct(&mut self.#name)
            }
        },
    );
    let optional_arms = arms(
        parsed,
        |field| field.attrs.embed && field.is_option(),
        |field| {
            let name = &field.ident;
            quote! { ::syndesis::__private::Option::Some(&mut self.#name) }
        },
    );
    let map_arms = arms(
        parsed,
        |field| field.attrs.embed && !field.is_option(),
        |field| {
            let name = &field.ident;
            let ty = &field.ty;
            quote! {
                (&&&::syndesis::__private::ShapeProbe::<#ty>::new()).as_map(&mut self.#name)
            }
        },
    );

    let unserialized = &parsed.unserialized;
    let nested = parsed
        .fields
        .iter()
        .enumerate()
        .filter(|(_, field)| !field.attrs.serde_skip)
        .map(|(index, _)| index);

    quote! {
        #[automatically_derived]
        impl ::syndesis::__private::Bindable for #ident {
            fn static_shape() -> &'static ::syndesis::__private::Shape {
                #[allow(unused_imports)]
                use ::syndesis::__private::{ShapeOpaque, ShapeViaMap, ShapeViaStruct};

                static SHAPE: ::syndesis::__private::OnceLock<::syndesis::__private::Shape> =
                    ::syndesis::__private::OnceLock::new();
                SHAPE.get_or_init(|| {
                    ::syndesis::__private::Shape::new(
                        #type_name,
                        ::syndesis::__private::Vec::from([#(#field_infos),*]),
                    )
                })
            }

            fn shape(&self) -> &'static ::syndesis::__private::Shape {
                <Self as ::syndesis::__private::Bindable>::static_shape()
            }

            fn leaf_mut(
                &mut self,
                index: usize,
            ) -> ::syndesis::__private::Option<
                ::syndesis::__private::Box<dyn ::syndesis::__private::LeafSlot + '_>,
            > {
                #[allow(unused_imports)]
                use ::syndesis::__private::{
                    ElementUnsupported, ElementViaCoerce, ElementViaFromStr, ElementViaParam,
                    FieldUnsupported, FieldViaCoerce, FieldViaFromStr, FieldViaParam,
                    FieldViaParams, FileNone, FileViaTarget,
                };

                #[allow(clippy::match_single_binding)]
                match index {
                    #leaf_arms
                    _ => ::syndesis::__private::Option::None,
                }
            }

            fn struct_mut(
                &mut self,
                index: usize,
            ) -> ::syndesis::__private::Option<&mut dyn ::syndesis::__private::Bindable> {
                #[allow(unused_imports)]
                use ::syndesis::__private::{ShapeOpaque, ShapeViaMap, ShapeViaStruct};

                #[allow(clippy::match_single_binding)]
                match index {
                    #struct_arms
                    _ => ::syndesis::__private::Option::None,
                }
            }

            fn optional_mut(
                &mut self,
                index: usize,
            ) -> ::syndesis::__private::Option<&mut dyn ::syndesis::__private::OptionalStruct> {
                #[allow(clippy::match_single_binding)]
                match index {
                    #optional_arms
                    _ => ::syndesis::__private::Option::None,
                }
            }

            fn map_mut(
                &mut self,
                index: usize,
            ) -> ::syndesis::__private::Option<&mut dyn ::syndesis::__private::ParamMap> {
                #[allow(unused_imports)]
                use ::syndesis::__private::{ShapeOpaque, ShapeViaMap, ShapeViaStruct};

                #[allow(clippy::match_single_binding)]
                match index {
                    #map_arms
                    _ => ::syndesis::__private::Option::None,
                }
            }

            fn as_any_mut(&mut self) -> &mut dyn ::syndesis::__private::Any {
                self
            }

            #[allow(unused_variables)]
            fn restore_skipped(&mut self, previous: &mut dyn ::syndesis::__private::Bindable) {
                let ::syndesis::__private::Option::Some(previous) =
                    previous.as_any_mut().downcast_mut::<Self>()
                else {
                    return;
                };
                #(::syndesis::__private::swap(&mut self.#unserialized, &mut previous.#unserialized);)*
                #(::syndesis::__private::restore_field(self, previous, #nested);)*
            }
        }

        #[automatically_derived]
        impl ::syndesis::__private::Target for #ident {
            fn target_mut(&mut self) -> ::syndesis::__private::TargetMut<'_> {
                ::syndesis::__private::TargetMut::Struct(self)
            }
        }
    }
}

/// Builds `index => body,` arms for the fields selected by `filter`.
/// Indices are positions in the shape, so every bound field counts.
fn arms(
    parsed: &BindStruct,
    filter: impl Fn(&BindField) -> bool,
    body: impl Fn(&BindField) -> TokenStream,
) -> TokenStream {
    parsed
        .fields
        .iter()
        .enumerate()
        .filter(|(_, field)| filter(field))
        .map(|(index, field)| {
            let body = body(field);
            quote! { #index => #body, }
        })
        .collect()
}

fn field_info(field: &BindField) -> TokenStream {
    let name = field.name();
    let ty = &field.ty;
    let tag = |value: &Option<String>| match value {
        Some(value) => quote! { ::syndesis::__private::Option::Some(#value) },
        None => quote! { ::syndesis::__private::Option::None },
    };
    let path = tag(&field.attrs.path);
    let query = tag(&field.attrs.query);
    let header = tag(&field.attrs.header);
    let form = tag(&field.attrs.form);
    let shared = tag(&field.attrs.name);

    let kind = if field.attrs.embed && field.is_option() {
        quote! {
            ::syndesis::__private::FieldKind::EmbeddedOptional(
                <#ty as ::syndesis::__private::OptionalStruct>::inner_static_shape,
            )
        }
    } else if field.attrs.embed {
        quote! { (&&&::syndesis::__private::ShapeProbe::<#ty>::new()).embed_kind() }
    } else {
        quote! { (&&&::syndesis::__private::ShapeProbe::<#ty>::new()).nested_kind() }
    };

    quote! {
        ::syndesis::__private::FieldInfo {
            ident: #name,
            tags: ::syndesis::__private::Tags {
                path: #path,
                query: #query,
                header: #header,
                form: #form,
                name: #shared,
            },
            kind: #kind,
        }
    }
}

fn leaf_arm(field: &BindField) -> TokenStream {
    let name = &field.ident;
    let ty = &field.ty;

    let assign = match &field.shape {
        LeafShape::Value(inner) => quote! {
            ::syndesis::__private::Value(
                (&&&&&::syndesis::__private::FieldProbe::<#inner>::new()).field_strategy(),
            )
        },
        LeafShape::Optional(inner) => quote! {
            ::syndesis::__private::Optional(
                (&&&&&::syndesis::__private::FieldProbe::<#inner>::new()).field_strategy(),
            )
        },
        LeafShape::Seq(inner) => quote! {
            ::syndesis::__private::Seq(
                (&&&&::syndesis::__private::ElementProbe::<#inner>::new()).element_strategy(),
            )
        },
        LeafShape::SeqOfOptional(inner) => quote! {
            ::syndesis::__private::SeqOfOptional(
                (&&&&::syndesis::__private::ElementProbe::<#inner>::new()).element_strategy(),
            )
        },
        LeafShape::OptionalSeq(inner) => quote! {
            ::syndesis::__private::OptionalSeq(
                (&&&&::syndesis::__private::ElementProbe::<#inner>::new()).element_strategy(),
            )
        },
    };

    quote! {
        ::syndesis::__private::Option::Some(::syndesis::__private::Box::new(
            ::syndesis::__private::Leaf::new(
                &mut self.#name,
                #assign,
                (&&::syndesis::__private::FileProbe::<#ty>::new()).file_assign(),
            ),
        ))
    }
}
