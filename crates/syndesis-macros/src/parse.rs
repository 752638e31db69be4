//! Parsing of `#[derive(Bind)]` input.
//!
//! Reads the `#[bind(..)]` field attributes and classifies every field type
//! by its syntactic shape.

use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Fields,
    GenericArgument, Ident, LitStr, Meta, PathArguments, Token, Type,
};

/// A struct accepted by the derive.
#[derive(Debug)]
pub struct BindStruct {
    /// The struct name.
    pub ident: Ident,
    /// Bound fields in declaration order. Skipped fields are omitted.
    pub fields: Vec<BindField>,
    /// Every field serde leaves out of deserialization, bound or not.
    pub unserialized: Vec<Ident>,
}

impl BindStruct {
    /// Validates and parses derive input.
    pub fn parse(input: &DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "#[derive(Bind)] does not support generic structs",
            ));
        }

        let named = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named,
                Fields::Unnamed(_) | Fields::Unit => {
                    return Err(syn::Error::new(
                        input.ident.span(),
                        "#[derive(Bind)] requires a struct with named fields",
                    ))
                }
            },
            Data::Enum(_) | Data::Union(_) => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Bind)] can only be used on structs",
                ))
            }
        };

        let mut fields = Vec::with_capacity(named.named.len());
        let mut unserialized = Vec::new();
        for field in &named.named {
            let attrs = FieldAttrs::from_attrs(&field.attrs)?;
            let Some(ident) = field.ident.clone() else {
                continue;
            };
            if attrs.serde_skip {
                unserialized.push(ident.clone());
            }
            if attrs.skip {
                continue;
            }
            if attrs.embed && attrs.has_tag() {
                return Err(syn::Error::new(
                    field.span(),
                    "source tags are not allowed on embedded fields; tag the inner fields instead",
                ));
            }
            fields.push(BindField {
                ident,
                shape: LeafShape::of(&field.ty),
                ty: field.ty.clone(),
                attrs,
            });
        }

        Ok(Self {
            ident: input.ident.clone(),
            fields,
            unserialized,
        })
    }
}

/// One bound field.
#[derive(Debug)]
pub struct BindField {
    /// Field name.
    pub ident: Ident,
    /// Declared type.
    pub ty: Type,
    /// Parsed attributes.
    pub attrs: FieldAttrs,
    /// Shape of the declared type.
    pub shape: LeafShape,
}

impl BindField {
    /// The field name as matched against source keys, without a raw
    /// identifier prefix.
    pub fn name(&self) -> String {
        let name = self.ident.to_string();
        name.strip_prefix("r#").map_or_else(|| name.clone(), str::to_owned)
    }

    /// Whether the declared type is `Option<..>`.
    pub fn is_option(&self) -> bool {
        matches!(
            self.shape,
            LeafShape::Optional(_) | LeafShape::OptionalSeq(_)
        )
    }
}

/// Parsed `#[bind(..)]` keys of one field.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldAttrs {
    /// `path = ".."` (alias `param`).
    pub path: Option<String>,
    /// `query = ".."`
    pub query: Option<String>,
    /// `header = ".."`
    pub header: Option<String>,
    /// `form = ".."`
    pub form: Option<String>,
    /// `name = ".."`, shared by every source.
    pub name: Option<String>,
    /// `embed`, or `#[serde(flatten)]`.
    pub embed: bool,
    /// `skip`
    pub skip: bool,
    /// `#[serde(skip)]` or `#[serde(skip_deserializing)]`.
    pub serde_skip: bool,
}

impl FieldAttrs {
    /// Collects the `bind` and `serde` attributes of a field.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs {
            if attr.path().is_ident("bind") {
                parsed.parse_bind(attr)?;
            } else if attr.path().is_ident("serde") {
                for key in serde_keys(attr) {
                    match key.as_str() {
                        "flatten" => parsed.embed = true,
                        "skip" | "skip_deserializing" => parsed.serde_skip = true,
                        _ => {}
                    }
                }
            }
        }
        if parsed.skip && (parsed.embed || parsed.has_tag()) {
            return Err(syn::Error::new(
                attrs
                    .iter()
                    .find(|a| a.path().is_ident("bind"))
                    .map_or_else(proc_macro2::Span::call_site, Spanned::span),
                "`skip` cannot be combined with other bind keys",
            ));
        }
        Ok(parsed)
    }

    /// Whether any source tag is declared.
    pub fn has_tag(&self) -> bool {
        self.path.is_some()
            || self.query.is_some()
            || self.header.is_some()
            || self.form.is_some()
            || self.name.is_some()
    }

    fn parse_bind(&mut self, attr: &Attribute) -> syn::Result<()> {
        attr.parse_nested_meta(|meta| {
            let key = meta
                .path
                .get_ident()
                .map(ToString::to_string)
                .ok_or_else(|| meta.error("expected identifier"))?;

            match key.as_str() {
                "embed" => set_flag(&mut self.embed, &meta, "embed"),
                "skip" => set_flag(&mut self.skip, &meta, "skip"),
                "path" | "param" => set_tag(&mut self.path, &meta, "path"),
                "query" => set_tag(&mut self.query, &meta, "query"),
                "header" => set_tag(&mut self.header, &meta, "header"),
                "form" => set_tag(&mut self.form, &meta, "form"),
                "name" => set_tag(&mut self.name, &meta, "name"),
                _ => Err(meta.error(format!("unknown bind attribute: {key}"))),
            }
        })
    }
}

fn set_flag(slot: &mut bool, meta: &syn::meta::ParseNestedMeta, key: &str) -> syn::Result<()> {
    if *slot {
        return Err(meta.error(format!("duplicate `{key}` key")));
    }
    *slot = true;
    Ok(())
}

fn set_tag(
    slot: &mut Option<String>,
    meta: &syn::meta::ParseNestedMeta,
    key: &str,
) -> syn::Result<()> {
    if slot.is_some() {
        return Err(meta.error(format!("duplicate `{key}` key")));
    }
    let value: LitStr = meta.value()?.parse()?;
    if value.value().is_empty() {
        return Err(syn::Error::new(value.span(), "tag name cannot be empty"));
    }
    *slot = Some(value.value());
    Ok(())
}

/// Top-level keys of a `#[serde(..)]` attribute. Anything serde itself
/// would reject is left for serde to report.
fn serde_keys(attr: &Attribute) -> Vec<String> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .map(|metas| {
            metas
                .iter()
                .filter_map(|meta| meta.path().get_ident().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Syntactic shape of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafShape {
    /// `T`
    Value(Type),
    /// `Option<T>`
    Optional(Type),
    /// `Vec<T>`
    Seq(Type),
    /// `Vec<Option<T>>`
    SeqOfOptional(Type),
    /// `Option<Vec<T>>`
    OptionalSeq(Type),
}

impl LeafShape {
    /// Classifies `ty`. `Option<Vec<T>>` is checked before `Option<T>`.
    pub fn of(ty: &Type) -> Self {
        if let Some(inner) = wrapped(ty, "Option") {
            if let Some(element) = wrapped(inner, "Vec") {
                return Self::OptionalSeq(element.clone());
            }
            return Self::Optional(inner.clone());
        }
        if let Some(element) = wrapped(ty, "Vec") {
            if let Some(inner) = wrapped(element, "Option") {
                return Self::SeqOfOptional(inner.clone());
            }
            return Self::Seq(element.clone());
        }
        Self::Value(ty.clone())
    }
}

/// Returns `T` if `ty` is `wrapper<T>`, matching the last path segment.
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_field_attrs() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[bind(query = "id", param = "pid")])];
        let parsed = FieldAttrs::from_attrs(&attrs).unwrap();
        assert_eq!(parsed.query.as_deref(), Some("id"));
        assert_eq!(parsed.path.as_deref(), Some("pid"));
        assert!(parsed.header.is_none());
        assert!(!parsed.embed);
    }

    #[test]
    fn test_serde_flatten_marks_embed() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[serde(default, rename = "x")]),
            parse_quote!(#[serde(flatten)]),
        ];
        assert!(FieldAttrs::from_attrs(&attrs).unwrap().embed);
    }

    #[test]
    fn test_serde_skip_is_recorded() {
        let input: DeriveInput = parse_quote! {
            struct Upload {
                #[bind(form = "avatar")]
                #[serde(skip)]
                avatar: Option<FileHeader>,
                #[bind(skip)]
                #[serde(skip_deserializing, default)]
                owner: String,
                #[serde(skip_serializing_if = "Option::is_none")]
                note: Option<String>,
            }
        };
        let parsed = BindStruct::parse(&input).unwrap();
        assert_eq!(parsed.unserialized, ["avatar", "owner"]);
        assert_eq!(parsed.fields.len(), 2);
        assert!(parsed.fields[0].attrs.serde_skip);
        assert!(!parsed.fields[1].attrs.serde_skip);
    }

    #[test]
    fn test_rejects_unknown_and_duplicate_keys() {
        let unknown: Vec<Attribute> = vec![parse_quote!(#[bind(cookie = "c")])];
        let err = FieldAttrs::from_attrs(&unknown).unwrap_err();
        assert!(err.to_string().contains("unknown bind attribute: cookie"));

        let duplicate: Vec<Attribute> = vec![parse_quote!(#[bind(path = "a", param = "b")])];
        let err = FieldAttrs::from_attrs(&duplicate).unwrap_err();
        assert!(err.to_string().contains("duplicate `path` key"));
    }

    #[test]
    fn test_rejects_skip_with_tag() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[bind(skip, query = "a")])];
        assert!(FieldAttrs::from_attrs(&attrs).is_err());
    }

    #[test]
    fn test_leaf_shapes() {
        let shape = LeafShape::of(&parse_quote!(Option<Vec<i64>>));
        assert_eq!(shape, LeafShape::OptionalSeq(parse_quote!(i64)));

        let shape = LeafShape::of(&parse_quote!(std::option::Option<String>));
        assert_eq!(shape, LeafShape::Optional(parse_quote!(String)));

        let shape = LeafShape::of(&parse_quote!(Vec<Option<u8>>));
        assert_eq!(shape, LeafShape::SeqOfOptional(parse_quote!(u8)));

        let shape = LeafShape::of(&parse_quote!(Vec<FileHeader>));
        assert_eq!(shape, LeafShape::Seq(parse_quote!(FileHeader)));

        let shape = LeafShape::of(&parse_quote!(HashMap<String, String>));
        assert_eq!(shape, LeafShape::Value(parse_quote!(HashMap<String, String>)));
    }

    #[test]
    fn test_parse_struct() {
        let input: DeriveInput = parse_quote! {
            struct Opts {
                #[bind(query = "id")]
                id: i64,
                #[bind(skip)]
                internal: u32,
                #[bind(embed)]
                paging: Paging,
            }
        };
        let parsed = BindStruct::parse(&input).unwrap();
        assert_eq!(parsed.ident, "Opts");
        assert_eq!(parsed.fields.len(), 2);
        assert!(parsed.fields[1].attrs.embed);
    }

    #[test]
    fn test_rejects_tagged_embed() {
        let input: DeriveInput = parse_quote! {
            struct Opts {
                #[bind(embed, query = "paging")]
                paging: Paging,
            }
        };
        let err = BindStruct::parse(&input).unwrap_err();
        assert!(err.to_string().contains("not allowed on embedded fields"));
    }

    #[test]
    fn test_rejects_generics_and_enums() {
        let generic: DeriveInput = parse_quote!(struct Page<T> { items: Vec<T> });
        assert!(BindStruct::parse(&generic).is_err());

        let tuple: DeriveInput = parse_quote!(struct Id(u64););
        assert!(BindStruct::parse(&tuple).is_err());

        let enumeration: DeriveInput = parse_quote!(enum Mode { A, B });
        assert!(BindStruct::parse(&enumeration).is_err());
    }

    #[test]
    fn test_raw_identifier_name() {
        let input: DeriveInput = parse_quote! {
            struct Opts {
                r#type: String,
            }
        };
        let parsed = BindStruct::parse(&input).unwrap();
        assert_eq!(parsed.fields[0].name(), "type");
    }
}
