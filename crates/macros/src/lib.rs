//! `#[derive(Decode)]` for the micro-router form decoder.
//!
//! Field attributes:
//!
//! - `#[form = "key,required"]`, `#[query = "key"]`: tag values, first element is the key
//! - `#[decode(required)]`: the field must be present under every tag
//! - `#[decode(skip)]`: the field is never decoded
//! - `#[decode(name = "value")]`: a tag with any other name
//! - `#[serde(rename = "key")]`: read as the `json` tag

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Expr, ExprLit, Field, Fields, Lit, LitStr, Meta, Token, parse_macro_input};

#[proc_macro_derive(Decode, attributes(form, query, decode))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&input.generics, "Decode can not be derived for generic types"));
    }

    let ident = &input.ident;
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Some(&fields.named),
            Fields::Unnamed(_) | Fields::Unit => None,
        },
        Data::Enum(_) | Data::Union(_) => None,
    };

    let Some(named) = named else {
        return Ok(quote! {
            impl ::micro_router::decode::Decode for #ident {
                const NAMED_FIELDS: bool = false;

                fn fields() -> &'static [::micro_router::decode::FieldDescriptor<Self>] {
                    &[]
                }
            }
        });
    };

    let mut setters = Vec::with_capacity(named.len());
    let mut descriptors = Vec::with_capacity(named.len());
    for field in named {
        let attrs = FieldAttrs::parse(field)?;
        if attrs.skip {
            continue;
        }

        let Some(field_ident) = &field.ident else { continue };
        let ty = &field.ty;
        let name = field_ident.unraw().to_string();
        let setter = format_ident!("__decode_{}", name);
        let required = attrs.required;
        let tags = attrs.tags.iter().map(|(tag, value)| quote! { (#tag, #value) });

        setters.push(quote! {
            fn #setter(
                dest: &mut #ident,
                value: ::micro_router::decode::RawValue<'_>,
            ) -> ::core::result::Result<(), ::micro_router::decode::FieldError> {
                #[allow(unused_imports, reason = "only one of the probes applies to a given field type")]
                use ::micro_router::decode::probe::{ViaFormField as _, ViaUnsupported as _};
                let set = (&::micro_router::decode::probe::FieldProbe::<#ty>::new()).setter();
                set(&mut dest.#field_ident, value)
            }
        });
        descriptors.push(quote! {
            ::micro_router::decode::FieldDescriptor::new(#name, &[#(#tags),*], #required, #setter)
        });
    }

    Ok(quote! {
        impl ::micro_router::decode::Decode for #ident {
            fn fields() -> &'static [::micro_router::decode::FieldDescriptor<Self>] {
                #(#setters)*

                const FIELDS: &[::micro_router::decode::FieldDescriptor<#ident>] = &[#(#descriptors),*];
                FIELDS
            }
        }
    })
}

#[derive(Default)]
struct FieldAttrs {
    tags: Vec<(String, String)>,
    required: bool,
    skip: bool,
}

impl FieldAttrs {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut attrs = FieldAttrs::default();
        for attr in &field.attrs {
            if attr.path().is_ident("form") || attr.path().is_ident("query") {
                attrs.push_tag(attr)?;
            } else if attr.path().is_ident("decode") {
                attrs.parse_decode(attr)?;
            } else if attr.path().is_ident("serde") {
                attrs.parse_serde(attr)?;
            }
        }
        Ok(attrs)
    }

    fn push_tag(&mut self, attr: &Attribute) -> syn::Result<()> {
        let Meta::NameValue(meta) = &attr.meta else {
            return Err(syn::Error::new_spanned(attr, "expected `#[tag = \"key,modifiers\"]`"));
        };
        let tag = meta.path.get_ident().map(ToString::to_string).unwrap_or_default();
        self.tags.push((tag, lit_str(&meta.value)?.value()));
        Ok(())
    }

    fn parse_decode(&mut self, attr: &Attribute) -> syn::Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                self.required = true;
            } else if meta.path.is_ident("skip") {
                self.skip = true;
            } else if let Some(tag) = meta.path.get_ident() {
                let value: LitStr = meta.value()?.parse()?;
                self.tags.push((tag.unraw().to_string(), value.value()));
            } else {
                return Err(meta.error("expected `required`, `skip` or `tag = \"key\"`"));
            }
            Ok(())
        })
    }

    /// Only `rename = "..."` matters here, everything else belongs to serde.
    fn parse_serde(&mut self, attr: &Attribute) -> syn::Result<()> {
        let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for item in items {
            if let Meta::NameValue(meta) = item
                && meta.path.is_ident("rename")
            {
                self.tags.push(("json".to_owned(), lit_str(&meta.value)?.value()));
            }
        }
        Ok(())
    }
}

fn lit_str(expr: &Expr) -> syn::Result<&LitStr> {
    match expr {
        Expr::Lit(ExprLit { lit: Lit::Str(lit), .. }) => Ok(lit),
        _ => Err(syn::Error::new_spanned(expr, "expected a string literal")),
    }
}
