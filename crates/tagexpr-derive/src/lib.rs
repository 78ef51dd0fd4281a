// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Derive macro for `tagexpr::Reflect`.
//!
//! Generates `Reflect` and `Structure` for structs with named fields. Field
//! tags are declared per namespace:
//!
//! ```ignore
//! #[derive(Reflect)]
//! struct Order {
//!     #[tag(te = "$ > 0", json = "qty")]
//!     quantity: i64,
//!     #[tag(skip)]
//!     cache: RefCell<Vec<u8>>,
//! }
//! ```

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Data, DeriveInput, Field, Fields, FieldsNamed, GenericParam, Generics, LitStr,
    parse_macro_input, parse_quote,
};

#[proc_macro_derive(Reflect, attributes(tag))]
pub fn derive_reflect(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Tags of one field, as parsed from `#[tag(...)]`
struct FieldTags {
    skip: bool,
    tags: Vec<(String, String)>,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let fields = named_fields(input)?;
    let generics = add_bounds(&input.generics)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut descriptors = Vec::new();
    let mut accessors = Vec::new();
    for field in &fields.named {
        let tags = field_tags(field)?;
        if tags.skip {
            continue;
        }
        let index = descriptors.len();
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let field_name = ident.unraw().to_string();
        let ty = &field.ty;
        let pairs = tags.tags.iter().map(|(namespace, text)| quote! { (#namespace, #text) });

        descriptors.push(quote! {
            ::tagexpr::FieldDescriptor {
                name: #field_name,
                kind: <#ty as ::tagexpr::Reflect>::kind(),
                tags: ::tagexpr::Tags::new(&[#(#pairs),*]),
            }
        });
        accessors.push(quote! {
            #index => ::tagexpr::Reflect::reflect(&self.#ident),
        });
    }

    Ok(quote! {
        impl #impl_generics ::tagexpr::Structure for #name #ty_generics #where_clause {
            fn descriptor() -> ::tagexpr::StructDescriptor {
                ::tagexpr::StructDescriptor {
                    name: ::core::any::type_name::<Self>(),
                    fields: ::std::vec![#(#descriptors),*],
                }
            }

            fn field(&self, index: usize) -> ::tagexpr::ValueRef<'_> {
                match index {
                    #(#accessors)*
                    _ => ::tagexpr::ValueRef::Nil,
                }
            }
        }

        impl #impl_generics ::tagexpr::Reflect for #name #ty_generics #where_clause {
            fn kind() -> ::tagexpr::Kind {
                ::tagexpr::Kind::Nested(::tagexpr::StructRef::of::<Self>())
            }

            fn reflect(&self) -> ::tagexpr::ValueRef<'_> {
                ::tagexpr::ValueRef::Struct(self)
            }
        }
    })
}

fn named_fields(input: &DeriveInput) -> syn::Result<&FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                &input.ident,
                "derive Reflect on tuple struct is not supported",
            )),
            Fields::Unit => Err(syn::Error::new_spanned(
                &input.ident,
                "derive Reflect on unit struct is not supported",
            )),
        },
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "derive Reflect on enum is not supported",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "derive Reflect on union is not supported",
        )),
    }
}

/// Every type parameter must itself be reflectable and `'static`
fn add_bounds(generics: &Generics) -> syn::Result<Generics> {
    let mut generics = generics.clone();
    for param in &mut generics.params {
        match param {
            GenericParam::Type(param) => {
                param.bounds.push(parse_quote!(::tagexpr::Reflect));
                param.bounds.push(parse_quote!('static));
            }
            GenericParam::Lifetime(param) => {
                return Err(syn::Error::new_spanned(
                    param,
                    "derive Reflect requires a 'static type; lifetime parameters are not supported",
                ));
            }
            GenericParam::Const(_) => {}
        }
    }
    Ok(generics)
}

fn field_tags(field: &Field) -> syn::Result<FieldTags> {
    let mut tags = FieldTags {
        skip: false,
        tags: Vec::new(),
    };
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("tag")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                tags.skip = true;
                return Ok(());
            }
            let namespace = meta
                .path
                .get_ident()
                .ok_or_else(|| meta.error("expected a namespace name"))?
                .unraw()
                .to_string();
            if tags.tags.iter().any(|(existing, _)| *existing == namespace) {
                return Err(meta.error(format!("duplicate tag namespace '{namespace}'")));
            }
            let text: LitStr = meta.value()?.parse()?;
            tags.tags.push((namespace, text.value()));
            Ok(())
        })?;
    }
    Ok(tags)
}
