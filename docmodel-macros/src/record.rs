use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::attributes::{RecordAttributes, record_fields};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = RecordAttributes::from_attrs(&input.attrs)?;
    let fields = record_fields(input)?;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collection_name = match &attrs.collection {
        Some(name) => quote! { ::core::option::Option::Some(#name) },
        None => quote! { ::core::option::Option::None },
    };
    let sequential_id = attrs.sequential_id;
    let random_id = attrs.random_id;
    let random_id_length = attrs.random_id_length.as_ref().map(|length| {
        quote! {
            fn random_id_length() -> u32 {
                #length
            }
        }
    });

    let id_field = fields
        .iter()
        .find(|field| field.is_id)
        .map(|field| &field.ident)
        .ok_or_else(|| syn::Error::new_spanned(ident, "missing id field"))?;

    let persisted = fields.iter().filter(|field| field.persisted()).collect::<Vec<_>>();
    let names = persisted.iter().map(|field| &field.name).collect::<Vec<_>>();
    let idents = persisted.iter().map(|field| &field.ident).collect::<Vec<_>>();

    Ok(quote! {
        impl #impl_generics ::docmodel::record::Record for #ident #ty_generics #where_clause {
            fn collection_name() -> ::core::option::Option<&'static str> {
                #collection_name
            }

            fn sequential_id() -> bool {
                #sequential_id
            }

            fn random_id() -> bool {
                #random_id
            }

            #random_id_length

            fn id(&self) -> ::core::option::Option<&::docmodel::id::Id> {
                self.#id_field.as_ref()
            }

            fn set_id(&mut self, id: ::core::option::Option<::docmodel::id::Id>) {
                self.#id_field = id;
            }

            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            #[allow(unused_mut)]
            fn to_document(&self) -> ::docmodel::error::DocumentStoreResult<::docmodel::bson::Document> {
                let mut document = ::docmodel::bson::Document::new();
                #(
                    document.insert(#names, ::docmodel::bson::ser::serialize_to_bson(&self.#idents)?);
                )*
                ::core::result::Result::Ok(document)
            }

            #[allow(unused_variables)]
            fn load_document(
                &mut self,
                document: &::docmodel::bson::Document,
            ) -> ::docmodel::error::DocumentStoreResult<()> {
                #(
                    if let ::core::option::Option::Some(value) = document.get(#names) {
                        self.#idents = ::docmodel::bson::de::deserialize_from_bson(value.clone())?;
                    }
                )*
                ::core::result::Result::Ok(())
            }
        }
    })
}
