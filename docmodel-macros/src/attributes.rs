//! Parsing of `#[record(...)]` attributes.

use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitInt, LitStr, Visibility, ext::IdentExt};

/// Struct-level settings from `#[record(collection = "...", sequential_id, ...)]`.
#[derive(Debug, Default)]
pub struct RecordAttributes {
    pub collection: Option<LitStr>,
    pub sequential_id: bool,
    pub random_id: bool,
    pub random_id_length: Option<LitInt>,
}

impl RecordAttributes {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("collection") {
                    parsed.collection = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("sequential_id") {
                    parsed.sequential_id = true;
                } else if meta.path.is_ident("random_id") {
                    parsed.random_id = true;
                } else if meta.path.is_ident("random_id_length") {
                    parsed.random_id_length = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unsupported record attribute"));
                }
                Ok(())
            })?;
        }

        Ok(parsed)
    }
}

/// One named field of the record struct.
#[derive(Debug)]
pub struct RecordField {
    pub ident: Ident,
    /// Key under which the field is stored.
    pub name: String,
    pub is_id: bool,
    pub skip: bool,
    pub public: bool,
}

impl RecordField {
    /// Public fields are persisted unless skipped; the id field never is.
    pub fn persisted(&self) -> bool {
        self.public && !self.skip && !self.is_id
    }
}

/// Collects the named fields of `input`, resolving the id field.
///
/// The id field is the one marked `#[record(id)]`, or else the field named `id`.
pub fn record_fields(input: &DeriveInput) -> syn::Result<Vec<RecordField>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "Record can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(&input.ident, "Record requires named fields"));
    };

    let mut fields = Vec::with_capacity(named.named.len());

    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };

        let mut record_field = RecordField {
            name: ident.unraw().to_string(),
            ident,
            is_id: false,
            skip: false,
            public: matches!(field.vis, Visibility::Public(_)),
        };

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    record_field.is_id = true;
                } else if meta.path.is_ident("skip") {
                    record_field.skip = true;
                } else if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    record_field.name = name.value();
                } else {
                    return Err(meta.error("unsupported record field attribute"));
                }
                Ok(())
            })?;
        }

        if record_field.name == "_id" && !record_field.is_id {
            return Err(syn::Error::new_spanned(&record_field.ident, "_id is reserved for the record id"));
        }

        fields.push(record_field);
    }

    let marked = fields.iter().filter(|field| field.is_id).count();
    if marked > 1 {
        return Err(syn::Error::new_spanned(&input.ident, "only one field can be marked #[record(id)]"));
    }
    if marked == 0 {
        match fields.iter_mut().find(|field| field.ident == "id") {
            Some(field) => field.is_id = true,
            None => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record requires an `id: Option<Id>` field or a field marked #[record(id)]",
                ));
            }
        }
    }

    Ok(fields)
}
