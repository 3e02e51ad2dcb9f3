//! Procedural macros for docmodel.
//!
//! Provides `#[derive(Record)]`, which implements `docmodel::record::Record` for a
//! struct with named fields.

#[allow(unused_extern_crates)]
extern crate self as docmodel_macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attributes;
mod record;

/// Derives `Record` for a struct.
///
/// Persisted fields are exactly the struct's `pub` fields. Private and restricted
/// (`pub(crate)`) fields are in-memory state and never reach the store. Every persisted
/// field type must implement `Serialize` and `DeserializeOwned`.
///
/// # Attributes
///
/// On the struct, inside `#[record(...)]`:
///
/// - `collection = "name"` - Collection the type is stored in. Without it, using the
///   type against a store fails with a configuration error
/// - `sequential_id` - Allocate ids from an atomic per-collection counter
/// - `random_id` - Allocate random integer ids; `sequential_id` wins if both are given
/// - `random_id_length = N` - Digits of random ids (default 6)
///
/// On fields:
///
/// - `#[record(id)]` - The id field, of type `Option<Id>`. Defaults to the field named `id`
/// - `#[record(skip)]` - Do not persist this public field
/// - `#[record(rename = "key")]` - Store the field under another key
///
/// # Example
///
/// ```ignore
/// use docmodel::prelude::*;
///
/// #[derive(Debug, Default, Record)]
/// #[record(collection = "tickets", random_id, random_id_length = 8)]
/// pub struct Ticket {
///     id: Option<Id>,
///     pub subject: String,
///     #[record(rename = "desc")]
///     pub description: String,
///     attempts: u32,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    record::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
