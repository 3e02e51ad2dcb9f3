//! Id allocation strategies.
//!
//! - [`IdStrategy::Opaque`]: nothing is allocated, the store assigns an id on insert.
//! - [`IdStrategy::Sequential`]: one counter document per collection name inside the
//!   shared counter collection, advanced with the store's atomic find-and-modify.
//! - [`IdStrategy::Random`]: a uniformly random integer of a fixed number of digits,
//!   redrawn until the collection holds no document with that id.
//!
//! The random strategy checks for collisions and then inserts as two separate steps, so
//! it is only safe with a single writer per collection. Use it for low-contention data.

use bson::{Bson, Document};
use rand::Rng;
use std::ops::RangeInclusive;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    id::Id,
    query::{Filter, FindAndModify},
    store::DocumentStore,
};

/// Default number of digits of random ids.
pub const DEFAULT_RANDOM_ID_LENGTH: u32 = 6;

/// Largest digit count whose range still fits in an `i64`.
pub const MAX_RANDOM_ID_LENGTH: u32 = 18;

/// Field of a counter document holding the last allocated value.
pub const COUNTER_FIELD: &str = "seq";

/// How a record type obtains ids for new documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    #[default]
    Opaque,
    Sequential,
    Random { length: u32 },
}

impl IdStrategy {
    /// Resolves declared policy flags into one strategy.
    ///
    /// Sequential takes precedence when both sequential and random are declared.
    pub fn resolve(sequential: bool, random: bool, random_length: u32) -> Self {
        if sequential {
            IdStrategy::Sequential
        } else if random {
            IdStrategy::Random { length: random_length }
        } else {
            IdStrategy::Opaque
        }
    }
}

/// Returns the inclusive range `[10^(length-1), 10^length - 1]` of random ids.
pub fn random_id_range(length: u32) -> DocumentStoreResult<RangeInclusive<i64>> {
    if !(1..=MAX_RANDOM_ID_LENGTH).contains(&length) {
        return Err(DocumentStoreError::Configuration(format!(
            "random id length must be between 1 and {MAX_RANDOM_ID_LENGTH}, got {length}"
        )));
    }

    let min = 10_i64.pow(length - 1);
    let max = 10_i64.pow(length) - 1;

    Ok(min..=max)
}

/// Allocates ids for documents about to be inserted.
pub struct IdAllocator<'a, B: StoreBackend> {
    store: &'a DocumentStore<B>,
}

impl<'a, B: StoreBackend> IdAllocator<'a, B> {
    pub fn new(store: &'a DocumentStore<B>) -> Self {
        Self { store }
    }

    /// Allocates an id for a new document of `collection`.
    ///
    /// Returns `None` for [`IdStrategy::Opaque`], leaving the choice to the store.
    pub async fn allocate(
        &self,
        strategy: IdStrategy,
        collection: &Collection<B>,
    ) -> DocumentStoreResult<Option<Id>> {
        let id = match strategy {
            IdStrategy::Opaque => return Ok(None),
            IdStrategy::Sequential => self.next_sequence(collection.name()).await?,
            IdStrategy::Random { length } => self.random_free(collection, length).await?,
        };

        debug!(collection = collection.name(), id, ?strategy, "allocated id");

        Ok(Some(Id::Int(id)))
    }

    /// Atomically advances the counter keyed by `key` and returns its new value.
    ///
    /// The first call for an unseen key creates the counter and returns 1.
    pub async fn next_sequence(&self, key: &str) -> DocumentStoreResult<i64> {
        let counters = self
            .store
            .collection(&self.store.options().counter_collection);

        let counter = counters
            .find_and_modify(FindAndModify::increment(Filter::eq("_id", key), COUNTER_FIELD, 1))
            .await?
            .ok_or_else(|| {
                DocumentStoreError::Backend(format!("counter {key} was not created by upsert"))
            })?;

        counter_value(&counter, key)
    }

    /// Draws random ids of `length` digits until one is not taken in `collection`.
    ///
    /// There is no retry bound: a collection with every id of the range taken never
    /// returns.
    pub async fn random_free(&self, collection: &Collection<B>, length: u32) -> DocumentStoreResult<i64> {
        let range = random_id_range(length)?;

        loop {
            let candidate = rand::thread_rng().gen_range(range.clone());

            let taken = collection
                .find_one(Some(Filter::eq("_id", candidate)), Some(vec!["_id".to_string()]))
                .await?
                .is_some();

            if !taken {
                return Ok(candidate);
            }

            debug!(collection = collection.name(), candidate, "random id collision, redrawing");
        }
    }
}

fn counter_value(counter: &Document, key: &str) -> DocumentStoreResult<i64> {
    match counter.get(COUNTER_FIELD) {
        Some(Bson::Int64(value)) => Ok(*value),
        Some(Bson::Int32(value)) => Ok(*value as i64),
        Some(Bson::Double(value)) => Ok(*value as i64),
        _ => Err(DocumentStoreError::InvalidDocument(format!(
            "counter {key} has no integer {COUNTER_FIELD} field"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn sequential_wins_over_random() {
        assert_eq!(IdStrategy::resolve(true, true, 4), IdStrategy::Sequential);
        assert_eq!(IdStrategy::resolve(false, true, 4), IdStrategy::Random { length: 4 });
        assert_eq!(IdStrategy::resolve(false, false, 4), IdStrategy::Opaque);
    }

    #[test]
    fn random_range_spans_exact_digit_count() {
        assert_eq!(random_id_range(1).unwrap(), 1..=9);
        assert_eq!(random_id_range(6).unwrap(), 100_000..=999_999);
        assert_eq!(*random_id_range(18).unwrap().end(), 999_999_999_999_999_999);
    }

    #[test]
    fn random_range_rejects_unusable_lengths() {
        assert!(matches!(random_id_range(0), Err(DocumentStoreError::Configuration(_))));
        assert!(matches!(random_id_range(19), Err(DocumentStoreError::Configuration(_))));
    }

    #[test]
    fn counter_value_accepts_any_integer_width() {
        assert_eq!(counter_value(&doc! { "seq": 3_i32 }, "people").unwrap(), 3);
        assert_eq!(counter_value(&doc! { "seq": 4_i64 }, "people").unwrap(), 4);
        assert!(counter_value(&doc! { "seq": "x" }, "people").is_err());
    }
}
