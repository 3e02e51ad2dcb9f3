//! Lazy, fault-tolerant iteration over search results.
//!
//! [`RecordExt::search`](crate::record::RecordExt::search) only lists ids. A
//! [`RecordCursor`] owns that id list and loads each record when it is reached.
//! Documents removed after the listing are skipped silently, so iterating a stale
//! result set never fails with `DocumentNotFound`.
//!
//! ```ignore
//! let mut people = Person::search(&store, Query::builder().sort("name", SortDirection::Asc).build()).await?;
//!
//! while let Some(person) = people.next().await? {
//!     println!("{}", person.name);
//! }
//! ```

use futures::{Stream, stream};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    fields,
    id::Id,
    record::{Record, fetch_record},
};

/// Where a cursor stands in its id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    BeforeStart,
    At(usize),
    Exhausted,
}

/// Forward-only cursor materializing records from a captured id list.
///
/// The id list is fixed when the search runs. [`reset`](Self::reset) moves back to the
/// start and re-reads documents for those same ids.
pub struct RecordCursor<R: Record, B: StoreBackend> {
    collection: Arc<Collection<B>>,
    ids: Vec<Id>,
    position: CursorPosition,
    current: Option<R>,
}

impl<R: Record, B: StoreBackend> RecordCursor<R, B> {
    pub(crate) fn new(collection: Arc<Collection<B>>, ids: Vec<Id>) -> Self {
        Self {
            collection,
            ids,
            position: CursorPosition::BeforeStart,
            current: None,
        }
    }

    /// The ids captured when the search ran, in result order.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    /// Moves back before the first id. Records are fetched again on the next access.
    pub fn reset(&mut self) {
        self.position = CursorPosition::BeforeStart;
        self.current = None;
    }

    /// Moves to the next id without fetching anything.
    pub fn advance(&mut self) {
        self.position = match self.position {
            CursorPosition::BeforeStart => self.index(0),
            CursorPosition::At(index) => self.index(index + 1),
            CursorPosition::Exhausted => CursorPosition::Exhausted,
        };
        self.current = None;
    }

    /// Whether no further id remains at or after the current position.
    pub fn is_exhausted(&self) -> bool {
        match self.position {
            CursorPosition::BeforeStart => self.ids.is_empty(),
            CursorPosition::At(_) => false,
            CursorPosition::Exhausted => true,
        }
    }

    /// Returns the record at the current position, loading it if needed.
    ///
    /// A cursor that has not started yet starts at the first id. Vanished documents
    /// are skipped forward; `Ok(None)` means every remaining id is gone.
    pub async fn current(&mut self) -> DocumentStoreResult<Option<&R>> {
        if self.current.is_none() {
            self.materialize().await?;
        }

        Ok(self.current.as_ref())
    }

    /// Advances and returns the next surviving record, `Ok(None)` once exhausted.
    pub async fn next(&mut self) -> DocumentStoreResult<Option<R>> {
        self.advance();
        self.materialize().await?;

        Ok(self.current.take())
    }

    /// Collects every surviving record after the current position.
    pub async fn collect_records(mut self) -> DocumentStoreResult<Vec<R>> {
        let mut records = Vec::with_capacity(self.ids.len());

        while let Some(record) = self.next().await? {
            records.push(record);
        }

        Ok(records)
    }

    /// Turns the cursor into a stream of the remaining records.
    pub fn into_stream(self) -> impl Stream<Item = DocumentStoreResult<R>> {
        stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, DocumentStoreError>(next.map(|record| (record, cursor)))
        })
    }

    /// Encodes every surviving record of the id list as a JSON array.
    ///
    /// Independent of the cursor position. Each element follows
    /// [`fields::to_json`]; `Ok(None)` signals an encoding failure.
    pub async fn to_json(&self) -> DocumentStoreResult<Option<String>> {
        let mut values: Vec<Value> = Vec::with_capacity(self.ids.len());

        for id in &self.ids {
            let Some(record) = fetch_record::<R, B>(&self.collection, id).await? else {
                continue;
            };

            match fields::to_json_value(&record) {
                Ok(value) => values.push(value),
                Err(e) => {
                    warn!(collection = self.collection.name(), id = %id, error = %e, "failed to encode record as JSON");
                    return Ok(None);
                }
            }
        }

        Ok(fields::to_json_array(values))
    }

    fn index(&self, index: usize) -> CursorPosition {
        if index < self.ids.len() {
            CursorPosition::At(index)
        } else {
            CursorPosition::Exhausted
        }
    }

    async fn materialize(&mut self) -> DocumentStoreResult<()> {
        let mut index = match self.position {
            CursorPosition::BeforeStart => 0,
            CursorPosition::At(index) => index,
            CursorPosition::Exhausted => return Ok(()),
        };

        while let Some(id) = self.ids.get(index) {
            if let Some(record) = fetch_record::<R, B>(&self.collection, id).await? {
                self.position = CursorPosition::At(index);
                self.current = Some(record);
                return Ok(());
            }

            warn!(collection = self.collection.name(), id = %id, "document vanished since search, skipping");
            index += 1;
        }

        self.position = CursorPosition::Exhausted;
        Ok(())
    }
}
