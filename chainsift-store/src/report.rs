//! The error-report channel and the lenient batch-driving wrapper.
//!
//! The core store returns explicit `Result`s. Long indexing runs that must
//! keep going past one bad record opt into [`LenientStore`], which swallows
//! each failure, reports it as a structured [`ErrorEvent`], and returns a
//! sentinel (`None`, an empty record, `false`, or an empty result set).

use crate::error::{StoreError, StoreResult};
use crate::filter::EntityFilter;
use crate::store::EntityStore;
use chainsift_types::Record;
use std::sync::Arc;
use tracing::warn;

/// A structured report of an internally caught store failure.
#[derive(Debug)]
pub struct ErrorEvent {
    /// The operation that failed (`"create"`, `"query"`, …).
    pub kind: &'static str,
    /// What the operation was addressing, e.g. `"Account id 0xabc"`.
    pub context: String,
    /// The underlying failure.
    pub error: StoreError,
}

/// Subscriber for swallowed store failures.
pub trait ErrorSink: Send + Sync {
    fn report(&self, event: ErrorEvent);
}

/// Default sink: logs each event through `tracing` at WARN.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, event: ErrorEvent) {
        warn!(
            kind = event.kind,
            context = %event.context,
            error = %event.error,
            "entity store operation failed; continuing"
        );
    }
}

/// Continue-past-one-bad-record wrapper around an [`EntityStore`].
///
/// Trades strict per-record consistency for indexing availability: a
/// failing operation is reported through the sink and the batch moves on.
/// Operators should watch the sink — a skipped record is data loss until
/// the range is re-indexed.
pub struct LenientStore<'a> {
    store: &'a EntityStore,
    sink: Arc<dyn ErrorSink>,
}

impl<'a> LenientStore<'a> {
    pub fn new(store: &'a EntityStore, sink: Arc<dyn ErrorSink>) -> Self {
        Self { store, sink }
    }

    /// Wraps with the default `tracing` sink.
    pub fn with_tracing(store: &'a EntityStore) -> Self {
        Self::new(store, Arc::new(TracingSink))
    }

    fn swallow<T>(
        &self,
        kind: &'static str,
        context: String,
        result: StoreResult<T>,
        fallback: T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                self.sink.report(ErrorEvent {
                    kind,
                    context,
                    error,
                });
                fallback
            }
        }
    }

    pub fn get(&self, entity: &str, id: &str) -> Option<Record> {
        self.swallow(
            "get",
            format!("{entity} id {id}"),
            self.store.get(entity, id),
            None,
        )
    }

    pub fn create(&self, entity: &str, id: &str, fields: Record) -> Record {
        self.swallow(
            "create",
            format!("{entity} id {id}"),
            self.store.create(entity, id, fields),
            Record::new(),
        )
    }

    pub fn update(&self, entity: &str, id: &str, fields: Record) -> Record {
        self.swallow(
            "update",
            format!("{entity} id {id}"),
            self.store.update(entity, id, fields),
            Record::new(),
        )
    }

    pub fn upsert(&self, entity: &str, id: &str, fields: Record) -> Record {
        self.swallow(
            "upsert",
            format!("{entity} id {id}"),
            self.store.upsert(entity, id, fields),
            Record::new(),
        )
    }

    pub fn delete(&self, entity: &str, id: &str) -> bool {
        self.swallow(
            "delete",
            format!("{entity} id {id}"),
            self.store.delete(entity, id),
            false,
        )
    }

    pub fn query(&self, entity: &str, filter: &EntityFilter) -> Vec<Record> {
        self.swallow(
            "query",
            entity.to_string(),
            self.store.query(entity, filter),
            Vec::new(),
        )
    }

    pub fn query_derived(&self, entity: &str, id: &str, derived_field: &str) -> Vec<Record> {
        self.swallow(
            "query_derived",
            format!("{entity} id {id} field {derived_field}"),
            self.store.query_derived(entity, id, derived_field),
            Vec::new(),
        )
    }
}
