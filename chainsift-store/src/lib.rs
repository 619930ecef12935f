//! SQLite-backed entity store for chainsift.
//!
//! The store is the component event handlers and the query front end talk
//! to: a compiled schema is installed with [`EntityStore::migrate`] (a
//! destructive recreate of every entity table), handlers mutate records
//! through the CRUD surface, and queries run through the GraphQL-style
//! filter contract ([`EntityFilter`]: `where`, `first`, `skip`, `orderBy`,
//! `orderDirection`).
//!
//! # Architecture
//!
//! - One `rusqlite` connection per store, serialized behind a mutex; cloned
//!   handles share it, matching the single-writer/many-reader embedding
//! - Every caller-supplied value reaches SQL through a bound parameter;
//!   identifiers are interpolated only after schema validation
//! - List columns hold a comma-delimited, backslash-escaped encoding that
//!   round-trips any element
//! - The core API returns explicit `Result`s; [`LenientStore`] is the
//!   opt-in wrapper that swallows per-record failures, reports them through
//!   an [`ErrorSink`], and keeps a long indexing run alive

mod error;
mod filter;
mod report;
mod serialize;
mod store;

pub use error::{StoreError, StoreResult};
pub use filter::{
    EntityFilter, FilterOperator, OrderDirection, operator_for_suffix, suffixes_for_kind,
};
pub use report::{ErrorEvent, ErrorSink, LenientStore, TracingSink};
pub use store::EntityStore;
