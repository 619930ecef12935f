//! Entity schema model for chainsift.
//!
//! An external parser hands this crate a declarative [`SchemaDef`]; compiling
//! it produces the validated [`Schema`] every store operation runs against:
//! - [`SchemaDef`] / [`EntityDef`] / [`FieldDef`] — the declarative input,
//!   serde-deserializable so the parser can hand over plain data
//! - [`FieldKind`] — the tagged union of field kinds (id, scalar, enum,
//!   list, relationship, derived)
//! - [`Schema`] / [`Entity`] / [`Field`] — the compiled, lookup-indexed
//!   graph with all referential invariants enforced
//!
//! Compilation fails closed: a schema with a dangling relationship, a
//! derived field chained onto another derived field, or an entity without
//! exactly one id field never becomes a [`Schema`].

mod def;
mod error;
mod schema;

pub use def::{EntityDef, FieldDef, FieldKind, SchemaDef};
pub use error::SchemaError;
pub use schema::{Entity, Field, Schema};
