//! Error types for the entity store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in entity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No schema has been installed via `migrate` (or the last migration
    /// failed and the store is failing closed).
    #[error("entity store has not been migrated with a schema yet")]
    NotInitialized,

    /// The entity name is not part of the installed schema.
    #[error("entity not found in schema: {entity}")]
    EntityNotFound { entity: String },

    /// An update addressed a record that does not exist.
    #[error("no {entity} record with id {id:?}")]
    RecordNotFound { entity: String, id: String },

    /// A write payload or `orderBy` named a field the entity does not define.
    #[error("field not found: {entity}.{field}")]
    FieldNotFound { entity: String, field: String },

    /// `query_derived` named a field that is absent or not derived.
    #[error("derived field not found: {entity}.{field}")]
    DerivedFieldNotFound { entity: String, field: String },

    /// A filter key resolved to no (field, operator-suffix) pair admitted
    /// for the field's kind.
    #[error("unsupported filter operator in key: {key:?}")]
    UnsupportedFilterOperator { key: String },

    /// A create collided with an existing record.
    #[error("duplicate primary key for {entity}: {id:?}")]
    DuplicatePrimaryKey { entity: String, id: String },

    /// A write carried an enum value outside the field's label set.
    #[error("invalid enum value for field {field}: {value:?}")]
    InvalidEnumValue { field: String, value: String },

    /// A write carried a value whose type does not fit the field.
    #[error("invalid value for field {field}: expected {expected}, got {got}")]
    InvalidValue {
        field: String,
        expected: String,
        got: String,
    },

    /// A stored cell could not be rehydrated into the field's logical type.
    #[error("failed to decode stored value for field {field}: {reason}")]
    DecodeFailed { field: String, reason: String },

    /// The destructive recreate failed; the store fails closed until a
    /// migration succeeds.
    #[error("migration failed: {reason}")]
    MigrationFailed { reason: String },

    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}
