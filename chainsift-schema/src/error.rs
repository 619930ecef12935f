//! Schema compilation errors.

use thiserror::Error;

/// Errors produced while compiling a declarative schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// An entity or field name is empty or not a valid identifier.
    #[error("invalid name: {0:?} (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidName(String),

    /// Two entities share a name.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),

    /// Two fields on the same entity share a name.
    #[error("duplicate field {entity}.{field}")]
    DuplicateField { entity: String, field: String },

    /// An entity declares no id field.
    #[error("entity {0} has no id field")]
    NoIdField(String),

    /// An entity declares more than one id field.
    #[error("entity {0} has more than one id field")]
    MultipleIdFields(String),

    /// An enum field declares an empty label set.
    #[error("enum field {entity}.{field} has no values")]
    EmptyEnum { entity: String, field: String },

    /// A relationship or derived field targets an entity the schema does
    /// not define.
    #[error("field {entity}.{field} targets unknown entity {target}")]
    UnknownEntity {
        entity: String,
        field: String,
        target: String,
    },

    /// A derived field targets a field its target entity does not define.
    #[error("derived field {entity}.{field} targets unknown field {target_entity}.{target_field}")]
    UnknownField {
        entity: String,
        field: String,
        target_entity: String,
        target_field: String,
    },

    /// A derived field targets another derived field.
    #[error("derived field {entity}.{field} targets derived field {target_entity}.{target_field}")]
    DerivedTarget {
        entity: String,
        field: String,
        target_entity: String,
        target_field: String,
    },
}
