//! Declarative schema definitions, the hand-off format from the schema parser.

use chainsift_types::ScalarType;
use serde::{Deserialize, Serialize};

/// The kind of a field, as a tagged union.
///
/// Every kind except `Derived` maps to exactly one physical column; a
/// derived field has no column and is resolved at query time by filtering
/// its target entity on its target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Primary key. Exactly one per entity.
    Id,
    /// A primitive value column.
    Scalar { scalar: ScalarType },
    /// A value constrained to a fixed label set.
    Enum { values: Vec<String> },
    /// An ordered sequence of scalars, stored delimiter-encoded in one column.
    List { scalar: ScalarType },
    /// A foreign key holding another entity's id.
    Relationship { entity: String },
    /// Virtual reverse relationship: all records of `entity` whose `field`
    /// equals this record's id.
    Derived { entity: String, field: String },
}

impl FieldKind {
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::Derived { .. })
    }
}

/// A declarative schema: the ordered entity definitions to compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub entities: Vec<EntityDef>,
}

impl SchemaDef {
    #[must_use]
    pub fn new(entities: Vec<EntityDef>) -> Self {
        Self { entities }
    }
}

/// A declarative entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Unique entity name; doubles as the physical table name.
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// A declarative field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the column accepts NULL. Ignored for id and derived fields.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    fn simple(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    /// Shorthand for the primary-key field, conventionally named `id`.
    #[must_use]
    pub fn id() -> Self {
        Self::simple("id", FieldKind::Id)
    }

    /// Shorthand for a scalar field of the given type.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::simple(name, FieldKind::Scalar { scalar })
    }

    /// Shorthand for a string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::String)
    }

    /// Shorthand for an integer field.
    pub fn int(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Int)
    }

    /// Shorthand for a float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Float)
    }

    /// Shorthand for a boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Boolean)
    }

    /// Shorthand for a bytes field.
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Bytes)
    }

    /// Shorthand for an enum field with a fixed label set.
    pub fn enumeration(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::simple(name, FieldKind::Enum { values })
    }

    /// Shorthand for a list field with the given element type.
    pub fn list(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::simple(name, FieldKind::List { scalar })
    }

    /// Shorthand for a relationship field referencing `entity`.
    pub fn relationship(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self::simple(
            name,
            FieldKind::Relationship {
                entity: entity.into(),
            },
        )
    }

    /// Shorthand for a derived field reverse-resolving `entity.field`.
    pub fn derived(
        name: impl Into<String>,
        entity: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::simple(
            name,
            FieldKind::Derived {
                entity: entity.into(),
                field: field.into(),
            },
        )
    }

    /// Marks the field as accepting NULL.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}
