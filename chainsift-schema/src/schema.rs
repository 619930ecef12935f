//! The compiled, lookup-indexed schema graph.

use crate::{EntityDef, FieldDef, FieldKind, SchemaDef, SchemaError};
use std::collections::BTreeMap;

/// A compiled field: name, kind, nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    nullable: bool,
}

impl Field {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[must_use]
    pub const fn nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn is_derived(&self) -> bool {
        self.kind.is_derived()
    }
}

/// A compiled entity: ordered fields plus a name lookup and a resolved
/// handle to the single id field.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    fields: Vec<Field>,
    by_name: BTreeMap<String, usize>,
    id_index: usize,
}

impl Entity {
    fn build(def: EntityDef) -> Result<Self, SchemaError> {
        validate_name(&def.name)?;

        let mut fields = Vec::with_capacity(def.fields.len());
        let mut by_name = BTreeMap::new();
        let mut id_index = None;

        for FieldDef {
            name,
            kind,
            nullable,
        } in def.fields
        {
            validate_name(&name)?;
            if by_name.contains_key(&name) {
                return Err(SchemaError::DuplicateField {
                    entity: def.name,
                    field: name,
                });
            }
            match &kind {
                FieldKind::Id => {
                    if id_index.replace(fields.len()).is_some() {
                        return Err(SchemaError::MultipleIdFields(def.name));
                    }
                }
                FieldKind::Enum { values } if values.is_empty() => {
                    return Err(SchemaError::EmptyEnum {
                        entity: def.name,
                        field: name,
                    });
                }
                _ => {}
            }
            by_name.insert(name.clone(), fields.len());
            fields.push(Field {
                name,
                // The id column never accepts NULL regardless of the def.
                nullable: nullable && !matches!(kind, FieldKind::Id),
                kind,
            });
        }

        let id_index = id_index.ok_or_else(|| SchemaError::NoIdField(def.name.clone()))?;

        Ok(Self {
            name: def.name,
            fields,
            by_name,
            id_index,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// The entity's single id field.
    #[must_use]
    pub fn id_field(&self) -> &Field {
        &self.fields[self.id_index]
    }

    /// The non-derived fields, i.e. those with a physical column.
    pub fn stored_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_derived())
    }

    /// The virtual reverse-relationship fields.
    pub fn derived_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_derived())
    }
}

/// A compiled schema: the validated entity graph the store migrates to and
/// queries against.
#[derive(Debug, Clone)]
pub struct Schema {
    entities: Vec<Entity>,
    by_name: BTreeMap<String, usize>,
}

impl Schema {
    /// Compiles a declarative definition into a validated schema.
    ///
    /// Enforces: valid unique entity/field names, exactly one id field per
    /// entity, non-empty enum label sets, relationship targets that exist,
    /// and derived targets that exist and are not themselves derived.
    pub fn compile(def: SchemaDef) -> Result<Self, SchemaError> {
        let mut entities = Vec::with_capacity(def.entities.len());
        let mut by_name = BTreeMap::new();

        for entity_def in def.entities {
            if by_name.contains_key(&entity_def.name) {
                return Err(SchemaError::DuplicateEntity(entity_def.name));
            }
            let entity = Entity::build(entity_def)?;
            by_name.insert(entity.name.clone(), entities.len());
            entities.push(entity);
        }

        let schema = Self { entities, by_name };
        schema.check_references()?;
        Ok(schema)
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        for entity in &self.entities {
            for field in entity.fields() {
                match field.kind() {
                    FieldKind::Relationship { entity: target } => {
                        if self.entity(target).is_none() {
                            return Err(SchemaError::UnknownEntity {
                                entity: entity.name.clone(),
                                field: field.name.clone(),
                                target: target.clone(),
                            });
                        }
                    }
                    FieldKind::Derived {
                        entity: target,
                        field: target_field,
                    } => {
                        let Some(target_entity) = self.entity(target) else {
                            return Err(SchemaError::UnknownEntity {
                                entity: entity.name.clone(),
                                field: field.name.clone(),
                                target: target.clone(),
                            });
                        };
                        let Some(resolved) = target_entity.field(target_field) else {
                            return Err(SchemaError::UnknownField {
                                entity: entity.name.clone(),
                                field: field.name.clone(),
                                target_entity: target.clone(),
                                target_field: target_field.clone(),
                            });
                        };
                        if resolved.is_derived() {
                            return Err(SchemaError::DerivedTarget {
                                entity: entity.name.clone(),
                                field: field.name.clone(),
                                target_entity: target.clone(),
                                target_field: target_field.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Entities in declaration order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }
}

/// Entity and field names double as SQL identifiers, so they are restricted
/// to `[A-Za-z_][A-Za-z0-9_]*`. This is what makes quoting them into DDL and
/// DML safe.
fn validate_name(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}
