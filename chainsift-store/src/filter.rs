//! The filter operator table and SQL predicate rendering.
//!
//! A `where` key is `<fieldName>` or `<fieldName>_<suffix>`; the suffix
//! selects a comparison (`_gt`, `_contains`, `_in`, …). Keys resolve
//! against a concrete entity by longest-field-name match, so field names
//! containing underscores work, and the suffix must be admitted for the
//! field's kind. Every resolved predicate is ANDed; there is no OR.
//!
//! All caller-supplied values are bound as parameters — never interpolated
//! — and `LIKE` values are wildcard-escaped, so a filter value cannot alter
//! the shape of the statement it appears in.

use crate::error::{StoreError, StoreResult};
use crate::serialize;
use chainsift_schema::{Entity, Field, FieldKind};
use chainsift_types::{ScalarType, Value};
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a filter suffix renders against storage: the SQL comparison
/// operator, optional pattern affixes for `LIKE` shapes, and whether the
/// value binds as a list of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOperator {
    pub suffix: &'static str,
    pub sql: &'static str,
    pub pattern_prefix: Option<&'static str>,
    pub pattern_suffix: Option<&'static str>,
    pub binds_list: bool,
}

const fn cmp(suffix: &'static str, sql: &'static str) -> FilterOperator {
    FilterOperator {
        suffix,
        sql,
        pattern_prefix: None,
        pattern_suffix: None,
        binds_list: false,
    }
}

const fn set(suffix: &'static str, sql: &'static str) -> FilterOperator {
    FilterOperator {
        suffix,
        sql,
        pattern_prefix: None,
        pattern_suffix: None,
        binds_list: true,
    }
}

const fn like(
    suffix: &'static str,
    sql: &'static str,
    prefix: Option<&'static str>,
    pattern_suffix: Option<&'static str>,
) -> FilterOperator {
    FilterOperator {
        suffix,
        sql,
        pattern_prefix: prefix,
        pattern_suffix,
        binds_list: false,
    }
}

/// The full suffix vocabulary. The `_nocase` twins render identically to
/// their plain counterparts: SQLite `LIKE` is ASCII-case-insensitive for
/// both.
pub const OPERATORS: &[FilterOperator] = &[
    cmp("", "="),
    cmp("not", "!="),
    set("in", "IN"),
    set("not_in", "NOT IN"),
    cmp("gt", ">"),
    cmp("lt", "<"),
    cmp("gte", ">="),
    cmp("lte", "<="),
    like("contains", "LIKE", Some("%"), Some("%")),
    like("contains_nocase", "LIKE", Some("%"), Some("%")),
    like("not_contains", "NOT LIKE", Some("%"), Some("%")),
    like("not_contains_nocase", "NOT LIKE", Some("%"), Some("%")),
    like("starts_with", "LIKE", None, Some("%")),
    like("starts_with_nocase", "LIKE", None, Some("%")),
    like("ends_with", "LIKE", Some("%"), None),
    like("ends_with_nocase", "LIKE", Some("%"), None),
    like("not_starts_with", "NOT LIKE", None, Some("%")),
    like("not_starts_with_nocase", "NOT LIKE", None, Some("%")),
    like("not_ends_with", "NOT LIKE", Some("%"), None),
    like("not_ends_with_nocase", "NOT LIKE", Some("%"), None),
];

/// Looks up the operator descriptor for a bare suffix (no leading `_`).
#[must_use]
pub fn operator_for_suffix(suffix: &str) -> Option<&'static FilterOperator> {
    OPERATORS.iter().find(|op| op.suffix == suffix)
}

const COMPARISON_SUFFIXES: &[&str] = &["", "not", "in", "not_in", "gt", "lt", "gte", "lte"];
const STRING_SUFFIXES: &[&str] = &[
    "contains",
    "contains_nocase",
    "not_contains",
    "not_contains_nocase",
    "starts_with",
    "starts_with_nocase",
    "ends_with",
    "ends_with_nocase",
    "not_starts_with",
    "not_starts_with_nocase",
    "not_ends_with",
    "not_ends_with_nocase",
];
const ENUM_SUFFIXES: &[&str] = &["", "not", "in", "not_in"];
const LIST_SUFFIXES: &[&str] = &[
    "",
    "not",
    "contains",
    "contains_nocase",
    "not_contains",
    "not_contains_nocase",
];

/// The suffixes admitted for a field kind, for building filter
/// vocabularies. Derived fields admit none.
#[must_use]
pub fn suffixes_for_kind(kind: &FieldKind) -> Vec<&'static str> {
    match kind {
        FieldKind::Id => COMPARISON_SUFFIXES.to_vec(),
        FieldKind::Scalar {
            scalar: ScalarType::String,
        }
        | FieldKind::Relationship { .. } => {
            let mut all = COMPARISON_SUFFIXES.to_vec();
            all.extend_from_slice(STRING_SUFFIXES);
            all
        }
        FieldKind::Scalar { .. } => COMPARISON_SUFFIXES.to_vec(),
        FieldKind::Enum { .. } => ENUM_SUFFIXES.to_vec(),
        FieldKind::List { .. } => LIST_SUFFIXES.to_vec(),
        FieldKind::Derived { .. } => Vec::new(),
    }
}

fn suffix_admitted(kind: &FieldKind, suffix: &str) -> bool {
    match kind {
        FieldKind::Id => COMPARISON_SUFFIXES.contains(&suffix),
        FieldKind::Scalar {
            scalar: ScalarType::String,
        }
        | FieldKind::Relationship { .. } => {
            COMPARISON_SUFFIXES.contains(&suffix) || STRING_SUFFIXES.contains(&suffix)
        }
        FieldKind::Scalar { .. } => COMPARISON_SUFFIXES.contains(&suffix),
        FieldKind::Enum { .. } => ENUM_SUFFIXES.contains(&suffix),
        FieldKind::List { .. } => LIST_SUFFIXES.contains(&suffix),
        FieldKind::Derived { .. } => false,
    }
}

/// Resolves a filter key into the entity field it addresses and the
/// operator its suffix selects. Longest field-name match wins.
pub(crate) fn resolve_key<'a>(
    entity: &'a Entity,
    key: &str,
) -> StoreResult<(&'a Field, &'static FilterOperator)> {
    let mut best: Option<(&Field, &'static FilterOperator)> = None;
    let mut best_len = 0;
    for field in entity.fields() {
        let name = field.name();
        let suffix = if key == name {
            Some("")
        } else if key.len() > name.len() + 1
            && key.starts_with(name)
            && key.as_bytes()[name.len()] == b'_'
        {
            Some(&key[name.len() + 1..])
        } else {
            None
        };
        let Some(suffix) = suffix else { continue };
        if !suffix_admitted(field.kind(), suffix) {
            continue;
        }
        if let Some(op) = operator_for_suffix(suffix) {
            if best.is_none() || name.len() > best_len {
                best = Some((field, op));
                best_len = name.len();
            }
        }
    }
    best.ok_or_else(|| StoreError::UnsupportedFilterOperator {
        key: key.to_string(),
    })
}

/// Sort direction for `orderBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// The filter argument set a query front end hands the store, with its
/// wire-level names. All `where` predicates are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFilter {
    #[serde(rename = "where")]
    pub where_clause: BTreeMap<String, Value>,
    /// Page size cap. `Some(0)` yields no rows; it is not "unset."
    pub first: Option<u32>,
    /// Offset. Applies even without `first` (an unlimited scan, then skip).
    pub skip: Option<u32>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
    #[serde(rename = "orderDirection")]
    pub order_direction: Option<OrderDirection>,
}

impl EntityFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single equality predicate — the shape derived-field resolution
    /// issues internally.
    pub fn where_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut filter = Self::default();
        filter.where_clause.insert(field.into(), value.into());
        filter
    }
}

/// A rendered WHERE clause plus its bound parameters, in placeholder order.
pub(crate) struct RenderedWhere {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub(crate) fn render_where(
    entity: &Entity,
    where_clause: &BTreeMap<String, Value>,
) -> StoreResult<RenderedWhere> {
    if where_clause.is_empty() {
        return Ok(RenderedWhere {
            sql: String::new(),
            params: Vec::new(),
        });
    }

    let mut predicates = Vec::with_capacity(where_clause.len());
    let mut params = Vec::new();

    for (key, value) in where_clause {
        let (field, op) = resolve_key(entity, key)?;
        let column = format!("\"{}\"", field.name());

        if op.binds_list {
            let items = value.as_list().ok_or_else(|| StoreError::InvalidValue {
                field: field.name().to_string(),
                expected: format!("a list for {key:?}"),
                got: value.type_name().to_string(),
            })?;
            if items.is_empty() {
                // An empty set matches nothing; its negation matches everything.
                predicates.push(if op.sql == "IN" { "1 = 0" } else { "1 = 1" }.to_string());
                continue;
            }
            let mut placeholders = Vec::with_capacity(items.len());
            for item in items {
                params.push(bind_value(field, item)?);
                placeholders.push("?");
            }
            predicates.push(format!("{column} {} ({})", op.sql, placeholders.join(", ")));
        } else if op.pattern_prefix.is_some() || op.pattern_suffix.is_some() {
            params.push(SqlValue::Text(like_pattern(field, op, value)?));
            predicates.push(format!("{column} {} ? ESCAPE '\\'", op.sql));
        } else if value.is_null() {
            let predicate = match op.sql {
                "=" => format!("{column} IS NULL"),
                "!=" => format!("{column} IS NOT NULL"),
                _ => {
                    return Err(StoreError::InvalidValue {
                        field: field.name().to_string(),
                        expected: format!("a non-null value for {key:?}"),
                        got: "null".to_string(),
                    });
                }
            };
            predicates.push(predicate);
        } else {
            params.push(bind_value(field, value)?);
            predicates.push(format!("{column} {} ?", op.sql));
        }
    }

    Ok(RenderedWhere {
        sql: format!("WHERE {}", predicates.join(" AND ")),
        params,
    })
}

/// Renders `ORDER BY` / `LIMIT` / `OFFSET`, appending their parameters.
pub(crate) fn render_order_and_limit(
    entity: &Entity,
    filter: &EntityFilter,
    params: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    let mut fragments: Vec<String> = Vec::new();

    if let Some(order_by) = &filter.order_by {
        let field = entity
            .field(order_by)
            .filter(|f| !f.is_derived())
            .ok_or_else(|| StoreError::FieldNotFound {
                entity: entity.name().to_string(),
                field: order_by.clone(),
            })?;
        let mut fragment = format!("ORDER BY \"{}\"", field.name());
        if let Some(direction) = filter.order_direction {
            fragment.push(' ');
            fragment.push_str(direction.sql());
        }
        fragments.push(fragment);
    }

    match (filter.first, filter.skip) {
        (Some(first), Some(skip)) => {
            params.push(SqlValue::Integer(i64::from(first)));
            params.push(SqlValue::Integer(i64::from(skip)));
            fragments.push("LIMIT ? OFFSET ?".to_string());
        }
        (Some(first), None) => {
            params.push(SqlValue::Integer(i64::from(first)));
            fragments.push("LIMIT ?".to_string());
        }
        (None, Some(skip)) => {
            // SQLite needs a LIMIT clause for OFFSET; -1 means unlimited.
            params.push(SqlValue::Integer(i64::from(skip)));
            fragments.push("LIMIT -1 OFFSET ?".to_string());
        }
        (None, None) => {}
    }

    Ok(fragments.join(" "))
}

/// Binds a scalar-shaped filter value for a comparison or set membership.
///
/// Enum labels are not validated here: filtering by an unknown label
/// matches nothing, it is not an error.
fn bind_value(field: &Field, value: &Value) -> StoreResult<SqlValue> {
    match field.kind() {
        FieldKind::Enum { .. } => match value.as_str() {
            Some(s) => Ok(SqlValue::Text(s.to_string())),
            None => Err(StoreError::InvalidValue {
                field: field.name().to_string(),
                expected: "an enum label".to_string(),
                got: value.type_name().to_string(),
            }),
        },
        _ => serialize::to_physical(field, value),
    }
}

/// Builds the bound `LIKE` pattern for a string-family operator, escaping
/// pattern metacharacters in the caller's value.
fn like_pattern(field: &Field, op: &FilterOperator, value: &Value) -> StoreResult<String> {
    let raw = match field.kind() {
        // List containment matches the element's physical encoding inside
        // the joined cell.
        FieldKind::List { .. } => {
            let canonical = value.to_canonical_string().ok_or_else(|| {
                StoreError::InvalidValue {
                    field: field.name().to_string(),
                    expected: "a scalar list element".to_string(),
                    got: value.type_name().to_string(),
                }
            })?;
            serialize::escape_element(&canonical)
        }
        _ => value
            .as_str()
            .ok_or_else(|| StoreError::InvalidValue {
                field: field.name().to_string(),
                expected: "a string".to_string(),
                got: value.type_name().to_string(),
            })?
            .to_string(),
    };

    let mut pattern = String::with_capacity(raw.len() + 2);
    if let Some(prefix) = op.pattern_prefix {
        pattern.push_str(prefix);
    }
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    if let Some(suffix) = op.pattern_suffix {
        pattern.push_str(suffix);
    }
    Ok(pattern)
}
