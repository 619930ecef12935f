//! The SQLite-backed entity store.

use crate::error::{StoreError, StoreResult};
use crate::filter::{self, EntityFilter};
use crate::serialize;
use chainsift_schema::{Entity, FieldKind, Schema};
use chainsift_types::{Record, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::debug;

/// Schema-driven entity store over a single SQLite database.
///
/// Cloned handles share the same connection and installed schema, which is
/// the intended embedding: the indexing pipeline writes sequentially while
/// a query front end reads through its own clones. The connection mutex
/// serializes every statement; the schema slot's write lock additionally
/// keeps migration exclusive against all other operations.
#[derive(Clone)]
pub struct EntityStore {
    conn: Arc<Mutex<Connection>>,
    schema: Arc<RwLock<Option<Arc<Schema>>>>,
}

impl EntityStore {
    /// Opens (or creates) a store at the given path, in WAL mode with a
    /// busy timeout.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: Arc::new(RwLock::new(None)),
        }
    }

    /// The currently installed schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema.read().unwrap().clone()
    }

    fn require_schema(&self) -> StoreResult<Arc<Schema>> {
        self.schema().ok_or(StoreError::NotInitialized)
    }

    /// Installs `schema` and recreates physical storage to match.
    ///
    /// This is a destructive full reset: every entity table in the new
    /// schema is dropped and recreated empty, inside one transaction. On
    /// failure the transaction rolls back and the store fails closed
    /// (`NotInitialized`) until a migration succeeds.
    pub fn migrate(&self, schema: Schema) -> StoreResult<()> {
        let mut slot = self.schema.write().unwrap();
        *slot = None;

        let mut conn = self.conn.lock().unwrap();
        let result: rusqlite::Result<()> = (|| {
            let tx = conn.transaction()?;
            for entity in schema.entities() {
                let columns: Vec<String> = entity
                    .stored_fields()
                    .filter_map(serialize::column_fragment)
                    .collect();
                debug!(entity = entity.name(), "recreating entity table");
                tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", entity.name()))?;
                tx.execute_batch(&format!(
                    "CREATE TABLE \"{}\" ({})",
                    entity.name(),
                    columns.join(", ")
                ))?;
            }
            tx.commit()
        })();

        match result {
            Ok(()) => {
                *slot = Some(Arc::new(schema));
                Ok(())
            }
            Err(e) => Err(StoreError::MigrationFailed {
                reason: e.to_string(),
            }),
        }
    }

    /// Fetches one record by id. `Ok(None)` when no such record exists.
    pub fn get(&self, entity_name: &str, id: &str) -> StoreResult<Option<Record>> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = ?1",
            entity.name(),
            entity.id_field().name()
        );
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt.query_row(params![id], row_to_pairs).optional()?;
        match pairs {
            Some(pairs) => Ok(Some(pairs_to_record(entity, pairs)?)),
            None => Ok(None),
        }
    }

    /// Inserts a new record. The `id` argument always wins over any `id`
    /// in the payload. Fails with `DuplicatePrimaryKey` if the id exists.
    pub fn create(&self, entity_name: &str, id: &str, mut fields: Record) -> StoreResult<Record> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        fields.insert(entity.id_field().name(), Value::String(id.to_string()));
        let (columns, values) = serialize_record(entity, &fields)?;

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            entity.name(),
            columns.join(", "),
            placeholders
        );
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt
            .query_row(params_from_iter(values), row_to_pairs)
            .map_err(|e| map_key_conflict(entity, id, e))?;
        pairs_to_record(entity, pairs)
    }

    /// Updates only the columns present in `fields`. The id column is
    /// never part of the update set. Fails with `RecordNotFound` when no
    /// record with that id exists.
    pub fn update(&self, entity_name: &str, id: &str, mut fields: Record) -> StoreResult<Record> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        fields.remove(entity.id_field().name());
        if fields.is_empty() {
            // Nothing to write; still report a missing record as an error.
            return self
                .get(entity_name, id)?
                .ok_or_else(|| record_not_found(entity, id));
        }

        let (columns, mut values) = serialize_record(entity, &fields)?;
        let assignments = columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(SqlValue::Text(id.to_string()));

        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ? RETURNING *",
            entity.name(),
            assignments,
            entity.id_field().name()
        );
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt
            .query_row(params_from_iter(values), row_to_pairs)
            .optional()?;
        match pairs {
            Some(pairs) => pairs_to_record(entity, pairs),
            None => Err(record_not_found(entity, id)),
        }
    }

    /// Insert-or-update, atomic on the single record: a primary-key
    /// conflict takes the update path instead of failing.
    pub fn upsert(&self, entity_name: &str, id: &str, mut fields: Record) -> StoreResult<Record> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        let id_column = entity.id_field().name().to_string();
        fields.insert(id_column.as_str(), Value::String(id.to_string()));
        let (columns, values) = serialize_record(entity, &fields)?;

        let quoted_id = format!("\"{id_column}\"");
        let mut assignments: Vec<String> = columns
            .iter()
            .filter(|c| **c != quoted_id)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        if assignments.is_empty() {
            // Id-only payload: a no-op assignment keeps RETURNING populated.
            assignments.push(format!("{quoted_id} = excluded.{quoted_id}"));
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {} RETURNING *",
            entity.name(),
            columns.join(", "),
            placeholders,
            quoted_id,
            assignments.join(", ")
        );
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let pairs = stmt.query_row(params_from_iter(values), row_to_pairs)?;
        pairs_to_record(entity, pairs)
    }

    /// Deletes one record. True iff exactly one record was removed.
    pub fn delete(&self, entity_name: &str, id: &str) -> StoreResult<bool> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?1",
            entity.name(),
            entity.id_field().name()
        );
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(&sql, params![id])?;
        Ok(removed == 1)
    }

    /// Runs a filtered, ordered, paginated query. All `where` predicates
    /// are ANDed.
    pub fn query(&self, entity_name: &str, filter: &EntityFilter) -> StoreResult<Vec<Record>> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        let rendered = filter::render_where(entity, &filter.where_clause)?;
        let mut params = rendered.params;
        let tail = filter::render_order_and_limit(entity, filter, &mut params)?;

        let mut sql = format!("SELECT * FROM \"{}\"", entity.name());
        if !rendered.sql.is_empty() {
            sql.push(' ');
            sql.push_str(&rendered.sql);
        }
        if !tail.is_empty() {
            sql.push(' ');
            sql.push_str(&tail);
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(pairs_to_record(entity, row_to_pairs(row)?)?);
        }
        Ok(records)
    }

    /// Resolves a derived field: all records of the target entity whose
    /// target field equals `id`.
    pub fn query_derived(
        &self,
        entity_name: &str,
        id: &str,
        derived_field: &str,
    ) -> StoreResult<Vec<Record>> {
        let schema = self.require_schema()?;
        let entity = lookup_entity(&schema, entity_name)?;

        let Some(FieldKind::Derived {
            entity: target,
            field: target_field,
        }) = entity.field(derived_field).map(|f| f.kind())
        else {
            return Err(StoreError::DerivedFieldNotFound {
                entity: entity_name.to_string(),
                field: derived_field.to_string(),
            });
        };

        let target = target.clone();
        let filter = EntityFilter::where_eq(target_field.clone(), Value::String(id.to_string()));
        self.query(&target, &filter)
    }
}

fn lookup_entity<'a>(schema: &'a Schema, name: &str) -> StoreResult<&'a Entity> {
    schema.entity(name).ok_or_else(|| StoreError::EntityNotFound {
        entity: name.to_string(),
    })
}

fn record_not_found(entity: &Entity, id: &str) -> StoreError {
    StoreError::RecordNotFound {
        entity: entity.name().to_string(),
        id: id.to_string(),
    }
}

/// Serializes a write payload into quoted column names and bound values,
/// validating every field against the schema.
fn serialize_record(entity: &Entity, fields: &Record) -> StoreResult<(Vec<String>, Vec<SqlValue>)> {
    let mut columns = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    for (name, value) in fields.iter() {
        let field = entity.field(name).ok_or_else(|| StoreError::FieldNotFound {
            entity: entity.name().to_string(),
            field: name.to_string(),
        })?;
        columns.push(format!("\"{}\"", field.name()));
        values.push(serialize::to_physical(field, value)?);
    }
    Ok((columns, values))
}

fn row_to_pairs(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vec<(String, SqlValue)>> {
    let stmt = row.as_ref();
    let mut pairs = Vec::with_capacity(stmt.column_count());
    for idx in 0..stmt.column_count() {
        let name = stmt.column_name(idx)?.to_string();
        pairs.push((name, row.get::<_, SqlValue>(idx)?));
    }
    Ok(pairs)
}

fn pairs_to_record(entity: &Entity, pairs: Vec<(String, SqlValue)>) -> StoreResult<Record> {
    let mut record = Record::new();
    for (name, raw) in pairs {
        let value = match entity.field(&name) {
            Some(field) => serialize::to_logical(field, raw)?,
            None => serialize::untyped_to_logical(raw),
        };
        record.insert(name, value);
    }
    Ok(record)
}

/// Maps a primary-key constraint violation onto `DuplicatePrimaryKey`.
fn map_key_conflict(entity: &Entity, id: &str, err: rusqlite::Error) -> StoreError {
    const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
    const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE
                ) =>
        {
            StoreError::DuplicatePrimaryKey {
                entity: entity.name().to_string(),
                id: id.to_string(),
            }
        }
        _ => StoreError::Database(err),
    }
}
