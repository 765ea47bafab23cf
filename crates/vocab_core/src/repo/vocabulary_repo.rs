//! Vocabulary repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the document-store operations the engine consumes: point lookup,
//!   filtered listing, batch insert, partial update, replace, soft delete.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - One row per vocabulary id; items live inside the JSON document.
//! - Write paths call `Vocabulary::validate_shape()` before SQL mutations.
//! - `insert` is all-or-nothing for the whole batch.
//! - Soft-deleted rows are kept so their ids stay reserved.
//!
//! # See also
//! - docs/architecture/vocabularies.md

use crate::db::DbError;
use crate::model::now_epoch_ms;
use crate::model::vocabulary::{
    SelectionType, ValidationError, Vocabulary, VocabularyId, VocabularyType, VocabularyUpdate,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const VOCABULARY_SELECT_SQL: &str = "SELECT
    id,
    document,
    is_deleted,
    created_at,
    updated_at
FROM vocabularies";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "document",
    "vocabulary_type",
    "field_type",
    "selection_type",
    "has_service",
    "is_deleted",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for vocabulary persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(VocabularyId),
    AlreadyExists(VocabularyId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "vocabulary not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "vocabulary already exists: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted vocabulary data: {message}")
            }
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter over the `field_type` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldTypeFilter {
    #[default]
    Any,
    /// Custom vocabularies only.
    Present,
    /// Default/system vocabularies only.
    Absent,
    Equals(String),
}

/// Query options for listing vocabularies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyListQuery {
    pub kind: Option<VocabularyType>,
    pub field_type: FieldTypeFilter,
    /// `Some(true)` keeps only vocabularies carrying a `service` config.
    pub has_service: Option<bool>,
    pub selection_type: Option<SelectionType>,
    pub include_deleted: bool,
}

/// Document-store interface consumed by the vocabulary engine.
///
/// Implementations own no business rules beyond document shape; validation,
/// references and notifications live in the service layer.
pub trait VocabularyRepository {
    /// Returns the active (non-deleted) vocabulary with `id`.
    fn find_one(&self, id: &str) -> RepoResult<Option<Vocabulary>>;
    /// Returns the soft-deleted vocabulary with `id`, if any.
    fn find_deleted(&self, id: &str) -> RepoResult<Option<Vocabulary>>;
    /// Lists vocabularies ordered by id.
    fn list(&self, query: &VocabularyListQuery) -> RepoResult<Vec<Vocabulary>>;
    /// Inserts all documents or none of them.
    fn insert(&self, docs: &[Vocabulary]) -> RepoResult<Vec<VocabularyId>>;
    /// Applies a partial update and returns the stored result.
    fn patch(&self, id: &str, update: &VocabularyUpdate) -> RepoResult<Vocabulary>;
    /// Replaces a whole active document.
    fn replace(&self, doc: &Vocabulary) -> RepoResult<()>;
    /// Marks a vocabulary as deleted without purging it.
    fn soft_delete(&self, id: &str) -> RepoResult<()>;

    /// Internal housekeeping write path.
    ///
    /// Stores the update like `patch`; callers use it to skip request-level
    /// hooks, not storage rules.
    fn system_update(&self, id: &str, update: &VocabularyUpdate) -> RepoResult<Vocabulary> {
        self.patch(id, update)
    }
}

/// SQLite-backed vocabulary repository.
pub struct SqliteVocabularyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVocabularyRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VocabularyRepository for SqliteVocabularyRepository<'_> {
    fn find_one(&self, id: &str) -> RepoResult<Option<Vocabulary>> {
        load_vocabulary(self.conn, id, false)
    }

    fn find_deleted(&self, id: &str) -> RepoResult<Option<Vocabulary>> {
        load_vocabulary(self.conn, id, true)
    }

    fn list(&self, query: &VocabularyListQuery) -> RepoResult<Vec<Vocabulary>> {
        let mut sql = format!("{VOCABULARY_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(kind) = query.kind {
            sql.push_str(" AND vocabulary_type = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }

        match &query.field_type {
            FieldTypeFilter::Any => {}
            FieldTypeFilter::Present => sql.push_str(" AND field_type IS NOT NULL"),
            FieldTypeFilter::Absent => sql.push_str(" AND field_type IS NULL"),
            FieldTypeFilter::Equals(value) => {
                sql.push_str(" AND field_type = ?");
                bind_values.push(Value::Text(value.clone()));
            }
        }

        if let Some(has_service) = query.has_service {
            sql.push_str(" AND has_service = ?");
            bind_values.push(Value::Integer(bool_to_int(has_service)));
        }

        if let Some(selection_type) = query.selection_type {
            sql.push_str(" AND selection_type = ?");
            bind_values.push(Value::Text(selection_type.as_str().to_string()));
        }

        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut vocabularies = Vec::new();
        while let Some(row) = rows.next()? {
            vocabularies.push(parse_vocabulary_row(row)?);
        }

        Ok(vocabularies)
    }

    fn insert(&self, docs: &[Vocabulary]) -> RepoResult<Vec<VocabularyId>> {
        let tx = self.conn.unchecked_transaction()?;
        let now = now_epoch_ms();
        let mut ids = Vec::with_capacity(docs.len());

        for doc in docs {
            doc.validate_shape()?;
            if row_exists(&tx, &doc.id)? {
                return Err(RepoError::AlreadyExists(doc.id.clone()));
            }

            let mut stored = doc.clone();
            stored.is_deleted = false;
            stored.created_at = Some(doc.created_at.unwrap_or(now));
            stored.updated_at = Some(doc.updated_at.unwrap_or(now));

            tx.execute(
                "INSERT INTO vocabularies (
                    id,
                    document,
                    vocabulary_type,
                    field_type,
                    selection_type,
                    has_service,
                    is_deleted,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8);",
                params![
                    stored.id.as_str(),
                    encode_document(&stored)?,
                    stored.kind.as_str(),
                    stored.field_type.as_deref(),
                    stored.selection_type.map(SelectionType::as_str),
                    bool_to_int(stored.service.is_some()),
                    stored.created_at,
                    stored.updated_at,
                ],
            )?;
            ids.push(stored.id);
        }

        tx.commit()?;
        Ok(ids)
    }

    fn patch(&self, id: &str, update: &VocabularyUpdate) -> RepoResult<Vocabulary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut doc =
            load_vocabulary(&tx, id, false)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        doc.apply_update(update);
        doc.updated_at = Some(now_epoch_ms());
        doc.validate_shape()?;

        if update_row(&tx, &doc)? == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        tx.commit()?;

        Ok(doc)
    }

    fn replace(&self, doc: &Vocabulary) -> RepoResult<()> {
        doc.validate_shape()?;

        let now = now_epoch_ms();
        let mut stored = doc.clone();
        stored.is_deleted = false;
        stored.created_at = Some(doc.created_at.unwrap_or(now));
        stored.updated_at = Some(doc.updated_at.unwrap_or(now));

        if update_row(self.conn, &stored)? == 0 {
            return Err(RepoError::NotFound(doc.id.clone()));
        }

        Ok(())
    }

    fn soft_delete(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vocabularies
             SET
                is_deleted = 1,
                updated_at = ?2
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id, now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

fn load_vocabulary(conn: &Connection, id: &str, deleted: bool) -> RepoResult<Option<Vocabulary>> {
    let mut stmt = conn.prepare(&format!(
        "{VOCABULARY_SELECT_SQL}
         WHERE id = ?1
           AND is_deleted = ?2;"
    ))?;

    let mut rows = stmt.query(params![id, bool_to_int(deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_vocabulary_row(row)?));
    }

    Ok(None)
}

fn update_row(conn: &Connection, doc: &Vocabulary) -> RepoResult<usize> {
    let changed = conn.execute(
        "UPDATE vocabularies
         SET
            document = ?2,
            vocabulary_type = ?3,
            field_type = ?4,
            selection_type = ?5,
            has_service = ?6,
            created_at = COALESCE(?7, created_at),
            updated_at = ?8
         WHERE id = ?1
           AND is_deleted = 0;",
        params![
            doc.id.as_str(),
            encode_document(doc)?,
            doc.kind.as_str(),
            doc.field_type.as_deref(),
            doc.selection_type.map(SelectionType::as_str),
            bool_to_int(doc.service.is_some()),
            doc.created_at,
            doc.updated_at.unwrap_or_else(now_epoch_ms),
        ],
    )?;
    Ok(changed)
}

fn row_exists(conn: &Connection, id: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM vocabularies WHERE id = ?1;",
            [id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn parse_vocabulary_row(row: &Row<'_>) -> RepoResult<Vocabulary> {
    let id: String = row.get("id")?;
    let document: String = row.get("document")?;
    let mut vocabulary: Vocabulary = serde_json::from_str(&document).map_err(|err| {
        RepoError::InvalidData(format!("document for `{id}` cannot be decoded: {err}"))
    })?;

    if vocabulary.id != id {
        return Err(RepoError::InvalidData(format!(
            "document id `{}` does not match row id `{id}`",
            vocabulary.id
        )));
    }

    vocabulary.is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in vocabularies.is_deleted"
            )));
        }
    };
    vocabulary.created_at = Some(row.get("created_at")?);
    vocabulary.updated_at = Some(row.get("updated_at")?);

    Ok(vocabulary)
}

fn encode_document(doc: &Vocabulary) -> RepoResult<String> {
    serde_json::to_string(doc).map_err(|err| {
        RepoError::InvalidData(format!("document for `{}` cannot be encoded: {err}", doc.id))
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "vocabularies")? {
        return Err(RepoError::MissingRequiredTable("vocabularies"));
    }

    for &column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "vocabularies", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "vocabularies",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
