//! Database module - SQLite-backed document store
//!
//! Documents are JSON objects addressed by a `/`-separated collection path
//! and a key, e.g. `artifacts/{app}/users/{uid}/workouts` + `Segunda-feira`.

use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document {collection}/{key} not found")]
    NotFound { collection: String, key: String },

    #[error("Document {collection}/{key} is not an object")]
    NotAnObject { collection: String, key: String },

    #[error("Invalid collection path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Stored document with its key
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: Value,
}

/// Reject empty segments so a path always names one collection
pub fn validate_path(collection: &str) -> Result<()> {
    if collection.is_empty() || collection.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(())
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Other sessions (CLI, second TUI) may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );

            CREATE TABLE IF NOT EXISTS identities (
                credential TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a single document
    pub fn get_document(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match body {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        })
    }

    /// Write a document. With `merge` the top-level fields of `body` replace the
    /// stored ones and every other stored field is kept; arrays are replaced whole.
    pub fn set_document(&self, collection: &str, key: &str, body: &Value, merge: bool) -> Result<()> {
        let incoming = body.as_object().ok_or_else(|| StoreError::NotAnObject {
            collection: collection.to_string(),
            key: key.to_string(),
        })?;

        let tx = self.conn.unchecked_transaction()?;

        let merged = if merge {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                    |row| row.get(0),
                )
                .optional()?;

            let mut fields = match existing {
                Some(text) => match serde_json::from_str::<Value>(&text)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
                None => Map::new(),
            };
            for (field, value) in incoming {
                fields.insert(field.clone(), value.clone());
            }
            Value::Object(fields)
        } else {
            body.clone()
        };

        tx.execute(
            "INSERT INTO documents (collection, key, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (collection, key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![collection, key, merged.to_string(), Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        debug!("Wrote {}/{} (merge: {})", collection, key, merge);
        Ok(())
    }

    /// Update one field of an existing document
    pub fn update_field(&self, collection: &str, key: &str, field: &str, value: Value) -> Result<()> {
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        };

        let tx = self.conn.unchecked_transaction()?;
        let existing: String = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(not_found)?;

        let mut fields = match serde_json::from_str::<Value>(&existing)? {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::NotAnObject {
                    collection: collection.to_string(),
                    key: key.to_string(),
                });
            }
        };
        fields.insert(field.to_string(), value);

        tx.execute(
            "UPDATE documents SET body = ?3, updated_at = ?4 WHERE collection = ?1 AND key = ?2",
            params![
                collection,
                key,
                Value::Object(fields).to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        debug!("Updated {}/{} field {}", collection, key, field);
        Ok(())
    }

    /// All documents of a collection, ordered by key
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, body FROM documents WHERE collection = ?1 ORDER BY key")?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, text)| {
                Ok(Document {
                    key,
                    body: serde_json::from_str(&text)?,
                })
            })
            .collect()
    }

    /// Changes whenever another connection commits to the same file
    pub fn data_version(&self) -> Result<i64> {
        let version = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// User id bound to a sign-in credential
    pub fn find_identity(&self, credential: &str) -> Result<Option<String>> {
        let user_id = self
            .conn
            .query_row(
                "SELECT user_id FROM identities WHERE credential = ?1",
                params![credential],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }

    pub fn insert_identity(&self, credential: &str, user_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO identities (credential, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![credential, user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLLECTION: &str = "artifacts/app/users/u1/workouts";

    #[test]
    fn test_validate_path() {
        assert!(validate_path(COLLECTION).is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("artifacts//users").is_err());
        assert!(validate_path("artifacts/app/").is_err());
    }

    #[test]
    fn test_get_missing_document() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_document(COLLECTION, "Domingo").unwrap(), None);
    }

    #[test]
    fn test_set_and_get_document() {
        let db = Database::open_in_memory().unwrap();
        let body = json!({"day": "Domingo", "completed": false});
        db.set_document(COLLECTION, "Domingo", &body, false).unwrap();
        assert_eq!(db.get_document(COLLECTION, "Domingo").unwrap(), Some(body));
    }

    #[test]
    fn test_merge_preserves_other_fields() {
        let db = Database::open_in_memory().unwrap();
        db.set_document(
            COLLECTION,
            "Domingo",
            &json!({"note": "leve", "exercises": [1, 2, 3]}),
            false,
        )
        .unwrap();
        db.set_document(COLLECTION, "Domingo", &json!({"exercises": [4]}), true)
            .unwrap();

        let stored = db.get_document(COLLECTION, "Domingo").unwrap().unwrap();
        assert_eq!(stored, json!({"note": "leve", "exercises": [4]}));
    }

    #[test]
    fn test_overwrite_without_merge() {
        let db = Database::open_in_memory().unwrap();
        db.set_document(COLLECTION, "Domingo", &json!({"note": "leve"}), false)
            .unwrap();
        db.set_document(COLLECTION, "Domingo", &json!({"completed": true}), false)
            .unwrap();

        let stored = db.get_document(COLLECTION, "Domingo").unwrap().unwrap();
        assert_eq!(stored, json!({"completed": true}));
    }

    #[test]
    fn test_set_rejects_non_object() {
        let db = Database::open_in_memory().unwrap();
        let err = db.set_document(COLLECTION, "Domingo", &json!([1]), true).unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject { .. }));
    }

    #[test]
    fn test_update_field() {
        let db = Database::open_in_memory().unwrap();
        db.set_document(COLLECTION, "Sábado", &json!({"completed": false, "day": "Sábado"}), false)
            .unwrap();
        db.update_field(COLLECTION, "Sábado", "completed", json!(true)).unwrap();

        let stored = db.get_document(COLLECTION, "Sábado").unwrap().unwrap();
        assert_eq!(stored, json!({"completed": true, "day": "Sábado"}));
    }

    #[test]
    fn test_update_missing_document_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .update_field(COLLECTION, "Sábado", "completed", json!(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_list_is_scoped_to_collection() {
        let db = Database::open_in_memory().unwrap();
        db.set_document(COLLECTION, "Domingo", &json!({}), false).unwrap();
        db.set_document(COLLECTION, "Quarta-feira", &json!({}), false).unwrap();
        db.set_document("artifacts/app/users/u2/workouts", "Domingo", &json!({}), false)
            .unwrap();

        let docs = db.list_documents(COLLECTION).unwrap();
        let keys: Vec<_> = docs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["Domingo", "Quarta-feira"]);
    }

    #[test]
    fn test_data_version_tracks_other_connections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("journal.db");
        let path = path.to_str().unwrap();
        let reader = Database::open(path).unwrap();
        let writer = Database::open(path).unwrap();

        let before = reader.data_version().unwrap();
        reader.set_document(COLLECTION, "Domingo", &json!({}), false).unwrap();
        assert_eq!(reader.data_version().unwrap(), before);

        writer.set_document(COLLECTION, "Segunda-feira", &json!({}), false).unwrap();
        assert_ne!(reader.data_version().unwrap(), before);
    }

    #[test]
    fn test_identities() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.find_identity("anonymous").unwrap(), None);
        db.insert_identity("anonymous", "abc").unwrap();
        assert_eq!(db.find_identity("anonymous").unwrap(), Some("abc".to_string()));
        assert!(db.insert_identity("anonymous", "def").is_err());
    }
}
