use crate::shitsumon::QuestionSet;
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Schema version written to `PRAGMA user_version` once the tables exist.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Qna,
    Media,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Qna, Namespace::Media];

    pub fn table(self) -> &'static str {
        match self {
            Namespace::Qna => "qna",
            Namespace::Media => "media",
        }
    }

    pub fn parse(name: &str) -> Option<Namespace> {
        Namespace::ALL.into_iter().find(|ns| ns.table() == name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    QuestionSet(QuestionSet),
    Media(Vec<u8>),
}

impl StoredValue {
    pub fn namespace(&self) -> Namespace {
        match self {
            StoredValue::QuestionSet(_) => Namespace::Qna,
            StoredValue::Media(_) => Namespace::Media,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored question set is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("keys cannot be empty")]
    EmptyKey,
    #[error("a {value} value cannot be stored in the `{namespace}` namespace")]
    WrongNamespace {
        namespace: Namespace,
        value: Namespace,
    },
    #[error("database schema version {0} is newer than supported version {max}", max = SCHEMA_VERSION)]
    UnsupportedVersion(i32),
}

enum Location {
    File(PathBuf),
    Memory,
}

/// Key-value store with one table per [`Namespace`].
///
/// Nothing is opened until the first operation; the connection is then kept for
/// the lifetime of the store.
pub struct LocalStore {
    location: Location,
    conn: Option<Connection>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> LocalStore {
        LocalStore {
            location: Location::File(path.into()),
            conn: None,
        }
    }

    pub fn in_memory() -> LocalStore {
        LocalStore {
            location: Location::Memory,
            conn: None,
        }
    }

    fn connection(&mut self) -> Result<&Connection, StoreError> {
        match self.conn {
            Some(ref conn) => Ok(conn),
            None => {
                let conn = match &self.location {
                    Location::File(path) => create_or_open(path),
                    Location::Memory => Connection::open_in_memory().map_err(StoreError::from),
                }
                .and_then(init_db)
                .map_err(|err| {
                    error!("[DB] Cannot open database: {}", err);
                    err
                })?;
                Ok(self.conn.insert(conn))
            }
        }
    }

    /// Inserts `value` under `key`, overwriting whatever was there.
    pub fn put(&mut self, namespace: Namespace, key: &str, value: &StoredValue) -> Result<(), StoreError> {
        if key.is_empty() {
            error!("[DB] Refusing to store an empty key in {}", namespace);
            return Err(StoreError::EmptyKey);
        }
        if value.namespace() != namespace {
            error!("[DB] Refusing to store a {} value in {}", value.namespace(), namespace);
            return Err(StoreError::WrongNamespace {
                namespace,
                value: value.namespace(),
            });
        }

        let now = Instant::now();
        let conn = self.connection()?;
        let result = match value {
            StoredValue::QuestionSet(set) => {
                let json = serde_json::to_string(set).map_err(|err| {
                    error!("[DB] Cannot encode '{}' for {}: {}", key, namespace, err);
                    err
                })?;
                conn.execute(
                    "INSERT OR REPLACE INTO qna(key, value) VALUES (?1, ?2)",
                    params![key, json],
                )
            }
            StoredValue::Media(bytes) => conn.execute(
                "INSERT OR REPLACE INTO media(key, value) VALUES (?1, ?2)",
                params![key, bytes],
            ),
        };
        match result {
            Ok(_) => {
                debug!(
                    "[DB] Stored '{}' in {} ({} ms)",
                    key,
                    namespace,
                    now.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!("[DB] Error while storing '{}' in {}: {:?}", key, namespace, err);
                Err(err.into())
            }
        }
    }

    /// Looks `key` up; a key that was never written is `Ok(None)`.
    pub fn get(&mut self, namespace: Namespace, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let conn = self.connection()?;
        let value = match namespace {
            Namespace::Qna => {
                let json: Option<String> = conn
                    .query_row("SELECT value FROM qna WHERE key = ?1", params![key], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(|err| {
                        error!("[DB] Error while reading '{}' from qna: {:?}", key, err);
                        err
                    })?;
                match json {
                    Some(json) => {
                        let set = serde_json::from_str(&json).map_err(|err| {
                            error!("[DB] Stored '{}' in qna is not a question set: {}", key, err);
                            err
                        })?;
                        Some(StoredValue::QuestionSet(set))
                    }
                    None => None,
                }
            }
            Namespace::Media => conn
                .query_row("SELECT value FROM media WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|err| {
                    error!("[DB] Error while reading '{}' from media: {:?}", key, err);
                    err
                })?
                .map(StoredValue::Media),
        };
        if value.is_none() {
            debug!("[DB] No '{}' in {}", key, namespace);
        }
        Ok(value)
    }

    /// Same as [`LocalStore::get`], but an unknown namespace name resolves to absent.
    pub fn get_by_name(&mut self, namespace: &str, key: &str) -> Result<Option<StoredValue>, StoreError> {
        match Namespace::parse(namespace) {
            Some(namespace) => self.get(namespace, key),
            None => {
                warn!("[DB] Unknown namespace '{}'", namespace);
                Ok(None)
            }
        }
    }

    /// All keys in `namespace`, sorted ascending.
    pub fn list_keys(&mut self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        let conn = self.connection()?;
        let sql = format!("SELECT key FROM {} ORDER BY key", namespace.table());
        let keys = conn.prepare(&sql).and_then(|mut statement| {
            let rows = statement.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()
        });

        keys.map_err(|err| {
            error!("[DB] Error while listing {}: {:?}", namespace, err);
            err.into()
        })
    }

    pub fn save_question_set(&mut self, key: &str, set: QuestionSet) -> Result<(), StoreError> {
        self.put(Namespace::Qna, key, &StoredValue::QuestionSet(set))
    }

    pub fn question_set(&mut self, key: &str) -> Result<Option<QuestionSet>, StoreError> {
        match self.get(Namespace::Qna, key)? {
            Some(StoredValue::QuestionSet(set)) => Ok(Some(set)),
            _ => Ok(None),
        }
    }

    pub fn save_media(&mut self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.put(Namespace::Media, key, &StoredValue::Media(bytes))
    }

    pub fn media(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.get(Namespace::Media, key)? {
            Some(StoredValue::Media(bytes)) => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }

    pub fn close(self) -> Result<(), StoreError> {
        match self.conn {
            Some(conn) => close_db(conn),
            None => Ok(()),
        }
    }
}

fn create_or_open(src: &Path) -> Result<Connection, StoreError> {
    let now = Instant::now();
    if src.exists() {
        info!("[DB] Opening existing Database");
    } else {
        info!("[DB] Creating new Database");
    }
    let db = Connection::open(src)?;
    debug!("[DB] Opening took {} ms.", now.elapsed().as_millis());
    Ok(db)
}

fn close_db(connection: Connection) -> Result<(), StoreError> {
    info!("[DB] Closing Database");
    match connection.close() {
        Ok(_) => Ok(()),
        Err((conn, _)) => {
            error!("[DB] Cannot close connection. Retrying 1/2...");
            match conn.close() {
                Ok(_) => Ok(()),
                Err((conn2, _)) => {
                    error!("[DB] Cannot close connection. Retrying 2/2...");
                    conn2.close().map_err(|(_, err)| {
                        error!("[DB] Cannot close connection! Giving up.");
                        err.into()
                    })
                }
            }
        }
    }
}

fn schema_version(conn: &Connection) -> Result<i32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn init_db(conn: Connection) -> Result<Connection, StoreError> {
    match schema_version(&conn)? {
        0 => {}
        SCHEMA_VERSION => {
            debug!("[DB INIT] Schema is up to date");
            return Ok(conn);
        }
        newer => {
            error!("[DB INIT] Unsupported schema version {}", newer);
            return Err(StoreError::UnsupportedVersion(newer));
        }
    }

    info!("[DB INIT] Creating tables");
    conn.execute_batch(&format!(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS qna (
              key TEXT NOT NULL PRIMARY KEY,
              value TEXT NOT NULL
            );
        CREATE TABLE IF NOT EXISTS media (
              key TEXT NOT NULL PRIMARY KEY,
              value BLOB NOT NULL
            );
        PRAGMA user_version = {SCHEMA_VERSION};
        COMMIT;"
    ))?;
    info!("[DB INIT] Database Creation Successful!");

    Ok(conn)
}
