//! Read-only access to the host's records.
//!
//! The module never writes to the host database. [`SqliteStore`] opens it
//! read-only and reads the host tables `data_store_file`, `cases` and
//! `client`; other backends only need to implement [`DataStore`].

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid timestamp {value:?} in {column}")]
    Timestamp { column: &'static str, value: String },

    #[error("store connection poisoned")]
    Poisoned,
}

/// Datastore file record (`DataStoreFile` in the host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_id: i64,
    pub case_id: i64,
    pub sha256: String,
    /// Location of the file on local disk.
    pub local_path: PathBuf,
    pub date_added: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub client_id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub case_id: i64,
    pub name: Option<String>,
    pub client: Option<ClientRecord>,
}

/// Lookups the processor performs against the host's records.
pub trait DataStore: Send + Sync {
    /// Most recently added stored file for `(case_id, sha256)`.
    fn latest_stored_file(&self, case_id: i64, sha256: &str) -> Result<Option<StoredFile>>;

    /// Case with its client attached, if the case exists.
    fn case_with_client(&self, case_id: i64) -> Result<Option<CaseRecord>>;
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

fn parse_timestamp(column: &'static str, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .ok_or_else(|| StoreError::Timestamp {
            column,
            value: value.to_string(),
        })
}

/// Format used when writing timestamps; sorts lexicographically.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open an existing database read-only. A missing file is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    /// Create the subset of host tables the processor reads. Fixture use only;
    /// the host owns the real schema.
    pub fn create_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS client (
                    client_id INTEGER PRIMARY KEY,
                    name TEXT
                );
                CREATE TABLE IF NOT EXISTS cases (
                    case_id INTEGER PRIMARY KEY,
                    name TEXT,
                    client_id INTEGER REFERENCES client(client_id)
                );
                CREATE TABLE IF NOT EXISTS data_store_file (
                    file_id INTEGER PRIMARY KEY,
                    file_case_id INTEGER NOT NULL,
                    file_sha256 TEXT,
                    file_local_name TEXT NOT NULL,
                    file_date_added TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_dsf_case_sha
                    ON data_store_file (file_case_id, file_sha256);",
            )?;
            Ok(())
        })
    }

    pub fn insert_client(&self, client_id: i64, name: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO client (client_id, name) VALUES (?1, ?2)",
                params![client_id, name],
            )?;
            Ok(())
        })
    }

    pub fn insert_case(&self, case_id: i64, name: Option<&str>, client_id: Option<i64>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cases (case_id, name, client_id) VALUES (?1, ?2, ?3)",
                params![case_id, name, client_id],
            )?;
            Ok(())
        })
    }

    /// Insert a datastore file record; returns its `file_id`.
    pub fn insert_stored_file(
        &self,
        case_id: i64,
        sha256: &str,
        local_path: &Path,
        date_added: &NaiveDateTime,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO data_store_file
                    (file_case_id, file_sha256, file_local_name, file_date_added)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    case_id,
                    sha256,
                    local_path.to_string_lossy().into_owned(),
                    format_timestamp(date_added)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}

impl DataStore for SqliteStore {
    fn latest_stored_file(&self, case_id: i64, sha256: &str) -> Result<Option<StoredFile>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT file_id, file_case_id, file_sha256, file_local_name, file_date_added
                     FROM data_store_file
                     WHERE file_case_id = ?1 AND file_sha256 = ?2
                     ORDER BY file_date_added DESC, file_id DESC
                     LIMIT 1",
                    params![case_id, sha256],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        row.map(|(file_id, case_id, sha256, local_name, date_added)| {
            Ok(StoredFile {
                file_id,
                case_id,
                sha256,
                local_path: PathBuf::from(local_name),
                date_added: parse_timestamp("file_date_added", &date_added)?,
            })
        })
        .transpose()
    }

    fn case_with_client(&self, case_id: i64) -> Result<Option<CaseRecord>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT c.case_id, c.name, cl.client_id, cl.name
                     FROM cases c
                     LEFT JOIN client cl ON cl.client_id = c.client_id
                     WHERE c.case_id = ?1",
                    params![case_id],
                    |row| {
                        let client_id: Option<i64> = row.get(2)?;
                        let client_name: Option<String> = row.get(3)?;
                        Ok(CaseRecord {
                            case_id: row.get(0)?,
                            name: row.get(1)?,
                            client: client_id.map(|client_id| ClientRecord {
                                client_id,
                                name: client_name,
                            }),
                        })
                    },
                )
                .optional()?)
        })
    }
}
