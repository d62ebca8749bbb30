/// Element record sources: the persisted SQLite store and an in-memory stand-in
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use crate::error::StoreError;
use crate::geometry::Discipline;

/// Table layout the renderer reads. Producers may add columns freely.
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS elements (
    id TEXT PRIMARY KEY,
    discipline TEXT NOT NULL,
    class TEXT NOT NULL,
    geometry BLOB
)";

const ELEMENT_QUERY: &str = "SELECT id, discipline, class, geometry FROM elements ORDER BY id";

/// One stored element before its geometry has been decoded
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: String,
    pub discipline: Discipline,
    pub class: String,
    pub geometry: Vec<u8>,
}

impl ElementRecord {
    pub fn new(
        id: impl Into<String>,
        discipline: Discipline,
        class: impl Into<String>,
        geometry: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            discipline,
            class: class.into(),
            geometry,
        }
    }
}

/// Anything that can hand the scene builder every element record, in a stable order
pub trait ElementSource {
    fn load_elements(&self) -> Result<Vec<ElementRecord>, StoreError>;
}

impl ElementSource for [ElementRecord] {
    fn load_elements(&self) -> Result<Vec<ElementRecord>, StoreError> {
        Ok(self.to_vec())
    }
}

impl ElementSource for Vec<ElementRecord> {
    fn load_elements(&self) -> Result<Vec<ElementRecord>, StoreError> {
        Ok(self.clone())
    }
}

/// Read-only view of an element database
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ElementSource for SqliteStore {
    fn load_elements(&self) -> Result<Vec<ElementRecord>, StoreError> {
        let mut stmt = self.conn.prepare(ELEMENT_QUERY)?;
        let records = stmt
            .query_map([], read_record)?
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Loaded {} element records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<ElementRecord> {
    let id = match row.get_ref(0)? {
        ValueRef::Integer(i) => i.to_string(),
        value => String::from_utf8_lossy(bytes_of(value)).into_owned(),
    };
    let discipline = String::from_utf8_lossy(bytes_of(row.get_ref(1)?));
    let class = String::from_utf8_lossy(bytes_of(row.get_ref(2)?)).into_owned();
    let geometry = bytes_of(row.get_ref(3)?).to_vec();

    Ok(ElementRecord {
        id,
        discipline: discipline.parse().unwrap_or_else(|never| match never {}),
        class,
        geometry,
    })
}

/// Text and blob columns as bytes; NULL and numeric values read as empty.
fn bytes_of(value: ValueRef<'_>) -> &[u8] {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes,
        _ => &[],
    }
}
