/// Error types shared across the rendering pipeline
use std::path::PathBuf;

use thiserror::Error;

/// Why a single element's geometry blob could not be turned into triangles.
///
/// These never abort a render: the scene builder drops the element and
/// records the reason.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("raw geometry is {len} bytes, not a multiple of the {stride}-byte triangle stride")]
    Misaligned { len: usize, stride: usize },

    #[error("raw geometry has a non-finite coordinate at float {index}")]
    NonFinite { index: usize },

    #[error("malformed structured geometry: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("face {face} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("geometry contains no triangles")]
    Empty,
}

/// Failures reading the element database. Always fatal for a render.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("discipline include and exclude sets are mutually exclusive")]
    ConflictingDisciplineSets,
}

/// Syntax errors in textual render options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionParseError {
    #[error("invalid resolution '{0}': expected WIDTHxHEIGHT with both values > 0")]
    Resolution(String),

    #[error("invalid bounding box '{0}': expected minX,minY,maxX,maxY with min <= max")]
    BoundingBox(String),
}
