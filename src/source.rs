#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{
    Deserialize,
    de::{self, Unexpected},
};
use serde_json::Value;
use thiserror::Error;

/// Comment placed between consecutive code cells of an extracted notebook.
pub const CELL_SEPARATOR: &str = "\n\n# --- Next Cell ---\n\n";

/// The notebook bytes could not be parsed as a notebook document.
#[derive(Error, Debug)]
#[error("Error parsing notebook: {0}")]
pub struct FormatError(#[from] serde_json::Error);

/// Errors raised while loading an assignment or a solution from disk.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The file could not be read.
    #[error("Error reading file {}: {source}", .path.display())]
    Io {
        /// Path that failed to read.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file was read but is not a valid notebook.
    #[error("{} is not a valid notebook: {source}", .path.display())]
    Format {
        /// Path of the offending notebook.
        path:   PathBuf,
        /// Underlying parse error.
        source: FormatError,
    },
}

/// Top-level notebook document. Only the cell list is read.
#[derive(Deserialize)]
struct Notebook {
    /// Cells in document order; a missing list reads as empty.
    #[serde(default)]
    cells: Vec<Cell>,
}

/// A single notebook cell.
#[derive(Deserialize)]
struct Cell {
    /// `code`, `markdown`, `raw`, ...
    #[serde(default)]
    cell_type: String,
    /// Source text of the cell.
    #[serde(default)]
    source:    CellSource,
}

/// nbformat allows a cell source to be a list of lines or one string.
#[derive(Deserialize)]
#[serde(untagged)]
enum CellSource {
    /// Line fragments, each usually ending in `\n`.
    Lines(Vec<String>),
    /// The whole source as a single string.
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Lines(Vec::new())
    }
}

impl CellSource {
    /// Concatenates the fragments with nothing in between.
    fn concat(self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text,
        }
    }
}

/// Extracts the code cells of a notebook as one source string.
///
/// Cells are kept in document order, blank code cells and non-code cells are
/// dropped, and the rest are joined with [`CELL_SEPARATOR`]. A notebook
/// without code yields an empty string.
pub fn extract_notebook(bytes: &[u8]) -> Result<String, FormatError> {
    let document: Value = serde_json::from_slice(bytes)?;
    require_object(&document, "a notebook object")?;
    if let Some(Value::Array(cells)) = document.get("cells") {
        for cell in cells {
            require_object(cell, "a notebook cell object")?;
        }
    }
    let notebook: Notebook = serde_json::from_value(document)?;

    Ok(notebook
        .cells
        .into_iter()
        .filter(|cell| cell.cell_type == "code")
        .map(|cell| cell.source.concat())
        .filter(|code| !code.trim().is_empty())
        .join(CELL_SEPARATOR))
}

/// Derived struct deserializers also accept arrays by position, so notebook
/// and cell shapes are checked up front.
fn require_object(value: &Value, expected: &'static str) -> Result<(), serde_json::Error> {
    let unexpected = match value {
        Value::Object(_) => return Ok(()),
        Value::Array(_) => Unexpected::Seq,
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
    };
    Err(de::Error::invalid_type(unexpected, &expected))
}

/// Decodes text as UTF-8, falling back to Latin-1 so decoding never fails.
pub fn read_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => {
            tracing::debug!("Input is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Reads raw bytes from `path`.
fn read_bytes(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a plain text file with [`read_text`] decoding.
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String, SourceError> {
    Ok(read_text(&read_bytes(path.as_ref())?))
}

/// Reads a notebook file and extracts its code cells.
pub fn extract_notebook_file(path: impl AsRef<Path>) -> Result<String, SourceError> {
    let path = path.as_ref();
    extract_notebook(&read_bytes(path)?).map_err(|source| SourceError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns true when `path` names a Jupyter notebook.
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"))
}

/// Loads a student solution, extracting code when given a notebook.
pub fn load_solution(path: impl AsRef<Path>) -> Result<String, SourceError> {
    let path = path.as_ref();
    if is_notebook(path) {
        extract_notebook_file(path)
    } else {
        read_text_file(path)
    }
}
