//! Error type shared by the layout engine and its canvases.

use std::io;
use thiserror::Error;

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while composing a document.
///
/// The first five variants are malformed-composition errors: they are raised
/// immediately and never retried. The remaining ones come from the canvas or
/// from reading input files.
#[derive(Error, Debug)]
pub enum Error {
    /// A component has no horizontal or vertical style and none was inherited,
    /// or its width/position cannot be resolved.
    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    /// A border edge is enabled but has no color.
    #[error("Border edge '{edge}' is enabled but has no color")]
    MissingColor { edge: &'static str },

    /// A table row's cells span a different number of columns than the
    /// table has.
    #[error("Row {row} spans {found} columns, table declares {expected}")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A single table row is taller than one page's usable body height.
    #[error("Row {row} is {height:.1}pt tall but a page only holds {available:.1}pt")]
    RowTooTall {
        row: usize,
        height: f32,
        available: f32,
    },

    /// Drawing was attempted on a page that has been finalized.
    #[error("Page {0} is closed")]
    PageClosed(usize),

    /// A page index that has not been created yet.
    #[error("Page {0} does not exist")]
    NoSuchPage(usize),

    /// A content stream was opened while another one was still open.
    #[error("A content stream is already open on page {0}")]
    StreamBusy(usize),

    /// `add_row`/`end_table` called without a matching `begin_table`.
    #[error("No table is open")]
    NoTableOpen,

    /// I/O error when reading inputs or writing the output file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Font file could not be loaded or parsed.
    #[error("Font error: {0}")]
    Font(String),

    /// Image data could not be decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// The JSON composition is malformed.
    #[error("Composition error: {0}")]
    Composition(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Composition(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
