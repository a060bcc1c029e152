use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pagenum operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures a numbering run can surface. Every variant is fatal to the
/// whole run; the core performs no recovery, retry, or partial-success
/// reporting.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure while reading inputs or serializing the output.
    /// The output sink may be left with a partial document.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The font file does not exist. There is no fallback font: the
    /// numeral must render in the requested typeface.
    #[error("font file not found: {}", .0.display())]
    FontMissing(PathBuf),

    /// The font file exists but could not be parsed or lacks the
    /// tables needed for embedding.
    #[error("cannot use font: {0}")]
    Font(String),

    /// The source document could not be opened or parsed.
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Errors raised while reading the source PDF. All are detected at
/// document-open time, before any page is processed.
#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    /// The bytes do not start with a valid `%PDF-` header.
    #[error("not a PDF file")]
    NotAPdf,

    /// The `startxref` keyword or its offset could not be found.
    #[error("startxref not found")]
    StartxrefNotFound,

    /// The cross-reference table is missing or could not be parsed.
    #[error("malformed or missing xref table")]
    MalformedXref,

    /// The trailer dictionary is missing or malformed.
    #[error("malformed or missing trailer")]
    MalformedTrailer,

    /// The PDF uses a cross-reference stream (PDF 1.5+), which is not
    /// supported.
    #[error("cross-reference streams (PDF 1.5+) are not supported")]
    XrefStreamNotSupported,

    /// An object reference could not be resolved (offset out of range
    /// or object missing from the xref table).
    #[error("cannot resolve object {0}")]
    UnresolvableObject(u32),

    /// Object syntax could not be parsed at the given byte offset.
    #[error("malformed object at byte offset {0}")]
    MalformedObject(usize),

    /// The page tree structure is invalid (missing /Pages, /Kids, or a
    /// page without a /MediaBox).
    #[error("malformed page tree")]
    MalformedPageTree,
}
