//! Stamp sequential page numbers onto an existing PDF.
//!
//! The crate reads a source PDF, computes a per-page anchor for the
//! number (honoring orientation, margins, and the chosen page edge),
//! renders a numeral-only overlay stream, composites it on top of a
//! copy of each source page, and serializes a brand-new output
//! document. The source file is never modified.
//!
//! [`Numberer`] is the entry point; [`SourceDocument`] and
//! [`NumberFont`] are its two inputs.

mod compose;
pub mod document;
pub mod error;
pub mod font;
pub mod geometry;
pub mod objects;
pub mod overlay;
pub mod reader;
pub mod writer;

pub use document::{Numberer, NumberingSpec};
pub use error::{Error, ReadError, Result};
pub use font::NumberFont;
pub use geometry::{
    Anchor, Margins, PageGeometry, PageSize, PlacementSpec, ResolvedAnchor,
    Rotation,
};
pub use reader::{PageRef, SourceDocument};
