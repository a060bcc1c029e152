use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, info};

use crate::compose::{composite, pick_font_name, ObjectCopier};
use crate::error::Result;
use crate::font::NumberFont;
use crate::geometry::{
    resolve, Margins, PageGeometry, PageSize, PlacementSpec,
};
use crate::objects::{ObjId, PdfObject};
use crate::overlay::render;
use crate::reader::SourceDocument;
use crate::writer::PdfWriter;

const CATALOG_OBJ: ObjId = ObjId(1, 0);
const PAGES_OBJ: ObjId = ObjId(2, 0);
const FIRST_FREE_OBJ_NUM: u32 = 3;

/// The numbering sequence: page `i` bears `start_number + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingSpec {
    pub start_number: u32,
}

impl Default for NumberingSpec {
    fn default() -> Self {
        NumberingSpec { start_number: 1 }
    }
}

/// High-level API for stamping page numbers onto a source document.
///
/// Owns the run's configuration and its one font handle. A run
/// processes pages strictly in order: for each source page it
/// resolves the anchor, renders the numeral stream, composites it
/// onto a copy of the page, and flushes the copied objects to the
/// writer before the next page begins. The output is a complete new
/// document; the source is never touched.
///
/// ```no_run
/// use std::path::Path;
/// use pagenum_core::{NumberFont, Numberer, SourceDocument};
///
/// # fn main() -> pagenum_core::Result<()> {
/// let font = NumberFont::load(Path::new("DejaVuSans.ttf"))?;
/// let source = SourceDocument::open(Path::new("report.pdf"))?;
/// Numberer::new(font).write_to_path(&source, Path::new("report_numbered.pdf"))?;
/// # Ok(())
/// # }
/// ```
pub struct Numberer {
    font: NumberFont,
    margins: Margins,
    placement: PlacementSpec,
    numbering: NumberingSpec,
    page_size: PageSize,
    compress: bool,
    title: Option<String>,
}

struct FontObjIds {
    type0: ObjId,
    cid: ObjId,
    descriptor: ObjId,
    file: ObjId,
    to_unicode: ObjId,
}

impl Numberer {
    pub fn new(font: NumberFont) -> Self {
        Numberer {
            font,
            margins: Margins::default(),
            placement: PlacementSpec::default(),
            numbering: NumberingSpec::default(),
            page_size: PageSize::default(),
            compress: true,
            title: None,
        }
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn placement(mut self, placement: PlacementSpec) -> Self {
        self.placement = placement;
        self
    }

    pub fn numbering(mut self, numbering: NumberingSpec) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enable or disable flate compression of generated streams.
    /// On by default; turn off to inspect output streams as text.
    pub fn set_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the /Title of the output's info dictionary.
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Number every page of `source` and serialize the result.
    ///
    /// On error the sink may hold a partial document; callers writing
    /// to a file should treat any error as "no usable output".
    pub fn write_to<W: Write>(
        &self,
        source: &SourceDocument,
        out: W,
    ) -> Result<()> {
        let font_res = pick_font_name(source);
        debug!("numeral font resource name: /{}", font_res);

        let mut writer = PdfWriter::new(out);
        writer.write_header()?;

        let mut copier = ObjectCopier::new(source, FIRST_FREE_OBJ_NUM);

        // Shared state guards, bracketing every page's own content.
        let q_obj = copier.allocate();
        let big_q_obj = copier.allocate();
        writer.write_object(q_obj, &self.generated_stream(b"q\n".to_vec())?)?;
        writer
            .write_object(big_q_obj, &self.generated_stream(b"Q\n".to_vec())?)?;

        // Font object numbers are fixed now so pages can reference
        // them; the bodies are written after the page loop, once the
        // full glyph usage is known.
        let font_ids = FontObjIds {
            type0: copier.allocate(),
            cid: copier.allocate(),
            descriptor: copier.allocate(),
            file: copier.allocate(),
            to_unicode: copier.allocate(),
        };

        // Fix every page's output number before any copying, so a
        // cross-page reference (a link annotation's /Dest, say) lands
        // on the composited page rather than on a raw copy of it.
        for page in source.pages() {
            copier.reserve(page.id);
        }

        let mut kids = Vec::new();
        let mut used_glyphs: BTreeSet<u16> = BTreeSet::new();

        for (i, page) in source.pages().iter().enumerate() {
            let number = self.numbering.start_number + i as u32;
            let text = number.to_string();

            let (src_w, src_h) = page.extents();
            let geometry = self
                .page_size
                .oriented_for(PageGeometry::new(src_w, src_h));
            let anchor = resolve(geometry, &self.margins, &self.placement);
            debug!(
                "page {}: number {} at ({:.2}, {:.2}), {} deg",
                i,
                number,
                anchor.x,
                anchor.y,
                anchor.rotation.degrees()
            );

            let numeral = render(
                geometry,
                anchor,
                &text,
                &self.font,
                self.placement.font_size,
                &font_res,
            );
            used_glyphs.extend(self.font.glyph_ids(&text));

            let overlay_obj = copier.allocate();
            writer.write_object(
                overlay_obj,
                &self.generated_stream(numeral.content_ops().to_vec())?,
            )?;

            let (page_obj, page_dict) = composite(
                &mut copier,
                page,
                overlay_obj,
                (q_obj, big_q_obj),
                &font_res,
                font_ids.type0,
                PAGES_OBJ,
            )?;
            for (id, obj) in copier.drain_copied() {
                writer.write_object(id, &obj)?;
            }
            writer.write_object(page_obj, &page_dict)?;
            kids.push(PdfObject::Reference(page_obj));
        }

        self.write_font_objects(&mut writer, &font_ids, &used_glyphs)?;

        writer.write_object(
            PAGES_OBJ,
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Pages")),
                ("Count", PdfObject::Integer(kids.len() as i64)),
                ("Kids", PdfObject::Array(kids.clone())),
            ]),
        )?;
        writer.write_object(
            CATALOG_OBJ,
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Catalog")),
                ("Pages", PdfObject::Reference(PAGES_OBJ)),
            ]),
        )?;

        let info_obj = copier.allocate();
        let mut info_dict = PdfObject::dict(vec![(
            "Producer",
            PdfObject::literal_string(concat!(
                "pagenum ",
                env!("CARGO_PKG_VERSION")
            )),
        )]);
        if let Some(title) = &self.title {
            info_dict.dict_set("Title", PdfObject::literal_string(title));
        }
        writer.write_object(info_obj, &info_dict)?;

        writer.write_xref_and_trailer(CATALOG_OBJ, Some(info_obj))?;
        info!(
            "numbered {} pages starting at {}",
            kids.len(),
            self.numbering.start_number
        );
        Ok(())
    }

    /// As `write_to`, collecting the output in memory.
    pub fn to_bytes(&self, source: &SourceDocument) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(source, &mut buf)?;
        Ok(buf)
    }

    /// As `write_to`, writing to a file. Not atomic: on failure a
    /// partial file may remain at `path`.
    pub fn write_to_path(
        &self,
        source: &SourceDocument,
        path: &Path,
    ) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(source, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Wrap generated content bytes in a stream object, compressed
    /// when compression is on.
    fn generated_stream(&self, data: Vec<u8>) -> Result<PdfObject> {
        if self.compress {
            let compressed = flate_compress(&data)?;
            Ok(PdfObject::stream(
                vec![("Filter", PdfObject::name("FlateDecode"))],
                compressed,
            ))
        } else {
            Ok(PdfObject::stream(vec![], data))
        }
    }

    /// Write the five-object Type0/CIDFontType2 embedding chain.
    fn write_font_objects<W: Write>(
        &self,
        writer: &mut PdfWriter<W>,
        ids: &FontObjIds,
        used_glyphs: &BTreeSet<u16>,
    ) -> Result<()> {
        let font = &self.font;
        let base_font = font.postscript_name.clone();

        writer.write_object(
            ids.type0,
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Font")),
                ("Subtype", PdfObject::name("Type0")),
                ("BaseFont", PdfObject::Name(base_font.clone())),
                ("Encoding", PdfObject::name("Identity-H")),
                (
                    "DescendantFonts",
                    PdfObject::array(vec![PdfObject::Reference(ids.cid)]),
                ),
                ("ToUnicode", PdfObject::Reference(ids.to_unicode)),
            ]),
        )?;

        writer.write_object(
            ids.cid,
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Font")),
                ("Subtype", PdfObject::name("CIDFontType2")),
                ("BaseFont", PdfObject::Name(base_font.clone())),
                (
                    "CIDSystemInfo",
                    PdfObject::dict(vec![
                        ("Registry", PdfObject::literal_string("Adobe")),
                        ("Ordering", PdfObject::literal_string("Identity")),
                        ("Supplement", PdfObject::Integer(0)),
                    ]),
                ),
                ("FontDescriptor", PdfObject::Reference(ids.descriptor)),
                ("DW", PdfObject::Integer(font.default_width_pdf())),
                ("W", PdfObject::Array(font.build_w_array(used_glyphs))),
                ("CIDToGIDMap", PdfObject::name("Identity")),
            ]),
        )?;

        writer.write_object(
            ids.descriptor,
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("FontDescriptor")),
                ("FontName", PdfObject::Name(base_font)),
                ("Flags", PdfObject::Integer(font.flags as i64)),
                (
                    "FontBBox",
                    PdfObject::array(vec![
                        PdfObject::Integer(font.scale_to_pdf(font.bbox[0])),
                        PdfObject::Integer(font.scale_to_pdf(font.bbox[1])),
                        PdfObject::Integer(font.scale_to_pdf(font.bbox[2])),
                        PdfObject::Integer(font.scale_to_pdf(font.bbox[3])),
                    ]),
                ),
                ("ItalicAngle", PdfObject::Real(font.italic_angle)),
                (
                    "Ascent",
                    PdfObject::Integer(font.scale_to_pdf(font.ascent)),
                ),
                (
                    "Descent",
                    PdfObject::Integer(font.scale_to_pdf(font.descent)),
                ),
                (
                    "CapHeight",
                    PdfObject::Integer(font.scale_to_pdf(font.cap_height)),
                ),
                (
                    "StemV",
                    PdfObject::Integer(font.scale_to_pdf(font.stem_v)),
                ),
                ("FontFile2", PdfObject::Reference(ids.file)),
            ]),
        )?;

        // The font program itself is always compressed; /Length1 is
        // the uncompressed size readers need to allocate.
        let compressed = flate_compress(&font.font_data)?;
        writer.write_object(
            ids.file,
            &PdfObject::stream(
                vec![
                    ("Filter", PdfObject::name("FlateDecode")),
                    (
                        "Length1",
                        PdfObject::Integer(font.font_data.len() as i64),
                    ),
                ],
                compressed,
            ),
        )?;

        writer.write_object(
            ids.to_unicode,
            &self.generated_stream(font.build_tounicode_cmap(used_glyphs))?,
        )?;

        Ok(())
    }
}

fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
