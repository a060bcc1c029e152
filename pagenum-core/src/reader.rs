use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{ReadError, Result};
use crate::objects::{ObjId, Parser, PdfObject};

/// A parsed source document: the raw bytes, the cross-reference map,
/// and the flattened page list with inherited attributes materialized.
///
/// Objects are parsed lazily through `resolve`; only the xref chain,
/// trailer, and page tree are walked up front, so a malformed document
/// fails at open time rather than mid-composite.
pub struct SourceDocument {
    data: Vec<u8>,
    xref: HashMap<u32, usize>,
    trailer: PdfObject,
    version: String,
    pages: Vec<PageRef>,
}

impl fmt::Debug for SourceDocument {
    // The raw bytes would swamp any assertion output; summarize.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("version", &self.version)
            .field("objects", &self.xref.len())
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

/// One leaf of the page tree. `dict` is a self-contained copy: any
/// /MediaBox or /Resources inherited from an ancestor node has been
/// written into it, and /MediaBox is always a direct numeric array.
#[derive(Debug, Clone)]
pub struct PageRef {
    pub id: ObjId,
    pub dict: PdfObject,
    pub media_box: [f64; 4],
}

impl PageRef {
    /// Page width and height in points, from the MediaBox extents.
    pub fn extents(&self) -> (f64, f64) {
        (
            (self.media_box[2] - self.media_box[0]).abs(),
            (self.media_box[3] - self.media_box[1]).abs(),
        )
    }
}

/// Attributes a Pages node passes down to its kids.
#[derive(Default, Clone)]
struct Inherited {
    media_box: Option<PdfObject>,
    resources: Option<PdfObject>,
}

impl SourceDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self::from_bytes(data)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> std::result::Result<Self, ReadError> {
        if !data.starts_with(b"%PDF-") {
            return Err(ReadError::NotAPdf);
        }
        let version = header_version(&data);

        let start = find_startxref(&data)?;
        let (xref, trailer) = read_xref_chain(&data, start)?;

        let mut doc = SourceDocument {
            data,
            xref,
            trailer,
            version,
            pages: Vec::new(),
        };
        doc.pages = doc.collect_pages()?;
        Ok(doc)
    }

    /// PDF version from the header, e.g. "1.4".
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trailer(&self) -> &PdfObject {
        &self.trailer
    }

    pub fn pages(&self) -> &[PageRef] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Parse the indirect object `id` refers to. Generation numbers
    /// are not checked; the xref chain already selected the live
    /// entry for each object number.
    pub fn resolve(&self, id: ObjId) -> std::result::Result<PdfObject, ReadError> {
        let &offset = self
            .xref
            .get(&id.0)
            .ok_or(ReadError::UnresolvableObject(id.0))?;
        if offset >= self.data.len() {
            return Err(ReadError::UnresolvableObject(id.0));
        }
        let (_, obj) = Parser::new(&self.data, offset).parse_indirect_object()?;
        Ok(obj)
    }

    /// Follow `obj` through at most one level of indirection.
    /// Direct objects are cloned.
    pub fn resolved(
        &self,
        obj: &PdfObject,
    ) -> std::result::Result<PdfObject, ReadError> {
        match obj.as_reference() {
            Some(id) => self.resolve(id),
            None => Ok(obj.clone()),
        }
    }

    // ── Page tree ─────────────────────────────────────────────────────────────

    fn collect_pages(&self) -> std::result::Result<Vec<PageRef>, ReadError> {
        let root_id = self
            .trailer
            .dict_get("Root")
            .and_then(|v| v.as_reference())
            .ok_or(ReadError::MalformedTrailer)?;
        let catalog = self.resolve(root_id)?;
        let pages_id = catalog
            .dict_get("Pages")
            .and_then(|v| v.as_reference())
            .ok_or(ReadError::MalformedPageTree)?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.walk_node(
            pages_id,
            &Inherited::default(),
            &mut pages,
            &mut visited,
        )?;
        if pages.is_empty() {
            return Err(ReadError::MalformedPageTree);
        }
        Ok(pages)
    }

    fn walk_node(
        &self,
        id: ObjId,
        inherited: &Inherited,
        pages: &mut Vec<PageRef>,
        visited: &mut HashSet<ObjId>,
    ) -> std::result::Result<(), ReadError> {
        if !visited.insert(id) {
            return Err(ReadError::MalformedPageTree);
        }
        let node = self.resolve(id)?;

        let is_pages = match node.dict_get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => true,
            Some("Page") => false,
            // Missing /Type: the presence of /Kids decides.
            _ => node.dict_get("Kids").is_some(),
        };

        if is_pages {
            let mut passed = inherited.clone();
            if let Some(mb) = node.dict_get("MediaBox") {
                passed.media_box = Some(self.resolved(mb)?);
            }
            if let Some(res) = node.dict_get("Resources") {
                passed.resources = Some(res.clone());
            }
            let kids = self.resolved(
                node.dict_get("Kids").ok_or(ReadError::MalformedPageTree)?,
            )?;
            let kids = match kids {
                PdfObject::Array(items) => items,
                _ => return Err(ReadError::MalformedPageTree),
            };
            for kid in &kids {
                let kid_id =
                    kid.as_reference().ok_or(ReadError::MalformedPageTree)?;
                self.walk_node(kid_id, &passed, pages, visited)?;
            }
            Ok(())
        } else {
            pages.push(self.materialize_page(id, node, inherited)?);
            Ok(())
        }
    }

    /// Build a self-contained page dict: pull inherited attributes in
    /// and flatten /MediaBox to a direct numeric array.
    fn materialize_page(
        &self,
        id: ObjId,
        mut dict: PdfObject,
        inherited: &Inherited,
    ) -> std::result::Result<PageRef, ReadError> {
        let media_box_obj = match dict.dict_get("MediaBox") {
            Some(mb) => self.resolved(mb)?,
            None => inherited
                .media_box
                .clone()
                .ok_or(ReadError::MalformedPageTree)?,
        };
        let media_box = self.media_box_values(&media_box_obj)?;
        dict.dict_set(
            "MediaBox",
            PdfObject::Array(
                media_box.iter().map(|&v| PdfObject::Real(v)).collect(),
            ),
        );

        if dict.dict_get("Resources").is_none() {
            if let Some(res) = &inherited.resources {
                dict.dict_set("Resources", res.clone());
            }
        }

        Ok(PageRef {
            id,
            dict,
            media_box,
        })
    }

    fn media_box_values(
        &self,
        obj: &PdfObject,
    ) -> std::result::Result<[f64; 4], ReadError> {
        let items = match obj {
            PdfObject::Array(items) if items.len() == 4 => items,
            _ => return Err(ReadError::MalformedPageTree),
        };
        let mut values = [0.0; 4];
        for (i, item) in items.iter().enumerate() {
            values[i] = self
                .resolved(item)?
                .as_real()
                .ok_or(ReadError::MalformedPageTree)?;
        }
        Ok(values)
    }
}

fn header_version(data: &[u8]) -> String {
    let rest = &data[b"%PDF-".len()..];
    let end = rest
        .iter()
        .position(|&b| !(b.is_ascii_digit() || b == b'.'))
        .unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

/// Scan the file tail for the last `startxref` keyword and parse the
/// offset that follows it.
fn find_startxref(data: &[u8]) -> std::result::Result<usize, ReadError> {
    let kw = b"startxref";
    let tail_len = data.len().min(2048);
    let tail_start = data.len() - tail_len;
    let tail = &data[tail_start..];
    let idx = tail
        .windows(kw.len())
        .rposition(|w| w == kw)
        .ok_or(ReadError::StartxrefNotFound)?;
    let mut parser = Parser::new(data, tail_start + idx + kw.len());
    let offset = parser
        .parse_unsigned()
        .map_err(|_| ReadError::StartxrefNotFound)?;
    Ok(offset as usize)
}

/// Read the xref table at `start` and every table it chains to via
/// /Prev. The first-seen entry for an object number wins, so newer
/// incremental-update sections shadow older ones. Free entries count
/// as seen too: an object a newer section deletes stays deleted even
/// when an older section still carries it in use.
fn read_xref_chain(
    data: &[u8],
    start: usize,
) -> std::result::Result<(HashMap<u32, usize>, PdfObject), ReadError> {
    let mut entries: HashMap<u32, Option<usize>> = HashMap::new();
    let mut trailer: Option<PdfObject> = None;
    let mut offset = start;
    let mut seen_offsets = HashSet::new();

    loop {
        if offset >= data.len() || !seen_offsets.insert(offset) {
            return Err(ReadError::MalformedXref);
        }
        let mut parser = Parser::new(data, offset);
        parser.skip_whitespace();
        if !parser.starts_with(b"xref") {
            // An indirect object here means a PDF 1.5 xref stream.
            if parser.parse_unsigned().is_ok() {
                return Err(ReadError::XrefStreamNotSupported);
            }
            return Err(ReadError::MalformedXref);
        }
        let section_trailer = read_xref_section(&mut parser, &mut entries)?;

        let prev = section_trailer
            .dict_get("Prev")
            .and_then(|v| v.as_integer());
        if trailer.is_none() {
            trailer = Some(section_trailer);
        }
        match prev {
            Some(p) if p >= 0 => offset = p as usize,
            Some(_) => return Err(ReadError::MalformedXref),
            None => break,
        }
    }

    let xref = entries
        .into_iter()
        .filter_map(|(num, offset)| offset.map(|o| (num, o)))
        .collect();
    Ok((xref, trailer.ok_or(ReadError::MalformedTrailer)?))
}

/// Parse one `xref` table (all its subsections) plus the trailer
/// dictionary that follows it. Free entries are recorded as `None`
/// tombstones so they shadow like in-use entries do.
fn read_xref_section(
    parser: &mut Parser,
    entries: &mut HashMap<u32, Option<usize>>,
) -> std::result::Result<PdfObject, ReadError> {
    parser
        .expect_keyword(b"xref")
        .map_err(|_| ReadError::MalformedXref)?;

    loop {
        parser.skip_whitespace();
        if parser.starts_with(b"trailer") {
            break;
        }
        let first = parser
            .parse_unsigned()
            .map_err(|_| ReadError::MalformedXref)? as u32;
        let count = parser
            .parse_unsigned()
            .map_err(|_| ReadError::MalformedXref)?;
        for i in 0..count {
            let entry_offset = parser
                .parse_unsigned()
                .map_err(|_| ReadError::MalformedXref)?;
            let _gen = parser
                .parse_unsigned()
                .map_err(|_| ReadError::MalformedXref)?;
            let in_use = if parser.expect_keyword(b"n").is_ok() {
                true
            } else if parser.expect_keyword(b"f").is_ok() {
                false
            } else {
                return Err(ReadError::MalformedXref);
            };
            let obj_num = first + i as u32;
            let live = in_use.then_some(entry_offset as usize);
            entries.entry(obj_num).or_insert(live);
        }
    }

    parser
        .expect_keyword(b"trailer")
        .map_err(|_| ReadError::MalformedTrailer)?;
    let trailer = parser
        .parse_object()
        .map_err(|_| ReadError::MalformedTrailer)?;
    match trailer {
        PdfObject::Dictionary(_) => Ok(trailer),
        _ => Err(ReadError::MalformedTrailer),
    }
}
