use std::collections::HashMap;

use crate::error::ReadError;
use crate::objects::{ObjId, PdfObject};
use crate::reader::{PageRef, SourceDocument};

/// Copies object graphs out of a source document into the output's
/// object number space.
///
/// Copies are memoized, so an object shared by several pages (a font,
/// an image) is copied once and every page references the same copy.
/// The mapping for an object is recorded before its body is walked,
/// which makes reference cycles (annotation /P back-links and the
/// like) terminate.
pub(crate) struct ObjectCopier<'a> {
    source: &'a SourceDocument,
    map: HashMap<ObjId, ObjId>,
    next_id: u32,
    copied: Vec<(ObjId, PdfObject)>,
}

impl<'a> ObjectCopier<'a> {
    pub fn new(source: &'a SourceDocument, first_free_id: u32) -> Self {
        ObjectCopier {
            source,
            map: HashMap::new(),
            next_id: first_free_id,
            copied: Vec::new(),
        }
    }

    pub fn source(&self) -> &SourceDocument {
        self.source
    }

    /// Allocate a fresh output object number.
    pub fn allocate(&mut self) -> ObjId {
        let id = ObjId(self.next_id, 0);
        self.next_id += 1;
        id
    }

    /// Allocate an output number for `source_id` without copying its
    /// body. Used for objects the caller rebuilds by hand (the page
    /// dict itself) so references to them still resolve. Idempotent:
    /// a number already handed out for `source_id` is returned as-is,
    /// never reassigned.
    pub fn reserve(&mut self, source_id: ObjId) -> ObjId {
        if let Some(&mapped) = self.map.get(&source_id) {
            return mapped;
        }
        let id = self.allocate();
        self.map.insert(source_id, id);
        id
    }

    /// Deep-copy the object `source_id` refers to, returning its
    /// output number. Everything it references is copied too.
    pub fn copy(&mut self, source_id: ObjId) -> Result<ObjId, ReadError> {
        if let Some(&mapped) = self.map.get(&source_id) {
            return Ok(mapped);
        }
        let new_id = self.reserve(source_id);

        let mut obj = self.source.resolve(source_id)?;
        self.rewrite_refs(&mut obj)?;
        self.copied.push((new_id, obj));
        Ok(new_id)
    }

    /// Copy every object `obj` references and rewrite the references
    /// in place to their output numbers.
    pub fn rewrite_refs(
        &mut self,
        obj: &mut PdfObject,
    ) -> Result<(), ReadError> {
        let mut refs = Vec::new();
        collect_refs(obj, &mut refs);
        for r in refs {
            self.copy(r)?;
        }
        let map = &self.map;
        obj.map_references(&mut |old| map.get(&old).copied().unwrap_or(old));
        Ok(())
    }

    /// Take the objects copied so far, in allocation order. Lets the
    /// caller flush output incrementally instead of holding every
    /// copied page in memory until the end.
    pub fn drain_copied(&mut self) -> Vec<(ObjId, PdfObject)> {
        std::mem::take(&mut self.copied)
    }
}

fn collect_refs(obj: &PdfObject, out: &mut Vec<ObjId>) {
    match obj {
        PdfObject::Reference(id) => out.push(*id),
        PdfObject::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        PdfObject::Dictionary(entries)
        | PdfObject::Stream { dict: entries, .. } => {
            for (_, v) in entries {
                collect_refs(v, out);
            }
        }
        _ => {}
    }
}

/// Merge one numeral overlay onto a copy of `page`.
///
/// The merged /Contents order is the invariant that keeps both sides
/// intact: a save-state guard, then the source page's own streams
/// untouched, then a restore-state guard, then the numeral stream
/// painted last. `guards` are the shared q and Q streams;
/// `overlay_stream` is this page's numeral stream; all three are
/// already in output space. Returns the new page's object number and
/// its rebuilt dict for the caller to write.
pub(crate) fn composite(
    copier: &mut ObjectCopier,
    page: &PageRef,
    overlay_stream: ObjId,
    guards: (ObjId, ObjId),
    font_res: &str,
    font_ref: ObjId,
    parent: ObjId,
) -> Result<(ObjId, PdfObject), ReadError> {
    let new_page_id = copier.reserve(page.id);
    let mut dict = page.dict.clone();

    // The source /Parent would drag the whole source page tree (and
    // every sibling page) into the copy.
    dict.dict_remove("Parent");
    let source_contents = dict.dict_remove("Contents");
    let source_resources = dict.dict_remove("Resources");

    let mut contents = vec![PdfObject::Reference(guards.0)];
    for cid in content_stream_ids(copier.source(), source_contents)? {
        contents.push(PdfObject::Reference(copier.copy(cid)?));
    }
    contents.push(PdfObject::Reference(guards.1));
    contents.push(PdfObject::Reference(overlay_stream));

    // Remaining entries (annotations, groups) are copied as-is.
    copier.rewrite_refs(&mut dict)?;

    let resources =
        build_resources(copier, source_resources, font_res, font_ref)?;

    dict.dict_set("Type", PdfObject::name("Page"));
    dict.dict_set("Parent", PdfObject::Reference(parent));
    dict.dict_set("Resources", resources);
    dict.dict_set("Contents", PdfObject::Array(contents));

    Ok((new_page_id, dict))
}

/// Copy the page's resource dict and add the numeral font under
/// `font_res`. A shared (indirect) resource dict is flattened to a
/// direct copy so the injection stays local to this page.
fn build_resources(
    copier: &mut ObjectCopier,
    source_resources: Option<PdfObject>,
    font_res: &str,
    font_ref: ObjId,
) -> Result<PdfObject, ReadError> {
    let mut resources = match source_resources {
        Some(res) => copier.source().resolved(&res)?,
        None => PdfObject::dict(vec![]),
    };

    let mut fonts = match resources.dict_remove("Font") {
        Some(f) => copier.source().resolved(&f)?,
        None => PdfObject::dict(vec![]),
    };
    // Copy existing entries before injecting: the injected reference
    // is already in output space.
    copier.rewrite_refs(&mut fonts)?;
    fonts.dict_set(font_res, PdfObject::Reference(font_ref));

    copier.rewrite_refs(&mut resources)?;
    resources.dict_set("Font", fonts);
    Ok(resources)
}

/// The page's content stream object numbers, in paint order.
/// /Contents may be absent, a reference to one stream, a reference to
/// an array, or a direct array.
pub(crate) fn content_stream_ids(
    source: &SourceDocument,
    contents: Option<PdfObject>,
) -> Result<Vec<ObjId>, ReadError> {
    let contents = match contents {
        Some(c) => c,
        None => return Ok(Vec::new()),
    };
    let ids = match contents {
        PdfObject::Reference(id) => match source.resolve(id)? {
            PdfObject::Array(items) => {
                items.iter().filter_map(|i| i.as_reference()).collect()
            }
            _ => vec![id],
        },
        PdfObject::Array(items) => {
            items.iter().filter_map(|i| i.as_reference()).collect()
        }
        _ => Vec::new(),
    };
    Ok(ids)
}

/// Pick a font resource name that collides with nothing in any page's
/// existing /Font dict: "PgNo", then "PgNo2", "PgNo3", ...
pub(crate) fn pick_font_name(source: &SourceDocument) -> String {
    let mut taken = Vec::new();
    for page in source.pages() {
        let fonts = page
            .dict
            .dict_get("Resources")
            .and_then(|r| source.resolved(r).ok())
            .and_then(|r| r.dict_get("Font").cloned())
            .and_then(|f| source.resolved(&f).ok());
        if let Some(PdfObject::Dictionary(entries)) = fonts {
            for (name, _) in entries {
                taken.push(name);
            }
        }
    }

    let mut n = 1u32;
    loop {
        let candidate = if n == 1 {
            "PgNo".to_string()
        } else {
            format!("PgNo{}", n)
        };
        if !taken.iter().any(|t| *t == candidate) {
            return candidate;
        }
        n += 1;
    }
}
