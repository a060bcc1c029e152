use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::objects::PdfObject;

/// The typeface the page numbers render in, parsed from a TrueType
/// file. A loaded font is immutable: measurement and encoding never
/// record state on the handle, so identical inputs always produce
/// identical output. Callers that need the set of glyphs actually
/// drawn collect it themselves and pass it to the embedding builders.
pub struct NumberFont {
    pub(crate) postscript_name: String,
    pub(crate) font_data: Vec<u8>,
    pub(crate) units_per_em: u16,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) bbox: [i16; 4],
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: f64,
    pub(crate) flags: u32,
    pub(crate) stem_v: i16,
    /// Unicode codepoint -> glyph ID
    cmap: BTreeMap<u32, u16>,
    /// Glyph ID -> advance width in font units
    glyph_widths: BTreeMap<u16, u16>,
    default_width: u16,
    /// Glyph ID -> Unicode codepoint (for ToUnicode CMap)
    glyph_to_unicode: BTreeMap<u16, u32>,
}

impl fmt::Debug for NumberFont {
    // Keep the whole font program out of assertion output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberFont")
            .field("postscript_name", &self.postscript_name)
            .field("units_per_em", &self.units_per_em)
            .field("glyphs", &self.glyph_widths.len())
            .finish_non_exhaustive()
    }
}

impl NumberFont {
    /// Load a font from a .ttf file. A missing file is a distinct
    /// error from an unparseable one; there is no fallback typeface.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FontMissing(path.to_path_buf()));
        }
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Parse a font from raw TrueType bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| Error::Font(format!("failed to parse TTF: {}", e)))?;

        let units_per_em = face.units_per_em();
        let ascent = face.ascender();
        let descent = face.descender();
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(ascent);
        let italic_angle = face.italic_angle() as f64;

        let flags = compute_flags(&face);
        let stem_v = estimate_stem_v(&face);

        let postscript_name = extract_postscript_name(&face)
            .or_else(|| extract_family_name(&face).map(|n| n.replace(' ', "")))
            .unwrap_or_else(|| "Unknown".to_string());

        let mut cmap = BTreeMap::new();
        let mut glyph_to_unicode = BTreeMap::new();
        let subtables = face
            .tables()
            .cmap
            .ok_or_else(|| Error::Font("font has no cmap table".to_string()))?;
        for subtable in subtables.subtables {
            if !subtable.is_unicode() {
                continue;
            }
            subtable.codepoints(|cp| {
                if let Some(gid) = subtable.glyph_index(cp) {
                    cmap.insert(cp, gid.0);
                    glyph_to_unicode.entry(gid.0).or_insert(cp);
                }
            });
        }

        // Digits are the whole working set; a font that cannot map
        // them is unusable here.
        for ch in '0'..='9' {
            if !cmap.contains_key(&(ch as u32)) {
                return Err(Error::Font(format!(
                    "font '{}' has no glyph for '{}'",
                    postscript_name, ch
                )));
            }
        }

        let num_glyphs = face.number_of_glyphs();
        let mut glyph_widths = BTreeMap::new();
        for gid in 0..num_glyphs {
            let width = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(0);
            glyph_widths.insert(gid, width);
        }
        let default_width = glyph_widths.get(&0).copied().unwrap_or(0);

        Ok(NumberFont {
            postscript_name,
            font_data: data,
            units_per_em,
            ascent,
            descent,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            cap_height,
            italic_angle,
            flags,
            stem_v,
            cmap,
            glyph_widths,
            default_width,
            glyph_to_unicode,
        })
    }

    /// Scale a raw font unit value to PDF units (1/1000 of text space).
    pub(crate) fn scale_to_pdf(&self, value: i16) -> i64 {
        (value as i64 * 1000) / self.units_per_em as i64
    }

    pub(crate) fn default_width_pdf(&self) -> i64 {
        (self.default_width as i64 * 1000) / self.units_per_em as i64
    }

    fn glyph_id(&self, ch: char) -> u16 {
        self.cmap.get(&(ch as u32)).copied().unwrap_or(0)
    }

    fn glyph_width_pdf(&self, gid: u16) -> i64 {
        let raw = self
            .glyph_widths
            .get(&gid)
            .copied()
            .unwrap_or(self.default_width);
        (raw as i64 * 1000) / self.units_per_em as i64
    }

    /// Measure text width in points at the given size.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        let total: i64 = text
            .chars()
            .map(|ch| self.glyph_width_pdf(self.glyph_id(ch)))
            .sum();
        total as f64 * font_size / 1000.0
    }

    /// Glyph IDs for each character of `text`.
    pub fn glyph_ids(&self, text: &str) -> Vec<u16> {
        text.chars().map(|ch| self.glyph_id(ch)).collect()
    }

    /// Encode text as hex glyph IDs for an Identity-H show operation:
    /// `<00480065>`.
    pub fn encode_hex(&self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for ch in text.chars() {
            hex.push_str(&format!("{:04X}", self.glyph_id(ch)));
        }
        hex.push('>');
        hex
    }

    /// Build the /W array for the given glyph set.
    /// Format: `[cid [w1 w2 ...] cid [w1 w2 ...] ...]`
    pub fn build_w_array(&self, used: &BTreeSet<u16>) -> Vec<PdfObject> {
        let sorted: Vec<u16> = used.iter().copied().collect();
        let mut result = Vec::new();

        let mut i = 0;
        while i < sorted.len() {
            let start = sorted[i];
            let mut widths = Vec::new();

            // Group consecutive glyph IDs into one run.
            let mut j = i;
            while j < sorted.len() && sorted[j] == start + (j - i) as u16 {
                widths.push(PdfObject::Integer(self.glyph_width_pdf(sorted[j])));
                j += 1;
            }

            result.push(PdfObject::Integer(start as i64));
            result.push(PdfObject::Array(widths));
            i = j;
        }

        result
    }

    /// Build the ToUnicode CMap stream bytes for the given glyph set.
    pub fn build_tounicode_cmap(&self, used: &BTreeSet<u16>) -> Vec<u8> {
        let mut cmap = String::new();
        cmap.push_str(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo\n\
             << /Registry (Adobe)\n\
             /Ordering (UCS)\n\
             /Supplement 0\n\
             >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );

        let mappings: Vec<(u16, u32)> = used
            .iter()
            .filter_map(|&gid| {
                self.glyph_to_unicode.get(&gid).map(|&cp| (gid, cp))
            })
            .collect();

        // 100 mappings per beginbfchar block, per the CMap spec.
        for chunk in mappings.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(gid, cp) in chunk {
                cmap.push_str(&format!("<{:04X}> <{:04X}>\n", gid, cp));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );

        cmap.into_bytes()
    }
}

fn extract_family_name(face: &ttf_parser::Face) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| {
            name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode()
        })
        .and_then(|name| name.to_string())
}

fn extract_postscript_name(face: &ttf_parser::Face) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| {
            name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME
                && name.is_unicode()
        })
        .and_then(|name| name.to_string())
}

/// Compute PDF font descriptor flags from the font tables.
fn compute_flags(face: &ttf_parser::Face) -> u32 {
    let mut flags = 0u32;

    // Bit 1 (value 1): FixedPitch
    if face.is_monospaced() {
        flags |= 1;
    }

    // Bit 6 (value 32): Nonsymbolic. Latin text fonts qualify.
    flags |= 32;

    // Bit 7 (value 64): Italic
    if face.is_italic() {
        flags |= 64;
    }

    flags
}

/// Estimate StemV from the font's weight class.
fn estimate_stem_v(face: &ttf_parser::Face) -> i16 {
    let weight = face.weight().to_number();
    let w = weight as f64 / 1000.0;
    (10.0 + 220.0 * w * w) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/DejaVuSans.ttf")
    }

    fn load_fixture() -> NumberFont {
        NumberFont::load(&fixture_path()).unwrap()
    }

    #[test]
    fn debug_output_summarizes_without_font_data() {
        let font = load_fixture();
        let s = format!("{:?}", font);
        assert!(s.contains("NumberFont"));
        assert!(s.contains("DejaVuSans"));
        assert!(!s.contains("font_data"));
    }

    #[test]
    fn missing_file_is_its_own_error() {
        let err =
            NumberFont::load(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, Error::FontMissing(_)));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = NumberFont::from_bytes(vec![0u8; 64]).unwrap_err();
        assert!(matches!(err, Error::Font(_)));
    }

    #[test]
    fn digits_have_nonzero_glyphs_and_widths() {
        let font = load_fixture();
        for ch in '0'..='9' {
            let gids = font.glyph_ids(&ch.to_string());
            assert_ne!(gids[0], 0, "no glyph for '{}'", ch);
        }
        let width = font.measure("42", 10.5);
        assert!(width > 0.0);
        // Two digits are wider than one at the same size.
        assert!(width > font.measure("4", 10.5));
    }

    #[test]
    fn measure_scales_linearly_with_size() {
        let font = load_fixture();
        let at_10 = font.measure("123", 10.0);
        let at_20 = font.measure("123", 20.0);
        assert!((at_20 - 2.0 * at_10).abs() < 1e-9);
    }

    #[test]
    fn encode_hex_is_four_digits_per_glyph() {
        let font = load_fixture();
        let hex = font.encode_hex("12");
        assert!(hex.starts_with('<'));
        assert!(hex.ends_with('>'));
        assert_eq!(hex.len(), 2 + 2 * 4);
        // Deterministic across calls.
        assert_eq!(hex, font.encode_hex("12"));
    }

    #[test]
    fn w_array_groups_consecutive_glyphs() {
        let font = load_fixture();
        // Digit glyphs are consecutive in DejaVu Sans.
        let used: BTreeSet<u16> =
            font.glyph_ids("0123456789").into_iter().collect();
        let w = font.build_w_array(&used);
        // One run: [start [w0 .. w9]]
        assert_eq!(w.len(), 2);
        match &w[1] {
            PdfObject::Array(widths) => assert_eq!(widths.len(), 10),
            _ => panic!("expected width array"),
        }
    }

    #[test]
    fn tounicode_maps_glyphs_back_to_codepoints() {
        let font = load_fixture();
        let used: BTreeSet<u16> = font.glyph_ids("7").into_iter().collect();
        let cmap = String::from_utf8(font.build_tounicode_cmap(&used)).unwrap();
        assert!(cmap.contains("1 beginbfchar"));
        assert!(cmap.contains(&format!("<{:04X}>", '7' as u32)));
        assert!(cmap.contains("endcmap"));
    }
}
