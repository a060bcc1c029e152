use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::objects::{ObjId, PdfObject};

/// Low-level PDF binary writer. Serializes PDF objects to any
/// `Write` target while tracking byte offsets for the xref table.
pub struct PdfWriter<W: Write> {
    writer: W,
    offset: usize,
    xref_entries: BTreeMap<u32, usize>,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(writer: W) -> Self {
        PdfWriter {
            writer,
            offset: 0,
            xref_entries: BTreeMap::new(),
        }
    }

    /// Write raw bytes, tracking the byte offset.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.offset += data.len();
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Write the PDF 1.7 header and binary comment.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.write_str("%PDF-1.7\n")?;
        // Binary comment: 4 bytes >= 128 for binary detection.
        self.write_bytes(b"%\xe2\xe3\xcf\xd3\n")?;
        Ok(())
    }

    /// Write an indirect object, recording its byte offset for xref.
    pub fn write_object(&mut self, id: ObjId, obj: &PdfObject) -> io::Result<()> {
        self.xref_entries.insert(id.0, self.offset);
        self.write_str(&format!("{} {} obj\n", id.0, id.1))?;
        self.write_pdf_object(obj)?;
        self.write_str("\nendobj\n")?;
        Ok(())
    }

    /// Serialize a PdfObject to its PDF text representation.
    fn write_pdf_object(&mut self, obj: &PdfObject) -> io::Result<()> {
        match obj {
            PdfObject::Null => self.write_str("null"),
            PdfObject::Boolean(true) => self.write_str("true"),
            PdfObject::Boolean(false) => self.write_str("false"),
            PdfObject::Integer(n) => self.write_str(&n.to_string()),
            PdfObject::Real(f) => {
                let s = format_real(*f);
                self.write_str(&s)
            }
            PdfObject::Name(name) => {
                self.write_str("/")?;
                let escaped = escape_pdf_name(name);
                self.write_bytes(&escaped)
            }
            PdfObject::LiteralString(bytes) => {
                self.write_str("(")?;
                let escaped = escape_pdf_bytes(bytes);
                self.write_bytes(&escaped)?;
                self.write_str(")")
            }
            PdfObject::HexString(bytes) => {
                self.write_str("<")?;
                for b in bytes {
                    self.write_str(&format!("{:02X}", b))?;
                }
                self.write_str(">")
            }
            PdfObject::Array(items) => {
                self.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.write_str(" ")?;
                    }
                    self.write_pdf_object(item)?;
                }
                self.write_str("]")
            }
            PdfObject::Dictionary(entries) => {
                self.write_str("<<")?;
                for (key, val) in entries {
                    self.write_str(" /")?;
                    let escaped = escape_pdf_name(key);
                    self.write_bytes(&escaped)?;
                    self.write_str(" ")?;
                    self.write_pdf_object(val)?;
                }
                self.write_str(" >>")
            }
            PdfObject::Stream { dict, data } => {
                self.write_str("<<")?;
                for (key, val) in dict {
                    self.write_str(" /")?;
                    let escaped = escape_pdf_name(key);
                    self.write_bytes(&escaped)?;
                    self.write_str(" ")?;
                    self.write_pdf_object(val)?;
                }
                self.write_str(" /Length ")?;
                self.write_str(&data.len().to_string())?;
                self.write_str(" >>\nstream\n")?;
                self.write_bytes(data)?;
                self.write_str("\nendstream")
            }
            PdfObject::Reference(id) => {
                self.write_str(&format!("{} {} R", id.0, id.1))
            }
        }
    }

    /// Current byte offset in the output.
    pub fn current_offset(&self) -> usize {
        self.offset
    }

    /// Write xref table, trailer, startxref, and %%EOF.
    pub fn write_xref_and_trailer(
        &mut self,
        root_id: ObjId,
        info_id: Option<ObjId>,
    ) -> io::Result<()> {
        let xref_offset = self.offset;

        let max_obj = self
            .xref_entries
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0);
        let size = max_obj + 1;

        self.write_str("xref\n")?;
        self.write_str(&format!("0 {}\n", size))?;

        // Object 0: free entry head (exactly 20 bytes).
        self.write_bytes(b"0000000000 65535 f\r\n")?;

        // Entries for objects 1..max_obj; gaps stay free.
        let entries = std::mem::take(&mut self.xref_entries);
        for obj_num in 1..size {
            match entries.get(&obj_num) {
                Some(&off) => {
                    let entry = format!("{:010} {:05} n\r\n", off, 0);
                    self.write_bytes(entry.as_bytes())?;
                }
                None => {
                    self.write_bytes(b"0000000000 00000 f\r\n")?;
                }
            }
        }

        let mut trailer = PdfObject::dict(vec![
            ("Size", PdfObject::Integer(size as i64)),
            ("Root", PdfObject::Reference(root_id)),
        ]);
        if let Some(info) = info_id {
            trailer.dict_set("Info", PdfObject::Reference(info));
        }
        self.write_str("trailer\n")?;
        self.write_pdf_object(&trailer)?;
        self.write_str("\n")?;

        self.write_str("startxref\n")?;
        self.write_str(&format!("{}\n", xref_offset))?;
        self.write_str("%%EOF\n")?;

        Ok(())
    }

    /// Return the inner writer, consuming this PdfWriter.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Escape the bytes of a PDF literal string. Parens and backslashes
/// must be escaped; CR is escaped so readers cannot translate it.
pub(crate) fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => result.extend_from_slice(b"\\\\"),
            b'(' => result.extend_from_slice(b"\\("),
            b')' => result.extend_from_slice(b"\\)"),
            b'\r' => result.extend_from_slice(b"\\r"),
            _ => result.push(b),
        }
    }
    result
}

/// Escape a name for output: bytes outside the regular range (and
/// `#` itself) become `#xx`.
fn escape_pdf_name(name: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(name.len());
    for &b in name.as_bytes() {
        let regular = (0x21..=0x7e).contains(&b)
            && b != b'#'
            && !matches!(
                b,
                b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
            );
        if regular {
            result.push(b);
        } else {
            result.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
    result
}

/// Format a float for PDF output: no trailing zeros,
/// no scientific notation.
fn format_real(f: f64) -> String {
    if f == f.floor() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let s = format!("{:.6}", f);
        let s = s.trim_end_matches('0');
        let s = s.trim_end_matches('.');
        s.to_string()
    }
}

/// Format a coordinate value for content streams: integers bare,
/// fractions trimmed to four decimals.
pub(crate) fn format_coord(v: f64) -> String {
    if v == v.floor() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.4}", v);
        let s = s.trim_end_matches('0');
        let s = s.trim_end_matches('.');
        s.to_string()
    }
}
