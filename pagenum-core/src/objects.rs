use crate::error::ReadError;

/// Object identifier: (object_number, generation_number).
/// Generation is always 0 for objects this crate creates; nonzero
/// generations can appear in source documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32, pub u16);

/// Represents PDF object types per PDF 32000-1:2008 Section 7.3.
///
/// Strings are byte-backed rather than `String`: source documents
/// carry binary string data (UTF-16 info entries, packed dates) that
/// must survive a copy unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// PDF name object (stored without the leading `/`, `#xx` decoded).
    Name(String),
    /// PDF literal string (decoded bytes, without the enclosing parens).
    LiteralString(Vec<u8>),
    /// PDF hexadecimal string (decoded bytes, without the brackets).
    HexString(Vec<u8>),
    Array(Vec<PdfObject>),
    /// Key-value pairs. Uses Vec for deterministic output order.
    Dictionary(Vec<(String, PdfObject)>),
    /// Stream dicts never hold /Length here; the writer derives it
    /// from `data` when serializing.
    Stream {
        dict: Vec<(String, PdfObject)>,
        data: Vec<u8>,
    },
    Reference(ObjId),
}

impl PdfObject {
    pub fn name(s: &str) -> Self {
        PdfObject::Name(s.to_string())
    }

    pub fn literal_string(s: &str) -> Self {
        PdfObject::LiteralString(s.as_bytes().to_vec())
    }

    pub fn reference(obj_num: u32, gen: u16) -> Self {
        PdfObject::Reference(ObjId(obj_num, gen))
    }

    pub fn array(items: Vec<PdfObject>) -> Self {
        PdfObject::Array(items)
    }

    pub fn dict(entries: Vec<(&str, PdfObject)>) -> Self {
        PdfObject::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn stream(
        dict_entries: Vec<(&str, PdfObject)>,
        data: Vec<u8>,
    ) -> Self {
        PdfObject::Stream {
            dict: dict_entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            data,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value of an Integer or Real.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(n) => Some(*n as f64),
            PdfObject::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(s) => Some(s),
            _ => None,
        }
    }

    fn entries(&self) -> Option<&[(String, PdfObject)]> {
        match self {
            PdfObject::Dictionary(e) => Some(e),
            PdfObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    fn entries_mut(&mut self) -> Option<&mut Vec<(String, PdfObject)>> {
        match self {
            PdfObject::Dictionary(e) => Some(e),
            PdfObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Look up a dictionary entry (also works on stream dicts).
    pub fn dict_get(&self, key: &str) -> Option<&PdfObject> {
        self.entries()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace a dictionary entry. No-op on non-dictionaries.
    pub fn dict_set(&mut self, key: &str, value: PdfObject) {
        if let Some(entries) = self.entries_mut() {
            if let Some(slot) =
                entries.iter_mut().find(|(k, _)| k == key)
            {
                slot.1 = value;
            } else {
                entries.push((key.to_string(), value));
            }
        }
    }

    /// Remove a dictionary entry, returning the previous value.
    pub fn dict_remove(&mut self, key: &str) -> Option<PdfObject> {
        let entries = self.entries_mut()?;
        let idx = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(idx).1)
    }

    /// Rewrite every indirect reference in this object tree through
    /// `f`. Used to renumber objects copied between documents.
    pub fn map_references(&mut self, f: &mut dyn FnMut(ObjId) -> ObjId) {
        match self {
            PdfObject::Reference(id) => *id = f(*id),
            PdfObject::Array(items) => {
                for item in items {
                    item.map_references(f);
                }
            }
            PdfObject::Dictionary(entries) => {
                for (_, v) in entries {
                    v.map_references(f);
                }
            }
            PdfObject::Stream { dict, .. } => {
                for (_, v) in dict {
                    v.map_references(f);
                }
            }
            _ => {}
        }
    }
}

// ── Object syntax parser ──────────────────────────────────────────────────────

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, 0 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Recursive-descent parser for PDF object syntax.
///
/// Operates on the whole file buffer so that the byte offsets carried
/// by `ReadError::MalformedObject` are absolute file offsets.
pub(crate) struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Parser { data, pos }
    }

    fn malformed<T>(&self) -> Result<T, ReadError> {
        Err(ReadError::MalformedObject(self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn starts_with(&self, s: &[u8]) -> bool {
        self.data[self.pos..].starts_with(s)
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_pdf_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Consume `kw` (after whitespace) or fail.
    pub fn expect_keyword(&mut self, kw: &[u8]) -> Result<(), ReadError> {
        self.skip_whitespace();
        if self.starts_with(kw) {
            self.pos += kw.len();
            Ok(())
        } else {
            self.malformed()
        }
    }

    /// Parse one object. Stream payloads are only valid at the top
    /// level of an indirect object; see `parse_indirect_object`.
    pub fn parse_object(&mut self) -> Result<PdfObject, ReadError> {
        self.skip_whitespace();
        match self.peek() {
            None => self.malformed(),
            Some(b'<') if self.starts_with(b"<<") => self.parse_dictionary(),
            Some(b'<') => self.parse_hex_string(),
            Some(b'[') => self.parse_array(),
            Some(b'(') => self.parse_literal_string(),
            Some(b'/') => Ok(PdfObject::Name(self.parse_name()?)),
            Some(b't') => {
                self.expect_keyword(b"true")?;
                Ok(PdfObject::Boolean(true))
            }
            Some(b'f') => {
                self.expect_keyword(b"false")?;
                Ok(PdfObject::Boolean(false))
            }
            Some(b'n') => {
                self.expect_keyword(b"null")?;
                Ok(PdfObject::Null)
            }
            Some(b) if b == b'+' || b == b'-' || b == b'.' || b.is_ascii_digit() => {
                self.parse_numeric()
            }
            _ => self.malformed(),
        }
    }

    /// Parse a full `N G obj … endobj` at the current position,
    /// including stream payload extraction.
    pub fn parse_indirect_object(
        &mut self,
    ) -> Result<(ObjId, PdfObject), ReadError> {
        let num = self.parse_unsigned()? as u32;
        let gen = self.parse_unsigned()? as u16;
        self.expect_keyword(b"obj")?;

        let mut body = self.parse_object()?;
        self.skip_whitespace();

        if self.starts_with(b"stream") {
            self.pos += b"stream".len();
            // One EOL follows the keyword: CRLF or LF.
            if self.peek() == Some(b'\r') {
                self.pos += 1;
            }
            if self.peek() == Some(b'\n') {
                self.pos += 1;
            }

            let mut entries = match body {
                PdfObject::Dictionary(e) => e,
                _ => return self.malformed(),
            };

            // /Length fast path; fall back to scanning for `endstream`
            // when Length is an indirect reference or inconsistent.
            let declared = entries
                .iter()
                .find(|(k, _)| k == "Length")
                .and_then(|(_, v)| v.as_integer());
            let end = match declared.and_then(|n| self.stream_end_by_length(n)) {
                Some(end) => end,
                None => self.stream_end_by_scan()?,
            };
            let data = self.data[self.pos..end].to_vec();
            self.pos = end;
            self.expect_keyword(b"endstream")?;

            // /Length is derived from the data on write.
            entries.retain(|(k, _)| k != "Length");
            body = PdfObject::Stream {
                dict: entries,
                data,
            };
        }

        self.skip_whitespace();
        if self.starts_with(b"endobj") {
            self.pos += b"endobj".len();
        }
        Ok((ObjId(num, gen), body))
    }

    /// Validate a declared /Length: `endstream` must follow the
    /// payload (after optional EOL). Returns the payload end offset.
    fn stream_end_by_length(&self, declared: i64) -> Option<usize> {
        let n = usize::try_from(declared).ok()?;
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let mut p = end;
        while p < self.data.len() && is_pdf_whitespace(self.data[p]) {
            p += 1;
        }
        if self.data[p..].starts_with(b"endstream") {
            Some(end)
        } else {
            None
        }
    }

    /// Locate the next `endstream` keyword and trim the single EOL
    /// that precedes it. Returns the payload end offset.
    fn stream_end_by_scan(&self) -> Result<usize, ReadError> {
        let hay = &self.data[self.pos..];
        let kw = b"endstream";
        let idx = hay
            .windows(kw.len())
            .position(|w| w == kw)
            .ok_or(ReadError::MalformedObject(self.pos))?;
        let mut end = self.pos + idx;
        if end > self.pos && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > self.pos && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(end)
    }

    pub(crate) fn parse_unsigned(&mut self) -> Result<u64, ReadError> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return self.malformed();
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(ReadError::MalformedObject(start))
    }

    fn parse_numeric(&mut self) -> Result<PdfObject, ReadError> {
        let num = self.parse_number()?;
        // `N G R` lookahead: a non-negative integer may open an
        // indirect reference.
        if let PdfObject::Integer(n) = num {
            if n >= 0 && n <= u32::MAX as i64 {
                let save = self.pos;
                if let Some(gen) = self.try_generation_and_r() {
                    return Ok(PdfObject::Reference(ObjId(n as u32, gen)));
                }
                self.pos = save;
            }
        }
        Ok(num)
    }

    fn try_generation_and_r(&mut self) -> Option<u16> {
        self.skip_whitespace();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let gen: u16 = std::str::from_utf8(&self.data[start..self.pos])
            .ok()?
            .parse()
            .ok()?;
        self.skip_whitespace();
        if self.peek() != Some(b'R') {
            return None;
        }
        // `R` must stand alone, not open a longer token.
        match self.data.get(self.pos + 1) {
            Some(&b) if !is_pdf_whitespace(b) && !is_delimiter(b) => None,
            _ => {
                self.pos += 1;
                Some(gen)
            }
        }
    }

    fn parse_number(&mut self) -> Result<PdfObject, ReadError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                seen_digit = true;
                self.pos += 1;
            } else if b == b'.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        if !seen_digit {
            return Err(ReadError::MalformedObject(start));
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| ReadError::MalformedObject(start))?;
        if seen_dot {
            text.parse::<f64>()
                .map(PdfObject::Real)
                .map_err(|_| ReadError::MalformedObject(start))
        } else {
            text.parse::<i64>()
                .map(PdfObject::Integer)
                .map_err(|_| ReadError::MalformedObject(start))
        }
    }

    fn parse_name(&mut self) -> Result<String, ReadError> {
        debug_assert_eq!(self.peek(), Some(b'/'));
        self.pos += 1;
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            if is_pdf_whitespace(b) || is_delimiter(b) {
                break;
            }
            if b == b'#' {
                let hi = self.data.get(self.pos + 1).copied();
                let lo = self.data.get(self.pos + 2).copied();
                match (
                    hi.and_then(|c| (c as char).to_digit(16)),
                    lo.and_then(|c| (c as char).to_digit(16)),
                ) {
                    (Some(h), Some(l)) => {
                        out.push((h * 16 + l) as u8);
                        self.pos += 3;
                    }
                    _ => return self.malformed(),
                }
            } else {
                out.push(b);
                self.pos += 1;
            }
        }
        String::from_utf8(out).map_err(|_| ReadError::MalformedObject(self.pos))
    }

    fn parse_literal_string(&mut self) -> Result<PdfObject, ReadError> {
        debug_assert_eq!(self.peek(), Some(b'('));
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(PdfObject::LiteralString(out));
                    }
                    out.push(b);
                }
                b'\\' => match self.peek() {
                    None => return self.malformed(),
                    Some(b'n') => {
                        out.push(b'\n');
                        self.pos += 1;
                    }
                    Some(b'r') => {
                        out.push(b'\r');
                        self.pos += 1;
                    }
                    Some(b't') => {
                        out.push(b'\t');
                        self.pos += 1;
                    }
                    Some(b'b') => {
                        out.push(0x08);
                        self.pos += 1;
                    }
                    Some(b'f') => {
                        out.push(0x0c);
                        self.pos += 1;
                    }
                    // Escaped EOL is a line continuation.
                    Some(b'\r') => {
                        self.pos += 1;
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {
                        self.pos += 1;
                    }
                    Some(d) if (b'0'..=b'7').contains(&d) => {
                        let mut val = 0u32;
                        for _ in 0..3 {
                            match self.peek() {
                                Some(o) if (b'0'..=b'7').contains(&o) => {
                                    val = val * 8 + (o - b'0') as u32;
                                    self.pos += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push(val as u8);
                    }
                    // Unknown escape: the backslash is dropped.
                    Some(other) => {
                        out.push(other);
                        self.pos += 1;
                    }
                },
                _ => out.push(b),
            }
        }
        self.malformed()
    }

    fn parse_hex_string(&mut self) -> Result<PdfObject, ReadError> {
        debug_assert_eq!(self.peek(), Some(b'<'));
        self.pos += 1;
        let mut nibbles = Vec::new();
        loop {
            match self.peek() {
                None => return self.malformed(),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b) if is_pdf_whitespace(b) => self.pos += 1,
                Some(b) => match (b as char).to_digit(16) {
                    Some(v) => {
                        nibbles.push(v as u8);
                        self.pos += 1;
                    }
                    None => return self.malformed(),
                },
            }
        }
        // Odd digit count: the final digit is the high nibble.
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }
        let bytes = nibbles
            .chunks(2)
            .map(|pair| pair[0] * 16 + pair[1])
            .collect();
        Ok(PdfObject::HexString(bytes))
    }

    fn parse_array(&mut self) -> Result<PdfObject, ReadError> {
        debug_assert_eq!(self.peek(), Some(b'['));
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return self.malformed(),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(PdfObject::Array(items));
                }
                _ => items.push(self.parse_object()?),
            }
        }
    }

    fn parse_dictionary(&mut self) -> Result<PdfObject, ReadError> {
        debug_assert!(self.starts_with(b"<<"));
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.starts_with(b">>") {
                self.pos += 2;
                return Ok(PdfObject::Dictionary(entries));
            }
            match self.peek() {
                Some(b'/') => {
                    let key = self.parse_name()?;
                    let value = self.parse_object()?;
                    entries.push((key, value));
                }
                _ => return self.malformed(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &[u8]) -> PdfObject {
        Parser::new(src, 0).parse_object().unwrap()
    }

    #[test]
    fn obj_id_equality() {
        let a = ObjId(1, 0);
        let b = ObjId(1, 0);
        let c = ObjId(2, 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dict_constructor_and_access() {
        let mut obj = PdfObject::dict(vec![
            ("Type", PdfObject::name("Page")),
            ("Parent", PdfObject::reference(2, 0)),
        ]);
        assert_eq!(
            obj.dict_get("Type").and_then(|v| v.as_name()),
            Some("Page")
        );
        obj.dict_set("Type", PdfObject::name("Pages"));
        assert_eq!(
            obj.dict_get("Type").and_then(|v| v.as_name()),
            Some("Pages")
        );
        assert!(obj.dict_remove("Parent").is_some());
        assert!(obj.dict_get("Parent").is_none());
    }

    #[test]
    fn map_references_renumbers_nested() {
        let mut obj = PdfObject::dict(vec![(
            "Kids",
            PdfObject::array(vec![
                PdfObject::reference(3, 0),
                PdfObject::reference(6, 0),
            ]),
        )]);
        obj.map_references(&mut |id| ObjId(id.0 + 100, id.1));
        match obj.dict_get("Kids").unwrap() {
            PdfObject::Array(items) => {
                assert_eq!(items[0].as_reference(), Some(ObjId(103, 0)));
                assert_eq!(items[1].as_reference(), Some(ObjId(106, 0)));
            }
            _ => panic!("expected Array"),
        }
    }

    #[test]
    fn parse_dictionary_with_reference_values() {
        let obj = parse(b"<< /Type /Catalog /Pages 2 0 R /N 7 >>");
        assert_eq!(
            obj.dict_get("Pages").and_then(|v| v.as_reference()),
            Some(ObjId(2, 0))
        );
        assert_eq!(obj.dict_get("N").and_then(|v| v.as_integer()), Some(7));
    }

    #[test]
    fn parse_nested_structures() {
        let obj = parse(b"<< /MediaBox [0 0 595.28 841.89] /A << /B true >> >>");
        match obj.dict_get("MediaBox").unwrap() {
            PdfObject::Array(items) => {
                assert_eq!(items.len(), 4);
                assert_eq!(items[2].as_real(), Some(595.28));
            }
            _ => panic!("expected Array"),
        }
        assert_eq!(
            obj.dict_get("A").and_then(|a| a.dict_get("B")),
            Some(&PdfObject::Boolean(true))
        );
    }

    #[test]
    fn integer_pair_is_not_mistaken_for_reference() {
        let obj = parse(b"[1 0 612 792]");
        match obj {
            PdfObject::Array(items) => {
                assert_eq!(items[0], PdfObject::Integer(1));
                assert_eq!(items[1], PdfObject::Integer(0));
                assert_eq!(items.len(), 4);
            }
            _ => panic!("expected Array"),
        }
    }

    #[test]
    fn reference_inside_array_is_parsed() {
        let obj = parse(b"[3 0 R 6 0 R]");
        match obj {
            PdfObject::Array(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].as_reference(), Some(ObjId(3, 0)));
            }
            _ => panic!("expected Array"),
        }
    }

    #[test]
    fn parse_literal_string_with_escapes() {
        let obj = parse(br"(a\(b\)c\\d\101)");
        assert_eq!(obj, PdfObject::LiteralString(b"a(b)c\\dA".to_vec()));
    }

    #[test]
    fn parse_balanced_parens_without_escapes() {
        let obj = parse(b"(outer (inner) tail)");
        assert_eq!(
            obj,
            PdfObject::LiteralString(b"outer (inner) tail".to_vec())
        );
    }

    #[test]
    fn parse_hex_string_pads_odd_digit() {
        let obj = parse(b"<48656C6C6F>");
        assert_eq!(obj, PdfObject::HexString(b"Hello".to_vec()));
        let obj = parse(b"<48 65 6>");
        assert_eq!(obj, PdfObject::HexString(vec![0x48, 0x65, 0x60]));
    }

    #[test]
    fn parse_name_with_hash_escape() {
        let obj = parse(b"/A#20B");
        assert_eq!(obj.as_name(), Some("A B"));
    }

    #[test]
    fn parse_indirect_stream_with_integer_length() {
        let src = b"4 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let (id, obj) = Parser::new(src, 0).parse_indirect_object().unwrap();
        assert_eq!(id, ObjId(4, 0));
        match obj {
            PdfObject::Stream { dict, data } => {
                assert_eq!(data, b"hello");
                // Length is stripped; the writer re-derives it.
                assert!(dict.iter().all(|(k, _)| k != "Length"));
            }
            _ => panic!("expected Stream"),
        }
    }

    #[test]
    fn parse_indirect_stream_with_reference_length() {
        let src = b"4 0 obj\n<< /Length 9 0 R >>\nstream\nhello\nendstream\nendobj\n";
        let (_, obj) = Parser::new(src, 0).parse_indirect_object().unwrap();
        match obj {
            PdfObject::Stream { data, .. } => assert_eq!(data, b"hello"),
            _ => panic!("expected Stream"),
        }
    }

    #[test]
    fn malformed_input_reports_offset() {
        let err = Parser::new(b"   }", 0).parse_object().unwrap_err();
        assert_eq!(err, ReadError::MalformedObject(3));
    }
}
