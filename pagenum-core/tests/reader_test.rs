use pagenum_core::objects::{ObjId, PdfObject};
use pagenum_core::writer::PdfWriter;
use pagenum_core::{ReadError, SourceDocument};

/// Helper: a document with `n` blank letter-size pages.
fn make_pdf(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut w = PdfWriter::new(&mut buf);
    w.write_header().unwrap();
    w.write_object(
        ObjId(1, 0),
        &PdfObject::dict(vec![
            ("Type", PdfObject::name("Catalog")),
            ("Pages", PdfObject::reference(2, 0)),
        ]),
    )
    .unwrap();
    let kids: Vec<PdfObject> = (0..n)
        .map(|i| PdfObject::reference(3 + i as u32, 0))
        .collect();
    w.write_object(
        ObjId(2, 0),
        &PdfObject::dict(vec![
            ("Type", PdfObject::name("Pages")),
            ("Kids", PdfObject::Array(kids)),
            ("Count", PdfObject::Integer(n as i64)),
            (
                "MediaBox",
                PdfObject::array(vec![
                    PdfObject::Integer(0),
                    PdfObject::Integer(0),
                    PdfObject::Integer(612),
                    PdfObject::Integer(792),
                ]),
            ),
        ]),
    )
    .unwrap();
    for i in 0..n {
        w.write_object(
            ObjId(3 + i as u32, 0),
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Page")),
                ("Parent", PdfObject::reference(2, 0)),
            ]),
        )
        .unwrap();
    }
    w.write_xref_and_trailer(ObjId(1, 0), None).unwrap();
    buf
}

#[test]
fn from_bytes_parses_generated_document() {
    assert!(SourceDocument::from_bytes(make_pdf(1)).is_ok());
}

#[test]
fn page_count_matches_document() {
    for n in [1usize, 3, 10] {
        let doc = SourceDocument::from_bytes(make_pdf(n)).unwrap();
        assert_eq!(doc.page_count(), n);
    }
}

#[test]
fn version_comes_from_header() {
    let doc = SourceDocument::from_bytes(make_pdf(1)).unwrap();
    assert_eq!(doc.version(), "1.7");
}

#[test]
fn pages_report_extents() {
    let doc = SourceDocument::from_bytes(make_pdf(2)).unwrap();
    for page in doc.pages() {
        assert_eq!(page.extents(), (612.0, 792.0));
    }
}

#[test]
fn open_reads_from_disk() {
    let bytes = make_pdf(2);
    let path = std::env::temp_dir().join("pagenum_reader_test_open.pdf");
    std::fs::write(&path, &bytes).unwrap();

    let doc = SourceDocument::open(&path).unwrap();
    assert_eq!(doc.page_count(), 2);

    std::fs::remove_file(&path).ok();
}

#[test]
fn empty_bytes_are_not_a_pdf() {
    let result = SourceDocument::from_bytes(vec![]);
    assert!(matches!(result, Err(ReadError::NotAPdf)));
}

#[test]
fn garbage_bytes_are_not_a_pdf() {
    let result =
        SourceDocument::from_bytes(b"this is not a pdf at all".to_vec());
    assert!(matches!(result, Err(ReadError::NotAPdf)));
}

#[test]
fn header_only_is_rejected() {
    let result = SourceDocument::from_bytes(b"%PDF-1.7\n".to_vec());
    assert!(result.is_err());
}

/// An incremental update appends a replacement object and a second
/// xref section chained to the first with /Prev. The newest entry for
/// an object number must win.
#[test]
fn incremental_update_shadows_older_objects() {
    let base = make_pdf(1);

    let kw = b"startxref";
    let sx_pos = base.windows(kw.len()).rposition(|w| w == kw).unwrap();
    let old_xref: usize = String::from_utf8_lossy(&base[sx_pos + kw.len()..])
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap();

    // Replacement page 3 with its own MediaBox.
    let mut update = Vec::new();
    let obj_offset = base.len();
    update.extend_from_slice(
        b"3 0 obj\n<< /Type /Page /Parent 2 0 R \
          /MediaBox [0 0 200 400] >>\nendobj\n",
    );
    let xref_offset = base.len() + update.len();
    update.extend_from_slice(b"xref\n0 1\n0000000000 65535 f\r\n3 1\n");
    update
        .extend_from_slice(format!("{:010} 00000 n\r\n", obj_offset).as_bytes());
    update.extend_from_slice(
        format!(
            "trailer\n<< /Size 4 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            old_xref, xref_offset
        )
        .as_bytes(),
    );

    let mut data = base;
    data.extend_from_slice(&update);

    let doc = SourceDocument::from_bytes(data).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.pages()[0].media_box, [0.0, 0.0, 200.0, 400.0]);
}

/// An incremental update can delete an object by marking it free. The
/// newer free entry must shadow the older in-use entry, not fall
/// through to it.
#[test]
fn incremental_update_deletion_stays_deleted() {
    let base = make_pdf(2);

    let kw = b"startxref";
    let sx_pos = base.windows(kw.len()).rposition(|w| w == kw).unwrap();
    let old_xref: usize = String::from_utf8_lossy(&base[sx_pos + kw.len()..])
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap();

    // Rewritten pages node dropping page 4, which the update frees.
    let mut data = base;
    let obj_offset = data.len();
    data.extend_from_slice(
        b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 \
          /MediaBox [0 0 612 792] >>\nendobj\n",
    );
    let xref_offset = data.len();
    data.extend_from_slice(b"xref\n0 1\n0000000000 65535 f\r\n2 1\n");
    data.extend_from_slice(
        format!("{:010} 00000 n\r\n", obj_offset).as_bytes(),
    );
    data.extend_from_slice(b"4 1\n0000000000 00001 f\r\n");
    data.extend_from_slice(
        format!(
            "trailer\n<< /Size 5 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            old_xref, xref_offset
        )
        .as_bytes(),
    );

    let doc = SourceDocument::from_bytes(data).unwrap();
    assert_eq!(doc.page_count(), 1);
    let result = doc.resolve(ObjId(4, 0));
    assert!(matches!(result, Err(ReadError::UnresolvableObject(4))));
}
