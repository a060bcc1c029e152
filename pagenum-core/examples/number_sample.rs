/// Example: stamp page numbers onto a generated sample document.
///
/// Builds a three-page source PDF in memory (one landscape page in
/// the middle), then numbers it with the default bottom-center
/// placement:
///
/// 1. Write a small source document with `PdfWriter`.
/// 2. Parse it back as a `SourceDocument`.
/// 3. Run `Numberer` over it and write the result to disk.
///
/// Run with:
///   cargo run --example number_sample
///
/// Opens output at: output/sample_numbered.pdf
use std::path::{Path, PathBuf};

use pagenum_core::objects::{ObjId, PdfObject};
use pagenum_core::writer::PdfWriter;
use pagenum_core::{NumberFont, Numberer, SourceDocument};

fn sample_source() -> Vec<u8> {
    let sizes = [(595.28, 841.89), (841.89, 595.28), (595.28, 841.89)];

    let mut buf = Vec::new();
    let mut w = PdfWriter::new(&mut buf);
    w.write_header().expect("header");
    w.write_object(
        ObjId(1, 0),
        &PdfObject::dict(vec![
            ("Type", PdfObject::name("Catalog")),
            ("Pages", PdfObject::reference(2, 0)),
        ]),
    )
    .expect("catalog");
    let kids: Vec<PdfObject> = (0..sizes.len())
        .map(|i| PdfObject::reference(3 + 2 * i as u32, 0))
        .collect();
    w.write_object(
        ObjId(2, 0),
        &PdfObject::dict(vec![
            ("Type", PdfObject::name("Pages")),
            ("Kids", PdfObject::Array(kids)),
            ("Count", PdfObject::Integer(sizes.len() as i64)),
        ]),
    )
    .expect("pages");

    for (i, &(pw, ph)) in sizes.iter().enumerate() {
        let page_id = 3 + 2 * i as u32;
        w.write_object(
            ObjId(page_id, 0),
            &PdfObject::dict(vec![
                ("Type", PdfObject::name("Page")),
                ("Parent", PdfObject::reference(2, 0)),
                (
                    "MediaBox",
                    PdfObject::array(vec![
                        PdfObject::Integer(0),
                        PdfObject::Integer(0),
                        PdfObject::Real(pw),
                        PdfObject::Real(ph),
                    ]),
                ),
                ("Contents", PdfObject::reference(page_id + 1, 0)),
            ]),
        )
        .expect("page");
        // A frame 36pt inside the page edge, so the numbers have
        // something to sit next to.
        let ops = format!(
            "2 w 36 36 {} {} re S",
            pw - 72.0,
            ph - 72.0
        );
        w.write_object(
            ObjId(page_id + 1, 0),
            &PdfObject::stream(vec![], ops.into_bytes()),
        )
        .expect("content");
    }
    w.write_xref_and_trailer(ObjId(1, 0), None).expect("trailer");
    buf
}

fn main() {
    std::fs::create_dir_all("output").unwrap();
    let path = Path::new("output/sample_numbered.pdf");

    let font_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/DejaVuSans.ttf");
    let font = NumberFont::load(&font_path).expect("load font");

    let source =
        SourceDocument::from_bytes(sample_source()).expect("parse source");
    println!("Source: {} pages", source.page_count());

    Numberer::new(font)
        .set_title("Numbered Sample")
        .write_to_path(&source, path)
        .expect("write output");

    println!("Written to {}", path.display());
}
