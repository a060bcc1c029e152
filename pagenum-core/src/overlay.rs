use crate::font::NumberFont;
use crate::geometry::{PageGeometry, ResolvedAnchor, Rotation};
use crate::writer::format_coord;

/// A rendered numeral page: the page extents and a content stream
/// that paints exactly one number and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct NumeralPage {
    pub geometry: PageGeometry,
    content: Vec<u8>,
}

impl NumeralPage {
    pub fn content_ops(&self) -> &[u8] {
        &self.content
    }
}

/// Paint `text` at the resolved anchor on an otherwise blank page.
///
/// The transform is bracketed by q/Q so the graphics state never
/// leaks into whatever stream follows this one. For unrotated
/// anchors the draw origin shifts left by half the measured text
/// width; side anchors draw from the origin unadjusted.
pub fn render(
    geometry: PageGeometry,
    anchor: ResolvedAnchor,
    text: &str,
    font: &NumberFont,
    font_size: f64,
    font_res: &str,
) -> NumeralPage {
    let anchor = match anchor.rotation {
        Rotation::Deg0 => anchor.centered(font.measure(text, font_size)),
        Rotation::Deg90 | Rotation::Deg270 => anchor,
    };

    // Rotation folded into the text-space matrix: cos/sin columns
    // for 0, 90, and 270 degrees.
    let (a, b, c, d) = match anchor.rotation {
        Rotation::Deg0 => (1, 0, 0, 1),
        Rotation::Deg90 => (0, 1, -1, 0),
        Rotation::Deg270 => (0, -1, 1, 0),
    };

    let mut content = String::new();
    content.push_str("q\n");
    content.push_str(&format!(
        "{} {} {} {} {} {} cm\n",
        a,
        b,
        c,
        d,
        format_coord(anchor.x),
        format_coord(anchor.y)
    ));
    content.push_str("BT\n");
    content.push_str(&format!(
        "/{} {} Tf\n",
        font_res,
        format_coord(font_size)
    ));
    content.push_str(&format!("{} Tj\n", font.encode_hex(text)));
    content.push_str("ET\nQ\n");

    NumeralPage {
        geometry,
        content: content.into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{
        resolve, Anchor, Margins, PageSize, PlacementSpec, CM,
    };
    use std::path::PathBuf;

    fn test_font() -> NumberFont {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/DejaVuSans.ttf");
        NumberFont::load(&path).unwrap()
    }

    fn ops(page: &NumeralPage) -> String {
        String::from_utf8(page.content_ops().to_vec()).unwrap()
    }

    #[test]
    fn content_is_a_single_guarded_text_block() {
        let font = test_font();
        let geometry = PageSize::A4.portrait();
        let anchor = resolve(geometry, &Margins::default(), &PlacementSpec::default());
        let page = render(geometry, anchor, "1", &font, 10.5, "PgNo");
        let text = ops(&page);
        assert!(text.starts_with("q\n"));
        assert!(text.ends_with("ET\nQ\n"));
        assert!(text.contains("/PgNo 10.5 Tf"));
        assert!(text.contains("BT\n"));
        assert!(text.contains(&format!("{} Tj", font.encode_hex("1"))));
    }

    #[test]
    fn bottom_anchor_is_width_centered() {
        let font = test_font();
        let geometry = PageSize::A4.portrait();
        let margins = Margins::default();
        let placement = PlacementSpec::default();
        let anchor = resolve(geometry, &margins, &placement);
        let page = render(geometry, anchor, "12", &font, 10.5, "PgNo");

        let expected_x = anchor.x - font.measure("12", 10.5) / 2.0;
        assert!(ops(&page)
            .contains(&format!("1 0 0 1 {} ", format_coord(expected_x))));
    }

    #[test]
    fn side_anchor_rotates_without_centering() {
        let font = test_font();
        let geometry = PageSize::A4.portrait();
        let margins = Margins::default();
        let placement = PlacementSpec {
            anchor: Anchor::Left,
            band_height: 1.0 * CM,
            font_size: 10.5,
        };
        let anchor = resolve(geometry, &margins, &placement);
        let page = render(geometry, anchor, "12", &font, 10.5, "PgNo");
        let text = ops(&page);
        // 270 degrees: x' = -y, y' = x.
        assert!(text.contains(&format!(
            "0 -1 1 0 {} {} cm",
            format_coord(anchor.x),
            format_coord(anchor.y)
        )));
    }

    #[test]
    fn render_is_idempotent() {
        let font = test_font();
        let geometry = PageSize::A4.portrait();
        let anchor = resolve(geometry, &Margins::default(), &PlacementSpec::default());
        let a = render(geometry, anchor, "7", &font, 10.5, "PgNo");
        let b = render(geometry, anchor, "7", &font, 10.5, "PgNo");
        assert_eq!(a, b);
    }
}
