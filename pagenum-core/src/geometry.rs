use std::str::FromStr;

/// Points per centimeter.
pub const CM: f64 = 72.0 / 2.54;

/// Points per millimeter.
pub const MM: f64 = CM / 10.0;

/// Fixed compensation added to every resolved anchor, in points
/// (0.05cm right, 0.15cm up). Corrects a baseline misalignment
/// observed with the reference typeface; do not retune per font.
pub const BASELINE_OFFSET: (f64, f64) = (0.05 * CM, 0.15 * CM);

/// Width and height of one page in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        PageGeometry { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Page margins in points, constant across a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn from_cm(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Margins {
            top: top * CM,
            right: right * CM,
            bottom: bottom * CM,
            left: left * CM,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Margins::from_cm(2.5, 2.5, 2.5, 3.0)
    }
}

/// Which page edge the numeral sits on. `Auto` behaves as `Bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
    Auto,
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Anchor::Top),
            "bottom" => Ok(Anchor::Bottom),
            "left" => Ok(Anchor::Left),
            "right" => Ok(Anchor::Right),
            "auto" => Ok(Anchor::Auto),
            _ => Err(format!(
                "unknown position '{}' (expected top, bottom, left, right, or auto)",
                s
            )),
        }
    }
}

/// Numeral rotation. Side anchors rotate the glyph so it reads along
/// the page edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg270 => 270,
        }
    }
}

/// Anchor position, band height, and type size for the numeral.
/// `band_height` is the distance from the anchored page edge to the
/// numeral's draw origin, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSpec {
    pub anchor: Anchor,
    pub band_height: f64,
    pub font_size: f64,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        PlacementSpec {
            anchor: Anchor::Auto,
            band_height: 1.75 * CM,
            font_size: 10.5,
        }
    }
}

/// Draw origin and rotation for one page's numeral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAnchor {
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
}

impl ResolvedAnchor {
    /// Shift the x origin left by half the rendered text width so the
    /// numeral is centered on the anchor. Only meaningful for
    /// unrotated anchors; side anchors draw from the origin as-is.
    pub fn centered(self, text_width: f64) -> Self {
        ResolvedAnchor {
            x: self.x - text_width / 2.0,
            ..self
        }
    }
}

/// Compute the numeral's draw origin and rotation for one page.
///
/// The midpoint formulas center the numeral in the writable band
/// between opposing margins, not on the full page. Out-of-range
/// margins are not clamped; a midpoint off the page is returned
/// unchanged.
pub fn resolve(
    page: PageGeometry,
    margins: &Margins,
    placement: &PlacementSpec,
) -> ResolvedAnchor {
    let band = placement.band_height;
    let hmid =
        (page.width - margins.left - margins.right) / 2.0 + margins.left;
    let vmid =
        (page.height - margins.top - margins.bottom) / 2.0 + margins.top;

    let (x, y, rotation) = match placement.anchor {
        Anchor::Top => (hmid, page.height - band, Rotation::Deg0),
        Anchor::Bottom | Anchor::Auto => (hmid, band, Rotation::Deg0),
        Anchor::Left => (band, vmid, Rotation::Deg270),
        Anchor::Right => (page.width - band, vmid, Rotation::Deg90),
    };

    ResolvedAnchor {
        x: x + BASELINE_OFFSET.0,
        y: y + BASELINE_OFFSET.1,
        rotation,
    }
}

/// Nominal output page sizes for numeral pages, ISO A series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
}

impl PageSize {
    /// Portrait dimensions in points.
    pub fn portrait(self) -> PageGeometry {
        let (w_mm, h_mm) = match self {
            PageSize::A0 => (841.0, 1189.0),
            PageSize::A1 => (594.0, 841.0),
            PageSize::A2 => (420.0, 594.0),
            PageSize::A3 => (297.0, 420.0),
            PageSize::A4 => (210.0, 297.0),
        };
        PageGeometry::new(w_mm * MM, h_mm * MM)
    }

    /// Dimensions matched to the source page's orientation: a
    /// landscape source gets the landscape variant of the nominal
    /// size.
    pub fn oriented_for(self, source: PageGeometry) -> PageGeometry {
        let nominal = self.portrait();
        if source.is_landscape() {
            PageGeometry::new(nominal.height, nominal.width)
        } else {
            nominal
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a0" => Ok(PageSize::A0),
            "a1" => Ok(PageSize::A1),
            "a2" => Ok(PageSize::A2),
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            _ => Err(format!("unknown page size '{}' (expected A0-A4)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn bottom_anchor_with_zero_margins() {
        let page = PageGeometry::new(595.28, 841.89);
        let margins = Margins {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        };
        let placement = PlacementSpec {
            anchor: Anchor::Bottom,
            band_height: 0.0,
            font_size: 10.5,
        };
        let anchor = resolve(page, &margins, &placement);
        // Pre-compensation y is 0; the fixed offset lifts it ~4.25pt.
        assert!(close(anchor.y, BASELINE_OFFSET.1));
        assert!((anchor.y - 4.2519).abs() < 1e-3);
        assert!(close(anchor.x, 595.28 / 2.0 + BASELINE_OFFSET.0));
        assert_eq!(anchor.rotation, Rotation::Deg0);
    }

    #[test]
    fn left_anchor_band_and_vertical_midpoint() {
        let page = PageGeometry::new(300.0, 800.0);
        let margins = Margins::from_cm(2.0, 2.0, 2.0, 2.0);
        let placement = PlacementSpec {
            anchor: Anchor::Left,
            band_height: 1.0 * CM,
            font_size: 10.5,
        };
        let anchor = resolve(page, &margins, &placement);
        assert!(close(anchor.x - BASELINE_OFFSET.0, 1.0 * CM));
        // (800 - 2cm - 2cm)/2 + 2cm = 400.
        assert!(close(anchor.y - BASELINE_OFFSET.1, 400.0));
        assert_eq!(anchor.rotation, Rotation::Deg270);
    }

    #[test]
    fn left_and_right_share_vertical_midpoint() {
        let page = PageGeometry::new(595.28, 841.89);
        let margins = Margins::from_cm(1.0, 2.0, 3.0, 1.5);
        let mut placement = PlacementSpec {
            anchor: Anchor::Left,
            band_height: 1.75 * CM,
            font_size: 10.5,
        };
        let left = resolve(page, &margins, &placement);
        placement.anchor = Anchor::Right;
        let right = resolve(page, &margins, &placement);
        assert!(close(left.y, right.y));
        assert_eq!(left.rotation, Rotation::Deg270);
        assert_eq!(right.rotation, Rotation::Deg90);
        // x origins differ by width - 2*band.
        assert!(close(
            right.x - left.x,
            page.width - 2.0 * placement.band_height
        ));
    }

    #[test]
    fn auto_behaves_as_bottom() {
        let page = PageGeometry::new(595.28, 841.89);
        let margins = Margins::default();
        let mut placement = PlacementSpec::default();
        let auto = resolve(page, &margins, &placement);
        placement.anchor = Anchor::Bottom;
        let bottom = resolve(page, &margins, &placement);
        assert_eq!(auto, bottom);
    }

    #[test]
    fn top_anchor_measures_from_page_top() {
        let page = PageGeometry::new(595.28, 841.89);
        let margins = Margins::default();
        let placement = PlacementSpec {
            anchor: Anchor::Top,
            band_height: 1.75 * CM,
            font_size: 10.5,
        };
        let anchor = resolve(page, &margins, &placement);
        assert!(close(
            anchor.y - BASELINE_OFFSET.1,
            841.89 - 1.75 * CM
        ));
    }

    #[test]
    fn oversized_margins_are_not_clamped() {
        let page = PageGeometry::new(100.0, 100.0);
        let margins = Margins {
            top: 0.0,
            right: 300.0,
            bottom: 0.0,
            left: 0.0,
        };
        let placement = PlacementSpec {
            anchor: Anchor::Bottom,
            band_height: 0.0,
            font_size: 10.5,
        };
        let anchor = resolve(page, &margins, &placement);
        // (100 - 0 - 300)/2 = -100; out-of-page is accepted.
        assert!(anchor.x - BASELINE_OFFSET.0 < 0.0);
    }

    #[test]
    fn centered_shifts_half_text_width() {
        let anchor = ResolvedAnchor {
            x: 100.0,
            y: 50.0,
            rotation: Rotation::Deg0,
        };
        let shifted = anchor.centered(20.0);
        assert!(close(shifted.x, 90.0));
        assert!(close(shifted.y, 50.0));
    }

    #[test]
    fn resolve_is_deterministic() {
        let page = PageGeometry::new(595.28, 841.89);
        let margins = Margins::default();
        let placement = PlacementSpec::default();
        let a = resolve(page, &margins, &placement);
        let b = resolve(page, &margins, &placement);
        assert_eq!(a, b);
    }

    #[test]
    fn a4_portrait_dimensions() {
        let a4 = PageSize::A4.portrait();
        assert!((a4.width - 595.28).abs() < 0.01);
        assert!((a4.height - 841.89).abs() < 0.01);
    }

    #[test]
    fn nominal_size_follows_source_orientation() {
        let landscape_src = PageGeometry::new(800.0, 300.0);
        let page = PageSize::A4.oriented_for(landscape_src);
        assert!(page.is_landscape());

        let portrait_src = PageGeometry::new(300.0, 800.0);
        let page = PageSize::A4.oriented_for(portrait_src);
        assert!(!page.is_landscape());
    }

    #[test]
    fn parse_anchor_and_page_size() {
        assert_eq!("bottom".parse::<Anchor>().unwrap(), Anchor::Bottom);
        assert_eq!("AUTO".parse::<Anchor>().unwrap(), Anchor::Auto);
        assert!("middle".parse::<Anchor>().is_err());
        assert_eq!("a3".parse::<PageSize>().unwrap(), PageSize::A3);
        assert!("letter".parse::<PageSize>().is_err());
    }
}
