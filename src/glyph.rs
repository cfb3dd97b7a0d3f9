use std::path::Path;

use kurbo::{Affine, BezPath, Point};
use roxmltree::ParsingOptions;
use usvg::tiny_skia_path::PathSegment;

use crate::Glyphs2FontError;

/// One icon as read from its SVG source file.
///
/// The outline is in SVG user units with the view box origin moved to
/// (0, 0), so y grows downwards.
#[derive(Debug, Clone)]
pub struct SourceGlyph {
    pub name: String,
    pub codepoints: Vec<char>,
    pub width: f64,
    pub height: f64,
    pub outline: BezPath,
}

impl SourceGlyph {
    pub fn load(
        path: &Path,
        name: impl Into<String>,
        codepoints: Vec<char>,
    ) -> Result<Self, Glyphs2FontError> {
        let text = std::fs::read_to_string(path).map_err(|e| Glyphs2FontError::GlyphSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_svg_str(&text, name, codepoints).map_err(|reason| {
            Glyphs2FontError::GlyphSource {
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    pub fn from_svg_str(
        svg: &str,
        name: impl Into<String>,
        codepoints: Vec<char>,
    ) -> Result<Self, String> {
        let name = name.into();
        let (width, height) = declared_size(svg)?;

        // A zero-sized document draws nothing, and usvg refuses to build a tree for it.
        let outline = if width > 0.0 && height > 0.0 {
            let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
                .map_err(|e| e.to_string())?;
            // usvg maps the view box onto the document size; map it back.
            let size = tree.size();
            let to_view_box = Affine::scale_non_uniform(
                width / size.width() as f64,
                height / size.height() as f64,
            );
            let mut outline = BezPath::new();
            collect_fills(tree.root(), to_view_box, &mut outline, &name);
            outline
        } else {
            BezPath::new()
        };

        log::trace!(
            "Glyph {}: {}x{}, {} path elements",
            name,
            width,
            height,
            outline.elements().len()
        );
        Ok(SourceGlyph {
            name,
            codepoints,
            width,
            height,
            outline,
        })
    }
}

/// Size from the root `viewBox`, otherwise from `width`/`height`.
fn declared_size(svg: &str) -> Result<(f64, f64), String> {
    let doc = roxmltree::Document::parse_with_options(
        svg,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if !root.has_tag_name("svg") {
        return Err(format!(
            "root element is <{}>, not <svg>",
            root.tag_name().name()
        ));
    }
    Ok(match root.attribute("viewBox").and_then(parse_view_box) {
        Some((w, h)) => (w, h),
        None => (
            root.attribute("width").and_then(parse_length).unwrap_or(0.0),
            root.attribute("height").and_then(parse_length).unwrap_or(0.0),
        ),
    })
}

/// Appends every visible filled path below `group`, in document order.
fn collect_fills(group: &usvg::Group, to_view_box: Affine, out: &mut BezPath, glyph: &str) {
    for node in group.children() {
        match node {
            usvg::Node::Group(group) => collect_fills(group, to_view_box, out, glyph),
            usvg::Node::Path(path) => {
                if !path.is_visible() || path.fill().is_none() {
                    log::debug!("Glyph {}: skipping unfilled path {:?}", glyph, path.id());
                    continue;
                }
                let transform = to_view_box * to_affine(path.abs_transform());
                append_segments(path.data(), transform, out);
            }
            _ => log::warn!("Glyph {}: ignoring non-path content", glyph),
        }
    }
}

fn to_affine(t: usvg::Transform) -> Affine {
    Affine::new([
        t.sx as f64,
        t.ky as f64,
        t.kx as f64,
        t.sy as f64,
        t.tx as f64,
        t.ty as f64,
    ])
}

fn append_segments(data: &usvg::tiny_skia_path::Path, transform: Affine, out: &mut BezPath) {
    let point =
        |p: usvg::tiny_skia_path::Point| transform * Point::new(p.x as f64, p.y as f64);
    for segment in data.segments() {
        match segment {
            PathSegment::MoveTo(p) => out.move_to(point(p)),
            PathSegment::LineTo(p) => out.line_to(point(p)),
            PathSegment::QuadTo(p1, p2) => out.quad_to(point(p1), point(p2)),
            PathSegment::CubicTo(p1, p2, p3) => out.curve_to(point(p1), point(p2), point(p3)),
            PathSegment::Close => out.close_path(),
        }
    }
}

/// A plain or `px` length. Percentages and other units are not resolved.
fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    value.trim().parse::<f64>().ok()
}

fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let numbers: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match numbers.as_slice() {
        &[_, _, w, h] if w > 0.0 && h > 0.0 => Some((w, h)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kurbo::{PathEl, Shape as _};
    use pretty_assertions::assert_eq;

    fn glyph(svg: &str) -> SourceGlyph {
        SourceGlyph::from_svg_str(svg, "test", vec!['\u{E000}']).unwrap()
    }

    fn contours(g: &SourceGlyph) -> usize {
        g.outline
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count()
    }

    fn assert_close(actual: (f64, f64, f64, f64), expected: (f64, f64, f64, f64)) {
        let pairs = [
            (actual.0, expected.0),
            (actual.1, expected.1),
            (actual.2, expected.2),
            (actual.3, expected.3),
        ];
        for (a, e) in pairs {
            assert!((a - e).abs() < 1e-4, "{:?} != {:?}", actual, expected);
        }
    }

    fn bounds(g: &SourceGlyph) -> (f64, f64, f64, f64) {
        let b = g.outline.bounding_box();
        (b.x0, b.y0, b.x1, b.y1)
    }

    #[test]
    fn test_view_box_sets_size_and_origin() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="10 20 24 24" width="48" height="48">
                <path d="M10 20 L34 20 L34 44 Z"/>
            </svg>"#,
        );
        assert_eq!((g.width, g.height), (24.0, 24.0));
        assert_close(bounds(&g), (0.0, 0.0, 24.0, 24.0));
    }

    #[test]
    fn test_width_height_without_view_box() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="32px" height="16">
                <rect x="0" y="0" width="32" height="16"/>
            </svg>"#,
        );
        assert_eq!((g.width, g.height), (32.0, 16.0));
        assert_close(bounds(&g), (0.0, 0.0, 32.0, 16.0));
    }

    #[test]
    fn test_group_transforms_accumulate() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
                <g transform="translate(10, 10)">
                    <g transform="scale(2)">
                        <polygon points="0,0 10,0 10,10"/>
                    </g>
                </g>
            </svg>"#,
        );
        assert_close(bounds(&g), (10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn test_skips_defs_and_unfilled_shapes() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
                <defs><path id="hidden" d="M0 0 L5 5 L0 5 Z"/></defs>
                <g fill="none"><path d="M0 0 L5 0 L5 5 Z"/></g>
                <path style="display: none" d="M0 0 L1 0 L1 1 Z"/>
                <path d="M1 1 L2 1 L2 2 Z"/>
            </svg>"#,
        );
        assert_eq!(contours(&g), 1);
        assert_close(bounds(&g), (1.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn test_doctype_is_accepted() {
        let g = glyph(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10">
    <path d="M0 0 L10 0 L10 10 Z"/>
</svg>"#,
        );
        assert_eq!(contours(&g), 1);
    }

    #[test]
    fn test_use_references_are_drawn() {
        let g = glyph(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 20 20">
                <defs><path id="p" d="M0 0 L4 0 L4 4 Z"/></defs>
                <use xlink:href="#p" x="10" y="10"/>
            </svg>"##,
        );
        assert_eq!(contours(&g), 1);
        assert_close(bounds(&g), (10.0, 10.0, 14.0, 14.0));
    }

    #[test]
    fn test_stylesheet_fill_none_is_honoured() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20">
                <style>.outline { fill: none; stroke: black; }</style>
                <rect class="outline" x="0" y="0" width="20" height="20"/>
                <path d="M5 5 L15 5 L15 15 Z"/>
            </svg>"#,
        );
        assert_eq!(contours(&g), 1);
        assert_close(bounds(&g), (5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn test_compact_number_lists() {
        let g = glyph(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-20 -20 40 40">
                <polygon points="0,0 20,0 20-10 0,10"/>
            </svg>"#,
        );
        let lines = g
            .outline
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::LineTo(_)))
            .count();
        assert_eq!(lines, 3);
        assert_close(bounds(&g), (20.0, 10.0, 40.0, 30.0));
    }

    #[test]
    fn test_empty_svg_has_no_outline() {
        let g = glyph(r#"<svg xmlns="http://www.w3.org/2000/svg" width="0" height="0"/>"#);
        assert!(g.outline.elements().is_empty());
        assert_eq!((g.width, g.height), (0.0, 0.0));
    }

    #[test]
    fn test_rejects_non_svg() {
        assert!(SourceGlyph::from_svg_str("<html/>", "x", vec![]).is_err());
        assert!(SourceGlyph::from_svg_str("not xml", "x", vec![]).is_err());
    }
}
