use kurbo::{Affine, BezPath, PathEl, Point, Shape as _};
use roxmltree::ParsingOptions;

use crate::{
    config::{FontConfig, DEFAULT_ROUND},
    font::{Font, FontGlyph, GlyphList},
    glyph::SourceGlyph,
    Glyphs2FontError,
};

/// Outline used to pad fonts that would otherwise hold a single glyph.
pub const EMPTY_GLYPH_SVG: &str = include_str!("../../resources/empty-glyph.svg");
/// First placeholder code point; later ones count downwards.
pub const PLACEHOLDER_START: u32 = 0xF8FF;
/// Font height used when neither the config nor any glyph provides one.
pub const DEFAULT_FONT_HEIGHT: f64 = 1000.0;

/// Knobs controlling how glyphs are scaled and placed in the font.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub font_name: String,
    pub normalize: bool,
    pub center_horizontally: bool,
    pub round: f64,
    pub font_height: Option<f64>,
    pub descent: f64,
    pub fixed_width: bool,
}

impl AssemblyOptions {
    pub fn new(font_name: impl Into<String>) -> Self {
        AssemblyOptions {
            font_name: font_name.into(),
            normalize: false,
            center_horizontally: false,
            round: DEFAULT_ROUND,
            font_height: None,
            descent: 0.0,
            fixed_width: false,
        }
    }
}

impl From<&FontConfig> for AssemblyOptions {
    fn from(config: &FontConfig) -> Self {
        AssemblyOptions {
            font_name: config.name.clone(),
            normalize: config.normalize,
            center_horizontally: config.center,
            round: config.round,
            font_height: config.height,
            descent: config.descent,
            fixed_width: config.fixedwidth,
        }
    }
}

/// Collects source glyphs, in order, and composes them into one SVG font.
#[derive(Debug, Clone)]
pub struct SvgFontAssembler {
    options: AssemblyOptions,
    glyphs: Vec<SourceGlyph>,
}

impl SvgFontAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        SvgFontAssembler {
            options,
            glyphs: vec![],
        }
    }

    pub fn add_glyph(&mut self, glyph: SourceGlyph) {
        log::debug!("Adding glyph {} {:?}", glyph.name, glyph.codepoints);
        self.glyphs.push(glyph);
    }

    /// Blink silently rejects fonts with a single glyph, so a font with
    /// `n <= 1` glyphs gets `n + 1` empty placeholders named `EMPTY<i>`
    /// at code points counting down from U+F8FF.
    pub fn pad_to_minimum(&mut self) -> Result<(), Glyphs2FontError> {
        let count = self.glyphs.len();
        if count > 1 {
            return Ok(());
        }
        for i in 0..=count {
            let code = PLACEHOLDER_START - i as u32;
            let character = char::from_u32(code).ok_or_else(|| {
                Glyphs2FontError::FontBuild(format!("bad placeholder code point {:#X}", code))
            })?;
            let placeholder =
                SourceGlyph::from_svg_str(EMPTY_GLYPH_SVG, format!("EMPTY{}", i), vec![character])
                    .map_err(|reason| Glyphs2FontError::GlyphSource {
                        path: "resources/empty-glyph.svg".into(),
                        reason,
                    })?;
            self.add_glyph(placeholder);
        }
        Ok(())
    }

    /// Scales, flips and places every glyph in font units.
    pub fn compose(&self) -> Result<Font, Glyphs2FontError> {
        let options = &self.options;
        let max_height = self.glyphs.iter().map(|g| g.height).fold(0.0, f64::max);
        let max_width = self.glyphs.iter().map(|g| g.width).fold(0.0, f64::max);
        let font_height = options.font_height.unwrap_or(if max_height > 0.0 {
            max_height
        } else {
            DEFAULT_FONT_HEIGHT
        });
        let font_width = if options.normalize {
            self.glyphs
                .iter()
                .filter(|g| g.height > 0.0)
                .map(|g| g.width * font_height / g.height)
                .fold(0.0, f64::max)
        } else if options.font_height.is_some() && max_height > 0.0 {
            max_width * font_height / max_height
        } else {
            max_width
        };
        let descent = options.descent;

        let mut font = Font::new(options.font_name.clone());
        font.units_per_em = font_height;
        font.ascent = font_height - descent;
        font.descent = -descent;
        font.default_advance = round_value(font_width, options.round);

        for glyph in &self.glyphs {
            let ratio = if glyph.height <= 0.0 {
                1.0
            } else if options.normalize {
                font_height / glyph.height
            } else if max_height > 0.0 {
                font_height / max_height
            } else {
                1.0
            };
            if !ratio.is_finite() {
                return Err(Glyphs2FontError::Outline {
                    glyph: glyph.name.clone(),
                    reason: "cannot scale glyph to the font height".to_string(),
                });
            }
            let height = glyph.height * ratio;
            let advance = if options.fixed_width {
                font_width
            } else {
                glyph.width * ratio
            };

            let mut outline = glyph.outline.clone();
            // Scale, then mirror so that SVG y=0 lands on the ascent.
            outline.apply_affine(Affine::new([ratio, 0.0, 0.0, -ratio, 0.0, height - descent]));
            if options.center_horizontally && !outline.elements().is_empty() {
                let bounds = outline.bounding_box();
                let dx = (advance - bounds.width()) / 2.0 - bounds.x0;
                outline.apply_affine(Affine::translate((dx, 0.0)));
            }

            font.glyphs.push(FontGlyph {
                name: glyph.name.clone(),
                codepoints: glyph.codepoints.clone(),
                advance: round_value(advance, options.round),
                outline: round_path(&outline, options.round),
            });
        }
        Ok(font)
    }

    /// Composes the glyphs and serializes them as an SVG font document.
    pub fn finish(&self) -> Result<String, Glyphs2FontError> {
        Ok(to_svg(&self.compose()?))
    }
}

fn round_value(value: f64, precision: f64) -> f64 {
    let rounded = (value * precision).round() / precision;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn round_path(path: &BezPath, precision: f64) -> BezPath {
    let r = |p: Point| Point::new(round_value(p.x, precision), round_value(p.y, precision));
    BezPath::from_vec(
        path.elements()
            .iter()
            .map(|el| match *el {
                PathEl::MoveTo(p) => PathEl::MoveTo(r(p)),
                PathEl::LineTo(p) => PathEl::LineTo(r(p)),
                PathEl::QuadTo(p1, p2) => PathEl::QuadTo(r(p1), r(p2)),
                PathEl::CurveTo(p1, p2, p3) => PathEl::CurveTo(r(p1), r(p2), r(p3)),
                PathEl::ClosePath => PathEl::ClosePath,
            })
            .collect(),
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes a font as an SVG 1.1 font document.
pub fn to_svg(font: &Font) -> String {
    let name = escape_xml(&font.family_name);
    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" standalone=\"no\"?>\n");
    svg.push_str("<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\" >\n");
    svg.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\">\n");
    svg.push_str("<defs>\n");
    svg.push_str(&format!(
        "  <font id=\"{}\" horiz-adv-x=\"{}\">\n",
        name, font.default_advance
    ));
    svg.push_str(&format!(
        "    <font-face font-family=\"{}\"\n      units-per-em=\"{}\" ascent=\"{}\"\n      descent=\"{}\" />\n",
        name,
        font.units_per_em,
        font.ascent,
        round_value(font.descent, DEFAULT_ROUND)
    ));
    svg.push_str(&format!(
        "    <missing-glyph horiz-adv-x=\"{}\" />\n",
        font.missing_glyph_advance
    ));
    for glyph in font.glyphs.iter() {
        let unicode: String = glyph
            .codepoints
            .iter()
            .map(|c| format!("&#x{:X};", *c as u32))
            .collect();
        let d = if glyph.is_empty() {
            String::new()
        } else {
            format!(" d=\"{}\"", glyph.outline.to_svg())
        };
        svg.push_str(&format!(
            "    <glyph glyph-name=\"{}\"\n      unicode=\"{}\"\n      horiz-adv-x=\"{}\"{} />\n",
            escape_xml(&glyph.name),
            unicode,
            glyph.advance,
            d
        ));
    }
    svg.push_str("  </font>\n");
    svg.push_str("</defs>\n");
    svg.push_str("</svg>\n");
    svg
}

fn number_attribute(
    node: roxmltree::Node<'_, '_>,
    attribute: &str,
) -> Result<Option<f64>, Glyphs2FontError> {
    node.attribute(attribute)
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| {
                Glyphs2FontError::SvgFont(format!(
                    "<{}> has a non-numeric {}: {:?}",
                    node.tag_name().name(),
                    attribute,
                    v
                ))
            })
        })
        .transpose()
}

/// Reads an SVG font document back into a [`Font`].
pub fn parse(svg: &str) -> Result<Font, Glyphs2FontError> {
    let doc = roxmltree::Document::parse_with_options(
        svg,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
    .map_err(|e| Glyphs2FontError::SvgFont(e.to_string()))?;
    let font_el = doc
        .descendants()
        .find(|n| n.has_tag_name("font"))
        .ok_or_else(|| Glyphs2FontError::SvgFont("no <font> element".to_string()))?;
    let face = font_el.children().find(|n| n.has_tag_name("font-face"));

    let family_name = face
        .and_then(|f| f.attribute("font-family"))
        .or_else(|| font_el.attribute("id"))
        .unwrap_or("Untitled");
    let mut font = Font::new(family_name);
    font.default_advance = number_attribute(font_el, "horiz-adv-x")?.unwrap_or(0.0);
    if let Some(face) = face {
        font.units_per_em = number_attribute(face, "units-per-em")?.unwrap_or(1000.0);
        font.descent = number_attribute(face, "descent")?.unwrap_or(0.0);
        font.ascent = number_attribute(face, "ascent")?.unwrap_or(font.units_per_em + font.descent);
    } else {
        font.ascent = font.units_per_em;
    }
    if let Some(missing) = font_el.children().find(|n| n.has_tag_name("missing-glyph")) {
        font.missing_glyph_advance =
            number_attribute(missing, "horiz-adv-x")?.unwrap_or(font.default_advance);
    }

    let mut glyphs = GlyphList::default();
    for (ix, node) in font_el
        .children()
        .filter(|n| n.has_tag_name("glyph"))
        .enumerate()
    {
        let name = node
            .attribute("glyph-name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("glyph{}", ix));
        let unicode: Vec<char> = node.attribute("unicode").unwrap_or("").chars().collect();
        let codepoints = if unicode.len() > 1 {
            log::warn!(
                "Glyph {} maps a character sequence; ligatures are not supported",
                name
            );
            vec![]
        } else {
            unicode
        };
        let outline = match node.attribute("d").map(str::trim) {
            Some(d) if !d.is_empty() => BezPath::from_svg(d).map_err(|e| {
                Glyphs2FontError::Outline {
                    glyph: name.clone(),
                    reason: e.to_string(),
                }
            })?,
            _ => BezPath::new(),
        };
        glyphs.push(FontGlyph {
            advance: number_attribute(node, "horiz-adv-x")?.unwrap_or(font.default_advance),
            name,
            codepoints,
            outline,
        });
    }
    font.glyphs = glyphs;
    Ok(font)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kurbo::Shape as _;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn square(name: &str, code: char, size: f64) -> SourceGlyph {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {s} {s}"><rect width="{h}" height="{h}"/></svg>"#,
            s = size,
            h = size / 2.0
        );
        SourceGlyph::from_svg_str(&svg, name, vec![code]).unwrap()
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 3)]
    #[case(2, 2)]
    #[case(5, 5)]
    fn test_minimum_glyph_padding(#[case] configured: usize, #[case] expected: usize) {
        let mut assembler = SvgFontAssembler::new(AssemblyOptions::new("Pad"));
        for i in 0..configured {
            assembler.add_glyph(square(&format!("g{}", i), 'a', 24.0));
        }
        assembler.pad_to_minimum().unwrap();
        assert_eq!(assembler.compose().unwrap().glyphs.len(), expected);
    }

    #[test]
    fn test_placeholders_count_down_from_private_use_end() {
        let mut assembler = SvgFontAssembler::new(AssemblyOptions::new("Pad"));
        assembler.add_glyph(square("only", '\u{E001}', 24.0));
        assembler.pad_to_minimum().unwrap();
        let font = assembler.compose().unwrap();
        let summary: Vec<(String, Vec<char>)> = font
            .glyphs
            .iter()
            .map(|g| (g.name.clone(), g.codepoints.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("only".to_string(), vec!['\u{E001}']),
                ("EMPTY0".to_string(), vec!['\u{F8FF}']),
                ("EMPTY1".to_string(), vec!['\u{F8FE}']),
            ]
        );
        assert!(font.glyphs[1].is_empty());
        assert!(!to_svg(&font).contains("d=\"\""));
    }

    #[test]
    fn test_flip_and_metrics() {
        let mut options = AssemblyOptions::new("Flip");
        options.descent = 4.0;
        let mut assembler = SvgFontAssembler::new(options);
        assembler.add_glyph(square("sq", 'a', 24.0));
        let font = assembler.compose().unwrap();
        assert_eq!(font.units_per_em, 24.0);
        assert_eq!(font.ascent, 20.0);
        assert_eq!(font.descent, -4.0);
        // The 12x12 square at the SVG top-left ends up just below the ascent.
        let bounds = font.glyphs[0].outline.bounding_box();
        assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (0.0, 8.0, 12.0, 20.0));
        assert_eq!(font.glyphs[0].advance, 24.0);
    }

    #[test]
    fn test_normalize_and_fixed_width() {
        let mut options = AssemblyOptions::new("Norm");
        options.normalize = true;
        options.font_height = Some(1000.0);
        options.fixed_width = true;
        let mut assembler = SvgFontAssembler::new(options);
        assembler.add_glyph(square("small", 'a', 10.0));
        let wide = SourceGlyph::from_svg_str(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20"><rect width="40" height="20"/></svg>"#,
            "wide",
            vec!['b'],
        )
        .unwrap();
        assembler.add_glyph(wide);
        let font = assembler.compose().unwrap();
        assert_eq!(font.units_per_em, 1000.0);
        assert_eq!(font.default_advance, 2000.0);
        assert!(font.glyphs.iter().all(|g| g.advance == 2000.0));
        let small = font.glyphs[0].outline.bounding_box();
        assert_eq!(small.width(), 500.0);
    }

    #[test]
    fn test_center_horizontally() {
        let mut options = AssemblyOptions::new("Center");
        options.center_horizontally = true;
        let mut assembler = SvgFontAssembler::new(options);
        assembler.add_glyph(square("sq", 'a', 24.0));
        let font = assembler.compose().unwrap();
        let bounds = font.glyphs[0].outline.bounding_box();
        assert_eq!((bounds.x0, bounds.x1), (6.0, 18.0));
    }

    #[test]
    fn test_rounding() {
        let mut options = AssemblyOptions::new("Round");
        options.round = 1.0;
        options.font_height = Some(100.0);
        let mut assembler = SvgFontAssembler::new(options);
        assembler.add_glyph(square("sq", 'a', 30.0));
        let font = assembler.compose().unwrap();
        let bounds = font.glyphs[0].outline.bounding_box();
        // 15 * 100/30 = 50, exact; the advance 100 too.
        assert_eq!((bounds.x1, bounds.y0), (50.0, 50.0));
        assert_eq!(font.glyphs[0].advance, 100.0);
    }

    #[test]
    fn test_svg_document_round_trip() {
        let mut assembler = SvgFontAssembler::new(AssemblyOptions::new("Tom & \"Jerry\""));
        assembler.add_glyph(square("home", '\u{E001}', 24.0));
        assembler.add_glyph(square("star", '\u{E002}', 24.0));
        let svg = assembler.finish().unwrap();
        assert!(svg.contains("font-family=\"Tom &amp; &quot;Jerry&quot;\""));
        assert!(svg.contains("unicode=\"&#xE001;\""));

        let font = parse(&svg).unwrap();
        assert_eq!(font.family_name, "Tom & \"Jerry\"");
        assert_eq!(font.units_per_em, 24.0);
        assert_eq!(font.ascent, 24.0);
        assert_eq!(font.descent, 0.0);
        assert_eq!(font.glyphs.len(), 2);
        assert_eq!(font.glyphs[1].name, "star");
        assert_eq!(font.glyphs[1].codepoints, vec!['\u{E002}']);
        assert_eq!(font.glyphs[0].advance, 24.0);
        assert!(!font.glyphs[0].is_empty());
    }

    #[test]
    fn test_parse_defaults_and_errors() {
        let font = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><font horiz-adv-x="500">
                <font-face units-per-em="1000" descent="-200"/>
                <glyph unicode="x"/>
            </font></svg>"#,
        )
        .unwrap();
        assert_eq!(font.ascent, 800.0);
        assert_eq!(font.glyphs[0].name, "glyph0");
        assert_eq!(font.glyphs[0].advance, 500.0);
        assert!(font.glyphs[0].is_empty());

        assert!(matches!(
            parse("<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            Err(Glyphs2FontError::SvgFont(_))
        ));
        assert!(matches!(
            parse("<svg><font horiz-adv-x=\"wide\"/></svg>"),
            Err(Glyphs2FontError::SvgFont(_))
        ));
    }
}
