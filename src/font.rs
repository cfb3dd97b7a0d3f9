use kurbo::BezPath;
use std::ops::{Deref, DerefMut};

/// A glyph of an assembled font: outline in font units, y up.
#[derive(Debug, Clone)]
pub struct FontGlyph {
    pub name: String,
    pub codepoints: Vec<char>,
    pub advance: f64,
    pub outline: BezPath,
}

impl FontGlyph {
    pub fn is_empty(&self) -> bool {
        self.outline.elements().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlyphList(pub Vec<FontGlyph>);
impl GlyphList {
    pub fn iter(&self) -> std::slice::Iter<'_, FontGlyph> {
        self.0.iter()
    }
}

impl Deref for GlyphList {
    type Target = Vec<FontGlyph>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl DerefMut for GlyphList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// An SVG font, as read back from the assembled document.
#[derive(Debug, Clone)]
pub struct Font {
    pub family_name: String,
    pub units_per_em: f64,
    pub ascent: f64,
    /// Negative below the baseline, as in the `font-face` element.
    pub descent: f64,
    /// The `horiz-adv-x` of the `font` element, used by glyphs without one.
    pub default_advance: f64,
    pub missing_glyph_advance: f64,
    pub glyphs: GlyphList,
}

impl Font {
    pub fn new(family_name: impl Into<String>) -> Self {
        Font {
            family_name: family_name.into(),
            units_per_em: 1000.0,
            ascent: 1000.0,
            descent: 0.0,
            default_advance: 0.0,
            missing_glyph_advance: 0.0,
            glyphs: GlyphList::default(),
        }
    }

    /// Every (code point, glyph index) pair, with glyph indices counted
    /// after `.notdef`.
    pub fn mappings(&self) -> impl Iterator<Item = (char, u32)> + '_ {
        self.glyphs.iter().enumerate().flat_map(|(ix, glyph)| {
            glyph
                .codepoints
                .iter()
                .map(move |c| (*c, ix as u32 + 1))
        })
    }

    /// The PostScript name: the family name without spaces and with only
    /// printable ASCII characters.
    pub fn postscript_name(&self) -> String {
        let name: String = self
            .family_name
            .chars()
            .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%".contains(*c))
            .take(63)
            .collect();
        if name.is_empty() {
            "Untitled".to_string()
        } else {
            name
        }
    }
}
