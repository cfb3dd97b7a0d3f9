use std::collections::BTreeMap;

use kurbo::{BezPath, CubicBez, PathEl, Point};
use write_fonts::{
    tables::{
        cmap::Cmap,
        glyf::{GlyfLocaBuilder, Glyph, SimpleGlyph},
        head::Head,
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        loca::LocaFormat,
        maxp::Maxp,
        name::{Name, NameRecord},
        os2::{Os2, SelectionFlags},
        post::Post,
    },
    types::{FWord, Fixed, GlyphId, LongDateTime, NameId, Tag, UfWord},
    FontBuilder,
};

use crate::{
    font::{Font, FontGlyph},
    Glyphs2FontError,
};

/// Maximum distance between a cubic and its quadratic approximation, in
/// font units.
const CUBIC_TO_QUAD_ACCURACY: f64 = 0.3;
/// Seconds between the TrueType epoch (1904) and the Unix epoch.
const SECONDS_1904_TO_1970: i64 = 2_082_844_800;
const VERSION_STRING: &str = "Version 1.0";

/// One glyph ready for the `glyf` table.
struct CompiledGlyph {
    name: String,
    advance: u16,
    glyph: Glyph,
    /// (x_min, y_min, x_max, y_max) over all points.
    bbox: Option<(i16, i16, i16, i16)>,
    points: u16,
    contours: u16,
}

impl CompiledGlyph {
    fn new(name: &str, advance: f64, outline: &BezPath) -> Result<Self, Glyphs2FontError> {
        let quadratic = to_rounded_quadratic(outline);
        let advance = clamp_u16(advance);
        if quadratic.elements().is_empty() {
            return Ok(CompiledGlyph {
                name: name.to_string(),
                advance,
                glyph: Glyph::Empty,
                bbox: None,
                points: 0,
                contours: 0,
            });
        }
        let simple =
            SimpleGlyph::from_bezpath(&quadratic).map_err(|e| Glyphs2FontError::Outline {
                glyph: name.to_string(),
                reason: format!("{:?}", e),
            })?;
        let (points, contours) = count_points(&quadratic);
        Ok(CompiledGlyph {
            name: name.to_string(),
            advance,
            glyph: Glyph::Simple(simple),
            bbox: control_box(&quadratic),
            points,
            contours,
        })
    }

    fn left_side_bearing(&self) -> i16 {
        self.bbox.map(|b| b.0).unwrap_or(0)
    }
}

fn clamp_u16(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

fn clamp_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Replaces cubic segments by quadratic approximations and rounds every
/// point to the integer grid.
fn to_rounded_quadratic(path: &BezPath) -> BezPath {
    let round = |p: Point| Point::new(p.x.round(), p.y.round());
    let mut out = BezPath::new();
    let mut current = Point::ZERO;
    let mut start = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.move_to(round(p));
                current = p;
                start = p;
            }
            PathEl::LineTo(p) => {
                out.line_to(round(p));
                current = p;
            }
            PathEl::QuadTo(p1, p2) => {
                out.quad_to(round(p1), round(p2));
                current = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                let cubic = CubicBez::new(current, p1, p2, p3);
                for (_, _, quad) in cubic.to_quads(CUBIC_TO_QUAD_ACCURACY) {
                    out.quad_to(round(quad.p1), round(quad.p2));
                }
                current = p3;
            }
            PathEl::ClosePath => {
                out.close_path();
                current = start;
            }
        }
    }
    out
}

fn control_box(path: &BezPath) -> Option<(i16, i16, i16, i16)> {
    let mut points = path.elements().iter().flat_map(|el| match *el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => vec![p],
        PathEl::QuadTo(p1, p2) => vec![p1, p2],
        PathEl::CurveTo(p1, p2, p3) => vec![p1, p2, p3],
        PathEl::ClosePath => vec![],
    });
    let first = points.next()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some((clamp_i16(x0), clamp_i16(y0), clamp_i16(x1), clamp_i16(y1)))
}

/// Upper bound of the (points, contours) a path turns into.
fn count_points(path: &BezPath) -> (u16, u16) {
    let mut points = 0usize;
    let mut contours = 0usize;
    for el in path.elements() {
        match el {
            PathEl::MoveTo(_) => {
                points += 1;
                contours += 1;
            }
            PathEl::LineTo(_) => points += 1,
            PathEl::QuadTo(..) => points += 2,
            PathEl::CurveTo(..) => points += 3,
            PathEl::ClosePath => {}
        }
    }
    (
        points.min(u16::MAX as usize) as u16,
        contours.min(u16::MAX as usize) as u16,
    )
}

fn unicode_ranges(font: &Font) -> (u32, u32) {
    let mut range_1 = 0u32;
    let mut range_2 = 0u32;
    for (c, _) in font.mappings() {
        match c as u32 {
            0x0000..=0x007F => range_1 |= 1,
            0x0080..=0x00FF => range_1 |= 1 << 1,
            // Bit 60: Private Use Area (plane 0)
            0xE000..=0xF8FF => range_2 |= 1 << (60 - 32),
            _ => {}
        }
    }
    (range_1, range_2)
}

fn name_table(font: &Font) -> Name {
    let family = font.family_name.clone();
    let entries = [
        (NameId::FAMILY_NAME, family.clone()),
        (NameId::SUBFAMILY_NAME, "Regular".to_string()),
        (NameId::UNIQUE_ID, format!("{}:{}", family, VERSION_STRING)),
        (NameId::FULL_NAME, family.clone()),
        (NameId::VERSION_STRING, VERSION_STRING.to_string()),
        (NameId::POSTSCRIPT_NAME, font.postscript_name()),
        (
            NameId::DESCRIPTION,
            concat!("Generated by glyphs2font ", env!("CARGO_PKG_VERSION")).to_string(),
        ),
    ];
    let records: Vec<NameRecord> = entries
        .into_iter()
        .map(|(name_id, value)| NameRecord::new(3, 1, 0x409, name_id, value.into()))
        .collect();
    Name::new(records.into_iter().collect())
}

/// Compiles a parsed SVG font into a TrueType binary.
pub fn compile(font: &Font) -> Result<Vec<u8>, Glyphs2FontError> {
    let upm = font.units_per_em.round();
    if !(16.0..=16384.0).contains(&upm) {
        log::warn!(
            "Units per em {} is outside the TrueType range 16..16384; set font.height to fix",
            upm
        );
    }

    let mut glyphs = vec![CompiledGlyph::new(
        ".notdef",
        font.missing_glyph_advance,
        &BezPath::new(),
    )?];
    for glyph in font.glyphs.iter() {
        glyphs.push(compile_glyph(glyph)?);
    }
    let num_glyphs = u16::try_from(glyphs.len()).map_err(|_| {
        Glyphs2FontError::FontBuild(format!("too many glyphs: {}", glyphs.len()))
    })?;

    let mut glyf_builder = GlyfLocaBuilder::new();
    for glyph in &glyphs {
        glyf_builder
            .add_glyph(&glyph.glyph)
            .map_err(|e| Glyphs2FontError::FontBuild(format!("glyph {}: {}", glyph.name, e)))?;
    }
    let (glyf, loca, loca_format) = glyf_builder.build();

    let boxes: Vec<(i16, i16, i16, i16)> = glyphs.iter().filter_map(|g| g.bbox).collect();
    let (x_min, y_min, x_max, y_max) = boxes
        .iter()
        .copied()
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
        .unwrap_or((0, 0, 0, 0));
    let advance_width_max = glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
    let inked: Vec<&CompiledGlyph> = glyphs.iter().filter(|g| g.bbox.is_some()).collect();
    let min_lsb = inked.iter().map(|g| g.left_side_bearing()).min().unwrap_or(0);
    let min_rsb = inked
        .iter()
        .filter_map(|g| g.bbox.map(|b| g.advance as i32 - b.2 as i32))
        .min()
        .unwrap_or(0);
    let x_max_extent = inked.iter().filter_map(|g| g.bbox.map(|b| b.2)).max().unwrap_or(0);
    let ascender = clamp_i16(font.ascent);
    let descender = clamp_i16(font.descent);

    let now = chrono::Utc::now().timestamp() + SECONDS_1904_TO_1970;
    let head = Head {
        font_revision: Fixed::from_f64(1.0),
        units_per_em: upm.clamp(1.0, u16::MAX as f64) as u16,
        created: LongDateTime::new(now),
        modified: LongDateTime::new(now),
        x_min,
        y_min,
        x_max,
        y_max,
        lowest_rec_ppem: 8,
        font_direction_hint: 2,
        index_to_loc_format: match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
        ..Default::default()
    };

    let hhea = Hhea {
        ascender: FWord::new(ascender),
        descender: FWord::new(descender),
        line_gap: FWord::new(0),
        advance_width_max: UfWord::new(advance_width_max),
        min_left_side_bearing: FWord::new(min_lsb),
        min_right_side_bearing: FWord::new(clamp_i16(min_rsb as f64)),
        x_max_extent: FWord::new(x_max_extent),
        caret_slope_rise: 1,
        caret_slope_run: 0,
        caret_offset: 0,
        number_of_h_metrics: num_glyphs,
        ..Default::default()
    };

    let hmtx = Hmtx::new(
        glyphs
            .iter()
            .map(|g| LongMetric::new(g.advance, g.left_side_bearing()))
            .collect(),
        vec![],
    );

    let maxp = Maxp {
        num_glyphs,
        max_points: Some(glyphs.iter().map(|g| g.points).max().unwrap_or(0)),
        max_contours: Some(glyphs.iter().map(|g| g.contours).max().unwrap_or(0)),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(2),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
        ..Default::default()
    };

    let codepoints: Vec<u32> = font.mappings().map(|(c, _)| c as u32).collect();
    let first_char = codepoints.iter().copied().min().unwrap_or(0).min(0xFFFF) as u16;
    let last_char = codepoints.iter().copied().max().unwrap_or(0).min(0xFFFF) as u16;
    let advances: Vec<u16> = glyphs.iter().map(|g| g.advance).filter(|a| *a > 0).collect();
    let avg_width = if advances.is_empty() {
        0
    } else {
        advances.iter().map(|a| *a as u32).sum::<u32>() / advances.len() as u32
    };
    let (unicode_range_1, unicode_range_2) = unicode_ranges(font);
    let scaled = |factor: f64| clamp_i16(upm * factor);
    let os2 = Os2 {
        x_avg_char_width: avg_width.min(i16::MAX as u32) as i16,
        us_weight_class: 400,
        us_width_class: 5,
        fs_type: 0,
        y_subscript_x_size: scaled(0.65),
        y_subscript_y_size: scaled(0.6),
        y_subscript_x_offset: 0,
        y_subscript_y_offset: scaled(0.075),
        y_superscript_x_size: scaled(0.65),
        y_superscript_y_size: scaled(0.6),
        y_superscript_x_offset: 0,
        y_superscript_y_offset: scaled(0.35),
        y_strikeout_size: scaled(0.05),
        y_strikeout_position: scaled(0.25),
        ul_unicode_range_1: unicode_range_1,
        ul_unicode_range_2: unicode_range_2,
        ach_vend_id: Tag::new(b"PfEd"),
        fs_selection: SelectionFlags::REGULAR,
        us_first_char_index: first_char,
        us_last_char_index: last_char,
        s_typo_ascender: ascender,
        s_typo_descender: descender,
        s_typo_line_gap: 0,
        us_win_ascent: clamp_u16(font.ascent.max(y_max as f64)),
        us_win_descent: clamp_u16((-font.descent).max(-(y_min as f64))),
        ul_code_page_range_1: Some(1),
        ul_code_page_range_2: Some(0),
        sx_height: Some(0),
        s_cap_height: Some(0),
        us_default_char: Some(0),
        us_break_char: Some(32),
        us_max_context: Some(0),
        ..Default::default()
    };

    let post = Post::new_v2(glyphs.iter().map(|g| g.name.as_str()));

    // Several glyphs may claim one code point; the first one wins.
    let mut mappings: BTreeMap<char, GlyphId> = BTreeMap::new();
    for (c, gid) in font.mappings() {
        mappings.entry(c).or_insert(GlyphId::new(gid));
    }
    let cmap = Cmap::from_mappings(mappings)
        .map_err(|e| Glyphs2FontError::FontBuild(format!("cmap: {}", e)))?;

    let mut builder = FontBuilder::new();
    builder.add_table(&head)?;
    builder.add_table(&hhea)?;
    builder.add_table(&maxp)?;
    builder.add_table(&os2)?;
    builder.add_table(&hmtx)?;
    builder.add_table(&cmap)?;
    builder.add_table(&loca)?;
    builder.add_table(&glyf)?;
    builder.add_table(&name_table(font))?;
    builder.add_table(&post)?;
    log::debug!(
        "Compiled {} glyphs into TrueType, units per em {}",
        num_glyphs,
        upm
    );
    Ok(builder.build())
}

fn compile_glyph(glyph: &FontGlyph) -> Result<CompiledGlyph, Glyphs2FontError> {
    CompiledGlyph::new(&glyph.name, glyph.advance, &glyph.outline)
}
