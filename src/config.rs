use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::Glyphs2FontError;

pub(crate) const DEFAULT_PREFIX: &str = "icon";
/// Rounding multiplier applied to outline coordinates: `round(v * r) / r`.
pub const DEFAULT_ROUND: f64 = 10e12;

/// The whole configuration file: font settings plus the ordered glyph list.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub font: FontConfig,
    #[serde(default)]
    pub glyphs: Vec<GlyphSpec>,
}

/// Font metadata, generation knobs and output locations.
///
/// Output paths are written relative to the configuration file's directory
/// (or absolute). `svg` and `ttf` fall back to scratch files when absent;
/// every other output is simply skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct FontConfig {
    pub name: String,
    /// Scale every glyph to the font height individually.
    #[serde(default)]
    pub normalize: bool,
    /// Center each outline horizontally inside its advance width.
    #[serde(default)]
    pub center: bool,
    #[serde(
        default = "default_round",
        deserialize_with = "crate::serde_helpers::number_or_string"
    )]
    pub round: f64,
    /// Units per em. Defaults to the height of the tallest glyph.
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub descent: f64,
    /// Give every glyph the advance width of the widest one.
    #[serde(default)]
    pub fixedwidth: bool,
    #[serde(default)]
    pub svg: Option<PathBuf>,
    #[serde(default)]
    pub ttf: Option<PathBuf>,
    #[serde(default)]
    pub eot: Option<PathBuf>,
    #[serde(default)]
    pub woff: Option<PathBuf>,
    #[serde(default)]
    pub css: Option<PathBuf>,
    #[serde(default)]
    pub html: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_round() -> f64 {
    DEFAULT_ROUND
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlyphSpec {
    pub name: String,
    pub code: u32,
    pub glyph: PathBuf,
}

/// The `Char` production of XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

const CONFIG_KEYS: &[&str] = &["font", "glyphs"];
const FONT_KEYS: &[&str] = &[
    "name",
    "normalize",
    "center",
    "round",
    "height",
    "descent",
    "fixedwidth",
    "svg",
    "ttf",
    "eot",
    "woff",
    "css",
    "html",
    "prefix",
];
const GLYPH_KEYS: &[&str] = &["name", "code", "glyph"];

fn warn_unknown_keys(value: &serde_yaml::Value, known: &[&str], context: &str) -> usize {
    let Some(mapping) = value.as_mapping() else {
        return 0;
    };
    let mut unknown = 0;
    for key in mapping.keys() {
        match key.as_str() {
            Some(k) if known.contains(&k) => {}
            Some(k) => {
                log::warn!("Ignoring unknown key {:?} in {}", k, context);
                unknown += 1;
            }
            None => {
                log::warn!("Ignoring non-string key in {}", context);
                unknown += 1;
            }
        }
    }
    unknown
}

/// Logs every key the configuration model does not know about, returning
/// how many there were.
fn check_unknown_keys(value: &serde_yaml::Value) -> usize {
    let mut unknown = warn_unknown_keys(value, CONFIG_KEYS, "the configuration");
    if let Some(font) = value.get("font") {
        unknown += warn_unknown_keys(font, FONT_KEYS, "font");
    }
    if let Some(glyphs) = value.get("glyphs").and_then(serde_yaml::Value::as_sequence) {
        for (index, glyph) in glyphs.iter().enumerate() {
            unknown += warn_unknown_keys(glyph, GLYPH_KEYS, &format!("glyph #{}", index));
        }
    }
    unknown
}

impl GlyphSpec {
    /// The code point as a `char`. Only fails on configs that skipped validation.
    pub fn character(&self) -> Result<char, Glyphs2FontError> {
        char::from_u32(self.code)
            .filter(|c| is_xml_char(*c))
            .ok_or_else(|| {
                Glyphs2FontError::InvalidConfig(format!(
                    "glyph {:?}: code {:#X} is not a character an SVG font can hold",
                    self.name, self.code
                ))
            })
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Glyphs2FontError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Glyphs2FontError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| Glyphs2FontError::io(path, e))?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, Glyphs2FontError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        check_unknown_keys(&value);
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no font can be built from and warns about duplicates.
    pub fn validate(&self) -> Result<(), Glyphs2FontError> {
        let font = &self.font;
        if font.name.trim().is_empty() {
            return Err(Glyphs2FontError::InvalidConfig(
                "font.name must not be empty".to_string(),
            ));
        }
        if let Some(height) = font.height {
            if !height.is_finite() || height <= 0.0 {
                return Err(Glyphs2FontError::InvalidConfig(format!(
                    "font.height must be a positive number, got {}",
                    height
                )));
            }
        }
        if !font.descent.is_finite() {
            return Err(Glyphs2FontError::InvalidConfig(
                "font.descent must be a finite number".to_string(),
            ));
        }
        if !font.round.is_finite() || font.round <= 0.0 {
            return Err(Glyphs2FontError::InvalidConfig(format!(
                "font.round must be a positive number, got {}",
                font.round
            )));
        }

        let mut names: HashMap<&str, usize> = HashMap::new();
        let mut codes: HashMap<u32, &str> = HashMap::new();
        for (index, glyph) in self.glyphs.iter().enumerate() {
            if glyph.name.is_empty() {
                return Err(Glyphs2FontError::InvalidConfig(format!(
                    "glyph #{} has an empty name",
                    index
                )));
            }
            glyph.character()?;
            if let Some(first) = names.insert(glyph.name.as_str(), index) {
                log::warn!(
                    "Glyph name {:?} is used by glyphs #{} and #{}; the CSS will contain duplicate rules",
                    glyph.name,
                    first,
                    index
                );
            }
            if let Some(other) = codes.insert(glyph.code, glyph.name.as_str()) {
                log::warn!(
                    "Code {:#X} is assigned to both {:?} and {:?}",
                    glyph.code,
                    other,
                    glyph.name
                );
            }
        }
        Ok(())
    }
}
