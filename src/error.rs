use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Glyphs2FontError {
    #[error("configuration file not found: {path:?}")]
    ConfigNotFound { path: PathBuf },

    #[error("Error parsing configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read glyph source {path:?}: {reason}")]
    GlyphSource { path: PathBuf, reason: String },

    #[error("Malformed SVG font: {0}")]
    SvgFont(String),

    #[error("Glyph {glyph} has an unusable outline: {reason}")]
    Outline { glyph: String, reason: String },

    #[error("Error building font: {0}")]
    FontBuild(String),

    #[error("Error reading font: {0}")]
    FontRead(#[from] write_fonts::read::ReadError),

    #[error("Error compressing table {tag}: {source}")]
    Compression {
        tag: String,
        #[source]
        source: io::Error,
    },
}

impl Glyphs2FontError {
    /// Wraps an [`io::Error`] with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Glyphs2FontError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<write_fonts::BuilderError> for Glyphs2FontError {
    fn from(val: write_fonts::BuilderError) -> Self {
        Glyphs2FontError::FontBuild(val.to_string())
    }
}
