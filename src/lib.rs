#![deny(clippy::unwrap_used, clippy::expect_used)]
//! Turns a directory of SVG icons into an icon web font: an SVG font, a
//! TrueType font, optional EOT and WOFF wrappers, a stylesheet and a
//! preview page, all driven by one YAML configuration file.

pub mod config;
pub mod convertors;
pub mod emitters;
mod error;
mod font;
mod glyph;
pub mod paths;
pub mod pipeline;
mod serde_helpers;

pub use crate::{
    config::{Config, FontConfig, GlyphSpec},
    error::Glyphs2FontError,
    font::{Font, FontGlyph, GlyphList},
    glyph::SourceGlyph,
};
use std::path::{Path, PathBuf};

/// Runs the conversion described by the configuration file at `config_file`.
pub fn convert(config_file: impl AsRef<Path>) -> Result<Vec<PathBuf>, Glyphs2FontError> {
    pipeline::run(config_file.as_ref())
}
