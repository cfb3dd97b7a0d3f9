/// SVG font assembler and reader
pub mod svgfont;
/// TrueType compiler
pub mod ttf;
/// WOFF 1.0 wrapper
pub mod woff;
/// Embedded OpenType wrapper
pub mod eot;
