//! Wraps a TrueType binary into a WOFF 1.0 container.
//!
//! Every table is zlib-compressed and stored compressed only when that
//! actually saves space. Tables stay in tag order, each on a four-byte
//! boundary.
use std::io::Write as _;

use flate2::{write::ZlibEncoder, Compression};
use write_fonts::read::{FontRef, TableProvider};

use crate::Glyphs2FontError;

pub const WOFF_SIGNATURE: u32 = 0x774F_4646;
const HEADER_SIZE: usize = 44;
const TABLE_ENTRY_SIZE: usize = 20;
const SFNT_HEADER_SIZE: usize = 12;
const SFNT_ENTRY_SIZE: usize = 16;

struct WoffTable {
    tag: [u8; 4],
    checksum: u32,
    original_length: u32,
    data: Vec<u8>,
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn pad(buf: &mut Vec<u8>) {
    buf.resize(padded(buf.len()), 0);
}

fn compress(tag: &str, data: &[u8]) -> Result<Vec<u8>, Glyphs2FontError> {
    let wrap = |source| Glyphs2FontError::Compression {
        tag: tag.to_string(),
        source,
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(wrap)?;
    encoder.finish().map_err(wrap)
}

/// Converts a TrueType binary to WOFF.
pub fn from_ttf(ttf: &[u8]) -> Result<Vec<u8>, Glyphs2FontError> {
    let font = FontRef::new(ttf)?;
    let revision = font.head()?.font_revision().to_f64();
    let major_version = revision.trunc().clamp(0.0, u16::MAX as f64) as u16;
    let minor_version = ((revision.fract() * 1000.0).round()).clamp(0.0, u16::MAX as f64) as u16;

    let mut tables = Vec::new();
    for record in font.table_directory.table_records() {
        let tag = record.tag();
        let start = record.offset() as usize;
        let end = start + record.length() as usize;
        let original = ttf.get(start..end).ok_or_else(|| {
            Glyphs2FontError::FontBuild(format!("table {} lies outside the font data", tag))
        })?;
        let compressed = compress(&tag.to_string(), original)?;
        let data = if compressed.len() < original.len() {
            compressed
        } else {
            original.to_vec()
        };
        tables.push(WoffTable {
            tag: tag.into_bytes(),
            checksum: record.checksum(),
            original_length: original.len() as u32,
            data,
        });
    }
    tables.sort_by_key(|t| t.tag);

    let num_tables = tables.len();
    let total_sfnt_size = SFNT_HEADER_SIZE
        + SFNT_ENTRY_SIZE * num_tables
        + tables
            .iter()
            .map(|t| padded(t.original_length as usize))
            .sum::<usize>();

    let mut directory = Vec::with_capacity(TABLE_ENTRY_SIZE * num_tables);
    let mut data = Vec::new();
    let data_start = HEADER_SIZE + TABLE_ENTRY_SIZE * num_tables;
    for table in &tables {
        directory.extend_from_slice(&table.tag);
        directory.extend_from_slice(&((data_start + data.len()) as u32).to_be_bytes());
        directory.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        directory.extend_from_slice(&table.original_length.to_be_bytes());
        directory.extend_from_slice(&table.checksum.to_be_bytes());
        data.extend_from_slice(&table.data);
        pad(&mut data);
    }

    let length = data_start + data.len();
    let mut woff = Vec::with_capacity(length);
    woff.extend_from_slice(&WOFF_SIGNATURE.to_be_bytes());
    woff.extend_from_slice(&font.table_directory.sfnt_version().to_be_bytes());
    woff.extend_from_slice(&(length as u32).to_be_bytes());
    woff.extend_from_slice(&(num_tables as u16).to_be_bytes());
    woff.extend_from_slice(&0u16.to_be_bytes());
    woff.extend_from_slice(&(total_sfnt_size as u32).to_be_bytes());
    woff.extend_from_slice(&major_version.to_be_bytes());
    woff.extend_from_slice(&minor_version.to_be_bytes());
    // No metadata and no private data block.
    woff.extend_from_slice(&[0u8; 20]);
    woff.extend_from_slice(&directory);
    woff.extend_from_slice(&data);
    log::debug!("Packed {} tables into {} bytes of WOFF", num_tables, length);
    Ok(woff)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convertors::ttf;
    use crate::font::{Font, FontGlyph};
    use flate2::read::ZlibDecoder;
    use kurbo::BezPath;
    use pretty_assertions::assert_eq;
    use std::io::Read as _;

    fn be32(data: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
    }

    fn be16(data: &[u8], at: usize) -> u16 {
        u16::from_be_bytes(data[at..at + 2].try_into().unwrap())
    }

    fn sample_ttf() -> Vec<u8> {
        let mut font = Font::new("Woff Test");
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.line_to((500.0, 0.0));
        outline.line_to((500.0, 500.0));
        outline.line_to((0.0, 500.0));
        outline.close_path();
        font.glyphs.push(FontGlyph {
            name: "box".to_string(),
            codepoints: vec!['\u{F101}'],
            advance: 1000.0,
            outline,
        });
        ttf::compile(&font).unwrap()
    }

    #[test]
    fn test_header() {
        let ttf = sample_ttf();
        let woff = from_ttf(&ttf).unwrap();
        let source = FontRef::new(&ttf).unwrap();
        assert_eq!(be32(&woff, 0), WOFF_SIGNATURE);
        assert_eq!(be32(&woff, 4), 0x0001_0000);
        assert_eq!(be32(&woff, 8) as usize, woff.len());
        assert_eq!(
            be16(&woff, 12) as usize,
            source.table_directory.table_records().len()
        );
        assert_eq!(be16(&woff, 14), 0);
        assert_eq!(be16(&woff, 20), 1);
        assert_eq!(woff.len() % 4, 0);
    }

    #[test]
    fn test_tables_restore_original_bytes() {
        let ttf = sample_ttf();
        let woff = from_ttf(&ttf).unwrap();
        let source = FontRef::new(&ttf).unwrap();
        let num_tables = be16(&woff, 12) as usize;
        let mut previous_tag = [0u8; 4];
        for ix in 0..num_tables {
            let entry = HEADER_SIZE + ix * TABLE_ENTRY_SIZE;
            let tag: [u8; 4] = woff[entry..entry + 4].try_into().unwrap();
            assert!(tag > previous_tag);
            previous_tag = tag;
            let offset = be32(&woff, entry + 4) as usize;
            let comp_length = be32(&woff, entry + 8) as usize;
            let orig_length = be32(&woff, entry + 12) as usize;
            assert_eq!(offset % 4, 0);
            let stored = &woff[offset..offset + comp_length];
            let restored = if comp_length < orig_length {
                let mut out = Vec::new();
                ZlibDecoder::new(stored).read_to_end(&mut out).unwrap();
                out
            } else {
                assert_eq!(comp_length, orig_length);
                stored.to_vec()
            };
            let original = source
                .table_data(write_fonts::types::Tag::new(&tag))
                .unwrap();
            assert_eq!(restored, original.as_bytes());
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(from_ttf(b"definitely not a font").is_err());
    }
}
