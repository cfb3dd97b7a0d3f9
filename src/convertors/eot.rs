//! Wraps a TrueType binary into an Embedded OpenType (version 0x00020001)
//! container for legacy Internet Explorer.
use write_fonts::{
    read::{FontRef, TableProvider},
    tables::os2::SelectionFlags,
    types::NameId,
};

use crate::Glyphs2FontError;

pub const EOT_VERSION: u32 = 0x0002_0001;
pub const EOT_MAGIC: u16 = 0x504C;
const DEFAULT_CHARSET: u8 = 1;

/// Little-endian byte writer for the EOT header.
#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn u8(&mut self, value: u8) {
        self.0.push(value);
    }
    fn u16(&mut self, value: u16) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }
    fn u32(&mut self, value: u32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }
    fn bytes(&mut self, value: &[u8]) {
        self.0.extend_from_slice(value);
    }
    /// A size-prefixed UTF-16LE string, preceded by a zero padding word.
    fn padded_name(&mut self, value: &str) {
        let encoded: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.u16(0);
        self.u16(encoded.len().min(u16::MAX as usize) as u16);
        self.bytes(&encoded[..encoded.len().min(u16::MAX as usize)]);
    }
}

fn windows_name(font: &FontRef, name_id: NameId) -> Result<String, Glyphs2FontError> {
    let name = font.name()?;
    for record in name.name_record() {
        if record.name_id() != name_id || record.platform_id() != 3 {
            continue;
        }
        let value = record.string(name.string_data())?;
        return Ok(value.chars().collect());
    }
    Ok(String::new())
}

/// Converts a TrueType binary to EOT.
pub fn from_ttf(ttf: &[u8]) -> Result<Vec<u8>, Glyphs2FontError> {
    let font = FontRef::new(ttf)?;
    let os2 = font.os2()?;
    let head = font.head()?;
    let font_data_size = u32::try_from(ttf.len())
        .map_err(|_| Glyphs2FontError::FontBuild("font too large for EOT".to_string()))?;

    let mut body = Writer::default();
    body.u32(font_data_size);
    body.u32(EOT_VERSION);
    body.u32(0); // flags
    let mut panose = [0u8; 10];
    for (slot, value) in panose.iter_mut().zip(os2.panose_10()) {
        *slot = *value;
    }
    body.bytes(&panose);
    body.u8(DEFAULT_CHARSET);
    body.u8(u8::from(os2.fs_selection().contains(SelectionFlags::ITALIC)));
    body.u32(os2.us_weight_class() as u32);
    body.u16(os2.fs_type());
    body.u16(EOT_MAGIC);
    body.u32(os2.ul_unicode_range_1());
    body.u32(os2.ul_unicode_range_2());
    body.u32(os2.ul_unicode_range_3());
    body.u32(os2.ul_unicode_range_4());
    body.u32(os2.ul_code_page_range_1().unwrap_or(0));
    body.u32(os2.ul_code_page_range_2().unwrap_or(0));
    body.u32(head.checksum_adjustment());
    for _ in 0..4 {
        body.u32(0); // reserved
    }
    body.padded_name(&windows_name(&font, NameId::FAMILY_NAME)?);
    body.padded_name(&windows_name(&font, NameId::SUBFAMILY_NAME)?);
    body.padded_name(&windows_name(&font, NameId::VERSION_STRING)?);
    body.padded_name(&windows_name(&font, NameId::FULL_NAME)?);
    body.u16(0); // padding
    body.u16(0); // root string size
    body.bytes(ttf);

    let total = body.0.len() + 4;
    let mut eot = Vec::with_capacity(total);
    eot.extend_from_slice(&(total as u32).to_le_bytes());
    eot.extend_from_slice(&body.0);
    log::debug!("Wrapped {} bytes of TrueType into EOT", ttf.len());
    Ok(eot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convertors::ttf;
    use crate::font::{Font, FontGlyph};
    use kurbo::BezPath;
    use pretty_assertions::assert_eq;

    fn le32(data: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
    }

    fn le16(data: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(data[at..at + 2].try_into().unwrap())
    }

    fn sample_ttf() -> Vec<u8> {
        let mut font = Font::new("Eot");
        let mut outline = BezPath::new();
        outline.move_to((0.0, 0.0));
        outline.line_to((400.0, 0.0));
        outline.line_to((200.0, 400.0));
        outline.close_path();
        font.glyphs.push(FontGlyph {
            name: "tri".to_string(),
            codepoints: vec!['\u{E900}'],
            advance: 500.0,
            outline,
        });
        ttf::compile(&font).unwrap()
    }

    #[test]
    fn test_header_fields() {
        let ttf = sample_ttf();
        let eot = from_ttf(&ttf).unwrap();
        assert_eq!(le32(&eot, 0) as usize, eot.len());
        assert_eq!(le32(&eot, 4) as usize, ttf.len());
        assert_eq!(le32(&eot, 8), EOT_VERSION);
        assert_eq!(eot[26], DEFAULT_CHARSET);
        assert_eq!(eot[27], 0);
        assert_eq!(le32(&eot, 28), 400);
        assert_eq!(le16(&eot, 34), EOT_MAGIC);
        assert!(eot.ends_with(&ttf));
    }

    #[test]
    fn test_family_name_is_utf16() {
        let eot = from_ttf(&sample_ttf()).unwrap();
        // Padding1 sits at 80, the family name size at 82.
        assert_eq!(le16(&eot, 80), 0);
        assert_eq!(le16(&eot, 82), 6);
        let family: Vec<u16> = (0..3).map(|i| le16(&eot, 84 + 2 * i)).collect();
        assert_eq!(String::from_utf16(&family).unwrap(), "Eot");
    }
}
