use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use ttf_parser::Face;

use crate::error::Error;

/// Handle to a font registered in a [`FontBook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontId(pub(crate) usize);

impl FontId {
    /// Helvetica, present in every [`FontBook`].
    pub const FALLBACK: FontId = FontId(0);
}

pub(crate) enum FontData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for FontData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FontData::Mapped(m) => &m[..],
            FontData::Owned(v) => v.as_slice(),
        }
    }
}

pub(crate) enum FontProgram {
    /// One of the PDF standard fonts, written with WinAnsiEncoding.
    Builtin {
        base_font: &'static str,
        widths_1000: Vec<f32>,
    },
    /// A whole TrueType/OpenType file, written as a CID font with Identity-H.
    TrueType {
        data: FontData,
        face_index: u32,
        ps_name: String,
        units_per_em: f32,
        bbox: [f32; 4],
    },
}

pub(crate) struct FontEntry {
    pub(crate) name: String,
    pub(crate) pdf_name: String,
    pub(crate) ascender_ratio: f32,
    pub(crate) descender_ratio: f32,
    pub(crate) cap_height_ratio: f32,
    pub(crate) program: FontProgram,
}

impl FontEntry {
    fn face(&self) -> Option<Face<'_>> {
        match &self.program {
            FontProgram::TrueType {
                data, face_index, ..
            } => Face::parse(data.as_ref(), *face_index).ok(),
            FontProgram::Builtin { .. } => None,
        }
    }

    /// Advance width of `text` at `font_size`, without kerning or shaping.
    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.program {
            FontProgram::Builtin { widths_1000, .. } => {
                to_winansi_bytes(text)
                    .iter()
                    .filter(|&&b| b >= 32)
                    .map(|&b| widths_1000[(b - 32) as usize])
                    .sum::<f32>()
                    * font_size
                    / 1000.0
            }
            FontProgram::TrueType { units_per_em, .. } => {
                let Some(face) = self.face() else {
                    return 0.0;
                };
                text.chars()
                    .filter_map(|ch| face.glyph_index(ch))
                    .filter_map(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32)
                    .sum::<f32>()
                    * font_size
                    / units_per_em
            }
        }
    }

    /// Bytes for a `Tj` operand: WinAnsi for builtin fonts, 2-byte glyph IDs otherwise.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.program {
            FontProgram::Builtin { .. } => to_winansi_bytes(text),
            FontProgram::TrueType { .. } => {
                let Some(face) = self.face() else {
                    return Vec::new();
                };
                let mut out = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let gid = face.glyph_index(ch).map(|g| g.0).unwrap_or(0);
                    out.push((gid >> 8) as u8);
                    out.push((gid & 0xFF) as u8);
                }
                out
            }
        }
    }

    /// Glyph ID and width (1000 units) for every char in `chars` the font covers.
    pub(crate) fn glyph_metrics(&self, chars: impl Iterator<Item = char>) -> Vec<(char, u16, f32)> {
        let Some(face) = self.face() else {
            return Vec::new();
        };
        let units = face.units_per_em() as f32;
        chars
            .filter_map(|ch| {
                let gid = face.glyph_index(ch)?;
                let w = face
                    .glyph_hor_advance(gid)
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0);
                Some((ch, gid.0, w))
            })
            .collect()
    }
}

/// Registry of the fonts a canvas can draw with, and the metrics layout needs.
///
/// Index 0 is always Helvetica so layout has something to fall back on.
pub struct FontBook {
    entries: Vec<FontEntry>,
    by_name: HashMap<String, FontId>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBook {
    pub fn new() -> Self {
        let mut book = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        book.push_builtin("Helvetica");
        book
    }

    pub fn lookup(&self, name: &str) -> Option<FontId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Find a registered font by name, registering a standard font on first use.
    pub fn resolve(&mut self, name: &str) -> Result<FontId, Error> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        let Some(base) = builtin_base_font(name) else {
            return Err(Error::Font(format!("font '{name}' is not registered")));
        };
        match self.lookup(base) {
            Some(id) => Ok(id),
            None => Ok(self.push_builtin(base)),
        }
    }

    pub fn register_file(&mut self, name: &str, path: &Path) -> Result<FontId, Error> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only; a font file modified while mapped is
        // a caller error, as with any memory-mapped input.
        let map = unsafe { Mmap::map(&file)? };
        self.register_data(name, FontData::Mapped(map))
    }

    pub fn register_bytes(&mut self, name: &str, data: Vec<u8>) -> Result<FontId, Error> {
        self.register_data(name, FontData::Owned(data))
    }

    fn register_data(&mut self, name: &str, data: FontData) -> Result<FontId, Error> {
        let t0 = std::time::Instant::now();
        let (units, ascender, descender, cap_height, bbox, family) = {
            let face = Face::parse(data.as_ref(), 0)
                .map_err(|e| Error::Font(format!("{name}: {e}")))?;
            let units = face.units_per_em() as f32;
            let bb = face.global_bounding_box();
            (
                units,
                face.ascender() as f32 / units,
                face.descender() as f32 / units,
                face.capital_height()
                    .map(|h| h as f32 / units)
                    .unwrap_or(0.7),
                [
                    bb.x_min as f32 / units * 1000.0,
                    bb.y_min as f32 / units * 1000.0,
                    bb.x_max as f32 / units * 1000.0,
                    bb.y_max as f32 / units * 1000.0,
                ],
                font_family_name(&face),
            )
        };
        let ps_name = family.unwrap_or_else(|| name.to_string()).replace(' ', "");
        let id = FontId(self.entries.len());
        self.entries.push(FontEntry {
            name: name.to_string(),
            pdf_name: format!("F{}", id.0 + 1),
            ascender_ratio: ascender,
            descender_ratio: descender,
            cap_height_ratio: cap_height,
            program: FontProgram::TrueType {
                data,
                face_index: 0,
                ps_name,
                units_per_em: units,
                bbox,
            },
        });
        self.by_name.insert(name.to_lowercase(), id);
        log::debug!(
            "register_font: {name} → {:.1}ms",
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(id)
    }

    fn push_builtin(&mut self, base_font: &'static str) -> FontId {
        let (ascender, descender, cap_height, widths_1000) = builtin_metrics(base_font);
        let id = FontId(self.entries.len());
        self.entries.push(FontEntry {
            name: base_font.to_string(),
            pdf_name: format!("F{}", id.0 + 1),
            ascender_ratio: ascender,
            descender_ratio: descender,
            cap_height_ratio: cap_height,
            program: FontProgram::Builtin {
                base_font,
                widths_1000,
            },
        });
        self.by_name.insert(base_font.to_lowercase(), id);
        id
    }

    pub(crate) fn entry(&self, id: FontId) -> &FontEntry {
        // FontIds are only minted by this book, so the index is always valid.
        &self.entries[id.0]
    }

    pub fn name(&self, id: FontId) -> &str {
        &self.entry(id).name
    }

    pub fn cap_height(&self, id: FontId, size: f32) -> f32 {
        self.entry(id).cap_height_ratio * size
    }

    pub fn ascent(&self, id: FontId, size: f32) -> f32 {
        self.entry(id).ascender_ratio * size
    }

    pub fn string_width(&self, id: FontId, size: f32, text: &str) -> f32 {
        self.entry(id).text_width(text, size)
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn builtin_base_font(name: &str) -> Option<&'static str> {
    let base = match name.to_lowercase().replace([' ', '_'], "-").as_str() {
        "helvetica" | "arial" | "sans-serif" => "Helvetica",
        "helvetica-bold" | "arial-bold" => "Helvetica-Bold",
        "helvetica-oblique" | "helvetica-italic" => "Helvetica-Oblique",
        "times" | "times-roman" | "times-new-roman" | "serif" => "Times-Roman",
        "times-bold" => "Times-Bold",
        "times-italic" => "Times-Italic",
        "courier" | "courier-new" | "monospace" => "Courier",
        "courier-bold" => "Courier-Bold",
        _ => return None,
    };
    Some(base)
}

/// (ascender, descender, cap height, WinAnsi widths) for a standard font.
fn builtin_metrics(base_font: &str) -> (f32, f32, f32, Vec<f32>) {
    match base_font {
        "Courier" | "Courier-Bold" => (0.629, -0.157, 0.562, vec![600.0; 224]),
        "Times-Roman" | "Times-Bold" | "Times-Italic" => (0.683, -0.217, 0.662, times_widths()),
        "Helvetica-Bold" => (
            0.718,
            -0.207,
            0.718,
            helvetica_widths().iter().map(|w| w * 1.05).collect(),
        ),
        _ => (0.718, -0.207, 0.718, helvetica_widths()),
    }
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            _ => 556.0,
        })
        .collect()
}

/// Approximate Times-Roman widths at 1000 units/em for WinAnsi chars 32..=255.
fn times_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 250.0,
            33..=47 => 333.0,
            48..=57 => 500.0,
            58..=64 => 278.0,
            73 => 333.0,
            74 => 389.0,
            77 => 889.0,
            87 => 944.0,
            65..=90 => 667.0,
            91..=96 => 333.0,
            102 | 105 | 106 | 108 | 116 => 278.0,
            109 => 778.0,
            119 => 722.0,
            97..=122 => 444.0,
            _ => 500.0,
        })
        .collect()
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Characters outside the code page are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match c as u32 {
            0x0000..=0x007F => Some(c as u8),
            0x00A0..=0x00FF => Some(c as u8), // Latin-1 supplement maps directly
            0x20AC => Some(0x80),
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85),
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // bullet
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winansi_maps_typographic_quotes() {
        assert_eq!(to_winansi_bytes("a\u{2019}b"), vec![b'a', 0x92, b'b']);
        assert_eq!(to_winansi_bytes("\u{4e2d}"), Vec::<u8>::new());
    }

    #[test]
    fn helvetica_is_always_registered_first() {
        let book = FontBook::new();
        assert_eq!(book.lookup("helvetica"), Some(FontId(0)));
        assert!((book.string_width(FontId(0), 10.0, "  ") - 5.56).abs() < 1e-4);
    }

    #[test]
    fn standard_fonts_resolve_by_alias() {
        let mut book = FontBook::new();
        let courier = book.resolve("monospace").unwrap();
        assert_eq!(book.name(courier), "Courier");
        assert_eq!(book.resolve("Courier").unwrap(), courier);
        assert!((book.string_width(courier, 10.0, "abc") - 18.0).abs() < 1e-4);
        assert!(matches!(book.resolve("NoSuchFont"), Err(Error::Font(_))));
    }
}
