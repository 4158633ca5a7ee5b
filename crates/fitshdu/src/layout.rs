//! Splitting a FITS byte image into HDU extents.

use std::fmt;

use tracing::debug;

use crate::block::{extend_padded, padded_byte_len, BLOCK_SIZE, DATA_PAD_BYTE};
use crate::error::{Error, Result};
use crate::header::{
    card_integer, card_logical, card_string, header_byte_len, parse_header_blocks,
    render_header_text, serialize_header, validate_required_keywords, Card, HeaderKind,
};

/// The type of an HDU, as reported by the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HduType {
    /// Primary array, IMAGE extension or tile-compressed image.
    Image,
    /// ASCII table extension (XTENSION = 'TABLE').
    AsciiTable,
    /// Binary table extension (XTENSION = 'BINTABLE').
    BinaryTable,
}

impl HduType {
    /// The CFITSIO type code (IMAGE_HDU = 0, ASCII_TBL = 1, BINARY_TBL = 2).
    pub fn code(self) -> i32 {
        match self {
            HduType::Image => 0,
            HduType::AsciiTable => 1,
            HduType::BinaryTable => 2,
        }
    }
}

impl fmt::Display for HduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HduType::Image => "IMAGE_HDU",
            HduType::AsciiTable => "ASCII_TBL",
            HduType::BinaryTable => "BINARY_TBL",
        })
    }
}

/// One Header Data Unit located within a FITS byte image.
#[derive(Debug, Clone)]
pub struct Hdu {
    hdu_type: HduType,
    compressed: bool,
    /// Byte offset where the header begins.
    pub header_start: usize,
    /// Byte offset where the data segment begins.
    pub data_start: usize,
    /// Length of the data segment in bytes, without padding.
    pub data_len: usize,
    cards: Vec<Card>,
}

impl Hdu {
    pub fn hdu_type(&self) -> HduType {
        self.hdu_type
    }

    /// `true` for a BINTABLE holding a tile-compressed image (ZIMAGE = T).
    pub fn is_compressed_image(&self) -> bool {
        self.compressed
    }

    /// Header cards, END excluded.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub(crate) fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }

    /// EXTNAME, falling back to HDUNAME.
    pub fn name(&self) -> Option<&str> {
        card_string(&self.cards, "EXTNAME").or_else(|| card_string(&self.cards, "HDUNAME"))
    }

    /// EXTVER, falling back to HDUVER, defaulting to 1.
    pub fn version(&self) -> i64 {
        card_integer(&self.cards, "EXTVER")
            .or_else(|| card_integer(&self.cards, "HDUVER"))
            .unwrap_or(1)
    }

    /// Axis lengths NAXIS1..NAXISn; ZNAXISn for compressed images.
    pub fn naxes(&self) -> Vec<usize> {
        let prefix = if self.compressed { "ZNAXIS" } else { "NAXIS" };
        let naxis = card_integer(&self.cards, prefix).unwrap_or(0).max(0);
        (1..=naxis)
            .map(|i| card_integer(&self.cards, &format!("{prefix}{i}")).unwrap_or(0).max(0) as usize)
            .collect()
    }

    /// The header as concatenated 80-byte records closed by END.
    pub fn header_text(&self) -> Vec<u8> {
        render_header_text(&self.cards)
    }

    /// Whether this HDU answers a move-by-name request.
    ///
    /// `hdu_type == None` accepts any type and a compressed image also answers
    /// to `BinaryTable`. Names compare without regard to ASCII case or
    /// trailing blanks, against EXTNAME then HDUNAME. `version == 0` accepts
    /// any version; otherwise EXTVER (or HDUVER) must match, defaulting to 1.
    pub fn matches(&self, hdu_type: Option<HduType>, name: &str, version: u32) -> bool {
        let type_ok = match hdu_type {
            None => true,
            Some(t) => t == self.hdu_type || (self.compressed && t == HduType::BinaryTable),
        };
        if !type_ok {
            return false;
        }
        let wanted = name.trim_end();
        [("EXTNAME", "EXTVER"), ("HDUNAME", "HDUVER")]
            .iter()
            .any(|&(name_key, ver_key)| {
                let Some(own) = card_string(&self.cards, name_key) else {
                    return false;
                };
                own.eq_ignore_ascii_case(wanted)
                    && (version == 0
                        || card_integer(&self.cards, ver_key).unwrap_or(1) == i64::from(version))
            })
    }
}

fn classify(cards: &[Card], is_primary: bool) -> Result<(HeaderKind, HduType, bool)> {
    if is_primary {
        return Ok((HeaderKind::Primary, HduType::Image, false));
    }
    let xtension = card_string(cards, "XTENSION").ok_or(Error::MissingKeyword("XTENSION"))?;
    match xtension {
        "IMAGE" | "IUEIMAGE" => Ok((HeaderKind::Image, HduType::Image, false)),
        "TABLE" => Ok((HeaderKind::AsciiTable, HduType::AsciiTable, false)),
        "BINTABLE" | "A3DTABLE" | "3DTABLE" => {
            if card_logical(cards, "ZIMAGE") == Some(true) {
                Ok((HeaderKind::BinaryTable, HduType::Image, true))
            } else {
                Ok((HeaderKind::BinaryTable, HduType::BinaryTable, false))
            }
        }
        other => Err(Error::UnknownExtension(other.to_string())),
    }
}

const SIZE_OVERFLOW: Error = Error::InvalidHeader("data size overflow");

fn required_count(cards: &[Card], keyword: &'static str) -> Result<usize> {
    let n = card_integer(cards, keyword).ok_or(Error::MissingKeyword(keyword))?;
    usize::try_from(n).map_err(|_| Error::InvalidHeader("negative size keyword"))
}

fn optional_count(cards: &[Card], keyword: &'static str, default: usize) -> Result<usize> {
    match card_integer(cards, keyword) {
        Some(n) => usize::try_from(n).map_err(|_| Error::InvalidHeader("negative size keyword")),
        None => Ok(default),
    }
}

/// Size of the data segment: |BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1*...*NAXISn).
///
/// Random groups (primary, NAXIS1 = 0, GROUPS = T) leave NAXIS1 out of the
/// product.
fn data_byte_len(cards: &[Card], kind: HeaderKind) -> Result<usize> {
    let bitpix = card_integer(cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?;
    if ![8, 16, 32, 64, -32, -64].contains(&bitpix) {
        return Err(Error::InvalidHeader("invalid BITPIX value"));
    }
    let naxis = required_count(cards, "NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }

    let mut dims = Vec::with_capacity(naxis);
    for i in 1..=naxis {
        let n = card_integer(cards, &format!("NAXIS{i}")).ok_or(Error::MissingKeyword("NAXISn"))?;
        dims.push(usize::try_from(n).map_err(|_| Error::InvalidHeader("negative NAXISn"))?);
    }

    let random_groups = kind == HeaderKind::Primary
        && dims[0] == 0
        && card_logical(cards, "GROUPS") == Some(true);
    let (pcount, gcount, axes) = if random_groups {
        (
            required_count(cards, "PCOUNT")?,
            required_count(cards, "GCOUNT")?,
            &dims[1..],
        )
    } else if kind == HeaderKind::Primary {
        (0, 1, &dims[..])
    } else {
        (
            optional_count(cards, "PCOUNT", 0)?,
            optional_count(cards, "GCOUNT", 1)?,
            &dims[..],
        )
    };

    let elements = axes
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|product| product.checked_add(pcount))
        .and_then(|group| group.checked_mul(gcount))
        .and_then(|values| values.checked_mul(bitpix.unsigned_abs() as usize / 8));
    elements.ok_or(SIZE_OVERFLOW)
}

fn read_hdu(data: &[u8], offset: usize, is_primary: bool) -> Result<Hdu> {
    let remaining = &data[offset..];
    let header_len = header_byte_len(remaining)?;
    let cards = parse_header_blocks(&remaining[..header_len])?;
    let (kind, hdu_type, compressed) = classify(&cards, is_primary)?;
    validate_required_keywords(kind, &cards)?;
    let data_len = data_byte_len(&cards, kind)?;
    let data_start = offset + header_len;
    let data_end = data_start.checked_add(data_len).ok_or(SIZE_OVERFLOW)?;

    // All data bytes must be present; the trailing block padding may be
    // missing.
    if data_end > data.len() {
        return Err(Error::UnexpectedEof);
    }

    Ok(Hdu {
        hdu_type,
        compressed,
        header_start: offset,
        data_start,
        data_len,
        cards,
    })
}

/// Locate every HDU in a complete FITS byte image.
///
/// Bytes after the last HDU that do not start an XTENSION header are ignored.
pub fn scan_hdus(data: &[u8]) -> Result<Vec<Hdu>> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    let mut hdus: Vec<Hdu> = Vec::new();
    let mut offset = 0usize;
    while data.len().saturating_sub(offset) >= BLOCK_SIZE {
        if !hdus.is_empty() && &data[offset..offset + 8] != b"XTENSION" {
            debug!(offset, "ignoring trailing bytes after last HDU");
            break;
        }
        let hdu = read_hdu(data, offset, hdus.is_empty())?;
        offset = padded_byte_len(hdu.data_len)
            .and_then(|padded| hdu.data_start.checked_add(padded))
            .ok_or(SIZE_OVERFLOW)?;
        hdus.push(hdu);
    }

    debug!(hdus = hdus.len(), bytes = data.len(), "scanned FITS layout");
    Ok(hdus)
}

/// Rebuild a FITS byte image from `data` with every header re-serialized
/// from `hdus` and every data segment copied through.
pub(crate) fn rebuild(data: &[u8], hdus: &[Hdu]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for hdu in hdus {
        out.extend_from_slice(&serialize_header(&hdu.cards));
        extend_padded(
            &mut out,
            &data[hdu.data_start..hdu.data_start + hdu.data_len],
            DATA_PAD_BYTE,
        );
    }
    out
}
