//! FITS header cards: parsing, formatting, validation and text rendering.

use crate::block::{extend_padded, BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// One 80-byte header record together with its decoded parts.
///
/// The raw record is kept so that headers can be re-emitted exactly as they
/// were read. Cards built through [`Card::new`] or modified with
/// [`Card::set_value`] get a freshly formatted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    keyword: [u8; 8],
    value: Option<Value>,
    comment: Option<String>,
    record: [u8; CARD_SIZE],
}

impl Card {
    /// Build a card from its parts, validating the keyword name.
    pub fn new(keyword: &str, value: Option<Value>, comment: Option<&str>) -> Result<Card> {
        let keyword = make_keyword(keyword)?;
        let comment = comment.map(String::from);
        let record = format_card(&keyword, value.as_ref(), comment.as_deref());
        Ok(Card {
            keyword,
            value,
            comment,
            record,
        })
    }

    /// The keyword with trailing blanks removed.
    pub fn keyword_str(&self) -> &str {
        std::str::from_utf8(&self.keyword)
            .unwrap_or("")
            .trim_end()
    }

    /// The parsed value, `None` for commentary or undefined keywords.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The inline comment, or the free text of a commentary card.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The 80-byte record as it appears in the file.
    pub fn record(&self) -> &[u8; CARD_SIZE] {
        &self.record
    }

    /// Replace the value, keeping the comment, and re-format the record.
    pub fn set_value(&mut self, value: Value) {
        self.record = format_card(&self.keyword, Some(&value), self.comment.as_deref());
        self.value = Some(value);
    }

    /// Returns `true` for COMMENT, HISTORY and blank-keyword cards.
    pub fn is_commentary(&self) -> bool {
        is_commentary_keyword(&self.keyword)
    }

    /// Returns `true` if the whole record is blank.
    pub fn is_blank_record(&self) -> bool {
        self.record.iter().all(|&b| b == b' ')
    }
}

/// HDU header layouts with distinct mandatory keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Primary,
    Image,
    AsciiTable,
    BinaryTable,
}

// ── Parsing ──

const END_KEYWORD: &[u8; 8] = b"END     ";

const COMMENTARY_KEYWORDS: [&[u8; 8]; 3] = [b"COMMENT ", b"HISTORY ", b"        "];

fn is_commentary_keyword(keyword: &[u8; 8]) -> bool {
    COMMENTARY_KEYWORDS.contains(&keyword)
}

/// Pad a keyword name to 8 bytes, rejecting characters the standard forbids.
pub fn make_keyword(name: &str) -> Result<[u8; 8]> {
    let bytes = name.as_bytes();
    if bytes.len() > 8 {
        return Err(Error::InvalidKeyword);
    }
    let mut keyword = [b' '; 8];
    for (slot, &b) in keyword.iter_mut().zip(bytes) {
        match b {
            b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => *slot = b,
            _ => return Err(Error::InvalidKeyword),
        }
    }
    Ok(keyword)
}

fn free_text(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?.trim_end();
    (!text.is_empty()).then(|| String::from(text))
}

/// Parse a single 80-byte header record.
///
/// Reading is lenient about keyword spelling (any printable ASCII), but the
/// record as a whole must be ASCII text.
pub fn parse_card(record: &[u8; CARD_SIZE]) -> Result<Card> {
    let printable = |b: &u8| (0x20..=0x7E).contains(b);
    if !record[..8].iter().all(printable) {
        return Err(Error::InvalidKeyword);
    }
    if !record[8..].iter().all(printable) {
        return Err(Error::InvalidHeader("non-ASCII character in header record"));
    }
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&record[..8]);

    let (value, comment) = if &keyword == END_KEYWORD || is_commentary_keyword(&keyword) {
        (None, free_text(&record[8..]))
    } else if &record[8..10] == b"= " {
        match parse_value(&record[10..]) {
            Some((value, comment)) => (Some(value), comment.map(String::from)),
            None => (None, undefined_value_comment(&record[10..])),
        }
    } else {
        (None, free_text(&record[8..]))
    };

    Ok(Card {
        keyword,
        value,
        comment,
        record: *record,
    })
}

fn undefined_value_comment(field: &[u8]) -> Option<String> {
    let slash = field.iter().position(|&b| b == b'/')?;
    free_text(&field[slash + 1..]).map(|s| s.trim_start().to_string())
}

fn records<'a>(data: &'a [u8]) -> impl Iterator<Item = &'a [u8; CARD_SIZE]> + 'a {
    let whole_blocks = data.len() / BLOCK_SIZE * BLOCK_SIZE;
    data[..whole_blocks]
        .chunks_exact(CARD_SIZE)
        .filter_map(|chunk| <&[u8; CARD_SIZE]>::try_from(chunk).ok())
}

/// Parse header blocks up to the END card.
///
/// The returned cards exclude END itself. Only complete 2880-byte blocks are
/// scanned; trailing bytes shorter than a block are ignored.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    let mut cards = Vec::new();
    for record in records(data) {
        if &record[..8] == END_KEYWORD {
            return Ok(cards);
        }
        cards.push(parse_card(record)?);
    }
    Err(Error::UnexpectedEof)
}

/// Return the number of bytes occupied by the header, END block included.
pub fn header_byte_len(data: &[u8]) -> Result<usize> {
    records(data)
        .position(|record| &record[..8] == END_KEYWORD)
        .map(|idx| (idx / CARDS_PER_BLOCK + 1) * BLOCK_SIZE)
        .ok_or(Error::UnexpectedEof)
}

// ── Writing ──

fn format_card(keyword: &[u8; 8], value: Option<&Value>, comment: Option<&str>) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(keyword);

    match value {
        Some(value) => {
            buf[8] = b'=';
            let mut field = format_value(value);
            if let Some(comment) = comment {
                insert_comment(&mut field, comment);
            }
            buf[10..].copy_from_slice(&field);
        }
        None => {
            if let Some(comment) = comment {
                let bytes = comment.as_bytes();
                let len = bytes.len().min(CARD_SIZE - 8);
                buf[8..8 + len].copy_from_slice(&bytes[..len]);
            }
        }
    }
    buf
}

/// Insert a ` / comment` into a 70-byte value field after the value.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = field
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |i| i + 1)
        .max(20);
    let comment_start = content_end + 3;
    if comment_start >= field.len() {
        return;
    }
    field[content_end + 1] = b'/';
    let bytes = comment.as_bytes();
    let len = bytes.len().min(field.len() - comment_start);
    field[comment_start..comment_start + len].copy_from_slice(&bytes[..len]);
}

/// The END record, padded with blanks.
pub fn end_record() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}

/// Serialize cards into complete header blocks: records, END, blank padding.
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let mut raw = Vec::with_capacity((cards.len() + 1) * CARD_SIZE);
    for card in cards {
        raw.extend_from_slice(card.record());
    }
    raw.extend_from_slice(&end_record());
    let mut out = Vec::with_capacity(raw.len() + BLOCK_SIZE);
    extend_padded(&mut out, &raw, HEADER_PAD_BYTE);
    out
}

/// Render a header as one string of concatenated 80-byte records.
///
/// Blank records directly before END are reserved space and are left out;
/// the END record closes the text. No line separators are inserted.
pub fn render_header_text(cards: &[Card]) -> Vec<u8> {
    let used = cards
        .iter()
        .rposition(|c| !c.is_blank_record())
        .map_or(0, |i| i + 1);
    let mut out = Vec::with_capacity((used + 1) * CARD_SIZE);
    for card in &cards[..used] {
        out.extend_from_slice(card.record());
    }
    out.extend_from_slice(&end_record());
    out
}

// ── Lookup ──

/// Find the first card with the given (unpadded) keyword.
pub fn find_card<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a Card> {
    cards.iter().find(|c| c.keyword_str() == keyword)
}

pub(crate) fn card_integer(cards: &[Card], keyword: &str) -> Option<i64> {
    match find_card(cards, keyword)?.value()? {
        Value::Integer(n) => Some(*n),
        _ => None,
    }
}

pub(crate) fn card_string<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a str> {
    match find_card(cards, keyword)?.value()? {
        Value::String(s) => Some(s.trim()),
        _ => None,
    }
}

pub(crate) fn card_logical(cards: &[Card], keyword: &str) -> Option<bool> {
    match find_card(cards, keyword)?.value()? {
        Value::Logical(b) => Some(*b),
        _ => None,
    }
}

// ── Validation ──

fn require_keyword_at<'a>(cards: &'a [Card], index: usize, name: &'static str) -> Result<&'a Card> {
    match cards.get(index) {
        Some(card) if card.keyword_str() == name => Ok(card),
        _ => Err(Error::MissingKeyword(name)),
    }
}

fn require_keyword_present(cards: &[Card], name: &'static str) -> Result<()> {
    find_card(cards, name)
        .map(|_| ())
        .ok_or(Error::MissingKeyword(name))
}

fn require_integer(card: &Card, expected: i64, what: &'static str) -> Result<()> {
    match card.value() {
        Some(Value::Integer(n)) if *n == expected => Ok(()),
        _ => Err(Error::InvalidHeader(what)),
    }
}

/// Check that the mandatory keywords of `kind` are present and in order.
pub fn validate_required_keywords(kind: HeaderKind, cards: &[Card]) -> Result<()> {
    if kind == HeaderKind::Primary {
        let simple = require_keyword_at(cards, 0, "SIMPLE")?;
        if simple.value() != Some(&Value::Logical(true)) {
            return Err(Error::InvalidHeader("SIMPLE is not T"));
        }
    } else {
        require_keyword_at(cards, 0, "XTENSION")?;
    }
    let bitpix = require_keyword_at(cards, 1, "BITPIX")?;
    let naxis = require_keyword_at(cards, 2, "NAXIS")?;

    match kind {
        HeaderKind::Primary => {}
        HeaderKind::Image => {
            require_keyword_present(cards, "PCOUNT")?;
            require_keyword_present(cards, "GCOUNT")?;
        }
        HeaderKind::AsciiTable | HeaderKind::BinaryTable => {
            require_integer(bitpix, 8, "table BITPIX must be 8")?;
            require_integer(naxis, 2, "table NAXIS must be 2")?;
            for name in ["NAXIS1", "NAXIS2", "PCOUNT", "GCOUNT", "TFIELDS"] {
                require_keyword_present(cards, name)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let len = s.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        buf
    }

    fn header_block(lines: &[&str]) -> Vec<u8> {
        let mut block = vec![b' '; BLOCK_SIZE];
        for (i, line) in lines.iter().enumerate() {
            block[i * CARD_SIZE..(i + 1) * CARD_SIZE].copy_from_slice(&record(line));
        }
        block
    }

    fn card(keyword: &str, value: Value) -> Card {
        Card::new(keyword, Some(value), None).unwrap()
    }

    #[test]
    fn parse_card_string_value() {
        let c = parse_card(&record("TELESCOP= 'Hubble  '           / telescope name")).unwrap();
        assert_eq!(c.keyword_str(), "TELESCOP");
        assert_eq!(c.value(), Some(&Value::String(String::from("Hubble"))));
        assert_eq!(c.comment(), Some("telescope name"));
    }

    #[test]
    fn parse_card_keeps_raw_record() {
        let raw = record("BITPIX  =   16 /free-format integer");
        let c = parse_card(&raw).unwrap();
        assert_eq!(c.value(), Some(&Value::Integer(16)));
        assert_eq!(c.record(), &raw);
    }

    #[test]
    fn parse_card_commentary() {
        let c = parse_card(&record("HISTORY = not a value")).unwrap();
        assert!(c.is_commentary());
        assert!(c.value().is_none());
        assert_eq!(c.comment(), Some("= not a value"));
    }

    #[test]
    fn parse_card_undefined_value_with_comment() {
        let c = parse_card(&record("BLANK   =                      / undefined value")).unwrap();
        assert!(c.value().is_none());
        assert_eq!(c.comment(), Some("undefined value"));
    }

    #[test]
    fn parse_card_rejects_control_bytes() {
        let mut raw = record("OBJECT  = 'M31'");
        raw[40] = b'\t';
        assert!(matches!(parse_card(&raw), Err(Error::InvalidHeader(_))));
        raw[2] = 0x80;
        assert!(matches!(parse_card(&raw), Err(Error::InvalidKeyword)));
    }

    #[test]
    fn parse_header_stops_at_end() {
        let block = header_block(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    0",
            "END",
        ]);
        let cards = parse_header_blocks(&block).unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(header_byte_len(&block).unwrap(), BLOCK_SIZE);
    }

    #[test]
    fn parse_header_without_end() {
        let block = header_block(&["SIMPLE  =                    T"]);
        assert!(matches!(parse_header_blocks(&block), Err(Error::UnexpectedEof)));
        assert!(matches!(header_byte_len(&block), Err(Error::UnexpectedEof)));
        assert!(matches!(parse_header_blocks(&[]), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn header_spanning_two_blocks() {
        let mut data = vec![b' '; 2 * BLOCK_SIZE];
        for i in 0..CARDS_PER_BLOCK {
            let line = format!("KEY{:<5}= {:>20}", i, i);
            data[i * CARD_SIZE..(i + 1) * CARD_SIZE].copy_from_slice(&record(&line));
        }
        data[BLOCK_SIZE..BLOCK_SIZE + CARD_SIZE].copy_from_slice(&record("END"));
        assert_eq!(parse_header_blocks(&data).unwrap().len(), CARDS_PER_BLOCK);
        assert_eq!(header_byte_len(&data).unwrap(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn new_card_rejects_bad_keywords() {
        assert!(matches!(Card::new("lower", None, None), Err(Error::InvalidKeyword)));
        assert!(matches!(Card::new("TOOLONGKEY", None, None), Err(Error::InvalidKeyword)));
        assert!(Card::new("DATE-OBS", None, None).is_ok());
    }

    #[test]
    fn new_card_formats_fixed_layout() {
        let c = Card::new("NAXIS", Some(Value::Integer(2)), Some("number of axes")).unwrap();
        let text = std::str::from_utf8(c.record()).unwrap();
        assert!(text.starts_with("NAXIS   =                    2 / number of axes"));
    }

    #[test]
    fn set_value_reformats_record() {
        let mut c = parse_card(&record("EXPTIME =   1.0 / seconds")).unwrap();
        c.set_value(Value::Integer(30));
        let reparsed = parse_card(c.record()).unwrap();
        assert_eq!(reparsed.value(), Some(&Value::Integer(30)));
        assert_eq!(reparsed.comment(), Some("seconds"));
    }

    #[test]
    fn serialize_then_parse() {
        let cards = vec![
            card("SIMPLE", Value::Logical(true)),
            card("BITPIX", Value::Integer(16)),
            card("NAXIS", Value::Integer(0)),
        ];
        let bytes = serialize_header(&cards);
        assert_eq!(bytes.len(), BLOCK_SIZE);
        assert_eq!(&bytes[240..243], b"END");
        assert_eq!(parse_header_blocks(&bytes).unwrap(), cards);
    }

    #[test]
    fn serialize_spills_into_second_block() {
        let cards: Vec<Card> = (0..36)
            .map(|i| card(&format!("KEY{:05}", i), Value::Integer(i)))
            .collect();
        assert_eq!(serialize_header(&cards).len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn render_drops_blank_records_before_end() {
        let cards = vec![
            parse_card(&record("SIMPLE  =                    T")).unwrap(),
            parse_card(&record("")).unwrap(),
            parse_card(&record("COMMENT keep me")).unwrap(),
            parse_card(&record("")).unwrap(),
            parse_card(&record("")).unwrap(),
        ];
        let text = render_header_text(&cards);
        assert_eq!(text.len(), 4 * CARD_SIZE);
        assert_eq!(&text[2 * CARD_SIZE..2 * CARD_SIZE + 15], b"COMMENT keep me");
        assert_eq!(&text[3 * CARD_SIZE..3 * CARD_SIZE + 3], b"END");
    }

    #[test]
    fn render_empty_header_is_end_only() {
        assert_eq!(render_header_text(&[]), end_record().to_vec());
    }

    #[test]
    fn lookups() {
        let cards = vec![
            card("XTENSION", Value::String(String::from("TABLE   "))),
            card("NAXIS", Value::Integer(2)),
            card("ZIMAGE", Value::Logical(true)),
        ];
        assert_eq!(card_string(&cards, "XTENSION"), Some("TABLE"));
        assert_eq!(card_integer(&cards, "NAXIS"), Some(2));
        assert_eq!(card_logical(&cards, "ZIMAGE"), Some(true));
        assert_eq!(card_integer(&cards, "XTENSION"), None);
        assert!(find_card(&cards, "MISSING").is_none());
    }

    #[test]
    fn validate_primary() {
        let mut cards = vec![
            card("SIMPLE", Value::Logical(true)),
            card("BITPIX", Value::Integer(16)),
            card("NAXIS", Value::Integer(0)),
        ];
        assert!(validate_required_keywords(HeaderKind::Primary, &cards).is_ok());
        cards.swap(0, 1);
        assert!(matches!(
            validate_required_keywords(HeaderKind::Primary, &cards),
            Err(Error::MissingKeyword("SIMPLE"))
        ));
    }

    #[test]
    fn validate_primary_simple_false() {
        let cards = vec![
            card("SIMPLE", Value::Logical(false)),
            card("BITPIX", Value::Integer(16)),
            card("NAXIS", Value::Integer(0)),
        ];
        assert!(matches!(
            validate_required_keywords(HeaderKind::Primary, &cards),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn validate_tables() {
        let mut cards = vec![
            card("XTENSION", Value::String(String::from("BINTABLE"))),
            card("BITPIX", Value::Integer(8)),
            card("NAXIS", Value::Integer(2)),
            card("NAXIS1", Value::Integer(32)),
            card("NAXIS2", Value::Integer(10)),
            card("PCOUNT", Value::Integer(0)),
            card("GCOUNT", Value::Integer(1)),
        ];
        assert!(matches!(
            validate_required_keywords(HeaderKind::BinaryTable, &cards),
            Err(Error::MissingKeyword("TFIELDS"))
        ));
        cards.push(card("TFIELDS", Value::Integer(3)));
        assert!(validate_required_keywords(HeaderKind::BinaryTable, &cards).is_ok());
        cards[1] = card("BITPIX", Value::Integer(16));
        assert!(matches!(
            validate_required_keywords(HeaderKind::AsciiTable, &cards),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn validate_image_extension_needs_gcount() {
        let cards = vec![
            card("XTENSION", Value::String(String::from("IMAGE"))),
            card("BITPIX", Value::Integer(-32)),
            card("NAXIS", Value::Integer(0)),
            card("PCOUNT", Value::Integer(0)),
        ];
        assert!(matches!(
            validate_required_keywords(HeaderKind::Image, &cards),
            Err(Error::MissingKeyword("GCOUNT"))
        ));
    }
}
