//! Header card values: parsing the 70-byte value field of a card and
//! formatting values back into it.

use std::fmt;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string, trailing blanks removed.
    String(String),
    /// FITS complex integer `(real, imaginary)`.
    ComplexInt(i64, i64),
    /// FITS complex float `(real, imaginary)`.
    ComplexFloat(f64, f64),
}

impl Value {
    /// Short type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Logical(_) => "logical",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::ComplexInt(..) => "complex integer",
            Value::ComplexFloat(..) => "complex float",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(b) => write!(f, "{}", if *b { 'T' } else { 'F' }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::ComplexInt(re, im) => write!(f, "({re}, {im})"),
            Value::ComplexFloat(re, im) => write!(f, "({re}, {im})"),
        }
    }
}

/// Locate a ` /` comment separator and return the trimmed comment after it.
///
/// Files written by IDL and friends omit the space after the slash, so only
/// the leading space is required.
fn split_comment(field: &[u8]) -> (&[u8], Option<&str>) {
    match field.windows(2).position(|w| w == b" /") {
        Some(i) => {
            let mut start = i + 2;
            if field.get(start) == Some(&b' ') {
                start += 1;
            }
            let comment = std::str::from_utf8(&field[start..])
                .ok()
                .map(str::trim_end)
                .filter(|s| !s.is_empty());
            (&field[..i], comment)
        }
        None => (field, None),
    }
}

/// Parse a quoted string starting at `field[0] == '\''`.
///
/// A doubled quote inside the string is a literal quote. An unterminated
/// string is accepted up to the end of the field.
fn parse_string(field: &[u8]) -> (Value, Option<&str>) {
    let mut value = String::new();
    let mut i = 1;
    while i < field.len() {
        match field[i] {
            b'\'' if field.get(i + 1) == Some(&b'\'') => {
                value.push('\'');
                i += 2;
            }
            b'\'' => {
                i += 1;
                break;
            }
            b => {
                value.push(b as char);
                i += 1;
            }
        }
    }
    let (_, comment) = split_comment(&field[i..]);
    let trimmed = value.trim_end().to_string();
    (Value::String(trimmed), comment)
}

/// Parse a float, accepting the Fortran `D` exponent marker.
fn parse_float_str(s: &str) -> Option<f64> {
    s.replace(['D', 'd'], "E").parse::<f64>().ok()
}

fn parse_complex(text: &str) -> Option<Value> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (left, right) = inner.split_once(',')?;
    let (left, right) = (left.trim(), right.trim());
    if let (Ok(re), Ok(im)) = (left.parse::<i64>(), right.parse::<i64>()) {
        return Some(Value::ComplexInt(re, im));
    }
    Some(Value::ComplexFloat(
        parse_float_str(left)?,
        parse_float_str(right)?,
    ))
}

/// Parse the value field of a card (bytes 10..80).
///
/// Returns the value and the optional inline comment, or `None` when the
/// field holds no value (an undefined keyword) or an unparseable one.
pub fn parse_value(value_bytes: &[u8]) -> Option<(Value, Option<&str>)> {
    let first = value_bytes.iter().position(|&b| b != b' ')?;
    let field = &value_bytes[first..];

    if field[0] == b'\'' {
        return Some(parse_string(field));
    }

    let (val_part, comment) = split_comment(value_bytes);
    let text = std::str::from_utf8(val_part).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    let value = match text {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        t if t.starts_with('(') => parse_complex(t)?,
        t if !t.contains(['.', 'E', 'e', 'D', 'd']) => match t.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Float(parse_float_str(t)?),
        },
        t => Value::Float(parse_float_str(t)?),
    };
    Some((value, comment))
}

/// Serialize a [`Value`] into a 70-byte field for bytes 10..80 of a card.
///
/// Numbers and logicals are right-justified in the first 20 bytes (card
/// columns 11-30). Strings open with a quote at byte 0 and are padded to at
/// least 8 characters.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    match value {
        Value::Logical(b) => buf[19] = if *b { b'T' } else { b'F' },
        Value::Integer(n) => right_justify(n.to_string().as_bytes(), &mut buf[..20]),
        Value::Float(f) => right_justify(format_float(*f, 20).as_bytes(), &mut buf[..20]),
        Value::String(s) => write_string(s, &mut buf),
        Value::ComplexInt(re, im) => {
            right_justify(format!("({re}, {im})").as_bytes(), &mut buf[..30])
        }
        Value::ComplexFloat(re, im) => {
            let s = format!("({}, {})", format_float(*re, 20), format_float(*im, 20));
            right_justify(s.as_bytes(), &mut buf[..50]);
        }
    }
    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

/// Format in exponent notation, dropping precision until it fits `max_len`.
fn format_float(f: f64, max_len: usize) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= max_len || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    buf[0] = b'\'';
    let mut pos = 1;
    for ch in s.bytes() {
        let width = if ch == b'\'' { 2 } else { 1 };
        if pos + width >= 70 {
            break;
        }
        buf[pos] = ch;
        if ch == b'\'' {
            buf[pos + 1] = b'\'';
        }
        pos += width;
    }
    // Closing quote no earlier than byte 9: strings are padded to 8 chars.
    buf[pos.max(9)] = b'\'';
}
