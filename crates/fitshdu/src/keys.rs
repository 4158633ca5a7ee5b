//! Typed access to header keyword values.

use crate::error::{Error, Result};
use crate::file::FitsFile;
use crate::layout::Hdu;
use crate::value::Value;

/// Types that can be read from a header card of an HDU.
pub trait ReadsKey: Sized {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self>;
}

/// Types that can be written to a header card of the current HDU.
pub trait WritesKey {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()>;
}

fn find_value<'a>(hdu: &'a Hdu, name: &str) -> Result<&'a Value> {
    hdu.cards()
        .iter()
        .filter(|card| card.keyword_str() == name)
        .find_map(|card| card.value())
        .ok_or_else(|| Error::KeyNotFound(name.to_string()))
}

impl ReadsKey for i64 {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self> {
        match find_value(hdu, name)? {
            Value::Integer(n) => Ok(*n),
            _ => Err(Error::BadKeywordType(name.to_string())),
        }
    }
}

impl ReadsKey for f64 {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self> {
        match find_value(hdu, name)? {
            Value::Float(f) => Ok(*f),
            Value::Integer(n) => Ok(*n as f64),
            _ => Err(Error::BadKeywordType(name.to_string())),
        }
    }
}

impl ReadsKey for bool {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self> {
        match find_value(hdu, name)? {
            Value::Logical(b) => Ok(*b),
            _ => Err(Error::BadKeywordType(name.to_string())),
        }
    }
}

impl ReadsKey for String {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self> {
        match find_value(hdu, name)? {
            Value::String(s) => Ok(s.trim().to_string()),
            _ => Err(Error::BadKeywordType(name.to_string())),
        }
    }
}

impl ReadsKey for Value {
    fn read_key(hdu: &Hdu, name: &str) -> Result<Self> {
        find_value(hdu, name).cloned()
    }
}

impl WritesKey for i64 {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()> {
        file.put_value(name, Value::Integer(*value))
    }
}

impl WritesKey for f64 {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()> {
        file.put_value(name, Value::Float(*value))
    }
}

impl WritesKey for bool {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()> {
        file.put_value(name, Value::Logical(*value))
    }
}

impl WritesKey for str {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()> {
        file.put_value(name, Value::String(value.to_string()))
    }
}

impl WritesKey for String {
    fn write_key(file: &mut FitsFile, name: &str, value: &Self) -> Result<()> {
        <str as WritesKey>::write_key(file, name, value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::scan_hdus;
    use crate::layout::tests::{build_fits, card, primary};

    fn sample_hdu() -> Hdu {
        let mut cards = primary(16, &[]);
        cards.push(card("EXPTIME", Value::Float(30.5)));
        cards.push(card("NCOMBINE", Value::Integer(4)));
        cards.push(card("OBJECT", Value::String(String::from("M31  "))));
        cards.push(card("FLATCOR", Value::Logical(false)));
        let data = build_fits(&[(cards, 0)]);
        scan_hdus(&data).unwrap().remove(0)
    }

    #[test]
    fn read_typed_values() {
        let hdu = sample_hdu();
        assert_eq!(i64::read_key(&hdu, "NCOMBINE").unwrap(), 4);
        assert_eq!(f64::read_key(&hdu, "EXPTIME").unwrap(), 30.5);
        assert_eq!(f64::read_key(&hdu, "NCOMBINE").unwrap(), 4.0);
        assert!(!bool::read_key(&hdu, "FLATCOR").unwrap());
        assert_eq!(String::read_key(&hdu, "OBJECT").unwrap(), "M31");
        assert_eq!(Value::read_key(&hdu, "BITPIX").unwrap(), Value::Integer(16));
    }

    #[test]
    fn missing_key() {
        let hdu = sample_hdu();
        match i64::read_key(&hdu, "GAIN") {
            Err(Error::KeyNotFound(name)) => assert_eq!(name, "GAIN"),
            other => panic!("Expected KeyNotFound, got {:?}", other),
        }
    }

    #[test]
    fn wrong_type() {
        let hdu = sample_hdu();
        assert!(matches!(
            i64::read_key(&hdu, "OBJECT"),
            Err(Error::BadKeywordType(_))
        ));
        assert!(matches!(
            String::read_key(&hdu, "EXPTIME"),
            Err(Error::BadKeywordType(_))
        ));
    }
}
