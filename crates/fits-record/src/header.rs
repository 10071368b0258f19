//! Typed header keyword lookups and the BITPIX storage table.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::catalog::ScalarKind;
use crate::error::{Error, Result};
use crate::value::Value;

/// Read-only access to header keywords with caller-supplied defaults.
///
/// A keyword that is missing, or whose value has the wrong type, yields the
/// default.  Only [`KeywordLookup::lookup`] needs implementing.
pub trait KeywordLookup {
    /// The raw value stored under `keyword`.
    fn lookup(&self, keyword: &str) -> Option<&Value>;

    fn contains(&self, keyword: &str) -> bool {
        self.lookup(keyword).is_some()
    }

    /// String value with surrounding blanks removed.
    fn get_string(&self, keyword: &str, default: &str) -> String {
        match self.lookup(keyword) {
            Some(Value::String(s)) => s.trim().into(),
            _ => default.into(),
        }
    }

    fn get_int(&self, keyword: &str, default: i32) -> i32 {
        match self.lookup(keyword) {
            Some(Value::Integer(n)) => *n as i32,
            _ => default,
        }
    }

    fn get_long(&self, keyword: &str, default: i64) -> i64 {
        match self.lookup(keyword) {
            Some(Value::Integer(n)) => *n,
            _ => default,
        }
    }

    fn get_longlong(&self, keyword: &str, default: i64) -> i64 {
        self.get_long(keyword, default)
    }

    /// Float value; integers are promoted.
    fn get_float(&self, keyword: &str, default: f32) -> f32 {
        match self.lookup(keyword) {
            Some(Value::Float(f)) => *f as f32,
            Some(Value::Integer(n)) => *n as f32,
            _ => default,
        }
    }

    /// Double value; integers are promoted.
    fn get_double(&self, keyword: &str, default: f64) -> f64 {
        match self.lookup(keyword) {
            Some(Value::Float(f)) => *f,
            Some(Value::Integer(n)) => *n as f64,
            _ => default,
        }
    }
}

impl KeywordLookup for BTreeMap<String, Value> {
    fn lookup(&self, keyword: &str) -> Option<&Value> {
        self.get(keyword)
    }
}

/// Ordered keyword/value pairs; the first match wins.
impl KeywordLookup for [(String, Value)] {
    fn lookup(&self, keyword: &str) -> Option<&Value> {
        self.iter().find(|(k, _)| k == keyword).map(|(_, v)| v)
    }
}

#[cfg(feature = "std")]
impl<S: std::hash::BuildHasher> KeywordLookup for std::collections::HashMap<String, Value, S> {
    fn lookup(&self, keyword: &str) -> Option<&Value> {
        self.get(keyword)
    }
}

/// Image pixel precision, as given by the BITPIX keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitpix {
    Byte,
    Short,
    Long,
    LongLong,
    Float,
    Double,
}

/// On-disk scalar storage code for image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCode {
    Byte,
    Short,
    Int,
    LongLong,
    Float,
    Double,
}

impl StorageCode {
    /// The numeric data type code used by FITS libraries.
    pub fn code(self) -> i32 {
        match self {
            StorageCode::Byte => 11,
            StorageCode::Short => 21,
            StorageCode::Int => 31,
            StorageCode::LongLong => 81,
            StorageCode::Float => 42,
            StorageCode::Double => 82,
        }
    }
}

impl Bitpix {
    pub fn from_code(bitpix: i64) -> Result<Bitpix> {
        match bitpix {
            8 => Ok(Bitpix::Byte),
            16 => Ok(Bitpix::Short),
            32 => Ok(Bitpix::Long),
            64 => Ok(Bitpix::LongLong),
            -32 => Ok(Bitpix::Float),
            -64 => Ok(Bitpix::Double),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Bitpix::Byte => 8,
            Bitpix::Short => 16,
            Bitpix::Long => 32,
            Bitpix::LongLong => 64,
            Bitpix::Float => -32,
            Bitpix::Double => -64,
        }
    }

    pub fn storage_code(self) -> StorageCode {
        match self {
            Bitpix::Byte => StorageCode::Byte,
            Bitpix::Short => StorageCode::Short,
            Bitpix::Long => StorageCode::Int,
            Bitpix::LongLong => StorageCode::LongLong,
            Bitpix::Float => StorageCode::Float,
            Bitpix::Double => StorageCode::Double,
        }
    }

    /// Catalog kind holding one pixel; the catalog has no 64-bit integer.
    pub fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            Bitpix::Byte => Some(ScalarKind::UInt8),
            Bitpix::Short => Some(ScalarKind::SInt16),
            Bitpix::Long => Some(ScalarKind::SInt32),
            Bitpix::LongLong => None,
            Bitpix::Float => Some(ScalarKind::Float32),
            Bitpix::Double => Some(ScalarKind::Float64),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        (self.code().unsigned_abs() / 8) as usize
    }

    pub fn is_float(self) -> bool {
        self.code() < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn header() -> BTreeMap<String, Value> {
        let mut h = BTreeMap::new();
        h.insert("ZCMPTYPE".into(), Value::from("GZIP_1  "));
        h.insert("ZBITPIX".into(), Value::Integer(-32));
        h.insert("ZSCALE".into(), Value::Integer(2));
        h.insert("ZZERO".into(), Value::Float(0.5));
        h
    }

    #[test]
    fn present_keywords() {
        let h = header();
        assert_eq!(h.get_string("ZCMPTYPE", "RICE_1"), "GZIP_1");
        assert_eq!(h.get_int("ZBITPIX", 0), -32);
        assert_eq!(h.get_long("ZBITPIX", 0), -32);
        assert_eq!(h.get_double("ZSCALE", 1.0), 2.0);
        assert_eq!(h.get_float("ZZERO", 0.0), 0.5);
        assert!(h.contains("ZZERO"));
    }

    #[test]
    fn missing_or_mistyped_keywords_use_default() {
        let h = header();
        assert_eq!(h.get_string("ZNAME1", ""), "");
        assert_eq!(h.get_int("ZNAXIS", 0), 0);
        assert_eq!(h.get_longlong("THEAP", 2880), 2880);
        assert_eq!(h.get_int("ZCMPTYPE", 7), 7);
        assert_eq!(h.get_string("ZBITPIX", "none"), "none");
        assert_eq!(h.get_double("ZCMPTYPE", 1.0), 1.0);
    }

    #[test]
    fn ordered_pairs_first_match_wins() {
        let cards: Vec<(String, Value)> = vec![
            ("NAXIS".into(), Value::Integer(2)),
            ("NAXIS".into(), Value::Integer(3)),
        ];
        assert_eq!(cards.as_slice().get_int("NAXIS", 0), 2);
        assert_eq!(cards.as_slice().get_int("NAXIS1", -1), -1);
    }

    #[test]
    fn bitpix_table() {
        let expected = [
            (8, StorageCode::Byte, Some(ScalarKind::UInt8), 1),
            (16, StorageCode::Short, Some(ScalarKind::SInt16), 2),
            (32, StorageCode::Int, Some(ScalarKind::SInt32), 4),
            (64, StorageCode::LongLong, None, 8),
            (-32, StorageCode::Float, Some(ScalarKind::Float32), 4),
            (-64, StorageCode::Double, Some(ScalarKind::Float64), 8),
        ];
        for (code, storage, kind, bytes) in expected {
            let b = Bitpix::from_code(code).unwrap();
            assert_eq!(b.code(), code);
            assert_eq!(b.storage_code(), storage);
            assert_eq!(b.scalar_kind(), kind);
            assert_eq!(b.bytes_per_pixel(), bytes);
        }
        assert_eq!(StorageCode::Double.code(), 82);
    }

    #[test]
    fn bitpix_rejects_unknown() {
        assert_eq!(Bitpix::from_code(24), Err(Error::InvalidBitpix(24)));
        assert_eq!(Bitpix::from_code(0), Err(Error::InvalidBitpix(0)));
    }
}
