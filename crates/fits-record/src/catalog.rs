//! The scalar type catalog and its cast matrix.
//!
//! The catalog is a fixed, ordered list of scalar kinds.  The order defines
//! the numeric kind codes and the promotion ranking used when a layout is
//! inferred from untyped sample data: narrower, less general kinds sort
//! before wider ones.
//!
//! Every kind carries a getter and a setter that move values between a
//! record's bytes and [`Value`]s, and a row of the cast matrix.  A cast reads
//! the source field in its own byte order, converts at host precision with
//! plain `as` semantics (same-width sign changes reinterpret the bits), then
//! writes the destination in its byte order.

use crate::endian::{
    read_c32, read_c64, read_f32, read_f64, read_i16, read_i32, read_i8, read_u16, read_u32,
    read_u8, write_c32, write_c64, write_f32, write_f64, write_i16, write_i32, write_i8,
    write_u16, write_u32, write_u8,
};
use crate::error::{Error, Result};
use crate::layout::Field;
use crate::value::Value;

/// Number of kinds in the catalog.
pub const NUM_KINDS: usize = 12;

/// One scalar kind of the catalog, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    /// `s` -- space-padded character data, width set per field.
    String,
    /// `c8` -- a single character.
    Char8,
    /// `I8` -- unsigned 8-bit integer.
    UInt8,
    /// `i8` -- signed 8-bit integer.
    SInt8,
    /// `I16` -- unsigned 16-bit integer.
    UInt16,
    /// `i16` -- signed 16-bit integer.
    SInt16,
    /// `I32` -- unsigned 32-bit integer.
    UInt32,
    /// `i32` -- signed 32-bit integer.
    SInt32,
    /// `f32` -- IEEE single.
    Float32,
    /// `f64` -- IEEE double.
    Float64,
    /// `F32` -- complex pair of IEEE singles.
    Complex32,
    /// `F64` -- complex pair of IEEE doubles.
    Complex64,
}

impl ScalarKind {
    /// Every kind, indexed by its code.
    pub const ALL: [ScalarKind; NUM_KINDS] = [
        ScalarKind::String,
        ScalarKind::Char8,
        ScalarKind::UInt8,
        ScalarKind::SInt8,
        ScalarKind::UInt16,
        ScalarKind::SInt16,
        ScalarKind::UInt32,
        ScalarKind::SInt32,
        ScalarKind::Float32,
        ScalarKind::Float64,
        ScalarKind::Complex32,
        ScalarKind::Complex64,
    ];

    pub fn code(self) -> usize {
        self as usize
    }

    pub fn from_code(code: usize) -> Option<ScalarKind> {
        Self::ALL.get(code).copied()
    }

    pub fn descriptor(self) -> &'static TypeDescriptor {
        &CATALOG[self.code()]
    }

    /// The format-string tag.
    pub fn tag(self) -> &'static str {
        self.descriptor().tag
    }

    /// Fixed byte width, or `None` for the variable-width string kind.
    pub fn width(self) -> Option<usize> {
        self.descriptor().width
    }

    pub fn is_text(self) -> bool {
        matches!(self, ScalarKind::String | ScalarKind::Char8)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::UInt8
                | ScalarKind::SInt8
                | ScalarKind::UInt16
                | ScalarKind::SInt16
                | ScalarKind::UInt32
                | ScalarKind::SInt32
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ScalarKind::Complex32 | ScalarKind::Complex64)
    }
}

/// Cast one field of a source record into one field of a destination record.
///
/// Both byte slices start at their record's first byte; the field offsets
/// select the bytes inside.
pub type CastFn = fn(dst: &Field, dst_rec: &mut [u8], src: &Field, src_rec: &[u8]);

/// Read one field of a record as a host value.
pub type GetFn = fn(field: &Field, rec: &[u8]) -> Value;

/// Store a host value into one field of a record.
pub type SetFn = fn(field: &Field, rec: &mut [u8], value: &Value) -> Result<()>;

/// Immutable description of one catalog kind.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub kind: ScalarKind,
    pub tag: &'static str,
    pub width: Option<usize>,
    pub get: GetFn,
    pub set: SetFn,
}

impl TypeDescriptor {
    /// The cast-matrix entry converting `src` into this kind.
    pub fn cast_from(&self, src: ScalarKind) -> Option<CastFn> {
        cast_fn(self.kind, src)
    }
}

/// The type catalog, indexed by kind code.
pub static CATALOG: [TypeDescriptor; NUM_KINDS] = [
    TypeDescriptor {
        kind: ScalarKind::String,
        tag: "s",
        width: None,
        get: get_text,
        set: set_text,
    },
    TypeDescriptor {
        kind: ScalarKind::Char8,
        tag: "c8",
        width: Some(1),
        get: get_text,
        set: set_text,
    },
    TypeDescriptor {
        kind: ScalarKind::UInt8,
        tag: "I8",
        width: Some(1),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::SInt8,
        tag: "i8",
        width: Some(1),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::UInt16,
        tag: "I16",
        width: Some(2),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::SInt16,
        tag: "i16",
        width: Some(2),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::UInt32,
        tag: "I32",
        width: Some(4),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::SInt32,
        tag: "i32",
        width: Some(4),
        get: get_numeric,
        set: set_integer,
    },
    TypeDescriptor {
        kind: ScalarKind::Float32,
        tag: "f32",
        width: Some(4),
        get: get_numeric,
        set: set_real,
    },
    TypeDescriptor {
        kind: ScalarKind::Float64,
        tag: "f64",
        width: Some(8),
        get: get_numeric,
        set: set_real,
    },
    TypeDescriptor {
        kind: ScalarKind::Complex32,
        tag: "F32",
        width: Some(8),
        get: get_numeric,
        set: set_complex,
    },
    TypeDescriptor {
        kind: ScalarKind::Complex64,
        tag: "F64",
        width: Some(16),
        get: get_numeric,
        set: set_complex,
    },
];

/// Look up the cast from `src` into `dst`.
///
/// The matrix is asymmetric: integers only widen (or change sign at the same
/// width), reals accept every integer and real, complex accepts every numeric
/// kind, and the two text kinds only accept each other.
pub fn cast_fn(dst: ScalarKind, src: ScalarKind) -> Option<CastFn> {
    use ScalarKind::*;
    let numeric: CastFn = cast_numeric;
    let text: CastFn = cast_text;
    match (dst, src) {
        (String | Char8, String | Char8) => Some(text),
        (UInt8 | SInt8, UInt8 | SInt8) => Some(numeric),
        (UInt16 | SInt16, UInt8 | SInt8 | UInt16 | SInt16) => Some(numeric),
        (UInt32 | SInt32, s) if s.is_integer() => Some(numeric),
        (Float32 | Float64, s) if s.is_integer() || matches!(s, Float32 | Float64) => {
            Some(numeric)
        }
        (Complex32 | Complex64, s) if !s.is_text() => Some(numeric),
        _ => None,
    }
}

/// True when the cast matrix has an entry for `src` into `dst`.
pub fn castable(dst: ScalarKind, src: ScalarKind) -> bool {
    cast_fn(dst, src).is_some()
}

/// A numeric field value at its native precision.
#[derive(Debug, Clone, Copy)]
enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    F64(f64),
    C32(f32, f32),
    C64(f64, f64),
}

impl Scalar {
    fn load(field: &Field, rec: &[u8]) -> Scalar {
        let buf = &rec[field.offset..];
        let swap = field.swap;
        match field.kind {
            ScalarKind::UInt8 => Scalar::U8(read_u8(buf)),
            ScalarKind::SInt8 => Scalar::I8(read_i8(buf)),
            ScalarKind::UInt16 => Scalar::U16(read_u16(buf, swap)),
            ScalarKind::SInt16 => Scalar::I16(read_i16(buf, swap)),
            ScalarKind::UInt32 => Scalar::U32(read_u32(buf, swap)),
            ScalarKind::SInt32 => Scalar::I32(read_i32(buf, swap)),
            ScalarKind::Float32 => Scalar::F32(read_f32(buf, swap)),
            ScalarKind::Float64 => Scalar::F64(read_f64(buf, swap)),
            ScalarKind::Complex32 => {
                let (re, im) = read_c32(buf, swap);
                Scalar::C32(re, im)
            }
            ScalarKind::Complex64 => {
                let (re, im) = read_c64(buf, swap);
                Scalar::C64(re, im)
            }
            // Text fields never reach the numeric path; the matrix keeps them apart.
            ScalarKind::String | ScalarKind::Char8 => Scalar::U8(read_u8(buf)),
        }
    }

    /// Exact integer value; reals truncate.
    fn integer(self) -> i64 {
        match self {
            Scalar::U8(v) => v as i64,
            Scalar::I8(v) => v as i64,
            Scalar::U16(v) => v as i64,
            Scalar::I16(v) => v as i64,
            Scalar::U32(v) => v as i64,
            Scalar::I32(v) => v as i64,
            Scalar::F32(v) | Scalar::C32(v, _) => v as i64,
            Scalar::F64(v) | Scalar::C64(v, _) => v as i64,
        }
    }

    /// Real part at double precision; exact for every 32-bit integer.
    fn real(self) -> f64 {
        match self {
            Scalar::F32(v) | Scalar::C32(v, _) => v as f64,
            Scalar::F64(v) | Scalar::C64(v, _) => v,
            other => other.integer() as f64,
        }
    }

    fn imag(self) -> f64 {
        match self {
            Scalar::C32(_, im) => im as f64,
            Scalar::C64(_, im) => im,
            _ => 0.0,
        }
    }

    fn store(self, field: &Field, rec: &mut [u8]) {
        let buf = &mut rec[field.offset..];
        let swap = field.swap;
        match field.kind {
            ScalarKind::UInt8 => write_u8(buf, self.integer() as u8),
            ScalarKind::SInt8 => write_i8(buf, self.integer() as i8),
            ScalarKind::UInt16 => write_u16(buf, self.integer() as u16, swap),
            ScalarKind::SInt16 => write_i16(buf, self.integer() as i16, swap),
            ScalarKind::UInt32 => write_u32(buf, self.integer() as u32, swap),
            ScalarKind::SInt32 => write_i32(buf, self.integer() as i32, swap),
            ScalarKind::Float32 => write_f32(buf, self.single(), swap),
            ScalarKind::Float64 => write_f64(buf, self.real(), swap),
            ScalarKind::Complex32 => write_c32(buf, (self.single(), self.imag() as f32), swap),
            ScalarKind::Complex64 => write_c64(buf, (self.real(), self.imag()), swap),
            ScalarKind::String | ScalarKind::Char8 => {}
        }
    }

    /// Real part at single precision, rounding once from the source value.
    fn single(self) -> f32 {
        match self {
            Scalar::F32(v) | Scalar::C32(v, _) => v,
            other => other.real() as f32,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Scalar::F32(v) => Value::Float(v as f64),
            Scalar::F64(v) => Value::Float(v),
            Scalar::C32(re, im) => Value::Complex(re as f64, im as f64),
            Scalar::C64(re, im) => Value::Complex(re, im),
            other => Value::Integer(other.integer()),
        }
    }
}

fn cast_numeric(dst: &Field, dst_rec: &mut [u8], src: &Field, src_rec: &[u8]) {
    Scalar::load(src, src_rec).store(dst, dst_rec);
}

/// Copy as many bytes as both fields hold and pad the rest with spaces.
fn cast_text(dst: &Field, dst_rec: &mut [u8], src: &Field, src_rec: &[u8]) {
    let n = dst.width.min(src.width);
    let out = &mut dst_rec[dst.offset..dst.offset + dst.width];
    out[..n].copy_from_slice(&src_rec[src.offset..src.offset + n]);
    out[n..].fill(b' ');
}

fn get_text(field: &Field, rec: &[u8]) -> Value {
    let bytes = &rec[field.offset..field.offset + field.width];
    Value::String(bytes.iter().map(|&b| b as char).collect())
}

fn get_numeric(field: &Field, rec: &[u8]) -> Value {
    Scalar::load(field, rec).into_value()
}

/// Store text up to the field width or the first NUL, padding with spaces.
fn set_text(field: &Field, rec: &mut [u8], value: &Value) -> Result<()> {
    let s = value
        .as_str()
        .ok_or(Error::UnconvertibleValue(field.kind))?;
    let out = &mut rec[field.offset..field.offset + field.width];
    let mut k = 0;
    for b in s.bytes().take_while(|&b| b != 0).take(out.len()) {
        out[k] = b;
        k += 1;
    }
    out[k..].fill(b' ');
    Ok(())
}

fn set_integer(field: &Field, rec: &mut [u8], value: &Value) -> Result<()> {
    let v = value
        .as_i64()
        .ok_or(Error::UnconvertibleValue(field.kind))?;
    store_integer(field, rec, v);
    Ok(())
}

fn store_integer(field: &Field, rec: &mut [u8], v: i64) {
    let buf = &mut rec[field.offset..];
    let swap = field.swap;
    match field.kind {
        ScalarKind::UInt8 => write_u8(buf, v as u8),
        ScalarKind::SInt8 => write_i8(buf, v as i8),
        ScalarKind::UInt16 => write_u16(buf, v as u16, swap),
        ScalarKind::SInt16 => write_i16(buf, v as i16, swap),
        ScalarKind::UInt32 => write_u32(buf, v as u32, swap),
        ScalarKind::SInt32 => write_i32(buf, v as i32, swap),
        _ => {}
    }
}

fn set_real(field: &Field, rec: &mut [u8], value: &Value) -> Result<()> {
    let v = value
        .as_f64()
        .ok_or(Error::UnconvertibleValue(field.kind))?;
    Scalar::F64(v).store(field, rec);
    Ok(())
}

fn set_complex(field: &Field, rec: &mut [u8], value: &Value) -> Result<()> {
    let (re, im) = value
        .as_complex()
        .ok_or(Error::UnconvertibleValue(field.kind))?;
    Scalar::C64(re, im).store(field, rec);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::layout::FieldLayout;
    use alloc::vec;

    fn layout(kinds: &[(ScalarKind, usize)], endian: Endian) -> FieldLayout {
        FieldLayout::from_kinds(kinds, endian)
    }

    #[test]
    fn catalog_order_matches_codes() {
        for (code, descr) in CATALOG.iter().enumerate() {
            assert_eq!(descr.kind.code(), code);
            assert_eq!(ScalarKind::from_code(code), Some(descr.kind));
        }
        assert_eq!(ScalarKind::from_code(NUM_KINDS), None);
    }

    #[test]
    fn tags_and_widths() {
        assert_eq!(ScalarKind::String.tag(), "s");
        assert_eq!(ScalarKind::String.width(), None);
        assert_eq!(ScalarKind::UInt16.tag(), "I16");
        assert_eq!(ScalarKind::Complex64.width(), Some(16));
        assert_eq!(ScalarKind::Complex32.width(), Some(8));
    }

    #[test]
    fn matrix_rows() {
        use ScalarKind::*;
        assert!(castable(Float64, SInt8));
        assert!(castable(Complex32, Complex64));
        assert!(castable(String, Char8));
        assert!(castable(UInt16, SInt16));
        assert!(!castable(String, SInt8));
        assert!(!castable(SInt8, SInt16));
        assert!(!castable(SInt32, Float32));
        assert!(!castable(Float64, Complex32));
        assert!(!castable(Float32, String));
    }

    #[test]
    fn matrix_entry_counts() {
        let count = |dst: ScalarKind| {
            ScalarKind::ALL
                .iter()
                .filter(|&&src| castable(dst, src))
                .count()
        };
        assert_eq!(count(ScalarKind::String), 2);
        assert_eq!(count(ScalarKind::SInt8), 2);
        assert_eq!(count(ScalarKind::UInt16), 4);
        assert_eq!(count(ScalarKind::SInt32), 6);
        assert_eq!(count(ScalarKind::Float32), 8);
        assert_eq!(count(ScalarKind::Complex64), 10);
    }

    #[test]
    fn sign_change_reinterprets_bits() {
        use ScalarKind::*;
        let src = layout(&[(SInt8, 1), (SInt16, 2)], Endian::Native);
        let dst = layout(&[(UInt8, 1), (UInt32, 4)], Endian::Native);
        let mut src_rec = vec![0u8; src.width()];
        src.fields()[0].set(&mut src_rec, &Value::Integer(-1)).unwrap();
        src.fields()[1].set(&mut src_rec, &Value::Integer(-2)).unwrap();

        let mut dst_rec = vec![0u8; dst.width()];
        for (d, s) in dst.fields().iter().zip(src.fields()) {
            cast_fn(d.kind, s.kind).unwrap()(d, &mut dst_rec, s, &src_rec);
        }
        assert_eq!(dst.fields()[0].get(&dst_rec), Value::Integer(255));
        assert_eq!(dst.fields()[1].get(&dst_rec), Value::Integer(0xFFFF_FFFE));
    }

    #[test]
    fn cast_across_byte_orders() {
        use ScalarKind::*;
        let src = layout(&[(SInt32, 4)], Endian::Big);
        let dst = layout(&[(Float64, 8)], Endian::Little);
        let src_rec = [0x00, 0x00, 0x01, 0x00];
        let mut dst_rec = [0u8; 8];
        cast_fn(Float64, SInt32).unwrap()(&dst.fields()[0], &mut dst_rec, &src.fields()[0], &src_rec);
        assert_eq!(dst_rec, 256.0f64.to_le_bytes());
    }

    #[test]
    fn real_to_complex_zeroes_imaginary() {
        use ScalarKind::*;
        let src = layout(&[(Float32, 4)], Endian::Native);
        let dst = layout(&[(Complex64, 16)], Endian::Big);
        let src_rec = 1.5f32.to_ne_bytes();
        let mut dst_rec = [0xAAu8; 16];
        cast_fn(Complex64, Float32).unwrap()(&dst.fields()[0], &mut dst_rec, &src.fields()[0], &src_rec);
        assert_eq!(dst.fields()[0].get(&dst_rec), Value::Complex(1.5, 0.0));
    }

    #[test]
    fn complex_narrowing_keeps_both_parts() {
        use ScalarKind::*;
        let src = layout(&[(Complex64, 16)], Endian::Native);
        let dst = layout(&[(Complex32, 8)], Endian::Native);
        let mut src_rec = [0u8; 16];
        src.fields()[0].set(&mut src_rec, &Value::Complex(0.5, -4.0)).unwrap();
        let mut dst_rec = [0u8; 8];
        cast_fn(Complex32, Complex64).unwrap()(&dst.fields()[0], &mut dst_rec, &src.fields()[0], &src_rec);
        assert_eq!(dst.fields()[0].get(&dst_rec), Value::Complex(0.5, -4.0));
    }

    #[test]
    fn text_cast_pads_with_spaces() {
        use ScalarKind::*;
        let src = layout(&[(String, 2)], Endian::Native);
        let dst = layout(&[(String, 4), (Char8, 1)], Endian::Native);
        let src_rec = *b"ab";
        let mut dst_rec = [0u8; 5];
        for d in dst.fields() {
            cast_fn(d.kind, String).unwrap()(d, &mut dst_rec, &src.fields()[0], &src_rec);
        }
        assert_eq!(&dst_rec, b"ab  a");
    }

    #[test]
    fn text_setter_truncates_and_pads() {
        let l = layout(&[(ScalarKind::String, 3)], Endian::Native);
        let f = &l.fields()[0];
        let mut rec = [0u8; 3];
        f.set(&mut rec, &Value::from("abcdef")).unwrap();
        assert_eq!(&rec, b"abc");
        f.set(&mut rec, &Value::from("z")).unwrap();
        assert_eq!(&rec, b"z  ");
        assert_eq!(f.get(&rec), Value::from("z  "));
    }

    #[test]
    fn setters_reject_wrong_host_kind() {
        use ScalarKind::*;
        let l = layout(&[(SInt16, 2), (String, 2), (Float32, 4)], Endian::Native);
        let mut rec = [0u8; 8];
        assert_eq!(
            l.fields()[0].set(&mut rec, &Value::from("x")),
            Err(Error::UnconvertibleValue(SInt16))
        );
        assert_eq!(
            l.fields()[1].set(&mut rec, &Value::Integer(3)),
            Err(Error::UnconvertibleValue(String))
        );
        assert_eq!(
            l.fields()[2].set(&mut rec, &Value::Complex(1.0, 1.0)),
            Err(Error::UnconvertibleValue(Float32))
        );
    }

    #[test]
    fn integer_setter_truncates_modulo_width() {
        let l = layout(&[(ScalarKind::SInt8, 1), (ScalarKind::UInt16, 2)], Endian::Big);
        let mut rec = [0u8; 3];
        l.fields()[0].set(&mut rec, &Value::Integer(300)).unwrap();
        l.fields()[1].set(&mut rec, &Value::Integer(-1)).unwrap();
        assert_eq!(l.fields()[0].get(&rec), Value::Integer(44));
        assert_eq!(l.fields()[1].get(&rec), Value::Integer(65535));
        assert_eq!(&rec[1..], &[0xFF, 0xFF]);
    }
}
