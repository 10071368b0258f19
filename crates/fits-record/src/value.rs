use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A host-side value read from or written into a record array.
///
/// Scalars map one-to-one onto fields.  A `Tuple` holds the fields of one
/// record and a `List` holds the entries of one outer axis, so a two-record
/// table of `(int, float)` reads back as
/// `List([Tuple([Integer, Float]), Tuple([Integer, Float])])`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer of any catalog width.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Complex value `(real, imaginary)`.
    Complex(f64, f64),
    /// Character data, as stored in `s` and `c8` fields.
    String(String),
    /// The fields of one record.
    Tuple(Vec<Value>),
    /// The entries of one outer axis.
    List(Vec<Value>),
}

impl Value {
    /// True for `Integer`, `Float`, `Complex` and `String`.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Tuple(_) | Value::List(_))
    }

    /// Integer view used by integer setters; floats truncate toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Real view used by floating-point setters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Complex view used by complex setters; reals get a zero imaginary part.
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self {
            Value::Complex(re, im) => Some((*re, *im)),
            other => other.as_f64().map(|re| (re, 0.0)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The nested entries of a `Tuple` or `List`.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(v) | Value::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Complex(re, im) => write!(f, "({re:?}{im:+?}j)"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
        }
    }
}
