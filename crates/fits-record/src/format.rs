//! The record format grammar.
//!
//! A format string describes one record:
//!
//! ```text
//! [endian] tag[size] (, tag[size])*
//! ```
//!
//! `endian` is one of `=`, `<`, `>` or `!`.  Tags are the catalog tags; a
//! tag may be abbreviated to any prefix, and the most general kind with that
//! prefix wins (`i` is `i32`, `f` is `f64`).  The string kind `s` must carry
//! a decimal byte count.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::catalog::ScalarKind;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::layout::{Field, FieldLayout};
use crate::value::Value;

fn syntax(msg: impl Into<String>) -> Error {
    Error::FormatSyntax(msg.into())
}

/// Parse a format string into a field layout.
pub fn parse(format: &str) -> Result<FieldLayout> {
    let rest = format.trim_start_matches(' ');
    let mut chars = rest.chars();
    let (endian, body) = match chars.next().and_then(Endian::from_char) {
        Some(endian) => (endian, chars.as_str()),
        None => (Endian::Native, rest),
    };
    if body.trim().is_empty() {
        return Err(syntax("empty format"));
    }

    let mut kinds = Vec::new();
    for token in body.split(',') {
        kinds.push(parse_token(token.trim())?);
    }
    Ok(FieldLayout::from_kinds(&kinds, endian))
}

fn parse_token(token: &str) -> Result<(ScalarKind, usize)> {
    if token.is_empty() {
        return Err(syntax("empty field"));
    }
    if let Some(count) = token.strip_prefix('s') {
        if count.is_empty() {
            return Err(syntax("missing byte count after 's'"));
        }
        if !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(syntax(format!("bad byte count in '{token}'")));
        }
        let width: usize = count
            .parse()
            .map_err(|_| syntax(format!("bad byte count in '{token}'")))?;
        if width == 0 {
            return Err(syntax("string fields need at least one byte"));
        }
        return Ok((ScalarKind::String, width));
    }

    ScalarKind::ALL
        .iter()
        .rev()
        .filter(|k| **k != ScalarKind::String)
        .find(|k| k.tag().starts_with(token))
        .map(|&k| (k, 0))
        .ok_or_else(|| syntax(format!("unknown type tag '{token}'")))
}

/// Print a layout in canonical form.
pub fn format(layout: &FieldLayout) -> String {
    format_fields(layout.fields(), layout.endian())
}

/// Print a list of fields in canonical form.
pub fn format_fields(fields: &[Field], endian: Endian) -> String {
    let mut out = String::new();
    out.push(endian.as_char());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(field.kind.tag());
        if field.kind == ScalarKind::String {
            out.push_str(&format!("{}", field.width));
        }
    }
    out
}

/// Widest kind needed so far at one record position.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Numeric(ScalarKind),
    Text(usize),
}

impl Slot {
    fn of(value: &Value) -> Result<Slot> {
        match value {
            Value::Integer(_) => Ok(Slot::Numeric(ScalarKind::SInt32)),
            Value::Float(_) => Ok(Slot::Numeric(ScalarKind::Float64)),
            Value::Complex(..) => Ok(Slot::Numeric(ScalarKind::Complex64)),
            Value::String(s) => Ok(Slot::Text(s.len())),
            Value::Tuple(_) | Value::List(_) => Err(syntax("nested sequence inside a record")),
        }
    }

    fn promote(self, other: Slot) -> Slot {
        match (self, other) {
            (Slot::Text(a), Slot::Text(b)) => Slot::Text(a.max(b)),
            (Slot::Text(a), Slot::Numeric(_)) | (Slot::Numeric(_), Slot::Text(a)) => Slot::Text(a),
            (Slot::Numeric(a), Slot::Numeric(b)) => Slot::Numeric(a.max(b)),
        }
    }

    fn kind(self) -> (ScalarKind, usize) {
        match self {
            Slot::Numeric(kind) => (kind, 0),
            Slot::Text(width) => (ScalarKind::String, width.max(1)),
        }
    }
}

/// The fields of one record in a sample: a tuple, or a bare scalar.
pub(crate) fn record_fields(value: &Value) -> &[Value] {
    match value {
        Value::Tuple(items) => items,
        scalar => core::slice::from_ref(scalar),
    }
}

fn gather(sample: &Value, slots: &mut Option<Vec<Slot>>) -> Result<()> {
    if let Value::List(items) = sample {
        for item in items {
            gather(item, slots)?;
        }
        return Ok(());
    }

    let fields = record_fields(sample);
    match slots {
        None => {
            *slots = Some(fields.iter().map(Slot::of).collect::<Result<_>>()?);
        }
        Some(slots) => {
            if slots.len() != fields.len() {
                return Err(Error::ShapeMismatch);
            }
            for (slot, value) in slots.iter_mut().zip(fields) {
                *slot = slot.promote(Slot::of(value)?);
            }
        }
    }
    Ok(())
}

/// Infer a native-order layout from nested sample data.
///
/// Lists are outer axes and tuples are records.  Every record position is
/// promoted to the widest kind seen there: integers to `i32`, floats to
/// `f64`, complex values to `F64`, and text to `s` sized for the longest
/// string.  Text wins over any number.
pub fn infer(sample: &Value) -> Result<FieldLayout> {
    let mut slots = None;
    gather(sample, &mut slots)?;
    let slots = match slots {
        Some(slots) if !slots.is_empty() => slots,
        _ => return Err(syntax("cannot infer a format from an empty sample")),
    };
    let kinds: Vec<_> = slots.into_iter().map(Slot::kind).collect();
    Ok(FieldLayout::from_kinds(&kinds, Endian::Native))
}
