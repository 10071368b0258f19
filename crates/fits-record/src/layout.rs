//! Per-field byte layout of one record.

use alloc::vec::Vec;

use crate::catalog::{cast_fn, CastFn, ScalarKind, TypeDescriptor};
use crate::endian::Endian;
use crate::error::Result;
use crate::value::Value;

/// One typed, fixed-offset slot within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Catalog kind of the stored value.
    pub kind: ScalarKind,
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Bytes occupied by the field.
    pub width: usize,
    /// True when the stored bytes are in the opposite order to the host.
    pub swap: bool,
}

impl Field {
    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.kind.descriptor()
    }

    /// Read this field out of a record's bytes.
    pub fn get(&self, rec: &[u8]) -> Value {
        (self.descriptor().get)(self, rec)
    }

    /// Store a host value into this field of a record's bytes.
    pub fn set(&self, rec: &mut [u8], value: &Value) -> Result<()> {
        (self.descriptor().set)(self, rec, value)
    }

    /// The cast that converts `src` into this field, if one is defined.
    pub fn cast_from(&self, src: &Field) -> Option<CastFn> {
        cast_fn(self.kind, src.kind)
    }
}

/// The ordered fields of one record plus their total byte width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    fields: Vec<Field>,
    width: usize,
    endian: Endian,
}

impl FieldLayout {
    /// Lay out `kinds` back to back in the given byte order.
    ///
    /// The width in each pair is only used for the string kind; every other
    /// kind takes its catalog width.
    pub fn from_kinds(kinds: &[(ScalarKind, usize)], endian: Endian) -> FieldLayout {
        Self::packed(kinds.iter().copied(), endian)
    }

    fn packed(kinds: impl Iterator<Item = (ScalarKind, usize)>, endian: Endian) -> FieldLayout {
        let swap = endian.needs_swap();
        let mut fields = Vec::new();
        let mut offset = 0usize;
        for (kind, width) in kinds {
            let width = kind.width().unwrap_or(width);
            fields.push(Field {
                kind,
                offset,
                width,
                swap,
            });
            offset += width;
        }
        FieldLayout {
            fields,
            width: offset,
            endian,
        }
    }

    /// The same fields re-laid in another byte order.
    pub fn with_endian(&self, endian: Endian) -> FieldLayout {
        Self::packed(self.fields.iter().map(|f| (f.kind, f.width)), endian)
    }

    /// A compact layout holding only the fields at `indices`, in that order.
    pub fn select(&self, indices: impl Iterator<Item = usize>, endian: Endian) -> FieldLayout {
        Self::packed(
            indices.map(|i| (self.fields[i].kind, self.fields[i].width)),
            endian,
        )
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total bytes per record.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }
}
