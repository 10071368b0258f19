//! Typed n-dimensional views over a shared byte buffer.
//!
//! A [`Record`] binds a [`Buffer`] to a [`FieldLayout`] and a set of
//! [`Dimensions`].  Indexing a record returns another record over the same
//! bytes; only [`Record::copy`] and [`Record::to_bytes`] allocate.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::buffer::Buffer;
use crate::cast::cast_view;
use crate::dimension::{skip_collapsed, Axis, Dimensions, Index};
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::format::{format_fields, infer, parse, record_fields};
use crate::layout::{Field, FieldLayout};
use crate::value::Value;

/// Format used by [`Record::from_bytes`] when none is given.
pub const DEFAULT_FORMAT: &str = "c8";

/// The result of indexing a record.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Every axis, the field axis included, was collapsed.
    Scalar(Value),
    /// A view sharing the indexed record's buffer.
    View(Record),
}

impl Selection {
    /// The selected data as host values.
    pub fn to_value(&self) -> Value {
        match self {
            Selection::Scalar(v) => v.clone(),
            Selection::View(r) => r.values(),
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Selection::View(r) => Some(r),
            Selection::Scalar(_) => None,
        }
    }
}

/// What [`Record::set`] writes from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Another record, cast field by field.
    Record(&'a Record),
    /// Nested host values, stored through the field setters.
    Values(&'a Value),
}

impl<'a> From<&'a Record> for Source<'a> {
    fn from(r: &'a Record) -> Self {
        Source::Record(r)
    }
}

impl<'a> From<&'a Value> for Source<'a> {
    fn from(v: &'a Value) -> Self {
        Source::Values(v)
    }
}

/// A strided, multi-field view of a byte buffer.
#[derive(Debug, Clone)]
pub struct Record {
    buffer: Buffer,
    offset: usize,
    dims: Dimensions,
    layout: FieldLayout,
}

/// Nesting shape of a sample, outermost first, ending in the field count.
fn sample_shape(sample: &Value, nfields: usize) -> Result<Vec<usize>> {
    match sample {
        Value::List(items) => {
            let shapes = items
                .iter()
                .map(|item| sample_shape(item, nfields))
                .collect::<Result<Vec<_>>>()?;
            if shapes.windows(2).any(|w| w[0] != w[1]) {
                return Err(Error::ShapeMismatch);
            }
            let mut shape = vec![items.len()];
            match shapes.into_iter().next() {
                Some(inner) => shape.extend(inner),
                None => shape.push(nfields),
            }
            Ok(shape)
        }
        record => {
            if record_fields(record).len() != nfields {
                return Err(Error::ShapeMismatch);
            }
            Ok(vec![nfields])
        }
    }
}

/// Bytes needed for `shape` (outermost first, field count last).
fn byte_size(shape: &[usize], width: usize) -> Result<usize> {
    shape[..shape.len() - 1]
        .iter()
        .try_fold(width, |acc, &n| acc.checked_mul(n))
        .ok_or(Error::SizeOverflow)
}

impl Record {
    /// Build a record array from nested sample data.
    ///
    /// Lists are outer axes and tuples are records.  Without a format the
    /// layout is inferred from the sample.
    pub fn new(sample: &Value, format: Option<&str>) -> Result<Record> {
        let layout = match format {
            Some(f) => parse(f)?,
            None => infer(sample)?,
        };
        let shape = sample_shape(sample, layout.len())?;
        let size = byte_size(&shape, layout.width())?;
        let buffer = Buffer::zeroed(size)?;
        tracing::debug!(
            shape = ?shape,
            format = %format_fields(layout.fields(), layout.endian()),
            bytes = size,
            "Creating record array"
        );

        let record = Record {
            buffer,
            offset: 0,
            dims: Dimensions::from_shape(&shape, layout.width())?,
            layout,
        };
        record.write_values(sample)?;
        Ok(record)
    }

    /// Bind an existing buffer without copying it.
    ///
    /// Without `count` the buffer must hold a whole number of records; with
    /// it, at least `count` records.  The default format is one `c8` field.
    pub fn from_bytes(buffer: Buffer, count: Option<usize>, format: Option<&str>) -> Result<Record> {
        let layout = parse(format.unwrap_or(DEFAULT_FORMAT))?;
        let width = layout.width();
        let len = buffer.len();
        let records = match count {
            None => {
                if len % width != 0 {
                    return Err(Error::SizeMismatch);
                }
                len / width
            }
            Some(count) => {
                let need = count.checked_mul(width).ok_or(Error::SizeOverflow)?;
                if len < need {
                    return Err(Error::BufferTooSmall);
                }
                count
            }
        };
        tracing::debug!(records, width, bytes = len, "Binding record buffer");

        let shape = [records, layout.len()];
        Ok(Record {
            buffer,
            offset: 0,
            dims: Dimensions::from_shape(&shape, width)?,
            layout,
        })
    }

    /// A view narrowed by `indices`, even when every axis collapses.
    pub fn view(&self, indices: &[Index]) -> Result<Record> {
        Ok(Record {
            buffer: self.buffer.clone(),
            offset: self.offset,
            dims: self.dims.select(indices)?,
            layout: self.layout.clone(),
        })
    }

    /// Index the record.
    ///
    /// A single entry selects along the outermost active axis; a longer
    /// index applies left to right.  Once no axis is left active the field
    /// value itself is returned.
    pub fn get(&self, indices: &[Index]) -> Result<Selection> {
        let view = self.view(indices)?;
        if view.dims.ndim() == 0 {
            Ok(Selection::Scalar(view.values()))
        } else {
            Ok(Selection::View(view))
        }
    }

    /// Overwrite the selected part of the record.
    ///
    /// Nothing is written unless the whole assignment is valid.
    pub fn set<'a>(&self, indices: &[Index], value: impl Into<Source<'a>>) -> Result<()> {
        let target = self.view(indices)?;
        match value.into() {
            Source::Record(src) => cast_view(&target, src),
            Source::Values(v) => target.write_values(v),
        }
    }

    fn write_values(&self, value: &Value) -> Result<()> {
        let mut plan = Vec::new();
        let axes = self.dims.axes();
        plan_values(&mut plan, axes, &self.layout, axes.len() - 1, self.offset, value)?;

        let mut scratch = vec![0u8; self.layout.width()];
        for (_, field, v) in &plan {
            field.set(&mut scratch, v)?;
        }

        let mut bytes = self.buffer.borrow_mut();
        for (rec, field, v) in &plan {
            field.set(&mut bytes[*rec..], v)?;
        }
        Ok(())
    }

    /// An independent copy of the selected data.
    ///
    /// The copy keeps only the selected fields, laid out back to back in
    /// `endian` (or the current byte order), in a buffer of its own.
    pub fn copy(&self, endian: Option<Endian>) -> Result<Record> {
        let endian = endian.unwrap_or(self.endian());
        let layout = self.layout.select(self.dims.field_axis().positions(), endian);
        let dims = self.dims.compact(layout.width());
        let size = self
            .dims
            .record_count()
            .checked_mul(layout.width())
            .ok_or(Error::SizeOverflow)?;
        tracing::debug!(
            format = %format_fields(layout.fields(), endian),
            bytes = size,
            "Copying record view"
        );

        let copy = Record {
            buffer: Buffer::zeroed(size)?,
            offset: 0,
            dims,
            layout,
        };
        cast_view(&copy, self)?;
        Ok(copy)
    }

    /// The selected data serialized as a fresh byte vector.
    pub fn to_bytes(&self, endian: Option<Endian>) -> Result<Vec<u8>> {
        Ok(self.copy(endian)?.buffer.into_vec())
    }

    /// Lengths of the active axes, outermost first.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.shape()
    }

    /// Re-view the selected records under a new shape.
    ///
    /// The view must cover whole contiguous records, and the new shape must
    /// keep both the field count (its last entry) and the total byte size.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<()> {
        if !self.dims.is_contiguous() {
            return Err(Error::NonContiguousReformat);
        }
        if shape.last() != Some(&self.layout.len()) {
            return Err(Error::ShapeMismatch);
        }
        let width = self.layout.width();
        let size = byte_size(shape, width)?;
        if Some(size) != self.dims.record_count().checked_mul(width) {
            return Err(Error::ShapeMismatch);
        }
        let dims = Dimensions::from_shape(shape, width)?;
        tracing::debug!(from = ?self.shape(), to = ?shape, "Reshaping record view");

        self.offset += self.dims.collapsed_offset();
        self.dims = dims;
        Ok(())
    }

    /// Canonical format string of the selected fields.
    pub fn format(&self) -> String {
        let fields: Vec<Field> = self
            .dims
            .field_axis()
            .positions()
            .map(|i| self.layout.fields()[i])
            .collect();
        format_fields(&fields, self.endian())
    }

    /// Reinterpret the record bytes under another format of the same width.
    ///
    /// Changing the number of fields needs the whole field axis in view.
    pub fn retype(&mut self, format: &str) -> Result<()> {
        let layout = parse(format)?;
        if layout.width() != self.layout.width() {
            return Err(Error::ShapeMismatch);
        }
        if layout.len() != self.layout.len() {
            if !self.dims.field_axis().is_full() {
                return Err(Error::NonContiguousReformat);
            }
            self.dims.reset_field_axis(layout.len());
        }
        tracing::debug!(from = %self.format(), to = format, "Retyping record view");
        self.layout = layout;
        Ok(())
    }

    /// Length of the outermost active axis; 1 when nothing is left active.
    pub fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole view as nested host values.
    pub fn values(&self) -> Value {
        let bytes = self.buffer.borrow();
        let axes = self.dims.axes();
        read_values(axes, &self.layout, axes.len() - 1, self.offset, &bytes)
    }

    pub fn endian(&self) -> Endian {
        self.layout.endian()
    }

    /// The full layout of one record, including fields outside the view.
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Byte offset of the view's origin within the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

fn read_values(axes: &[Axis], layout: &FieldLayout, k: usize, offset: usize, bytes: &[u8]) -> Value {
    let (k, offset) = skip_collapsed(axes, k, offset);
    let axis = &axes[k];
    let rec = &bytes[offset..];
    if k == 0 {
        if axis.active {
            Value::Tuple(axis.positions().map(|i| layout.fields()[i].get(rec)).collect())
        } else {
            layout.fields()[axis.start].get(rec)
        }
    } else {
        Value::List(
            axis.positions()
                .map(|p| read_values(axes, layout, k - 1, offset + p * axis.stride, bytes))
                .collect(),
        )
    }
}

type Assignment<'v> = (usize, Field, &'v Value);

fn plan_values<'v>(
    plan: &mut Vec<Assignment<'v>>,
    axes: &[Axis],
    layout: &FieldLayout,
    k: usize,
    offset: usize,
    value: &'v Value,
) -> Result<()> {
    let (k, offset) = skip_collapsed(axes, k, offset);
    let axis = &axes[k];
    if k == 0 {
        if !axis.active {
            plan.push((offset, layout.fields()[axis.start], value));
            return Ok(());
        }
        let items = record_fields(value);
        if items.len() != axis.count() {
            return Err(Error::ShapeMismatch);
        }
        for (i, v) in axis.positions().zip(items) {
            plan.push((offset, layout.fields()[i], v));
        }
        return Ok(());
    }

    let items = value.items().ok_or(Error::ShapeMismatch)?;
    if items.len() != axis.count() {
        return Err(Error::ShapeMismatch);
    }
    for (p, v) in axis.positions().zip(items) {
        plan_values(plan, axes, layout, k - 1, offset + p * axis.stride, v)?;
    }
    Ok(())
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record({}, format='{}')", self.values(), self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::SliceSpec;
    use alloc::string::ToString;

    fn table() -> Value {
        Value::List(vec![
            Value::Tuple(vec![7.into(), 3.5.into()]),
            Value::Tuple(vec![(-1).into(), 2.25.into()]),
        ])
    }

    #[test]
    fn new_infers_layout_and_shape() {
        let r = Record::new(&table(), None).unwrap();
        assert_eq!(r.format(), "=i32,f64");
        assert_eq!(r.shape(), vec![2, 2]);
        assert_eq!(r.buffer().len(), 24);
        assert_eq!(r.values(), table());
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn new_with_explicit_format() {
        let r = Record::new(&table(), Some(">i32,f64")).unwrap();
        assert_eq!(&r.buffer().borrow()[..4], &[0, 0, 0, 7]);
        assert_eq!(r.endian(), Endian::Big);
    }

    #[test]
    fn new_rejects_ragged_and_bad_values() {
        let ragged = Value::List(vec![
            Value::List(vec![Value::Tuple(vec![1.into()])]),
            Value::List(vec![]),
        ]);
        assert_eq!(Record::new(&ragged, Some("i8")).unwrap_err(), Error::ShapeMismatch);
        assert_eq!(Record::new(&table(), Some("i8")).unwrap_err(), Error::ShapeMismatch);
        assert_eq!(
            Record::new(&table(), Some("i8,s3")).unwrap_err(),
            Error::UnconvertibleValue(crate::catalog::ScalarKind::String)
        );
    }

    #[test]
    fn get_scalar_and_views() {
        let r = Record::new(&table(), None).unwrap();
        match r.get(&[Index::At(1), Index::At(1)]).unwrap() {
            Selection::Scalar(v) => assert_eq!(v, Value::Float(2.25)),
            Selection::View(_) => panic!("expected a scalar"),
        }
        let row = r.get(&[Index::At(0)]).unwrap().into_record().unwrap();
        assert_eq!(row.shape(), vec![2]);
        assert_eq!(row.values(), Value::Tuple(vec![7.into(), 3.5.into()]));
        assert_eq!(row.len(), 2);

        let col = r.view(&[Index::from(..), Index::At(0)]).unwrap();
        assert_eq!(col.values(), Value::List(vec![7.into(), (-1).into()]));
        assert_eq!(col.format(), "=i32");
    }

    #[test]
    fn set_is_all_or_nothing() {
        let r = Record::new(&table(), None).unwrap();
        let before = r.buffer().to_vec();
        let bad = Value::List(vec![
            Value::Tuple(vec![1.into(), 1.0.into()]),
            Value::Tuple(vec![2.into(), "x".into()]),
        ]);
        assert_eq!(
            r.set(&[], &bad).unwrap_err(),
            Error::UnconvertibleValue(crate::catalog::ScalarKind::Float64)
        );
        assert_eq!(r.buffer().to_vec(), before);

        let short = Value::List(vec![Value::Tuple(vec![1.into(), 1.0.into()])]);
        assert_eq!(r.set(&[], &short).unwrap_err(), Error::ShapeMismatch);
        assert_eq!(r.buffer().to_vec(), before);
    }

    #[test]
    fn set_single_field_and_record() {
        let r = Record::new(&table(), None).unwrap();
        r.set(&[Index::At(1), Index::At(0)], &Value::Integer(42)).unwrap();
        r.set(&[Index::At(0)], &Value::Tuple(vec![0.into(), 0.5.into()]))
            .unwrap();
        assert_eq!(
            r.values(),
            Value::List(vec![
                Value::Tuple(vec![0.into(), 0.5.into()]),
                Value::Tuple(vec![42.into(), 2.25.into()]),
            ])
        );
    }

    #[test]
    fn set_from_record_casts() {
        let r = Record::new(&table(), Some("i32,f64")).unwrap();
        let ints = Record::new(&Value::Tuple(vec![5.into(), 6.into()]), Some("i8,i16")).unwrap();
        r.set(&[Index::At(1)], &ints).unwrap();
        assert_eq!(
            r.get(&[Index::At(1)]).unwrap().to_value(),
            Value::Tuple(vec![5.into(), 6.0.into()])
        );
    }

    #[test]
    fn copy_keeps_selected_fields_only() {
        let r = Record::new(&table(), Some(">i32,f64")).unwrap();
        let col = r.view(&[Index::from(..), Index::At(1)]).unwrap();
        let c = col.copy(Some(Endian::Little)).unwrap();
        assert_eq!(c.format(), "<f64");
        assert_eq!(c.buffer().len(), 16);
        assert_eq!(c.values(), Value::List(vec![3.5.into(), 2.25.into()]));
        assert!(!c.buffer().ptr_eq(r.buffer()));
    }

    #[test]
    fn reshape_contiguous_only() {
        let sample = Value::List((0..6).map(|i| Value::Tuple(vec![i.into()])).collect());
        let mut r = Record::new(&sample, Some("i16")).unwrap();
        r.reshape(&[2, 3, 1]).unwrap();
        assert_eq!(r.shape(), vec![2, 3, 1]);
        assert_eq!(
            r.get(&[Index::At(1), Index::At(2), Index::At(0)]).unwrap().to_value(),
            Value::Integer(5)
        );

        assert_eq!(r.reshape(&[4, 1]), Err(Error::ShapeMismatch));
        assert_eq!(r.reshape(&[6, 2]), Err(Error::ShapeMismatch));

        let mut row = r.view(&[Index::At(1)]).unwrap();
        row.reshape(&[3, 1]).unwrap();
        assert_eq!(
            row.values(),
            Value::List(vec![
                Value::Tuple(vec![3.into()]),
                Value::Tuple(vec![4.into()]),
                Value::Tuple(vec![5.into()]),
            ])
        );

        let mut stepped = r
            .view(&[Index::Slice(SliceSpec::all()), Index::Slice(SliceSpec::all().with_step(2))])
            .unwrap();
        assert_eq!(stepped.reshape(&[4, 1]), Err(Error::NonContiguousReformat));
    }

    #[test]
    fn reshape_of_empty_record_rejects_overflowing_strides() {
        let mut empty = Record::new(&Value::List(vec![]), Some("i8")).unwrap();
        assert_eq!(empty.shape(), vec![0, 1]);
        assert_eq!(
            empty.reshape(&[0, usize::MAX / 2, 4, 1]),
            Err(Error::SizeOverflow)
        );
        assert_eq!(empty.shape(), vec![0, 1]);
        empty.reshape(&[0, 3, 1]).unwrap();
        assert_eq!(empty.shape(), vec![0, 3, 1]);
    }

    #[test]
    fn retype_preserves_width() {
        let mut r = Record::new(&table(), Some("<i32,f64")).unwrap();
        r.retype("<I32,i32,i32").unwrap();
        assert_eq!(r.shape(), vec![2, 3]);
        assert_eq!(r.get(&[Index::At(0), Index::At(0)]).unwrap().to_value(), Value::Integer(7));
        assert_eq!(r.retype("i32"), Err(Error::ShapeMismatch));

        let mut narrowed = r.view(&[Index::from(..), Index::from(0..2)]).unwrap();
        assert_eq!(narrowed.retype("<i32,f64"), Err(Error::NonContiguousReformat));
        narrowed.retype("<i32,i32,I32").unwrap();
        assert_eq!(narrowed.format(), "<i32,i32");
    }

    #[test]
    fn display_shows_values_and_format() {
        let r = Record::new(&table(), Some(">i32,f64")).unwrap();
        assert_eq!(
            r.to_string(),
            "record([(7, 3.5), (-1, 2.25)], format='>i32,f64')"
        );
    }

    #[test]
    fn single_record_sample() {
        let r = Record::new(&Value::Tuple(vec![1.into(), "ab".into()]), None).unwrap();
        assert_eq!(r.shape(), vec![2]);
        assert_eq!(r.format(), "=i32,s2");
        assert_eq!(r.get(&[Index::At(1)]).unwrap().to_value(), Value::from("ab"));
    }
}
