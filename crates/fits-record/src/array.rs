//! Conversions between record views and `ndarray` arrays of `f64`.
//!
//! The field axis of a record is the last array axis.  Only real numeric
//! fields convert; complex and text fields report `CastUnsupported`.

use alloc::string::String;
use alloc::vec::Vec;

use bytemuck::pod_collect_to_vec;
use ndarray::{Array, ArrayD};

use crate::buffer::Buffer;
use crate::catalog::ScalarKind;
use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::layout::Field;
use crate::record::Record;

const NATIVE_F64: Field = Field {
    kind: ScalarKind::Float64,
    offset: 0,
    width: 8,
    swap: false,
};

/// Copy the selected part of `record` into an array shaped like the view.
pub fn to_array(record: &Record) -> Result<ArrayD<f64>> {
    let copy = record.copy(Some(Endian::Native))?;
    let layout = copy.layout();
    if layout.is_empty() {
        return Array::from_shape_vec(copy.shape(), Vec::new()).map_err(|_| Error::ShapeMismatch);
    }
    let casts = layout
        .fields()
        .iter()
        .map(|f| {
            NATIVE_F64.cast_from(f).ok_or(Error::CastUnsupported {
                dst: ScalarKind::Float64,
                src: f.kind,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let nfields = layout.len();
    let count = copy.dims().record_count();
    let mut out = Vec::with_capacity(count * nfields * 8);
    {
        let bytes = copy.buffer().borrow();
        let mut slot = [0u8; 8];
        for rec in bytes.chunks_exact(layout.width()).take(count) {
            for (field, cast) in layout.fields().iter().zip(&casts) {
                cast(&NATIVE_F64, &mut slot, field, rec);
                out.extend_from_slice(&slot);
            }
        }
    }
    let data: Vec<f64> = pod_collect_to_vec(&out);
    Array::from_shape_vec(copy.shape(), data).map_err(|_| Error::ShapeMismatch)
}

/// Build a native-order `f64` record array from `array`.
///
/// The last array axis becomes the field axis, so `[rows, n]` gives `rows`
/// records of `n` fields.
pub fn from_array(array: &ArrayD<f64>) -> Result<Record> {
    let shape = array.shape().to_vec();
    let nfields = match shape.last() {
        Some(&n) if n > 0 => n,
        _ => return Err(Error::ShapeMismatch),
    };
    let count = shape[..shape.len() - 1].iter().product::<usize>();

    let values: Vec<f64> = array.iter().copied().collect();
    let bytes: Vec<u8> = pod_collect_to_vec(&values);
    let format: String = core::iter::repeat("f64")
        .take(nfields)
        .collect::<Vec<_>>()
        .join(",");

    let mut record = Record::from_bytes(Buffer::new(bytes), Some(count), Some(&format))?;
    record.reshape(&shape)?;
    Ok(record)
}
