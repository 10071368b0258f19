//! Axis selections and strides for record views.
//!
//! A view's dimensions are stored innermost first.  Axis 0 is the field
//! axis: its positions are field indices and its stride is zero, because
//! fields are addressed through their layout offsets.  Axis 1 is the record
//! axis with a stride of one record width, and every further axis strides
//! over all the axes inside it.
//!
//! Shapes are reported the other way round, outermost first, with the field
//! count last.  Indices are applied in reported order too.

use alloc::vec::Vec;
use core::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{Error, Result};

/// The current selection along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    /// First selected position.
    pub start: usize,
    /// One past the last position the selection may reach.
    pub stop: usize,
    /// Distance between selected positions; at least 1.
    pub step: usize,
    /// Length of the underlying axis.
    pub len: usize,
    /// Bytes between consecutive positions.
    pub stride: usize,
    /// False once the axis has been collapsed by an integer index.
    pub active: bool,
}

impl Axis {
    fn full(len: usize, stride: usize) -> Axis {
        Axis {
            start: 0,
            stop: len,
            step: 1,
            len,
            stride,
            active: true,
        }
    }

    /// Number of selected positions.
    pub fn count(&self) -> usize {
        (self.stop - self.start).div_ceil(self.step)
    }

    /// Absolute position of the `i`-th selected entry.
    pub fn position(&self, i: usize) -> usize {
        self.start + i * self.step
    }

    /// Every selected absolute position, in order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count()).map(|i| self.position(i))
    }

    /// True for an active axis selecting every position once, in order.
    pub fn is_full(&self) -> bool {
        self.active && self.start == 0 && self.stop == self.len && self.step == 1
    }

    fn index(&mut self, i: usize) -> Result<()> {
        if i >= self.count() {
            return Err(Error::IndexOutOfRange);
        }
        self.start = self.position(i);
        self.stop = self.start + 1;
        self.step = 1;
        self.active = false;
        Ok(())
    }

    fn slice(&mut self, spec: &SliceSpec) -> Result<()> {
        if spec.step == 0 {
            return Err(Error::IndexOutOfRange);
        }
        let n = self.count();
        let lo = spec.start.unwrap_or(0).min(n);
        let hi = spec.stop.unwrap_or(n).clamp(lo, n);
        // A step past the end of the selection reaches only its first entry.
        let s = spec.step.min(n.max(1));
        let count = (hi - lo).div_ceil(s);

        let start = if lo < n { self.position(lo) } else { self.start };
        let step = if count > 1 { self.step * s } else { 1 };
        self.start = start;
        self.step = step;
        self.stop = match count {
            0 => start,
            _ => start + (count - 1) * step + 1,
        };
        self.active = true;
        Ok(())
    }
}

/// Walk inwards from axis `k` past collapsed record axes.
///
/// Returns the first active axis at or inside `k` (or the field axis) and
/// `offset` advanced by each skipped axis's fixed position.
pub(crate) fn skip_collapsed(axes: &[Axis], mut k: usize, mut offset: usize) -> (usize, usize) {
    while k > 0 && !axes[k].active {
        offset += axes[k].start * axes[k].stride;
        k -= 1;
    }
    (k, offset)
}

/// A `start:stop:step` selection; open ends default to the whole axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: usize,
}

impl SliceSpec {
    pub fn new(start: usize, stop: usize) -> SliceSpec {
        SliceSpec {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// Every position of the axis.
    pub fn all() -> SliceSpec {
        SliceSpec {
            start: None,
            stop: None,
            step: 1,
        }
    }

    pub fn with_step(mut self, step: usize) -> SliceSpec {
        self.step = step;
        self
    }
}

impl From<Range<usize>> for SliceSpec {
    fn from(r: Range<usize>) -> Self {
        SliceSpec::new(r.start, r.end)
    }
}

impl From<RangeFrom<usize>> for SliceSpec {
    fn from(r: RangeFrom<usize>) -> Self {
        SliceSpec {
            start: Some(r.start),
            ..SliceSpec::all()
        }
    }
}

impl From<RangeTo<usize>> for SliceSpec {
    fn from(r: RangeTo<usize>) -> Self {
        SliceSpec {
            stop: Some(r.end),
            ..SliceSpec::all()
        }
    }
}

impl From<RangeFull> for SliceSpec {
    fn from(_: RangeFull) -> Self {
        SliceSpec::all()
    }
}

/// One entry of an index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    /// Collapse the axis to one position.
    At(usize),
    /// Narrow the axis, keeping it active.
    Slice(SliceSpec),
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Index::At(i)
    }
}

impl From<SliceSpec> for Index {
    fn from(s: SliceSpec) -> Self {
        Index::Slice(s)
    }
}

impl From<Range<usize>> for Index {
    fn from(r: Range<usize>) -> Self {
        Index::Slice(r.into())
    }
}

impl From<RangeFull> for Index {
    fn from(r: RangeFull) -> Self {
        Index::Slice(r.into())
    }
}

/// The axes of one record view, innermost (field axis) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    axes: Vec<Axis>,
}

impl Dimensions {
    /// Build full, active axes for `shape` given outermost first.
    ///
    /// The last entry is the field count; every earlier entry is a record
    /// axis of `record_width`-byte records.  Fails with `SizeOverflow` when a
    /// stride does not fit in `usize`, whatever the other axis lengths.
    pub fn from_shape(shape: &[usize], record_width: usize) -> Result<Dimensions> {
        let mut axes = Vec::with_capacity(shape.len());
        let mut stride = record_width;
        for (k, &len) in shape.iter().rev().enumerate() {
            if k == 0 {
                axes.push(Axis::full(len, 0));
            } else {
                axes.push(Axis::full(len, stride));
                stride = stride.checked_mul(len).ok_or(Error::SizeOverflow)?;
            }
        }
        Ok(Dimensions { axes })
    }

    /// A compact model holding the same selection as `self`.
    ///
    /// Every axis keeps its activity; its length becomes the selected count
    /// and strides are recomputed for `record_width`.
    pub fn compact(&self, record_width: usize) -> Dimensions {
        let mut axes = Vec::with_capacity(self.axes.len());
        let mut stride = record_width;
        for (k, axis) in self.axes.iter().enumerate() {
            let len = axis.count();
            let mut compact = Axis::full(len, if k == 0 { 0 } else { stride });
            compact.active = axis.active;
            if k > 0 {
                stride *= len;
            }
            axes.push(compact);
        }
        Dimensions { axes }
    }

    /// All axes, innermost first.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn field_axis(&self) -> &Axis {
        &self.axes[0]
    }

    /// Replace the field axis with a full selection of `len` fields.
    pub(crate) fn reset_field_axis(&mut self, len: usize) {
        self.axes[0] = Axis::full(len, 0);
    }

    /// Indices of the active axes in reported order, outermost first.
    pub fn active_axes(&self) -> Vec<usize> {
        (0..self.axes.len())
            .rev()
            .filter(|&k| self.axes[k].active)
            .collect()
    }

    /// Number of active axes.
    pub fn ndim(&self) -> usize {
        self.axes.iter().filter(|a| a.active).count()
    }

    /// Selected lengths of the active axes, outermost first.
    pub fn shape(&self) -> Vec<usize> {
        self.active_axes()
            .into_iter()
            .map(|k| self.axes[k].count())
            .collect()
    }

    /// Number of selected records.
    pub fn record_count(&self) -> usize {
        self.axes[1..].iter().map(Axis::count).product()
    }

    /// True when the selection covers one unbroken run of whole records.
    ///
    /// The field axis and the record axes from the innermost outwards must be
    /// full; once a collapsed record axis is met, every axis outside it must
    /// be collapsed too.
    pub fn is_contiguous(&self) -> bool {
        if !self.axes[0].is_full() {
            return false;
        }
        let mut collapsed = false;
        for axis in &self.axes[1..] {
            if axis.active {
                if collapsed || !axis.is_full() {
                    return false;
                }
            } else {
                collapsed = true;
            }
        }
        true
    }

    /// Byte offset contributed by the collapsed record axes.
    pub fn collapsed_offset(&self) -> usize {
        self.axes[1..]
            .iter()
            .filter(|a| !a.active)
            .map(|a| a.start * a.stride)
            .sum()
    }

    /// Apply an index expression, returning the narrowed dimensions.
    ///
    /// Entries map onto the active axes in reported order, so a single entry
    /// selects along the outermost active axis.
    pub fn select(&self, indices: &[Index]) -> Result<Dimensions> {
        let active = self.active_axes();
        if indices.len() > active.len() {
            return Err(Error::TooManyIndices);
        }
        let mut out = self.clone();
        for (index, &k) in indices.iter().zip(&active) {
            let axis = &mut out.axes[k];
            match index {
                Index::At(i) => axis.index(*i)?,
                Index::Slice(spec) => axis.slice(spec)?,
            }
        }
        tracing::trace!(indices = indices.len(), ndim = out.ndim(), "Applied index");
        Ok(out)
    }
}
