//! Shape checks and element-wise casts between record views.

use alloc::vec::Vec;

use crate::catalog::CastFn;
use crate::dimension::{skip_collapsed, Axis};
use crate::error::{Error, Result};
use crate::layout::{Field, FieldLayout};
use crate::record::Record;

/// Check that `src` can be cast into `dst`.
///
/// Both views must have the same active shape, and every field `src`
/// selects must have a cast into the field `dst` selects at the same place.
pub fn compare_layouts(dst: &Record, src: &Record) -> Result<()> {
    if dst.shape() != src.shape() {
        return Err(Error::ShapeMismatch);
    }
    let (df, sf) = (dst.dims().field_axis(), src.dims().field_axis());
    for (i, j) in df.positions().zip(sf.positions()) {
        let d = &dst.layout().fields()[i];
        let s = &src.layout().fields()[j];
        if d.cast_from(s).is_none() {
            return Err(Error::CastUnsupported {
                dst: d.kind,
                src: s.kind,
            });
        }
    }
    Ok(())
}

/// Cast every selected field of `src` into the matching field of `dst`.
///
/// The walk runs twice: a dry pass that checks depths, counts and casts,
/// then a pass that writes.  An error therefore leaves `dst` untouched.
/// `src` may alias `dst`; its bytes are then read from a snapshot taken
/// before the first write.
pub fn cast_view(dst: &Record, src: &Record) -> Result<()> {
    compare_layouts(dst, src)?;
    let (to, from) = (Side::of(dst), Side::of(src));
    let elements = walk(&to, &from, &mut |_: Step| {})?;
    let aliased = dst.buffer().ptr_eq(src.buffer());
    tracing::debug!(elements, aliased, "Casting record view");

    if aliased {
        let snapshot = src.buffer().try_to_vec()?;
        let mut out = dst.buffer().borrow_mut();
        walk(&to, &from, &mut |step: Step| step.apply(&mut out, &snapshot))?;
    } else {
        let input = src.buffer().borrow();
        let mut out = dst.buffer().borrow_mut();
        walk(&to, &from, &mut |step: Step| step.apply(&mut out, &input))?;
    }
    Ok(())
}

/// One field conversion: record offsets in each buffer, the two fields and
/// the cast between them.
#[derive(Clone, Copy)]
struct Step {
    dst_rec: usize,
    dst: Field,
    src_rec: usize,
    src: Field,
    cast: CastFn,
}

impl Step {
    fn apply(&self, out: &mut [u8], input: &[u8]) {
        (self.cast)(
            &self.dst,
            &mut out[self.dst_rec..],
            &self.src,
            &input[self.src_rec..],
        );
    }
}

struct Side<'a> {
    axes: &'a [Axis],
    layout: &'a FieldLayout,
    offset: usize,
}

impl<'a> Side<'a> {
    fn of(record: &'a Record) -> Side<'a> {
        Side {
            axes: record.dims().axes(),
            layout: record.layout(),
            offset: record.offset(),
        }
    }
}

/// Visit every field pair of the two views in order; returns the count.
fn walk<F: FnMut(Step)>(dst: &Side<'_>, src: &Side<'_>, visit: &mut F) -> Result<usize> {
    let mut visited = 0;
    descend(
        &mut |step| {
            visited += 1;
            visit(step)
        },
        (dst, dst.axes.len() - 1, dst.offset),
        (src, src.axes.len() - 1, src.offset),
    )?;
    Ok(visited)
}

type Cursor<'s, 'a> = (&'s Side<'a>, usize, usize);

fn descend<F: FnMut(Step)>(
    visit: &mut F,
    (dst, dk, doff): Cursor<'_, '_>,
    (src, sk, soff): Cursor<'_, '_>,
) -> Result<()> {
    let (dk, doff) = skip_collapsed(dst.axes, dk, doff);
    let (sk, soff) = skip_collapsed(src.axes, sk, soff);
    let (da, sa) = (&dst.axes[dk], &src.axes[sk]);
    if da.count() != sa.count() {
        return Err(Error::InternalCast);
    }

    match (dk, sk) {
        (0, 0) => {
            for (i, j) in da.positions().zip(sa.positions()) {
                let d = dst.layout.fields()[i];
                let s = src.layout.fields()[j];
                let cast = d.cast_from(&s).ok_or(Error::CastUnsupported {
                    dst: d.kind,
                    src: s.kind,
                })?;
                visit(Step {
                    dst_rec: doff,
                    dst: d,
                    src_rec: soff,
                    src: s,
                    cast,
                });
            }
            Ok(())
        }
        (0, _) | (_, 0) => Err(Error::InternalCast),
        _ => {
            for (p, q) in da.positions().zip(sa.positions()) {
                descend(
                    visit,
                    (dst, dk - 1, doff + p * da.stride),
                    (src, sk - 1, soff + q * sa.stride),
                )?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::dimension::{Dimensions, Index};
    use crate::format::parse;
    use crate::value::Value;
    use alloc::vec;

    fn pairs(values: &[(i64, i64)]) -> Value {
        Value::List(
            values
                .iter()
                .map(|&(a, b)| Value::Tuple(vec![a.into(), b.into()]))
                .collect(),
        )
    }

    #[test]
    fn int8_into_float64_is_exact() {
        let src = Record::new(&pairs(&[(-128, 127), (5, -6)]), Some("i8,i8")).unwrap();
        let dst = Record::new(&pairs(&[(0, 0), (0, 0)]), Some(">f64,f64")).unwrap();
        cast_view(&dst, &src).unwrap();
        assert_eq!(
            dst.values(),
            Value::List(vec![
                Value::Tuple(vec![(-128.0).into(), 127.0.into()]),
                Value::Tuple(vec![5.0.into(), (-6.0).into()]),
            ])
        );
    }

    #[test]
    fn int8_into_text_is_unsupported() {
        let src = Record::new(&pairs(&[(1, 2)]), Some("i8,i8")).unwrap();
        let dst = Record::from_bytes(vec![b' '; 8].into(), Some(1), Some("s4,s4")).unwrap();
        assert_eq!(
            compare_layouts(&dst, &src),
            Err(Error::CastUnsupported {
                dst: crate::catalog::ScalarKind::String,
                src: crate::catalog::ScalarKind::SInt8,
            })
        );
        let before = dst.buffer().to_vec();
        assert!(cast_view(&dst, &src).is_err());
        assert_eq!(dst.buffer().to_vec(), before);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let a = Record::new(&pairs(&[(1, 2), (3, 4)]), Some("i32,i32")).unwrap();
        let b = Record::new(&pairs(&[(1, 2)]), Some("i32,i32")).unwrap();
        assert_eq!(compare_layouts(&a, &b), Err(Error::ShapeMismatch));
        let one_field = a.view(&[Index::from(..), Index::At(0)]).unwrap();
        assert_eq!(compare_layouts(&a, &one_field), Err(Error::ShapeMismatch));
    }

    #[test]
    fn collapsed_axes_are_skipped() {
        let src = Record::new(&pairs(&[(1, 2), (3, 4), (5, 6)]), Some("i16,i16")).unwrap();
        let dst = Record::new(&pairs(&[(0, 0)]), Some("i32,i32")).unwrap();
        let row = src.view(&[Index::At(2)]).unwrap();
        let target = dst.view(&[Index::At(0)]).unwrap();
        cast_view(&target, &row).unwrap();
        assert_eq!(dst.values(), pairs(&[(5, 6)]));
    }

    #[test]
    fn self_overlapping_cast_reads_snapshot() {
        let rec = Record::new(&pairs(&[(1, 10), (2, 20), (3, 30)]), Some("i32,i32")).unwrap();
        let head = rec.view(&[Index::from(0..2)]).unwrap();
        let tail = rec.view(&[Index::from(1..3)]).unwrap();
        cast_view(&tail, &head).unwrap();
        assert_eq!(rec.values(), pairs(&[(1, 10), (1, 10), (2, 20)]));
    }

    #[test]
    fn large_casts_stream_field_pairs() {
        let n = 100_000;
        let bytes: Vec<u8> = (0..n).map(|i| i as u8).collect();
        let src = Record::from_bytes(bytes.into(), None, Some("i8")).unwrap();
        let dst = Record::from_bytes(Buffer::zeroed(2 * n).unwrap(), None, Some("<i16")).unwrap();
        assert_eq!(walk(&Side::of(&dst), &Side::of(&src), &mut |_: Step| {}), Ok(n));

        cast_view(&dst, &src).unwrap();
        let out = dst.buffer().to_vec();
        assert_eq!(&out[2..4], &[1, 0]);
        assert_eq!(&out[2 * 255..2 * 257], &[0xFF, 0xFF, 0, 0]);
    }

    fn count_steps(
        dst: (&Dimensions, &FieldLayout),
        src: (&Dimensions, &FieldLayout),
    ) -> Result<usize> {
        fn side<'a>((dims, layout): (&'a Dimensions, &'a FieldLayout)) -> Side<'a> {
            Side {
                axes: dims.axes(),
                layout,
                offset: 0,
            }
        }
        walk(&side(dst), &side(src), &mut |_: Step| {})
    }

    #[test]
    fn inconsistent_descent_is_internal() {
        let layout = parse("i32,i32").unwrap();
        let flat = Dimensions::from_shape(&[2, 2], layout.width()).unwrap();
        let nested = Dimensions::from_shape(&[1, 2, 2], layout.width())
            .unwrap()
            .select(&[Index::from(..)])
            .unwrap();
        assert_eq!(count_steps((&flat, &layout), (&flat, &layout)), Ok(4));
        // Same element count, different active depth.
        let deep = Dimensions::from_shape(&[2, 1, 2], layout.width()).unwrap();
        assert_eq!(
            count_steps((&flat, &layout), (&deep, &layout)),
            Err(Error::InternalCast)
        );
        assert_eq!(
            count_steps((&nested, &layout), (&flat, &layout)),
            Err(Error::InternalCast)
        );
    }
}
