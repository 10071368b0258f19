use alloc::string::String;

use crate::catalog::ScalarKind;

/// All errors that can occur while laying out, viewing, or casting records.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A format string could not be parsed.
    FormatSyntax(String),
    /// Two views disagree in axis count or axis lengths, or a reshape would
    /// change the total byte width.
    ShapeMismatch,
    /// No cast is defined from `src` into `dst`.
    CastUnsupported { dst: ScalarKind, src: ScalarKind },
    /// An integer index fell outside the axis, or a slice step was zero.
    IndexOutOfRange,
    /// More indices were supplied than there are active axes.
    TooManyIndices,
    /// The requested buffer size does not fit in the address space.
    SizeOverflow,
    /// The buffer length is not a multiple of the record width.
    SizeMismatch,
    /// The buffer holds fewer bytes than the requested record count needs.
    BufferTooSmall,
    /// The field count of a sliced or collapsed view cannot be changed.
    NonContiguousReformat,
    /// The buffer allocation failed.
    AllocationFailure,
    /// The two sides of a cast descended to inconsistent depths.
    InternalCast,
    /// A host value cannot be stored into a field of this kind.
    UnconvertibleValue(ScalarKind),
    /// Unrecognized image precision (BITPIX) code.
    InvalidBitpix(i64),
    /// The tile compression algorithm is not handled here.
    UnsupportedCompression,
    /// A compressed tile payload could not be decoded.
    DecompressionError,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::FormatSyntax(msg) => write!(f, "bad format string: {msg}"),
            Error::ShapeMismatch => write!(f, "array shapes are not equal"),
            Error::CastUnsupported { dst, src } => {
                write!(f, "cannot cast items from {} to {}", src.tag(), dst.tag())
            }
            Error::IndexOutOfRange => write!(f, "record index out of range"),
            Error::TooManyIndices => write!(f, "too many indices"),
            Error::SizeOverflow => write!(f, "buffer size exceeds addressable memory"),
            Error::SizeMismatch => write!(f, "buffer size not multiple of record size"),
            Error::BufferTooSmall => write!(f, "buffer size is less than requested size"),
            Error::NonContiguousReformat => {
                write!(f, "cannot change format of non-contiguous array")
            }
            Error::AllocationFailure => write!(f, "buffer allocation failed"),
            Error::InternalCast => write!(f, "internal record error while casting"),
            Error::UnconvertibleValue(kind) => {
                write!(f, "value cannot be stored in a {} field", kind.tag())
            }
            Error::InvalidBitpix(v) => write!(f, "invalid BITPIX value: {v}"),
            Error::UnsupportedCompression => write!(f, "unsupported compression algorithm"),
            Error::DecompressionError => write!(f, "tile decompression failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_format_syntax() {
        let e = Error::FormatSyntax("unknown type tag 'q'".into());
        assert_eq!(e.to_string(), "bad format string: unknown type tag 'q'");
    }

    #[test]
    fn display_cast_unsupported() {
        let e = Error::CastUnsupported {
            dst: ScalarKind::String,
            src: ScalarKind::SInt8,
        };
        assert_eq!(e.to_string(), "cannot cast items from i8 to s");
    }

    #[test]
    fn display_index_errors() {
        assert_eq!(Error::IndexOutOfRange.to_string(), "record index out of range");
        assert_eq!(Error::TooManyIndices.to_string(), "too many indices");
    }

    #[test]
    fn display_invalid_bitpix() {
        let e = Error::InvalidBitpix(-99);
        assert_eq!(e.to_string(), "invalid BITPIX value: -99");
    }

    #[test]
    fn display_unconvertible_value() {
        let e = Error::UnconvertibleValue(ScalarKind::Float64);
        assert_eq!(e.to_string(), "value cannot be stored in a f64 field");
    }

    #[test]
    fn result_type_alias() {
        let ok: Result<u32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<u32> = Err(Error::ShapeMismatch);
        assert!(err.is_err());
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        let e = Error::SizeMismatch;
        assert!(e.source().is_none());
    }
}
