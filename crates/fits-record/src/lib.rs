#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod buffer;
pub mod cast;
pub mod catalog;
pub mod dimension;
pub mod endian;
pub mod error;
pub mod format;
pub mod header;
pub mod layout;
pub mod record;
pub mod tiles;
pub mod value;

#[cfg(feature = "array")]
pub mod array;

pub use buffer::Buffer;
pub use cast::{cast_view, compare_layouts};
pub use catalog::ScalarKind;
pub use dimension::{Index, SliceSpec};
pub use endian::Endian;
pub use error::{Error, Result};
pub use layout::{Field, FieldLayout};
pub use record::{Record, Selection, Source};
pub use tiles::Container;
pub use value::Value;
