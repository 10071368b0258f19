//! The shared byte region behind a family of record views.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell, RefMut};

use crate::error::{Error, Result};

/// A reference-counted, interior-mutable byte buffer.
///
/// Cloning a `Buffer` clones the handle, not the bytes: every view built by
/// indexing a record holds a handle to the same region, so writes through
/// one are visible through all.  The bytes are freed with the last handle.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl Buffer {
    /// Wrap existing bytes without copying them.
    pub fn new(bytes: Vec<u8>) -> Buffer {
        Buffer {
            bytes: Rc::new(RefCell::new(bytes)),
        }
    }

    /// Allocate `len` zero bytes, reporting allocation failure as an error.
    pub fn zeroed(len: usize) -> Result<Buffer> {
        if len > isize::MAX as usize {
            return Err(Error::SizeOverflow);
        }
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| Error::AllocationFailure)?;
        bytes.resize(len, 0);
        Ok(Buffer::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn borrow(&self) -> Ref<'_, [u8]> {
        Ref::map(self.bytes.borrow(), Vec::as_slice)
    }

    pub fn borrow_mut(&self) -> RefMut<'_, [u8]> {
        RefMut::map(self.bytes.borrow_mut(), Vec::as_mut_slice)
    }

    /// True when both handles point at the same bytes.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Number of live handles to these bytes.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.bytes)
    }

    /// A detached copy of the bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    /// A detached copy of the bytes, reporting allocation failure as an error.
    pub fn try_to_vec(&self) -> Result<Vec<u8>> {
        let bytes = self.bytes.borrow();
        let mut copy = Vec::new();
        copy.try_reserve_exact(bytes.len())
            .map_err(|_| Error::AllocationFailure)?;
        copy.extend_from_slice(&bytes);
        Ok(copy)
    }

    /// Take the bytes out, copying only if other handles are still alive.
    pub fn into_vec(self) -> Vec<u8> {
        match Rc::try_unwrap(self.bytes) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        }
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer::new(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Buffer::new(bytes.to_vec())
    }
}
