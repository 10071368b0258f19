//! Byte order tags and swap-aware scalar access.
//!
//! A record layout declares the byte order of its data with one of the four
//! format-string characters `=`, `<`, `>` or `!`.  Each field caches whether
//! its bytes must be reversed on this host, and every load and store in the
//! crate goes through the helpers below with that flag.

/// Declared byte order of record data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// `=` -- whatever the host uses.
    #[default]
    Native,
    /// `<` -- least-significant byte first.
    Little,
    /// `>` -- most-significant byte first (FITS order).
    Big,
    /// `!` -- network order, byte-identical to `Big`.
    Network,
}

impl Endian {
    /// Parse a format-string endian character.
    pub fn from_char(c: char) -> Option<Endian> {
        match c {
            '=' => Some(Endian::Native),
            '<' => Some(Endian::Little),
            '>' => Some(Endian::Big),
            '!' => Some(Endian::Network),
            _ => None,
        }
    }

    /// The format-string character for this byte order.
    pub fn as_char(self) -> char {
        match self {
            Endian::Native => '=',
            Endian::Little => '<',
            Endian::Big => '>',
            Endian::Network => '!',
        }
    }

    /// True when data in this order must be byte-reversed on the host.
    pub fn needs_swap(self) -> bool {
        match self {
            Endian::Native => false,
            Endian::Little => cfg!(target_endian = "big"),
            Endian::Big | Endian::Network => cfg!(target_endian = "little"),
        }
    }
}

/// Copy the first `N` bytes of `buf` into host order.
#[inline]
pub fn load<const N: usize>(buf: &[u8], swap: bool) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[..N]);
    if swap {
        out.reverse();
    }
    out
}

/// Store host-order `bytes` into the first `N` bytes of `buf`.
#[inline]
pub fn store<const N: usize>(buf: &mut [u8], mut bytes: [u8; N], swap: bool) {
    if swap {
        bytes.reverse();
    }
    buf[..N].copy_from_slice(&bytes);
}

#[inline]
pub fn read_u8(buf: &[u8]) -> u8 {
    buf[0]
}

#[inline]
pub fn read_i8(buf: &[u8]) -> i8 {
    buf[0] as i8
}

#[inline]
pub fn read_u16(buf: &[u8], swap: bool) -> u16 {
    u16::from_ne_bytes(load(buf, swap))
}

#[inline]
pub fn read_i16(buf: &[u8], swap: bool) -> i16 {
    i16::from_ne_bytes(load(buf, swap))
}

#[inline]
pub fn read_u32(buf: &[u8], swap: bool) -> u32 {
    u32::from_ne_bytes(load(buf, swap))
}

#[inline]
pub fn read_i32(buf: &[u8], swap: bool) -> i32 {
    i32::from_ne_bytes(load(buf, swap))
}

#[inline]
pub fn read_f32(buf: &[u8], swap: bool) -> f32 {
    f32::from_ne_bytes(load(buf, swap))
}

#[inline]
pub fn read_f64(buf: &[u8], swap: bool) -> f64 {
    f64::from_ne_bytes(load(buf, swap))
}

/// Read a complex pair of `f32`; each part is swapped on its own.
#[inline]
pub fn read_c32(buf: &[u8], swap: bool) -> (f32, f32) {
    (read_f32(buf, swap), read_f32(&buf[4..], swap))
}

/// Read a complex pair of `f64`; each part is swapped on its own.
#[inline]
pub fn read_c64(buf: &[u8], swap: bool) -> (f64, f64) {
    (read_f64(buf, swap), read_f64(&buf[8..], swap))
}

// --- Single-value writes ---

#[inline]
pub fn write_u8(buf: &mut [u8], val: u8) {
    buf[0] = val;
}

#[inline]
pub fn write_i8(buf: &mut [u8], val: i8) {
    buf[0] = val as u8;
}

#[inline]
pub fn write_u16(buf: &mut [u8], val: u16, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_i16(buf: &mut [u8], val: i16, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_u32(buf: &mut [u8], val: u32, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_i32(buf: &mut [u8], val: i32, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_f32(buf: &mut [u8], val: f32, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_f64(buf: &mut [u8], val: f64, swap: bool) {
    store(buf, val.to_ne_bytes(), swap);
}

#[inline]
pub fn write_c32(buf: &mut [u8], val: (f32, f32), swap: bool) {
    write_f32(buf, val.0, swap);
    write_f32(&mut buf[4..], val.1, swap);
}

#[inline]
pub fn write_c64(buf: &mut [u8], val: (f64, f64), swap: bool) {
    write_f64(buf, val.0, swap);
    write_f64(&mut buf[8..], val.1, swap);
}

// --- Bulk conversions ---

/// Reverse every `width`-byte element of `buf` in place.
///
/// # Panics
/// Panics if `buf.len()` is not a multiple of `width`.
pub fn swap_in_place(buf: &mut [u8], width: usize) {
    assert!(
        width > 0 && buf.len().is_multiple_of(width),
        "buffer length must be a multiple of the element width"
    );
    if width == 1 {
        return;
    }
    for chunk in buf.chunks_exact_mut(width) {
        chunk.reverse();
    }
}
