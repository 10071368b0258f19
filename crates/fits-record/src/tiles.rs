//! Tile-compression boundary.
//!
//! A tile-compressed image is cut into rectangular tiles, each stored as one
//! payload: compressed bytes, optionally with the scale and zero point used
//! to quantize floating-point pixels, or the raw pixels when a tile could
//! not be compressed.  Codec parameters come from the `Z*` header keywords.
//!
//! Only GZIP_1 payloads are coded here.  RICE_1, PLIO_1 and HCOMPRESS_1 are
//! recognized and configured, but their codecs live outside this crate.
//!
//! Decoded tiles are handed out as big-endian [`Record`]s, so byte order and
//! type conversion go through the record engine.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use bytemuck::pod_collect_to_vec;

use crate::buffer::Buffer;
use crate::cast::cast_view;
use crate::endian::{swap_in_place, Endian};
use crate::error::{Error, Result};
use crate::header::{Bitpix, KeywordLookup};
use crate::record::Record;

/// Axes beyond this count are ignored when reading tile geometry.
pub const MAX_COMPRESS_DIM: usize = 6;

pub const DEFAULT_COMPRESSION_TYPE: &str = "RICE_1";
pub const DEFAULT_BLOCK_SIZE: i32 = 32;
pub const DEFAULT_BYTE_PIX: i32 = 4;
pub const DEFAULT_QUANTIZE_LEVEL: f32 = 16.0;
pub const DEFAULT_HCOMP_SCALE: f32 = 0.0;
pub const DEFAULT_HCOMP_SMOOTH: i32 = 0;

/// Tile compression algorithm, from `ZCMPTYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Rice1,
    Gzip1,
    Plio1,
    Hcompress1,
}

impl Compression {
    pub fn from_name(name: &str) -> Result<Compression> {
        match name.trim() {
            "RICE_1" | "RICE_ONE" => Ok(Compression::Rice1),
            "GZIP_1" => Ok(Compression::Gzip1),
            "PLIO_1" => Ok(Compression::Plio1),
            "HCOMPRESS_1" => Ok(Compression::Hcompress1),
            _ => Err(Error::UnsupportedCompression),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compression::Rice1 => "RICE_1",
            Compression::Gzip1 => "GZIP_1",
            Compression::Plio1 => "PLIO_1",
            Compression::Hcompress1 => "HCOMPRESS_1",
        }
    }
}

/// Image axes and the tile shape laid over them, fastest axis first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGeometry {
    axes: Vec<usize>,
    tile: Vec<usize>,
}

impl TileGeometry {
    /// Lay `tile` over `axes`.
    ///
    /// A zero tile length means the default: the whole row along the first
    /// axis, one pixel along every other axis.  Tiles never exceed the axis.
    pub fn new(axes: &[usize], tile: &[usize]) -> TileGeometry {
        let tile = axes
            .iter()
            .enumerate()
            .map(|(k, &len)| {
                let t = tile.get(k).copied().unwrap_or(0);
                let t = match (t, k) {
                    (0, 0) => len,
                    (0, _) => 1,
                    (t, _) => t,
                };
                t.min(len).max(1)
            })
            .collect();
        TileGeometry {
            axes: axes.to_vec(),
            tile,
        }
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn tile_shape(&self) -> &[usize] {
        &self.tile
    }

    /// Number of tiles along each axis.
    pub fn tiles_per_axis(&self) -> Vec<usize> {
        self.axes
            .iter()
            .zip(&self.tile)
            .map(|(&len, &t)| len.div_ceil(t))
            .collect()
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        if self.axes.is_empty() || self.axes.contains(&0) {
            return 0;
        }
        self.tiles_per_axis().iter().product()
    }

    /// Pixels in the largest tile.
    pub fn max_tile_len(&self) -> usize {
        self.tile.iter().product()
    }

    /// Per-axis extent of tile `index`; edge tiles are clipped to the image.
    pub fn extent(&self, index: usize) -> Result<Vec<usize>> {
        if index >= self.tile_count() {
            return Err(Error::IndexOutOfRange);
        }
        let mut rest = index;
        let mut extent = Vec::with_capacity(self.axes.len());
        for ((&len, &t), n) in self.axes.iter().zip(&self.tile).zip(self.tiles_per_axis()) {
            let pos = rest % n;
            rest /= n;
            extent.push(t.min(len - pos * t));
        }
        Ok(extent)
    }

    /// Pixels in tile `index`.
    pub fn tile_len(&self, index: usize) -> Result<usize> {
        Ok(self.extent(index)?.iter().product())
    }
}

/// Which optional per-tile columns the compressed table carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileColumns {
    pub zscale: bool,
    pub zzero: bool,
    pub zblank: bool,
    pub uncompressed: bool,
}

impl TileColumns {
    /// Scan `TTYPE1..=TFIELDS` for the per-tile column names.
    pub fn from_header<H: KeywordLookup + ?Sized>(header: &H) -> TileColumns {
        let tfields = header.get_long("TFIELDS", 0).max(0);
        let mut columns = TileColumns::default();
        for idx in 1..=tfields {
            match header.get_string(&format!("TTYPE{idx}"), "").as_str() {
                "ZSCALE" => columns.zscale = true,
                "ZZERO" => columns.zzero = true,
                "ZBLANK" => columns.zblank = true,
                "UNCOMPRESSED_DATA" => columns.uncompressed = true,
                _ => {}
            }
        }
        columns
    }
}

/// Codec configuration for one compressed image.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParams {
    pub compression: Compression,
    pub zbitpix: Bitpix,
    /// Axis count declared by `ZNAXIS`, before capping.
    pub zndim: usize,
    pub geometry: TileGeometry,
    pub columns: TileColumns,
    pub rice_blocksize: i32,
    pub rice_bytepix: i32,
    pub quantize_level: f32,
    pub hcomp_smooth: i32,
    pub hcomp_scale: f32,
    pub zscale: f64,
    pub zzero: f64,
    pub zblank: i32,
    /// True when floating-point pixels are stored as scaled integers.
    pub quantized: bool,
}

impl CodecParams {
    /// Read the codec configuration from compressed-image header keywords.
    pub fn from_header<H: KeywordLookup + ?Sized>(header: &H) -> Result<CodecParams> {
        let zbitpix = Bitpix::from_code(header.get_long("ZBITPIX", 0))?;
        let columns = TileColumns::from_header(header);

        let zblank = if columns.zblank {
            0
        } else if header.contains("ZBLANK") {
            header.get_int("ZBLANK", 0)
        } else {
            header.get_int("BLANK", 0)
        };
        let zscale = header.get_double("ZSCALE", 1.0);
        let zzero = header.get_double("ZZERO", 0.0);
        let quantized = zbitpix.is_float() && (columns.zscale || header.contains("ZSCALE"));

        let compression =
            Compression::from_name(&header.get_string("ZCMPTYPE", DEFAULT_COMPRESSION_TYPE))?;

        let zndim = header.get_long("ZNAXIS", 0).max(0) as usize;
        let ndim = zndim.min(MAX_COMPRESS_DIM);
        let mut axes = Vec::with_capacity(ndim);
        let mut tile = Vec::with_capacity(ndim);
        for idx in 1..=ndim {
            axes.push(header.get_long(&format!("ZNAXIS{idx}"), 0).max(0) as usize);
            tile.push(header.get_long(&format!("ZTILE{idx}"), 0).max(0) as usize);
        }

        let mut params = CodecParams {
            compression,
            zbitpix,
            zndim,
            geometry: TileGeometry::new(&axes, &tile),
            columns,
            rice_blocksize: DEFAULT_BLOCK_SIZE,
            rice_bytepix: DEFAULT_BYTE_PIX,
            quantize_level: DEFAULT_QUANTIZE_LEVEL,
            hcomp_smooth: DEFAULT_HCOMP_SMOOTH,
            hcomp_scale: DEFAULT_HCOMP_SCALE,
            zscale,
            zzero,
            zblank,
            quantized,
        };
        params.read_zvals(header);

        tracing::debug!(
            algorithm = params.compression.name(),
            zbitpix = params.zbitpix.code(),
            tiles = params.geometry.tile_count(),
            quantized = params.quantized,
            "Configured tile codec"
        );
        Ok(params)
    }

    /// Apply the `ZNAMEn`/`ZVALn` pairs, stopping at the first missing name.
    fn read_zvals<H: KeywordLookup + ?Sized>(&mut self, header: &H) {
        for idx in 1.. {
            let name_kw = format!("ZNAME{idx}");
            if !header.contains(&name_kw) {
                break;
            }
            let name = header.get_string(&name_kw, "");
            let val_kw = format!("ZVAL{idx}");
            match (self.compression, name.as_str()) {
                (Compression::Rice1, "BLOCKSIZE") => {
                    self.rice_blocksize = header.get_int(&val_kw, DEFAULT_BLOCK_SIZE)
                }
                (Compression::Rice1, "BYTEPIX") => {
                    self.rice_bytepix = header.get_int(&val_kw, DEFAULT_BYTE_PIX)
                }
                (Compression::Hcompress1, "SMOOTH") => {
                    self.hcomp_smooth = header.get_int(&val_kw, DEFAULT_HCOMP_SMOOTH)
                }
                (Compression::Hcompress1, "SCALE") => {
                    self.hcomp_scale = header.get_float(&val_kw, DEFAULT_HCOMP_SCALE)
                }
                (Compression::Rice1 | Compression::Hcompress1, _) => {}
                (_, "NOISEBIT") if self.zbitpix.is_float() => {
                    self.quantize_level = header.get_float(&val_kw, DEFAULT_QUANTIZE_LEVEL)
                }
                _ => {}
            }
        }
    }
}

/// Linear quantization of floating-point pixels: `q = round((v - zero) / scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantize {
    pub scale: f64,
    pub zero: f64,
}

impl Quantize {
    /// Quantize one value, rounding to nearest and clamping to `i32`.
    pub fn quantize(&self, v: f64) -> i32 {
        let r = libm::round((v - self.zero) / self.scale);
        if r < i32::MIN as f64 {
            i32::MIN
        } else if r > i32::MAX as f64 {
            i32::MAX
        } else {
            r as i32
        }
    }

    pub fn dequantize(&self, q: i32) -> f64 {
        self.zero + self.scale * q as f64
    }
}

/// The stored bytes of one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    /// Output of the tile codec.
    Compressed(Vec<u8>),
    /// Big-endian pixels kept because the tile could not be compressed.
    Uncompressed(Vec<u8>),
}

/// One tile as exchanged with the compressed table.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePayload {
    pub data: TileData,
    /// Per-tile quantization, present when the pixels were quantized.
    pub quantize: Option<Quantize>,
}

/// Compress GZIP_1 tile bytes as a zlib stream.
pub fn gzip_compress(raw: &[u8]) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(raw, 6)
}

/// Stream framing found around a GZIP_1 tile's deflate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// RFC 1952 member: header, deflate data, CRC32 and size trailer.
    Gzip,
    /// RFC 1950 stream, as written by [`gzip_compress`].
    Zlib,
    /// Bare deflate data.
    RawDeflate,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_DEFLATE: u8 = 8;
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;

/// The deflate body of a gzip member, without header or trailer.
fn gzip_body(member: &[u8]) -> Option<&[u8]> {
    let header = member.get(..10)?;
    if header[..2] != GZIP_MAGIC || header[2] != GZIP_DEFLATE {
        return None;
    }
    let flags = header[3];
    let mut rest = &member[10..];
    if flags & FEXTRA != 0 {
        let xlen = u16::from_le_bytes([*rest.first()?, *rest.get(1)?]) as usize;
        rest = rest.get(2..)?.get(xlen..)?;
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            let nul = rest.iter().position(|&b| b == 0)?;
            rest = &rest[nul + 1..];
        }
    }
    if flags & FHCRC != 0 {
        rest = rest.get(2..)?;
    }
    let body_len = rest.len().checked_sub(8)?;
    Some(&rest[..body_len])
}

/// Decompress GZIP_1 tile bytes, reporting the framing they arrived in.
///
/// A gzip magic number commits to gzip; otherwise zlib is tried before
/// bare deflate.
pub fn gzip_decompress(compressed: &[u8]) -> Result<(Container, Vec<u8>)> {
    use miniz_oxide::inflate::{decompress_to_vec, decompress_to_vec_zlib};

    let (container, inflated) = if compressed.starts_with(&GZIP_MAGIC) {
        let body = gzip_body(compressed).ok_or(Error::DecompressionError)?;
        (Container::Gzip, decompress_to_vec(body))
    } else {
        match decompress_to_vec_zlib(compressed) {
            Ok(raw) => (Container::Zlib, Ok(raw)),
            Err(_) => (Container::RawDeflate, decompress_to_vec(compressed)),
        }
    };
    let raw = inflated.map_err(|_| Error::DecompressionError)?;
    tracing::trace!(container = ?container, bytes = raw.len(), "Inflated tile");
    Ok((container, raw))
}

/// Big-endian record format holding one pixel of `bitpix`.
fn pixel_format(bitpix: Bitpix) -> Result<String> {
    let kind = bitpix
        .scalar_kind()
        .ok_or(Error::InvalidBitpix(bitpix.code()))?;
    Ok(format!(">{}", kind.tag()))
}

/// Allocate a zeroed `n`-pixel record in `format`.
fn blank_pixels(n: usize, width: usize, format: &str) -> Result<Record> {
    let size = n.checked_mul(width).ok_or(Error::SizeOverflow)?;
    Record::from_bytes(Buffer::zeroed(size)?, Some(n), Some(format))
}

impl CodecParams {
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        match self.compression {
            Compression::Gzip1 => Ok(gzip_compress(raw)),
            _ => Err(Error::UnsupportedCompression),
        }
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        match self.compression {
            Compression::Gzip1 => gzip_decompress(compressed).map(|(_, raw)| raw),
            _ => Err(Error::UnsupportedCompression),
        }
    }

    /// Encode one tile of pixels.
    ///
    /// `pixels` is a one-field record of any numeric kind and byte order.
    /// With `quantize`, floating-point images are stored as scaled `i32`;
    /// otherwise pixels are cast to the `ZBITPIX` type.
    pub fn encode_tile(&self, pixels: &Record, quantize: Option<Quantize>) -> Result<TilePayload> {
        let n = pixels.dims().record_count();
        let raw = match quantize {
            Some(q) if self.zbitpix.is_float() => {
                let native = blank_pixels(n, 8, "=f64")?;
                cast_view(&native, pixels)?;
                let values: Vec<f64> = pod_collect_to_vec(&native.buffer().to_vec());
                let ints: Vec<i32> = values.iter().map(|&v| q.quantize(v)).collect();
                let mut raw: Vec<u8> = pod_collect_to_vec(&ints);
                if Endian::Big.needs_swap() {
                    swap_in_place(&mut raw, 4);
                }
                raw
            }
            _ => {
                let out = blank_pixels(n, self.zbitpix.bytes_per_pixel(), &pixel_format(self.zbitpix)?)?;
                cast_view(&out, pixels)?;
                out.buffer().to_vec()
            }
        };
        let quantize = quantize.filter(|_| self.zbitpix.is_float());

        match self.compress(&raw) {
            Ok(compressed) => Ok(TilePayload {
                data: TileData::Compressed(compressed),
                quantize,
            }),
            Err(Error::UnsupportedCompression) if self.columns.uncompressed => {
                tracing::debug!(bytes = raw.len(), "Storing tile uncompressed");
                let raw = match quantize {
                    Some(_) => {
                        let out = blank_pixels(n, self.zbitpix.bytes_per_pixel(), &pixel_format(self.zbitpix)?)?;
                        cast_view(&out, pixels)?;
                        out.buffer().to_vec()
                    }
                    None => raw,
                };
                Ok(TilePayload {
                    data: TileData::Uncompressed(raw),
                    quantize: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Decode tile `index` into a record of its pixels.
    ///
    /// Quantized tiles come back as `>f64`; all others in the big-endian
    /// `ZBITPIX` format.
    pub fn decode_tile(&self, index: usize, payload: &TilePayload) -> Result<Record> {
        let n = self.geometry.tile_len(index)?;
        let bytes = match &payload.data {
            TileData::Compressed(c) => self.decompress(c)?,
            TileData::Uncompressed(raw) => raw.clone(),
        };

        let quantize = match (&payload.data, payload.quantize) {
            (TileData::Compressed(_), Some(q)) => Some(q),
            (TileData::Compressed(_), None) if self.quantized => Some(Quantize {
                scale: self.zscale,
                zero: self.zzero,
            }),
            _ => None,
        };

        match quantize {
            Some(q) => {
                let mut ints = bytes;
                if ints.len() < n * 4 {
                    return Err(Error::DecompressionError);
                }
                ints.truncate(n * 4);
                if Endian::Big.needs_swap() {
                    swap_in_place(&mut ints, 4);
                }
                let ints: Vec<i32> = pod_collect_to_vec(&ints);
                let values: Vec<f64> = ints.iter().map(|&v| q.dequantize(v)).collect();
                let mut raw: Vec<u8> = pod_collect_to_vec(&values);
                if Endian::Big.needs_swap() {
                    swap_in_place(&mut raw, 8);
                }
                Record::from_bytes(raw.into(), Some(n), Some(">f64"))
            }
            None => {
                let width = self.zbitpix.bytes_per_pixel();
                if bytes.len() < n * width {
                    return Err(Error::DecompressionError);
                }
                Record::from_bytes(bytes.into(), Some(n), Some(&pixel_format(self.zbitpix)?))
            }
        }
    }
}
