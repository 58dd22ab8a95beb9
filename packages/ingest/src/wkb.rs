//! Minimal WKB reader for region boundary payloads.
//!
//! Region geometries arrive as hex strings carrying a fixed 4-character
//! transport prefix ahead of the WKB payload. The prefix is stripped and
//! the remainder is validated before parsing: it must hex-decode and open
//! with a WKB byte-order marker, so a changed export format fails loudly
//! instead of decoding garbage. Only 2D `Polygon` and `MultiPolygon`
//! payloads are accepted. The EWKB SRID flag is tolerated and the SRID
//! ignored, since both coordinate reference systems are assumed identical
//! and no reprojection is performed.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use thiserror::Error;

/// Length in hex characters of the non-payload transport prefix ahead of
/// the WKB payload.
pub const GEOMETRY_PREFIX_LEN: usize = 4;

const WKB_POLYGON: u32 = 3;
const WKB_MULTI_POLYGON: u32 = 6;

const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const EWKB_Z_FLAG: u32 = 0x8000_0000;
const EWKB_M_FLAG: u32 = 0x4000_0000;

/// Errors raised while decoding a single region's geometry payload.
///
/// These are row-level errors: the offending region is skipped and
/// reported, the run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryDecodeError {
    /// The string is shorter than the transport prefix plus payload.
    #[error("geometry string shorter than the {GEOMETRY_PREFIX_LEN}-character prefix")]
    MissingPrefix,

    /// The payload after the prefix is not valid hex.
    #[error("invalid geometry hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The decoded payload does not open with a WKB byte-order marker.
    #[error("payload does not start with a WKB byte-order marker (found {marker:#04x})")]
    ByteOrder {
        /// The unexpected leading byte.
        marker: u8,
    },

    /// The payload ended before the structure it declares was complete.
    #[error("WKB payload truncated at byte {offset}")]
    Truncated {
        /// Byte offset at which the read failed.
        offset: usize,
    },

    /// The payload is a geometry type other than a 2D polygon.
    #[error("unsupported WKB geometry type {geometry_type:#010x}")]
    UnsupportedType {
        /// The raw WKB type code, flag bits included.
        geometry_type: u32,
    },

    /// A polygon declared zero rings.
    #[error("polygon has no rings")]
    EmptyPolygon,
}

// `hex::FromHexError` implements `PartialEq` but not `Eq`, so `Eq` can't be
// derived here. It holds no floating-point state, so the `PartialEq` impl
// is already reflexive and a manual `Eq` impl is sound.
impl Eq for GeometryDecodeError {}

/// Strips and validates the transport prefix, then decodes the WKB
/// payload into a [`MultiPolygon`]. A plain `Polygon` payload is wrapped
/// into a single-member multi-polygon.
///
/// # Errors
///
/// Returns [`GeometryDecodeError`] if the prefix is missing, the hex is
/// malformed, or the WKB structure is truncated or of an unsupported
/// type.
pub fn decode_region_geometry(encoded: &str) -> Result<MultiPolygon<f64>, GeometryDecodeError> {
    let payload = encoded
        .get(GEOMETRY_PREFIX_LEN..)
        .ok_or(GeometryDecodeError::MissingPrefix)?;
    if payload.is_empty() {
        return Err(GeometryDecodeError::MissingPrefix);
    }
    let bytes = hex::decode(payload)?;
    let mut reader = Reader::new(&bytes);
    read_geometry(&mut reader)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], GeometryDecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(GeometryDecodeError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, GeometryDecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self, big_endian: bool) -> Result<u32, GeometryDecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(if big_endian {
            u32::from_be_bytes(buf)
        } else {
            u32::from_le_bytes(buf)
        })
    }

    fn read_f64(&mut self, big_endian: bool) -> Result<f64, GeometryDecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(if big_endian {
            f64::from_be_bytes(buf)
        } else {
            f64::from_le_bytes(buf)
        })
    }
}

/// Reads a geometry header: byte-order marker plus type word. EWKB SRID
/// payloads are skipped; Z/M dimensions (EWKB flag bits or ISO 1000+
/// type offsets) are rejected.
fn read_header(reader: &mut Reader<'_>) -> Result<(bool, u32), GeometryDecodeError> {
    let marker = reader.read_u8()?;
    let big_endian = match marker {
        0 => true,
        1 => false,
        other => return Err(GeometryDecodeError::ByteOrder { marker: other }),
    };

    let raw_type = reader.read_u32(big_endian)?;
    if raw_type & (EWKB_Z_FLAG | EWKB_M_FLAG) != 0 {
        return Err(GeometryDecodeError::UnsupportedType {
            geometry_type: raw_type,
        });
    }
    let base_type = raw_type & !EWKB_SRID_FLAG;
    if base_type >= 1000 {
        return Err(GeometryDecodeError::UnsupportedType {
            geometry_type: raw_type,
        });
    }
    if raw_type & EWKB_SRID_FLAG != 0 {
        reader.read_u32(big_endian)?;
    }

    Ok((big_endian, base_type))
}

fn read_geometry(reader: &mut Reader<'_>) -> Result<MultiPolygon<f64>, GeometryDecodeError> {
    let (big_endian, geometry_type) = read_header(reader)?;
    match geometry_type {
        WKB_POLYGON => Ok(MultiPolygon(vec![read_polygon_body(reader, big_endian)?])),
        WKB_MULTI_POLYGON => {
            let polygon_count = reader.read_u32(big_endian)?;
            let mut polygons = Vec::new();
            for _ in 0..polygon_count {
                let (nested_big_endian, nested_type) = read_header(reader)?;
                if nested_type != WKB_POLYGON {
                    return Err(GeometryDecodeError::UnsupportedType {
                        geometry_type: nested_type,
                    });
                }
                polygons.push(read_polygon_body(reader, nested_big_endian)?);
            }
            Ok(MultiPolygon(polygons))
        }
        other => Err(GeometryDecodeError::UnsupportedType {
            geometry_type: other,
        }),
    }
}

fn read_polygon_body(
    reader: &mut Reader<'_>,
    big_endian: bool,
) -> Result<Polygon<f64>, GeometryDecodeError> {
    let ring_count = reader.read_u32(big_endian)?;
    if ring_count == 0 {
        return Err(GeometryDecodeError::EmptyPolygon);
    }
    let mut rings = Vec::new();
    for _ in 0..ring_count {
        rings.push(read_ring(reader, big_endian)?);
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn read_ring(
    reader: &mut Reader<'_>,
    big_endian: bool,
) -> Result<LineString<f64>, GeometryDecodeError> {
    let point_count = reader.read_u32(big_endian)?;
    let mut coords = Vec::new();
    for _ in 0..point_count {
        let x = reader.read_f64(big_endian)?;
        let y = reader.read_f64(big_endian)?;
        coords.push(Coord { x, y });
    }
    Ok(LineString::new(coords))
}
