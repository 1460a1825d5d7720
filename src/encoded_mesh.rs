//! Quantized, base64-wrapped mesh encoding used for string-tagged branch items.
//!
//! Layout (little-endian):
//! `"QMSH"` magic, `u8` version, 3 reserved bytes, `u32` vertex count,
//! `u32` triangle count, bbox min `3 x f32`, bbox max `3 x f32`,
//! positions `n x 3 x u16`, indices `m x 3 x u32`.
//!
//! Positions are quantized to 16 bits per axis inside the bounding box.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nalgebra::Point3;

use crate::error::MeshDecodeError;
use crate::geometry::{Face, Geometry};

const MAGIC: [u8; 4] = *b"QMSH";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 12 + 12;
const QUANT_MAX: f32 = u16::MAX as f32;

/// Decode a base64 encoded mesh into [`Geometry::Mesh`].
pub fn decode_base64(text: &str) -> Result<Geometry, MeshDecodeError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| MeshDecodeError::Base64(e.to_string()))?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Geometry, MeshDecodeError> {
    let mut r = Reader { bytes, pos: 0 };
    let header = r.take(HEADER_LEN)?;
    let magic: [u8; 4] = header[0..4].try_into().unwrap_or_default();
    if magic != MAGIC {
        return Err(MeshDecodeError::BadMagic(magic));
    }
    if header[4] != VERSION {
        return Err(MeshDecodeError::UnsupportedVersion(header[4]));
    }

    let mut h = Reader { bytes: &header[8..], pos: 0 };
    let vertex_count = h.u32()?;
    let triangle_count = h.u32()?;
    let min = [h.f32()?, h.f32()?, h.f32()?];
    let max = [h.f32()?, h.f32()?, h.f32()?];
    if !min.iter().chain(max.iter()).all(|c| c.is_finite()) {
        return Err(MeshDecodeError::NonFiniteBounds);
    }

    let needed = HEADER_LEN
        .saturating_add((vertex_count as usize).saturating_mul(6))
        .saturating_add((triangle_count as usize).saturating_mul(12));
    if bytes.len() < needed {
        return Err(MeshDecodeError::Truncated { needed, got: bytes.len() });
    }

    let mut vertices = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        let mut p = [0f64; 3];
        for axis in 0..3 {
            let q = r.u16()? as f32 / QUANT_MAX;
            p[axis] = (min[axis] + q * (max[axis] - min[axis])) as f64;
        }
        vertices.push(Point3::from(p));
    }

    let mut faces = Vec::with_capacity(triangle_count as usize);
    for _ in 0..triangle_count {
        let tri = [r.u32()?, r.u32()?, r.u32()?];
        if let Some(&index) = tri.iter().find(|&&i| i >= vertex_count) {
            return Err(MeshDecodeError::IndexOutOfRange { index, vertices: vertex_count });
        }
        faces.push(Face::Tri(tri));
    }

    let rest = bytes.len() - r.pos;
    if rest != 0 {
        return Err(MeshDecodeError::TrailingBytes(rest));
    }
    Ok(Geometry::Mesh { vertices, faces })
}

/// Encode triangle geometry. Quads are split; non-mesh geometry yields `None`.
pub fn encode(geometry: &Geometry) -> Option<Vec<u8>> {
    let Geometry::Mesh { vertices, .. } = geometry else {
        return None;
    };
    let bounds = geometry.bounds();
    let (min, max) = if bounds.is_empty() {
        ([0f32; 3], [0f32; 3])
    } else {
        let min = bounds.min.cast::<f32>();
        let max = bounds.max.cast::<f32>();
        ([min.x, min.y, min.z], [max.x, max.y, max.z])
    };
    let tris = triangle_indices(geometry);

    let mut out = Vec::with_capacity(HEADER_LEN + vertices.len() * 6 + tris.len() * 12);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&[VERSION, 0, 0, 0]);
    out.extend_from_slice(&(vertices.len() as u32).to_le_bytes());
    out.extend_from_slice(&(tris.len() as u32).to_le_bytes());
    for c in min.iter().chain(max.iter()) {
        out.extend_from_slice(&c.to_le_bytes());
    }
    for v in vertices {
        for axis in 0..3 {
            let span = max[axis] - min[axis];
            let t = if span > 0.0 { (v[axis] as f32 - min[axis]) / span } else { 0.0 };
            let q = (t.clamp(0.0, 1.0) * QUANT_MAX).round() as u16;
            out.extend_from_slice(&q.to_le_bytes());
        }
    }
    for tri in &tris {
        for i in tri {
            out.extend_from_slice(&i.to_le_bytes());
        }
    }
    Some(out)
}

pub fn encode_base64(geometry: &Geometry) -> Option<String> {
    encode(geometry).map(|bytes| STANDARD.encode(bytes))
}

fn triangle_indices(geometry: &Geometry) -> Vec<[u32; 3]> {
    let Geometry::Mesh { faces, .. } = geometry else {
        return Vec::new();
    };
    let mut tris = Vec::with_capacity(faces.len());
    for face in faces {
        match *face {
            Face::Tri(t) => tris.push(t),
            Face::Quad([a, b, c, d]) => {
                tris.push([a, b, c]);
                tris.push([a, c, d]);
            }
        }
    }
    tris
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MeshDecodeError> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(MeshDecodeError::Truncated { needed: end, got: self.bytes.len() })?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], MeshDecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u16(&mut self) -> Result<u16, MeshDecodeError> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, MeshDecodeError> {
        self.array().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, MeshDecodeError> {
        self.array().map(f32::from_le_bytes)
    }
}
