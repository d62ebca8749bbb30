/// Geometry blob decoder for the structured (indexed JSON) and raw (packed f32) encodings
use nalgebra::Point3;
use nom::{
    combinator::{all_consuming, map},
    multi::many0,
    number::complete::le_f32,
    sequence::tuple,
    IResult,
};
use serde::Deserialize;

use crate::error::DecodeError;
use crate::geometry::Triangle;

/// Bytes per raw triangle: three vertices of three little-endian f32s
pub const RAW_TRIANGLE_STRIDE: usize = 3 * 3 * std::mem::size_of::<f32>();

/// A stored geometry blob, tagged by the encoding it was written in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryBlob<'a> {
    /// `{"vertices": [[x, y, z], ...], "faces": [[i, j, k], ...]}`
    Structured(&'a str),
    /// Consecutive `(x, y, z)` f32 triples, three per triangle
    Raw(&'a [u8]),
}

impl<'a> GeometryBlob<'a> {
    /// Structured blobs are UTF-8 text opening with `{`; anything else is raw.
    pub fn classify(data: &'a [u8]) -> Self {
        match std::str::from_utf8(data) {
            Ok(text) if text.trim_start().starts_with('{') => GeometryBlob::Structured(text),
            _ => GeometryBlob::Raw(data),
        }
    }

    /// A structured-looking blob that is not JSON at all, but is a whole
    /// number of raw triangles, is read as raw: packed floats can happen to
    /// be ASCII text opening with `{`.
    pub fn decode(self) -> Result<Vec<Triangle>, DecodeError> {
        let triangles = match self {
            GeometryBlob::Structured(text) => match decode_structured(text) {
                Err(DecodeError::Malformed(err))
                    if err.is_syntax() && text.len() % RAW_TRIANGLE_STRIDE == 0 =>
                {
                    decode_raw(text.as_bytes()).map_err(|_| DecodeError::Malformed(err))?
                }
                decoded => decoded?,
            },
            GeometryBlob::Raw(data) => decode_raw(data)?,
        };

        if triangles.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(triangles)
    }
}

/// Detect the encoding of a stored blob and decode it into world-space triangles
pub fn decode_geometry(data: &[u8]) -> Result<Vec<Triangle>, DecodeError> {
    GeometryBlob::classify(data).decode()
}

#[derive(Debug, Deserialize)]
struct IndexedMesh {
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

fn decode_structured(text: &str) -> Result<Vec<Triangle>, DecodeError> {
    let mesh: IndexedMesh = serde_json::from_str(text)?;
    let vertex_count = mesh.vertices.len();

    mesh.faces
        .iter()
        .enumerate()
        .map(|(face, indices)| {
            let mut corners = [Point3::origin(); 3];
            for (corner, &index) in corners.iter_mut().zip(indices) {
                let [x, y, z] = *mesh.vertices.get(index).ok_or(DecodeError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                })?;
                *corner = Point3::new(x, y, z);
            }
            Ok(Triangle::new(corners[0], corners[1], corners[2]))
        })
        .collect()
}

type RawVertex = (f32, f32, f32);

fn parse_vertex(input: &[u8]) -> IResult<&[u8], RawVertex> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn parse_triangle(input: &[u8]) -> IResult<&[u8], [RawVertex; 3]> {
    map(tuple((parse_vertex, parse_vertex, parse_vertex)), |(a, b, c)| [a, b, c])(input)
}

fn decode_raw(data: &[u8]) -> Result<Vec<Triangle>, DecodeError> {
    let misaligned = DecodeError::Misaligned {
        len: data.len(),
        stride: RAW_TRIANGLE_STRIDE,
    };
    if data.len() % RAW_TRIANGLE_STRIDE != 0 {
        return Err(misaligned);
    }

    let (_, raw) = all_consuming(many0(parse_triangle))(data).map_err(|_| misaligned)?;

    raw.iter()
        .enumerate()
        .map(|(t, corners)| {
            let mut vertices = [Point3::origin(); 3];
            for (v, &(x, y, z)) in corners.iter().enumerate() {
                let base = (t * 3 + v) * 3;
                for (axis, value) in [x, y, z].into_iter().enumerate() {
                    if !value.is_finite() {
                        return Err(DecodeError::NonFinite { index: base + axis });
                    }
                }
                vertices[v] = Point3::new(x as f64, y as f64, z as f64);
            }
            Ok(Triangle::new(vertices[0], vertices[1], vertices[2]))
        })
        .collect()
}
