// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wavefront OBJ parsing into flat vertex and index buffers.

use core::str::SplitWhitespace;

use thiserror::Error;

use crate::{allocators::LinearAllocator, collections::FixedVec};

/// Floats per vertex position (x, y, z, w=1).
const POSITION_FLOATS: usize = 4;
/// Floats per texture coordinate (u, v).
const TEXCOORD_FLOATS: usize = 2;
/// Floats per normal (x, y, z, w=0).
const NORMAL_FLOATS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjError {
    #[error("the mesh is not valid UTF-8")]
    NotUtf8,
    #[error("the mesh has no vertex positions")]
    NoPositions,
    #[error("malformed statement on line {line}")]
    Malformed { line: usize },
    #[error("face on line {line} refers to a vertex attribute that isn't defined")]
    IndexOutOfRange { line: usize },
    #[error("the mesh has more vertices than 16-bit indices can refer to")]
    TooManyVertices,
    #[error("not enough scratch memory for the mesh")]
    OutOfMemory,
}

/// Unindexed triangle list parsed from an OBJ file: every face corner is its
/// own vertex, and the indices just count up from zero.
///
/// Each vertex is a position, followed by a texture coordinate if the file has
/// any, followed by a normal if the file has any. Corners missing an attribute
/// the rest of the mesh has get zeroes in its place.
#[derive(Debug)]
pub struct MeshData<'a> {
    pub vertices: FixedVec<'a, f32>,
    pub indices: FixedVec<'a, u16>,
    /// Floats per vertex in `vertices`.
    pub vertex_stride: usize,
}

impl MeshData<'_> {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.vertex_stride
    }
}

/// Parses the `v`, `vt`, `vn` and `f` statements of an OBJ file, ignoring
/// everything else. Faces must be triangles, with corners written as `p`,
/// `p/t`, `p//n` or `p/t/n`, where negative indices count back from the latest
/// attribute.
pub fn parse_obj<'a>(bytes: &[u8], arena: &'a LinearAllocator) -> Result<MeshData<'a>, ObjError> {
    let text = core::str::from_utf8(bytes).map_err(|_| ObjError::NotUtf8)?;

    let mut position_count = 0;
    let mut texcoord_count = 0;
    let mut normal_count = 0;
    let mut face_count = 0;
    for line in text.lines() {
        match line.split_whitespace().next() {
            Some("v") => position_count += 1,
            Some("vt") => texcoord_count += 1,
            Some("vn") => normal_count += 1,
            Some("f") => face_count += 1,
            _ => {}
        }
    }
    if position_count == 0 {
        return Err(ObjError::NoPositions);
    }
    let vertex_count = face_count * 3;
    if vertex_count > u16::MAX as usize + 1 {
        return Err(ObjError::TooManyVertices);
    }

    let has_texcoords = texcoord_count > 0;
    let has_normals = normal_count > 0;
    let mut vertex_stride = POSITION_FLOATS;
    if has_texcoords {
        vertex_stride += TEXCOORD_FLOATS;
    }
    if has_normals {
        vertex_stride += NORMAL_FLOATS;
    }

    let mut vertices = FixedVec::new(arena, vertex_count * vertex_stride).ok_or(ObjError::OutOfMemory)?;
    let mut indices = FixedVec::new(arena, vertex_count).ok_or(ObjError::OutOfMemory)?;
    let mut positions: FixedVec<[f32; POSITION_FLOATS]> =
        FixedVec::new(arena, position_count).ok_or(ObjError::OutOfMemory)?;
    let mut texcoords: FixedVec<[f32; TEXCOORD_FLOATS]> =
        FixedVec::new(arena, texcoord_count).ok_or(ObjError::OutOfMemory)?;
    let mut normals: FixedVec<[f32; NORMAL_FLOATS]> =
        FixedVec::new(arena, normal_count).ok_or(ObjError::OutOfMemory)?;

    for (line_index, text_line) in text.lines().enumerate() {
        let line = line_index + 1;
        let mut fields = text_line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let [x, y, z] = parse_floats(&mut fields).ok_or(ObjError::Malformed { line })?;
                let Ok(_) = positions.push([x, y, z, 1.0]) else {
                    unreachable!("positions are allocated for every v statement")
                };
            }
            Some("vt") => {
                let uv = parse_floats(&mut fields).ok_or(ObjError::Malformed { line })?;
                let Ok(_) = texcoords.push(uv) else {
                    unreachable!("texture coordinates are allocated for every vt statement")
                };
            }
            Some("vn") => {
                let [x, y, z] = parse_floats(&mut fields).ok_or(ObjError::Malformed { line })?;
                let Ok(_) = normals.push([x, y, z, 0.0]) else {
                    unreachable!("normals are allocated for every vn statement")
                };
            }
            Some("f") => {
                for _ in 0..3 {
                    let corner = fields.next().ok_or(ObjError::Malformed { line })?;
                    let corner = parse_corner(corner, line)?;

                    let position = resolve_index(corner.position, positions.len())
                        .ok_or(ObjError::IndexOutOfRange { line })?;
                    push_floats(&mut vertices, &positions[position]);

                    if has_texcoords {
                        match corner.texcoord {
                            Some(index) => {
                                let texcoord = resolve_index(index, texcoords.len())
                                    .ok_or(ObjError::IndexOutOfRange { line })?;
                                push_floats(&mut vertices, &texcoords[texcoord]);
                            }
                            None => push_floats(&mut vertices, &[0.0; TEXCOORD_FLOATS]),
                        }
                    }

                    if has_normals {
                        match corner.normal {
                            Some(index) => {
                                let normal = resolve_index(index, normals.len())
                                    .ok_or(ObjError::IndexOutOfRange { line })?;
                                push_floats(&mut vertices, &normals[normal]);
                            }
                            None => push_floats(&mut vertices, &[0.0; NORMAL_FLOATS]),
                        }
                    }

                    // The vertex count was checked to fit in u16 above.
                    let Ok(_) = indices.push(indices.len() as u16) else {
                        unreachable!("indices are allocated for three corners per face")
                    };
                }
                if fields.next().is_some() {
                    // Only triangles are supported.
                    return Err(ObjError::Malformed { line });
                }
            }
            _ => {}
        }
    }

    Ok(MeshData {
        vertices,
        indices,
        vertex_stride,
    })
}

struct Corner {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

fn parse_corner(corner: &str, line: usize) -> Result<Corner, ObjError> {
    let mut parts = corner.split('/');
    let position = parts
        .next()
        .and_then(|p| p.parse::<i64>().ok())
        .ok_or(ObjError::Malformed { line })?;
    let optional_index = |part: Option<&str>| match part {
        None | Some("") => Ok(None),
        Some(index) => index.parse::<i64>().map(Some).map_err(|_| ObjError::Malformed { line }),
    };
    let texcoord = optional_index(parts.next())?;
    let normal = optional_index(parts.next())?;
    if parts.next().is_some() {
        return Err(ObjError::Malformed { line });
    }
    Ok(Corner {
        position,
        texcoord,
        normal,
    })
}

/// Turns a 1-based (or negative, relative to the end) OBJ index into an index
/// into an attribute list of length `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = match index {
        0 => return None,
        1.. => index - 1,
        _ => len + index,
    };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn parse_floats<const N: usize>(fields: &mut SplitWhitespace) -> Option<[f32; N]> {
    let mut floats = [0.0; N];
    for float in &mut floats {
        *float = fields.next()?.parse().ok()?;
    }
    Some(floats)
}

fn push_floats(vertices: &mut FixedVec<f32>, floats: &[f32]) {
    for &float in floats {
        let Ok(_) = vertices.push(float) else {
            unreachable!("vertices are allocated for a full stride per face corner")
        };
    }
}

#[cfg(test)]
mod tests {
    use crate::{allocators::LinearAllocator, test_platform::TestPlatform};

    use super::{parse_obj, ObjError};

    const TRIANGLE: &str = "# a triangle\n\
                            o triangle\n\
                            v 0 0 0\n\
                            v 1 0 0\n\
                            v 0 1 0\n\
                            s off\n\
                            f 1 2 3\n";

    #[test]
    fn positions_only() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 1024).unwrap();
        let mesh = parse_obj(TRIANGLE.as_bytes(), &arena).unwrap();
        assert_eq!(4, mesh.vertex_stride);
        assert_eq!(3, mesh.vertex_count());
        assert_eq!(&[0, 1, 2], &*mesh.indices);
        assert_eq!(
            &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            &*mesh.vertices,
        );
    }

    #[test]
    fn all_corner_forms() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 4096).unwrap();
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
                   vt 0.5 0.25\n\
                   vn 0 0 1\n\
                   f 1/1/1 2//1 3/1\n\
                   f -3 -2/-1 -1/1/-1\n";
        let mesh = parse_obj(obj.as_bytes(), &arena).unwrap();
        assert_eq!(10, mesh.vertex_stride);
        assert_eq!(6, mesh.vertex_count());
        assert_eq!(&[0, 1, 2, 3, 4, 5], &*mesh.indices);

        let vertex = |i: usize| &mesh.vertices[i * 10..(i + 1) * 10];
        assert_eq!(&[0.0, 0.0, 0.0, 1.0, 0.5, 0.25, 0.0, 0.0, 1.0, 0.0], vertex(0));
        // p//n: no texture coordinate.
        assert_eq!(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0], vertex(1));
        // p/t: no normal.
        assert_eq!(&[0.0, 1.0, 0.0, 1.0, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0], vertex(2));
        // Negative indices count back from the latest attribute.
        assert_eq!(&[0.0, 0.0, 0.0, 1.0], &vertex(3)[..4]);
        assert_eq!(&[0.0, 1.0, 0.0, 1.0, 0.5, 0.25, 0.0, 0.0, 1.0, 0.0], vertex(5));
    }

    #[test]
    fn rejects_bad_meshes() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 4096).unwrap();
        let parse = |obj: &str| parse_obj(obj.as_bytes(), &arena).map(|_| ());

        assert_eq!(Err(ObjError::NoPositions), parse("vt 0 0\n"));
        assert_eq!(Err(ObjError::Malformed { line: 2 }), parse("v 0 0 0\nv 1 x 0\n"));
        assert_eq!(
            Err(ObjError::Malformed { line: 4 }),
            parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3 1\n"),
        );
        assert_eq!(
            Err(ObjError::IndexOutOfRange { line: 2 }),
            parse("v 0 0 0\nf 1 1 4\n"),
        );
        assert_eq!(
            Err(ObjError::IndexOutOfRange { line: 2 }),
            parse("v 0 0 0\nf 1 1 0\n"),
        );
        assert_eq!(Err(ObjError::NotUtf8), parse_obj(&[b'v', 0xFF], &arena).map(|_| ()));
    }

    #[test]
    fn runs_out_of_scratch_memory() {
        let platform = TestPlatform::new();
        let arena = LinearAllocator::new(&platform, 16).unwrap();
        assert_eq!(
            ObjError::OutOfMemory,
            parse_obj(TRIANGLE.as_bytes(), &arena).unwrap_err(),
        );
    }
}
