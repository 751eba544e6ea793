#![forbid(unsafe_code)]

use std::path::Path;

use tracing::debug;

use crate::pak::encode::{header_count, EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::io::PayloadBuf;

/// points per face, face count, data pointer.
pub const MODEL_HEADER_SIZE: usize = 16;

/// position (3) + texcoord (2) + normal (3)
pub const FLOATS_PER_POINT: usize = 8;

/// Wavefront `.obj` meshes, flattened to one interleaved float stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjEncoder;

impl Encoder for ObjEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let src = std::fs::read_to_string(path)?;
        Ok(vec![encode_obj(path, &src)?])
    }
}

/// 1-based `p/t/n` indices of one face corner.
type Corner = [usize; 3];

#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    faces: Vec<Vec<Corner>>,
}

fn floats<const N: usize>(rest: &str) -> Option<[f32; N]> {
    let mut out = [0f32; N];
    let mut it = rest.split_whitespace();
    for slot in out.iter_mut() {
        *slot = it.next()?.parse().ok()?;
    }
    Some(out)
}

fn corner(tok: &str) -> Option<Corner> {
    let mut it = tok.split('/');
    let mut out = [0usize; 3];
    for slot in out.iter_mut() {
        *slot = it.next()?.parse().ok()?;
    }
    if it.next().is_some() {
        return None;
    }
    Some(out)
}

fn push<T>(list: &mut Vec<T>, item: Option<T>) -> bool {
    match item {
        Some(v) => {
            list.push(v);
            true
        }
        None => false,
    }
}

fn parse(path: &Path, src: &str) -> ObjData {
    let mut data = ObjData::default();

    for (line_num, line) in src.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (tag, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        let ok = match tag {
            "v" => push(&mut data.positions, floats::<3>(rest)),
            "vt" => push(&mut data.texcoords, floats::<2>(rest)),
            "vn" => push(&mut data.normals, floats::<3>(rest)),
            "f" => push(
                &mut data.faces,
                rest.split_whitespace()
                    .map(corner)
                    .collect::<Option<Vec<_>>>()
                    .filter(|f| !f.is_empty()),
            ),
            _ => false,
        };
        if !ok {
            debug!("{}:{}: unable to parse line '{}'", path.display(), line_num + 1, line);
        }
    }
    data
}

fn lookup<T: Copy>(list: &[T], one_based: usize) -> Option<T> {
    one_based.checked_sub(1).and_then(|i| list.get(i)).copied()
}

pub(crate) fn encode_obj(path: &Path, src: &str) -> PakResult<EncodedEntry> {
    let data = parse(path, src);

    let points_per_face = match data.faces.first() {
        Some(f) => f.len(),
        None => return Err(PakError::unsupported(path, "mesh has no faces")),
    };

    let mut p = PayloadBuf::with_capacity(
        MODEL_HEADER_SIZE + data.faces.len() * points_per_face * FLOATS_PER_POINT * 4,
    );
    p.u32(header_count(path, points_per_face, "points per face")?)
        .u32(header_count(path, data.faces.len(), "faces")?)
        .pointer();

    for (face_idx, face) in data.faces.iter().enumerate() {
        if face.len() != points_per_face {
            return Err(PakError::unsupported(
                path,
                format!(
                    "face {} has {} points, expected {}",
                    face_idx + 1,
                    face.len(),
                    points_per_face
                ),
            ));
        }
        for &[pi, ti, ni] in face {
            let resolved = (
                lookup(&data.positions, pi),
                lookup(&data.texcoords, ti),
                lookup(&data.normals, ni),
            );
            let (Some(pos), Some(uv), Some(n)) = resolved else {
                return Err(PakError::unsupported(
                    path,
                    format!("face {} references missing index {pi}/{ti}/{ni}", face_idx + 1),
                ));
            };
            p.f32s(&pos).f32s(&uv).f32s(&n);
        }
    }

    Ok(EncodedEntry::new(AssetType::Model, p.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats_after_header(payload: &[u8]) -> Vec<f32> {
        payload[MODEL_HEADER_SIZE..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    const TRI: &str = "\
# a triangle
mtllib tri.mtl
o Tri
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1 0.5
vn 0 0 1
s off
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn triangle_is_interleaved() {
        let e = encode_obj(Path::new("tri.obj"), TRI).unwrap();
        assert_eq!(e.kind, AssetType::Model);
        assert_eq!(&e.payload[0..4], &3u32.to_le_bytes());
        assert_eq!(&e.payload[4..8], &1u32.to_le_bytes());

        let f = floats_after_header(&e.payload);
        assert_eq!(f.len(), 3 * FLOATS_PER_POINT);
        assert_eq!(&f[0..8], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(&f[8..16], &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        // third texcoord component is dropped
        assert_eq!(&f[16..24], &[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let src = format!("{TRI}v not numbers\nf 1/1\n");
        let e = encode_obj(Path::new("tri.obj"), &src).unwrap();
        assert_eq!(&e.payload[4..8], &1u32.to_le_bytes());
    }

    #[test]
    fn unresolved_index_skips_asset() {
        let src = format!("{TRI}f 1/1/1 2/2/1 9/3/1\n");
        let err = encode_obj(Path::new("tri.obj"), &src).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn zero_index_is_unresolved() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 0/1/1 1/1/1 1/1/1\n";
        assert!(encode_obj(Path::new("z.obj"), src).unwrap_err().is_recoverable());
    }

    #[test]
    fn mixed_face_sizes_skip_asset() {
        let src = format!("{TRI}v 1 1 0\nf 1/1/1 2/2/1 3/3/1 4/3/1\n");
        assert!(encode_obj(Path::new("q.obj"), &src).unwrap_err().is_recoverable());
    }

    #[test]
    fn empty_mesh_is_skipped() {
        assert!(encode_obj(Path::new("e.obj"), "v 0 0 0\n").unwrap_err().is_recoverable());
    }
}
