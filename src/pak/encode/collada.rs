#![forbid(unsafe_code)]

use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::pak::encode::math::{decompose, mat4_from_row_major, mul, Mat4, IDENTITY};
use crate::pak::encode::skinned::{
    skeleton_payload, skin_payload, three_influences, Bone, MAX_INFLUENCES, SKELETON_PREFIX,
    SKIN_FLOATS_PER_VERTEX, SKIN_PREFIX,
};
use crate::pak::encode::{EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;

/// COLLADA (`.dae`) skinned meshes. Produces the same skin and skeleton
/// entries as the `.edan` path; animations are not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColladaEncoder;

impl Encoder for ColladaEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let text = std::fs::read_to_string(path)?;
        encode_collada(path, &text)
    }
}

pub(crate) fn encode_collada(path: &Path, text: &str) -> PakResult<Vec<EncodedEntry>> {
    let doc = Document::parse(text).map_err(|e| PakError::malformed(path, e.to_string()))?;
    let dae = Dae { doc: &doc, path };

    let skin = dae
        .doc
        .descendants()
        .find(|n| n.has_tag_name("skin"))
        .ok_or_else(|| dae.err("no skin controller"))?;

    let joints = dae.joint_names(skin)?;
    let weights = dae.vertex_weights(skin)?;
    let geometry = dae.lookup(dae.attr(skin, "source")?)?;
    let skin_floats = dae.skinned_triangles(geometry, &weights)?;
    let bones = dae.bones(&joints)?;

    debug!(
        "{}: {} joints, {} skinned vertices",
        path.display(),
        joints.len(),
        skin_floats.len() / SKIN_FLOATS_PER_VERTEX
    );

    Ok(vec![
        EncodedEntry::new(AssetType::Skinned, skin_payload(path, &skin_floats)?)
            .with_prefix(SKIN_PREFIX),
        EncodedEntry::new(AssetType::Skeleton, skeleton_payload(path, &bones)?)
            .with_prefix(SKELETON_PREFIX),
    ])
}

#[derive(Debug, Clone, Copy)]
struct Input<'a> {
    semantic: &'a str,
    source: &'a str,
    offset: usize,
}

/// Float source with its accessor stride.
struct FloatSource {
    data: Vec<f32>,
    stride: usize,
}

impl FloatSource {
    fn get(&self, index: usize, n: usize) -> Option<&[f32]> {
        if self.stride < n {
            return None;
        }
        let start = index.checked_mul(self.stride)?;
        self.data.get(start..start + n)
    }
}

struct Dae<'a, 'i> {
    doc: &'a Document<'i>,
    path: &'a Path,
}

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|c| c.has_tag_name(tag))
}

impl<'a, 'i> Dae<'a, 'i> {
    fn err(&self, reason: impl Into<String>) -> PakError {
        PakError::malformed(self.path, reason)
    }

    fn child(&self, node: Node<'a, 'i>, tag: &str) -> PakResult<Node<'a, 'i>> {
        child(node, tag).ok_or_else(|| {
            self.err(format!("<{}> has no <{tag}>", node.tag_name().name()))
        })
    }

    fn attr(&self, node: Node<'a, 'i>, name: &str) -> PakResult<&'a str> {
        node.attribute(name).ok_or_else(|| {
            self.err(format!("<{}> has no '{name}' attribute", node.tag_name().name()))
        })
    }

    fn lookup(&self, url: &str) -> PakResult<Node<'a, 'i>> {
        let id = url.trim_start_matches('#');
        self.doc
            .descendants()
            .find(|n| n.attribute("id") == Some(id))
            .ok_or_else(|| self.err(format!("unresolved reference '{url}'")))
    }

    fn list<T: FromStr>(&self, node: Node<'a, 'i>) -> PakResult<Vec<T>> {
        node.text()
            .unwrap_or("")
            .split_whitespace()
            .map(|t| {
                t.parse::<T>().map_err(|_| {
                    self.err(format!("bad value '{t}' in <{}>", node.tag_name().name()))
                })
            })
            .collect()
    }

    fn inputs(&self, node: Node<'a, 'i>) -> PakResult<Vec<Input<'a>>> {
        node.children()
            .filter(|c| c.has_tag_name("input"))
            .map(|c| {
                let offset = match c.attribute("offset") {
                    Some(o) => o
                        .parse()
                        .map_err(|_| self.err(format!("bad input offset '{o}'")))?,
                    None => 0,
                };
                Ok(Input {
                    semantic: self.attr(c, "semantic")?,
                    source: self.attr(c, "source")?,
                    offset,
                })
            })
            .collect()
    }

    fn float_source(&self, url: &str) -> PakResult<FloatSource> {
        let src = self.lookup(url)?;
        let data = self.list(self.child(src, "float_array")?)?;
        let stride = match child(src, "technique_common")
            .and_then(|t| child(t, "accessor"))
            .and_then(|a| a.attribute("stride"))
        {
            Some(s) => s
                .parse()
                .map_err(|_| self.err(format!("bad accessor stride '{s}'")))?,
            None => 1,
        };
        Ok(FloatSource { data, stride })
    }

    fn joint_names(&self, skin: Node<'a, 'i>) -> PakResult<Vec<String>> {
        let joints = self.child(skin, "joints")?;
        let input = self
            .inputs(joints)?
            .into_iter()
            .find(|i| i.semantic == "JOINT")
            .ok_or_else(|| self.err("<joints> has no JOINT input"))?;
        let src = self.lookup(input.source)?;
        self.list(self.child(src, "Name_array")?)
    }

    /// Per-vertex `(bone, weight)` triples, ordered as the position source.
    fn vertex_weights(&self, skin: Node<'a, 'i>) -> PakResult<Vec<[(f32, f32); MAX_INFLUENCES]>> {
        let vw = self.child(skin, "vertex_weights")?;
        let inputs = self.inputs(vw)?;
        let joint = inputs
            .iter()
            .find(|i| i.semantic == "JOINT")
            .ok_or_else(|| self.err("<vertex_weights> has no JOINT input"))?;
        let weight = inputs
            .iter()
            .find(|i| i.semantic == "WEIGHT")
            .ok_or_else(|| self.err("<vertex_weights> has no WEIGHT input"))?;
        let weight_values = self.float_source(weight.source)?;
        let stride = inputs.iter().map(|i| i.offset).max().unwrap_or(0) + 1;

        let vcount: Vec<usize> = self.list(self.child(vw, "vcount")?)?;
        let v: Vec<i64> = self.list(self.child(vw, "v")?)?;

        let mut out = Vec::with_capacity(vcount.len());
        let mut cursor = 0usize;
        for count in vcount {
            let mut infl = Vec::with_capacity(count);
            for _ in 0..count {
                let base = cursor * stride;
                cursor += 1;
                let (Some(&j), Some(&w)) = (v.get(base + joint.offset), v.get(base + weight.offset))
                else {
                    return Err(self.err("<v> is shorter than <vcount> requires"));
                };
                let w = usize::try_from(w)
                    .ok()
                    .and_then(|w| weight_values.get(w, 1))
                    .ok_or_else(|| self.err(format!("weight index {w} out of range")))?[0];
                // -1 binds to the bind-shape, not to a bone
                if j >= 0 {
                    infl.push((j as f32, w));
                }
            }
            out.push(three_influences(infl));
        }
        Ok(out)
    }

    /// Flattens the first `<triangles>` of `geometry` into skinned vertices.
    fn skinned_triangles(
        &self,
        geometry: Node<'a, 'i>,
        weights: &[[(f32, f32); MAX_INFLUENCES]],
    ) -> PakResult<Vec<f32>> {
        let mesh = self.child(geometry, "mesh")?;
        let tris = self.child(mesh, "triangles")?;
        let tri_inputs = self.inputs(tris)?;

        let vertex = tri_inputs
            .iter()
            .find(|i| i.semantic == "VERTEX")
            .ok_or_else(|| self.err("<triangles> has no VERTEX input"))?;

        // attributes declared on <vertices> share the VERTEX offset
        let mut attrs: Vec<Input<'a>> = self
            .inputs(self.lookup(vertex.source)?)?
            .into_iter()
            .map(|i| Input {
                offset: vertex.offset,
                ..i
            })
            .collect();
        attrs.extend(
            tri_inputs
                .iter()
                .filter(|i| i.semantic != "VERTEX")
                .copied(),
        );

        let find = |semantic: &str| -> PakResult<(FloatSource, usize)> {
            let input = attrs
                .iter()
                .find(|i| i.semantic == semantic)
                .ok_or_else(|| self.err(format!("mesh has no {semantic} input")))?;
            Ok((self.float_source(input.source)?, input.offset))
        };
        let (positions, pos_off) = find("POSITION")?;
        let (normals, norm_off) = find("NORMAL")?;
        let (uvs, uv_off) = find("TEXCOORD")?;

        let stride = tri_inputs.iter().map(|i| i.offset).max().unwrap_or(0) + 1;
        let p: Vec<usize> = self.list(self.child(tris, "p")?)?;
        if p.len() % (3 * stride) != 0 {
            return Err(self.err("<p> is not a whole number of triangles"));
        }

        let mut out = Vec::with_capacity(p.len() / stride * SKIN_FLOATS_PER_VERTEX);
        for corner in p.chunks_exact(stride) {
            let vi = corner[pos_off];
            let pos = positions
                .get(vi, 3)
                .ok_or_else(|| self.err(format!("position index {vi} out of range")))?;
            let ni = corner[norm_off];
            let normal = normals
                .get(ni, 3)
                .ok_or_else(|| self.err(format!("normal index {ni} out of range")))?;
            let ti = corner[uv_off];
            let uv = uvs
                .get(ti, 2)
                .ok_or_else(|| self.err(format!("texcoord index {ti} out of range")))?;
            let w = weights
                .get(vi)
                .ok_or_else(|| self.err(format!("vertex {vi} has no skin weights")))?;

            out.extend_from_slice(pos);
            out.extend_from_slice(normal);
            out.extend_from_slice(uv);
            for (bone, weight) in w {
                out.push(*bone);
                out.push(*weight);
            }
        }
        Ok(out)
    }

    fn joint_node(&self, name: &str) -> Option<Node<'a, 'i>> {
        self.doc.descendants().find(|n| {
            n.has_tag_name("node")
                && n.attribute("type") == Some("JOINT")
                && (n.attribute("sid") == Some(name)
                    || n.attribute("name") == Some(name)
                    || n.attribute("id") == Some(name))
        })
    }

    /// The node's own `<matrix>`, identity when absent.
    fn local_matrix(&self, node: Node<'a, 'i>) -> PakResult<Mat4> {
        match child(node, "matrix") {
            Some(m) => mat4_from_row_major(&self.list::<f32>(m)?)
                .ok_or_else(|| self.err("<matrix> must hold 16 floats")),
            None => Ok(IDENTITY),
        }
    }

    /// Bind pose of `joint` relative to the armature: its local matrix
    /// composed with every enclosing JOINT node's.
    fn armature_matrix(&self, joint: Node<'a, 'i>) -> PakResult<Mat4> {
        let mut m = IDENTITY;
        for n in joint
            .ancestors()
            .take_while(|n| n.has_tag_name("node") && n.attribute("type") == Some("JOINT"))
        {
            m = mul(&self.local_matrix(n)?, &m);
        }
        Ok(m)
    }

    /// Bones in controller joint order with their armature-space bind transforms.
    fn bones(&self, joints: &[String]) -> PakResult<Vec<Bone>> {
        let nodes = joints
            .iter()
            .map(|j| {
                self.joint_node(j)
                    .ok_or_else(|| self.err(format!("joint '{j}' not found in visual scene")))
            })
            .collect::<PakResult<Vec<_>>>()?;

        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let parent = node
                    .parent_element()
                    .and_then(|p| nodes.iter().position(|n| *n == p))
                    .map_or(-1, |p| p as i32);
                Ok(Bone {
                    parent,
                    index: index as i32,
                    transform: decompose(&self.armature_matrix(*node)?),
                })
            })
            .collect()
    }
}
