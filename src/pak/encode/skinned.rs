#![forbid(unsafe_code)]

use std::path::Path;

use crate::pak::encode::math::TRANSFORM_FLOATS;
use crate::pak::encode::{header_count, EncodedEntry, Encoder};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::AssetType;
use crate::pak::io::PayloadBuf;

/// position (3) + normal (3) + uv (2) + 3 x (bone, weight)
pub const SKIN_FLOATS_PER_VERTEX: usize = 14;

/// Influences stored per skinned vertex.
pub const MAX_INFLUENCES: usize = 3;

pub const SKIN_PREFIX: &str = "SKIN_";
pub const SKELETON_PREFIX: &str = "SKEL_";

pub fn animation_prefix(clip: &str) -> String {
    format!("ANIM_{}_", clip.to_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bone {
    pub parent: i32,
    pub index: i32,
    pub transform: [f32; TRANSFORM_FLOATS],
}

/// `[float count u32][floats]`
pub(crate) fn skin_payload(path: &Path, floats: &[f32]) -> PakResult<Vec<u8>> {
    let mut p = PayloadBuf::with_capacity(4 + floats.len() * 4);
    p.u32(header_count(path, floats.len(), "skin floats")?).f32s(floats);
    Ok(p.finish())
}

/// `[bone count i32]` then `(parent i32, index i32, 10 x f32)` per bone.
pub(crate) fn skeleton_payload(path: &Path, bones: &[Bone]) -> PakResult<Vec<u8>> {
    let mut p = PayloadBuf::with_capacity(4 + bones.len() * (8 + TRANSFORM_FLOATS * 4));
    p.i32(header_count(path, bones.len(), "bones")?);
    for b in bones {
        p.i32(b.parent).i32(b.index).f32s(&b.transform);
    }
    Ok(p.finish())
}

/// Keeps the three heaviest `(bone, weight)` influences, pads with zero
/// weights and rescales so the kept weights sum to one.
pub(crate) fn three_influences(mut infl: Vec<(f32, f32)>) -> [(f32, f32); MAX_INFLUENCES] {
    infl.sort_by(|a, b| b.1.total_cmp(&a.1));
    infl.truncate(MAX_INFLUENCES);
    infl.resize(MAX_INFLUENCES, (0.0, 0.0));

    let total: f32 = infl.iter().map(|(_, w)| w).sum();
    let mut out = [(0.0, 0.0); MAX_INFLUENCES];
    for (slot, (bone, w)) in out.iter_mut().zip(infl) {
        *slot = (bone, if total > 0.0 { w / total } else { w });
    }
    out
}

/// Line-tagged skinned-mesh export (`.edan`): one `geo:` mesh, one `arm:`
/// skeleton and any number of `anim:<clip>:` animations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdanEncoder;

impl Encoder for EdanEncoder {
    fn encode(&self, path: &Path) -> PakResult<Vec<EncodedEntry>> {
        let src = std::fs::read_to_string(path)?;
        encode_edan(path, &src)
    }
}

struct LineCtx<'a> {
    path: &'a Path,
    line: usize,
}

impl LineCtx<'_> {
    fn err(&self, reason: impl std::fmt::Display) -> PakError {
        PakError::malformed(self.path, format!("line {}: {reason}", self.line))
    }

    fn floats(&self, s: &str) -> PakResult<Vec<f32>> {
        s.split_whitespace()
            .map(|t| t.parse::<f32>().map_err(|_| self.err(format!("bad float '{t}'"))))
            .collect()
    }

    fn transform(&self, s: &str) -> PakResult<[f32; TRANSFORM_FLOATS]> {
        let v = self.floats(s)?;
        v.as_slice()
            .try_into()
            .map_err(|_| self.err(format!("expected {TRANSFORM_FLOATS} transform floats, got {}", v.len())))
    }
}

pub(crate) fn encode_edan(path: &Path, src: &str) -> PakResult<Vec<EncodedEntry>> {
    let mut out = Vec::new();

    for (i, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ctx = LineCtx { path, line: i + 1 };
        let (tag, rest) = line
            .split_once(':')
            .ok_or_else(|| ctx.err("missing record tag"))?;

        let entry = match tag {
            "geo" => parse_geo(&ctx, rest)?,
            "arm" => parse_arm(&ctx, rest)?,
            "anim" => {
                let (clip, frames) = rest
                    .split_once(':')
                    .ok_or_else(|| ctx.err("animation without clip name"))?;
                if clip.trim().is_empty() {
                    return Err(ctx.err("empty clip name"));
                }
                parse_anim(&ctx, clip.trim(), frames)?
            }
            other => return Err(ctx.err(format!("unknown record tag '{other}'"))),
        };
        out.push(entry);
    }

    Ok(out)
}

fn parse_geo(ctx: &LineCtx<'_>, rest: &str) -> PakResult<EncodedEntry> {
    let floats = ctx.floats(rest)?;
    if floats.len() % SKIN_FLOATS_PER_VERTEX != 0 {
        return Err(ctx.err(format!(
            "{} floats is not a whole number of {SKIN_FLOATS_PER_VERTEX}-float vertices",
            floats.len()
        )));
    }
    let payload = skin_payload(ctx.path, &floats)?;
    Ok(EncodedEntry::new(AssetType::Skinned, payload).with_prefix(SKIN_PREFIX))
}

fn parse_arm(ctx: &LineCtx<'_>, rest: &str) -> PakResult<EncodedEntry> {
    let mut bones = Vec::new();
    for bone in rest.split('|') {
        let mut tok = bone.split_whitespace();
        let mut int = |what: &str| -> PakResult<i32> {
            let t = tok.next().ok_or_else(|| ctx.err(format!("bone without {what}")))?;
            t.parse().map_err(|_| ctx.err(format!("bad {what} '{t}'")))
        };
        let parent = int("parent")?;
        let index = int("index")?;
        // bone name, not packed
        tok.next().ok_or_else(|| ctx.err("bone without name"))?;
        let transform = ctx.transform(&tok.collect::<Vec<_>>().join(" "))?;
        bones.push(Bone {
            parent,
            index,
            transform,
        });
    }
    let payload = skeleton_payload(ctx.path, &bones)?;
    Ok(EncodedEntry::new(AssetType::Skeleton, payload).with_prefix(SKELETON_PREFIX))
}

fn parse_anim(ctx: &LineCtx<'_>, clip: &str, rest: &str) -> PakResult<EncodedEntry> {
    let mut frame_indices: Vec<u32> = Vec::new();
    let mut transforms: Vec<f32> = Vec::new();
    let mut bone_count: Option<usize> = None;

    for frame in rest.split(';') {
        let (idx, bones) = frame
            .split_once('=')
            .ok_or_else(|| ctx.err("frame without '<index>='"))?;
        let idx = idx
            .trim()
            .parse::<u32>()
            .map_err(|_| ctx.err(format!("bad frame index '{}'", idx.trim())))?;

        let per_frame: Vec<&str> = bones.split('|').collect();
        match bone_count {
            Some(n) if n != per_frame.len() => {
                return Err(ctx.err(format!(
                    "frame {idx} has {} bones, expected {n}",
                    per_frame.len()
                )))
            }
            _ => bone_count = Some(per_frame.len()),
        }

        frame_indices.push(idx);
        for t in per_frame {
            transforms.extend_from_slice(&ctx.transform(t)?);
        }
    }

    let bone_count = bone_count.unwrap_or(0);
    let mut p = PayloadBuf::with_capacity(8 + frame_indices.len() * 4 + transforms.len() * 4);
    p.u32(header_count(ctx.path, frame_indices.len(), "frames")?)
        .u32(header_count(ctx.path, bone_count, "bones")?);
    for i in &frame_indices {
        p.u32(*i);
    }
    p.f32s(&transforms);

    Ok(EncodedEntry::new(AssetType::Animation, p.finish()).with_prefix(animation_prefix(clip)))
}
