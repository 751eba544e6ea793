#![forbid(unsafe_code)]

use std::path::Path;

use crate::pak::error::{PakError, PakResult};

/// Relative path of `file_path` under `input_root`, as forward-slash segments.
pub fn rel_segments(input_root: &Path, file_path: &Path) -> PakResult<Vec<String>> {
    let rel = file_path
        .strip_prefix(input_root)
        .map_err(|_| PakError::Outside(file_path.to_string_lossy().into_owned()))?;

    let segs: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .collect();

    if segs.is_empty() {
        return Err(PakError::Invalid("empty relative path".into()));
    }
    Ok(segs)
}

/// Lower-cased final extension of `path`, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// File name without its final extension.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Upper-cases `prefix + stem` and maps everything outside `[A-Z0-9]` to `_`.
pub fn sanitize_name(prefix: &str, stem: &str) -> String {
    prefix
        .chars()
        .chain(stem.chars())
        .flat_map(char::to_uppercase)
        .map(|c| if c.is_ascii_uppercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitize_maps_punctuation_and_case() {
        assert_eq!(sanitize_name("", "master_shader"), "MASTER_SHADER");
        assert_eq!(sanitize_name("", "a!"), "A_");
        assert_eq!(sanitize_name("SKEL_", "hero-rig 2"), "SKEL_HERO_RIG_2");
        assert_eq!(sanitize_name("ANIM_WALK_", "hero"), "ANIM_WALK_HERO");
    }

    #[test]
    fn sanitize_never_emits_non_ascii() {
        let s = sanitize_name("", "häus");
        assert!(s.is_ascii());
        assert_eq!(s, "H_US");
    }

    #[test]
    fn stem_and_extension() {
        let p = PathBuf::from("res/test/Alphabet.TXT");
        assert_eq!(stem(&p), "Alphabet");
        assert_eq!(extension(&p).as_deref(), Some("txt"));
        assert_eq!(extension(Path::new("res/README")), None);
    }

    #[test]
    fn rel_segments_strips_root() {
        let segs = rel_segments(Path::new("res"), Path::new("res/test/deep/a.txt")).unwrap();
        assert_eq!(segs, vec!["test", "deep", "a.txt"]);
        assert!(rel_segments(Path::new("res"), Path::new("other/a.txt")).is_err());
    }
}
