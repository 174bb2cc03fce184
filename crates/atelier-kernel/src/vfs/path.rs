//! Workspace path normalization.
//!
//! Workspace paths are plain slash-delimited strings. They are never touched
//! by the host filesystem, so `std::path` is not used: a workspace authored on
//! one platform must round-trip byte-for-byte on another.

/// Normalize a workspace path: strip leading `/`, drop empty and `.` segments,
/// resolve `..` against the segments seen so far.
///
/// Returns `None` when nothing is left (`""`, `"/"`, `"a/.."`).
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.trim().split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
