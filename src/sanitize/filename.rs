//! Filename normalization.

/// Upper bound on a normalized filename, in bytes (the output is ASCII).
pub const MAX_FILENAME_LEN: usize = 255;

/// Name used when nothing safe is left.
pub const FALLBACK_FILENAME: &str = "file";

fn is_safe_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Reduce an untrusted filename to a single safe path component.
///
/// Keeps only the last path segment, maps everything outside
/// `[A-Za-z0-9._-]` to `_`, removes `..` sequences and leading/trailing dots.
pub fn sanitize_filename(input: &str) -> String {
    let unified = input.replace('\\', "/");
    let last = unified.rsplit('/').next().unwrap_or_default();

    let mut name: String = last
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if is_safe_filename_char(c) { c } else { '_' })
        .collect();

    while name.contains("..") {
        name = name.replace("..", "");
    }

    if name.len() > MAX_FILENAME_LEN {
        name.truncate(MAX_FILENAME_LEN);
    }

    let trimmed = name.trim_matches('.');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
