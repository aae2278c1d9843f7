//! File and directory name sanitization for the local filesystem.

/// Placeholder used when an album name sanitizes to nothing.
pub const ALBUM_PLACEHOLDER: &str = "Album";

/// Placeholder used when a file name sanitizes to nothing.
pub const FILE_PLACEHOLDER: &str = "file";

/// Characters that are rejected by at least one mainstream filesystem.
const PATH_HOSTILE: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strips path-hostile characters and surrounding whitespace from `name`.
///
/// Returns `fallback` when nothing usable remains. `.` and `..` are treated as
/// empty because joining them would escape the album directory.
///
/// # Examples
///
/// ```
/// use albumdl_core::download::sanitize_name;
///
/// assert_eq!(sanitize_name("  My: Album? ", "Album"), "My Album");
/// assert_eq!(sanitize_name("<>", "Album"), "Album");
/// ```
#[must_use]
pub fn sanitize_name(name: &str, fallback: &str) -> String {
    let stripped: String = name.chars().filter(|c| !PATH_HOSTILE.contains(c)).collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitizes an album display name for use as a directory name.
#[must_use]
pub fn sanitize_album_name(name: &str) -> String {
    sanitize_name(name, ALBUM_PLACEHOLDER)
}

/// Sanitizes a file display name for use as a file name.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    sanitize_name(name, FILE_PLACEHOLDER)
}
