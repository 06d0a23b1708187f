//! Derives the local basename for an object key, and sanitizes it for the
//! local filesystem.

/// Last non-empty `/`-separated segment of `key`, or `"download.bin"` if the
/// key has no usable segment (empty, or `/`-only).
pub fn basename_for_key(key: &str) -> String {
    let segment = key.split('/').filter(|s| !s.is_empty()).last();
    match segment {
        Some(s) if s != "." && s != ".." => sanitize_filename_for_linux(s),
        _ => "download.bin".to_string(),
    }
}

/// Sanitizes a candidate filename for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Collapses consecutive underscores
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_filename_for_linux(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            '_'
        } else if c == ' ' || c == '\t' {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '\t' || c == '.' || c == '_');

    if trimmed.is_empty() {
        return "download.bin".to_string();
    }

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_from_nested_key() {
        assert_eq!(basename_for_key("path/to/object.bin"), "object.bin");
    }

    #[test]
    fn basename_from_flat_key() {
        assert_eq!(basename_for_key("object.bin"), "object.bin");
    }

    #[test]
    fn basename_falls_back_on_trailing_slash() {
        assert_eq!(basename_for_key("path/to/"), "download.bin");
        assert_eq!(basename_for_key(""), "download.bin");
    }

    #[test]
    fn removes_slash_and_backslash() {
        assert_eq!(sanitize_filename_for_linux("a/b\\c.txt"), "a_b_c.txt");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(
            sanitize_filename_for_linux("  ..  file.txt  ..  "),
            "file.txt"
        );
    }

    #[test]
    fn collapses_underscores() {
        assert_eq!(
            sanitize_filename_for_linux("file___name.txt"),
            "file_name.txt"
        );
    }

    #[test]
    fn control_chars() {
        assert_eq!(
            sanitize_filename_for_linux("file\x00name.txt"),
            "file_name.txt"
        );
    }
}
