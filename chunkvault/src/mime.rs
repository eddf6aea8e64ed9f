//! MIME types.

use std::path::Path;

/// Fallback for files we can't classify.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Classifies a file by its name.
///
/// Only the extension is looked at. The contents are never read.
pub fn classify(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!("text/plain", classify(Path::new("notes.txt")));
        assert_eq!("image/png", classify(Path::new("/tmp/a/b/photo.PNG")));
        assert_eq!(OCTET_STREAM, classify(Path::new("no-extension")));
        assert_eq!(OCTET_STREAM, classify(Path::new("weird.zzzzunknown")));
    }
}
