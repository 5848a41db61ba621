// Content type hint derived from the file extension
// A wrong guess surfaces later as a decode error from the primitive, never as a load failure

/// Guess the container type from a path's extension, defaulting to mp4
pub fn content_type_for_path(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for_path("/media/show.mkv"), "video/x-matroska");
        assert_eq!(content_type_for_path("clip.webm"), "video/webm");
        assert_eq!(content_type_for_path("C:\\videos\\old.avi"), "video/x-msvideo");
        assert_eq!(content_type_for_path("phone.MOV"), "video/quicktime");
    }

    #[test]
    fn test_default_is_mp4() {
        assert_eq!(content_type_for_path("movie.mp4"), "video/mp4");
        assert_eq!(content_type_for_path("movie.m4v"), "video/mp4");
        assert_eq!(content_type_for_path("no_extension"), "video/mp4");
        assert_eq!(content_type_for_path("/dir.mkv/file"), "video/mp4");
    }
}
