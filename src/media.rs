use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "mkv"];

/// Media category reported in the result envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Image,
    Video,
    Unknown,
}

impl FileType {
    /// Categorize a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = lowercase_extension(path) else {
            return FileType::Unknown;
        };
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Video
        } else {
            FileType::Unknown
        }
    }
}

/// Like [`FileType::from_path`], but unsupported extensions are an error.
pub fn classify(path: &Path) -> Result<FileType> {
    match FileType::from_path(path) {
        FileType::Unknown => match lowercase_extension(path) {
            Some(ext) => bail!("Unsupported file type: .{}", ext),
            None => bail!("Unsupported file type: {} has no extension", path.display()),
        },
        file_type => Ok(file_type),
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions_case_insensitively() {
        assert_eq!(classify(Path::new("a/b/photo.JPG")).unwrap(), FileType::Image);
        assert_eq!(classify(Path::new("scan.bmp")).unwrap(), FileType::Image);
        assert_eq!(classify(Path::new("clip.MkV")).unwrap(), FileType::Video);
        assert_eq!(classify(Path::new("clip.wmv")).unwrap(), FileType::Video);
    }

    #[test]
    fn unsupported_extensions_are_descriptive() {
        let err = classify(Path::new("notes.txt")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .txt");

        let err = classify(Path::new("README")).unwrap_err();
        assert!(err.to_string().contains("has no extension"));
    }

    #[test]
    fn file_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&FileType::Video).unwrap(), "\"VIDEO\"");
        assert_eq!(serde_json::to_string(&FileType::Unknown).unwrap(), "\"UNKNOWN\"");
    }
}
