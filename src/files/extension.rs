//! File extension inference

use std::path::Path;

/// MIME types whose first table entry is not the extension people expect
const PREFERRED: [(&str, &str); 3] = [
    ("text/plain", "txt"),
    ("application/octet-stream", "bin"),
    ("image/jpeg", "jpg"),
];

/// Extension of a declared file name, without the dot
pub fn from_filename(name: &str) -> Option<String> {
    Path::new(name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

/// Extension registered for a MIME type (`application/pdf` → `pdf`)
pub fn from_mime(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }

    if let Some((_, ext)) = PREFERRED.iter().find(|(mime, _)| *mime == essence) {
        return Some(ext.to_string());
    }

    let extensions = mime_guess::get_mime_extensions_str(&essence)?;
    let subtype = essence.split('/').nth(1).unwrap_or_default();
    extensions
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| extensions.first())
        .map(|ext| ext.to_string())
}

/// Extension detected from the file's magic bytes
pub fn from_content(path: &Path) -> Option<String> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => {
            log::debug!(
                "{} identified as {} from its content",
                path.display(),
                kind.mime_type()
            );
            Some(kind.extension().to_string())
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("Could not inspect {}: {}", path.display(), e);
            None
        }
    }
}

/// Extension for a stored file: declared name, then MIME type, then content
///
/// # Example
/// ```
/// use crm_migrator::files::infer_extension;
/// use std::path::Path;
///
/// let missing = Path::new("/nonexistent/00P000000000001AAA");
/// assert_eq!(infer_extension(Some("report.PDF"), None, missing).as_deref(), Some("PDF"));
/// assert_eq!(infer_extension(Some("report"), Some("application/pdf"), missing).as_deref(), Some("pdf"));
/// assert_eq!(infer_extension(Some("report"), None, missing), None);
/// ```
pub fn infer_extension(
    declared_filename: Option<&str>,
    content_type: Option<&str>,
    path: &Path,
) -> Option<String> {
    declared_filename
        .and_then(from_filename)
        .or_else(|| content_type.and_then(from_mime))
        .or_else(|| from_content(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_filename() {
        assert_eq!(from_filename("Q3 report.xlsx").as_deref(), Some("xlsx"));
        assert_eq!(from_filename("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(from_filename("README"), None);
        assert_eq!(from_filename(".bashrc"), None);
        assert_eq!(from_filename(""), None);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(from_mime("application/pdf").as_deref(), Some("pdf"));
        assert_eq!(from_mime("image/png").as_deref(), Some("png"));
        assert_eq!(from_mime("text/plain; charset=UTF-8").as_deref(), Some("txt"));
        assert_eq!(from_mime("Image/JPEG").as_deref(), Some("jpg"));
        assert_eq!(from_mime("application/x-made-up"), None);
        assert_eq!(from_mime(""), None);
    }

    #[test]
    fn test_sniff_content_last() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("00P000000000001AAA");
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, png).unwrap();

        assert_eq!(infer_extension(None, None, &path).as_deref(), Some("png"));
        // declared information wins over content
        assert_eq!(
            infer_extension(Some("logo.gif"), Some("image/png"), &path).as_deref(),
            Some("gif")
        );
        assert_eq!(
            infer_extension(Some("logo"), Some("image/gif"), &path).as_deref(),
            Some("gif")
        );
    }

    #[test]
    fn test_unknown_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        std::fs::write(&path, "just some words").unwrap();
        assert_eq!(infer_extension(None, None, &path), None);
    }
}
