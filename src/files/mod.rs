//! Matching stored files to their records
//!
//! Salesforce exports attachment and content-version bodies as files named
//! after the record id. Renaming gives them a readable name while keeping
//! the id up front, so a file can always be found again by id prefix:
//!
//! ```text
//! 00P5g00000AbCdEFGH                              (as exported)
//! 00P5g00000AbCdEFGH -- Signed contract.pdf       (after rename)
//! ```

mod extension;
mod rename;

pub use extension::{from_content, from_filename, from_mime, infer_extension};
pub use rename::{FileMetadata, FileRenamer, MARKER, NameSanitizer, RenameOutcome, RenameSummary};

use eyre::{Context, Result};
use std::path::Path;

/// File names in a directory, sorted
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// First listing entry whose name starts with the record id
///
/// # Example
/// ```
/// use crm_migrator::files::find_by_id;
///
/// let listing = vec![
///     "00P000000000001AAA -- Contract.pdf".to_string(),
///     "00P000000000002AAA".to_string(),
/// ];
/// assert_eq!(
///     find_by_id(&listing, "00P000000000001AAA"),
///     Some("00P000000000001AAA -- Contract.pdf")
/// );
/// assert_eq!(find_by_id(&listing, "00P000000000003AAA"), None);
/// ```
pub fn find_by_id<'a>(listing: &'a [String], id: &str) -> Option<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    listing
        .iter()
        .map(String::as_str)
        .find(|name| name.starts_with(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b"), "").unwrap();
        std::fs::write(temp.path().join("a"), "").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        assert_eq!(list_files(temp.path()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_list_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(list_files(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_find_by_empty_id() {
        let listing = vec!["anything".to_string()];
        assert_eq!(find_by_id(&listing, ""), None);
    }
}
