//! Small side tables joined into the main datasets

use crate::project::LookupTable;
use crate::storage::CsvSource;

use eyre::Result;
use std::path::Path;

/// Which link is kept when a document is linked to several entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// The first link in file order
    First,
    /// The last link in file order
    Last,
}

/// ContentDocumentLink.csv: document id → the entity it is linked to
pub fn document_links(path: &Path, policy: LinkPolicy) -> Result<LookupTable> {
    let mut links = LookupTable::new();
    for row in CsvSource::new(path).open()? {
        let row = row?;
        let (Some(document), Some(entity)) =
            (row.value("ContentDocumentId"), row.value("LinkedEntityId"))
        else {
            continue;
        };
        match policy {
            LinkPolicy::First => {
                links
                    .entry(document.to_string())
                    .or_insert_with(|| entity.to_string());
            }
            LinkPolicy::Last => {
                links.insert(document.to_string(), entity.to_string());
            }
        }
    }
    log::info!("Found links for {} unique document(s)", links.len());
    Ok(links)
}

/// EmailMessage.csv: activity id → HTML body, else text body
pub fn email_bodies(path: &Path) -> Result<LookupTable> {
    let mut bodies = LookupTable::new();
    for row in CsvSource::new(path).open()? {
        let row = row?;
        let Some(activity) = row.value("ActivityId") else {
            continue;
        };
        if let Some(body) = row.value("HtmlBody").or_else(|| row.value("TextBody")) {
            bodies.insert(activity.to_string(), body.to_string());
        }
    }
    log::info!("Loaded {} unique email bodies", bodies.len());
    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn link_table(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("ContentDocumentLink.csv");
        std::fs::write(
            &path,
            "ContentDocumentId,LinkedEntityId\n069A,003xx1\n069A,005user\n069B,\n069C,001xx1\n\
             069D,005user\n069D,003xx2\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_first_link_wins() {
        let temp = TempDir::new().unwrap();
        let links = document_links(&link_table(&temp), LinkPolicy::First).unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links["069A"], "003xx1");
        assert_eq!(links["069C"], "001xx1");
        assert_eq!(links["069D"], "005user");
    }

    #[test]
    fn test_last_link_wins() {
        let temp = TempDir::new().unwrap();
        let links = document_links(&link_table(&temp), LinkPolicy::Last).unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links["069A"], "005user");
        assert_eq!(links["069C"], "001xx1");
        assert_eq!(links["069D"], "003xx2");
    }

    #[test]
    fn test_email_bodies_prefer_html() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("EmailMessage.csv");
        std::fs::write(
            &path,
            "ActivityId,HtmlBody,TextBody\n00T1,<p>hi</p>,hi\n00T2,,plain\n00T3,,\n,<p>orphan</p>,\n",
        )
        .unwrap();

        let bodies = email_bodies(&path).unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies["00T1"], "<p>hi</p>");
        assert_eq!(bodies["00T2"], "plain");
    }
}
