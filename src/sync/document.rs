//! Streaming reader for the remote Atom document.
//!
//! Only the shape the read-state pass needs is kept: direct `<entry>`
//! children of the root, and within each entry its first `<id>` text and the
//! `label` attribute of every `<category>` child. Names are matched on their
//! local part, so the Atom default namespace and prefixed variants both work.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("document ended inside {0} unclosed element(s)")]
    Unclosed(usize),
}

/// One `<entry>` of the remote document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Text content of the first `<id>` child, if there was one.
    pub id: Option<String>,
    /// `label` attributes of `<category>` children, in document order.
    pub labels: Vec<String>,
}

/// Parse a complete remote body into its entries, in document order.
///
/// The whole body is checked before anything is returned, so a truncated or
/// malformed document yields an error and no entries at all.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RemoteEntry>, DocumentError> {
    // SEC-002: quick-xml never expands <!ENTITY> declarations; unknown
    // entity references surface as errors from unescape().
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut walker = EntryWalker::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                walker.depth += 1;
                walker.open(&e, &reader);
            }
            Ok(Event::Empty(e)) => {
                walker.depth += 1;
                walker.open(&e, &reader);
                walker.close();
                walker.depth -= 1;
            }
            Ok(Event::End(_)) => {
                walker.close();
                walker.depth = walker.depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) if walker.in_id => {
                let text = t
                    .unescape()
                    .map_err(|e| DocumentError::Xml(e.to_string()))?;
                walker.push_id_text(&text);
            }
            Ok(Event::CData(c)) if walker.in_id => {
                walker.push_id_text(&String::from_utf8_lossy(&c));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if walker.depth > 0 {
        return Err(DocumentError::Unclosed(walker.depth));
    }
    if !walker.seen_root {
        return Err(DocumentError::MissingRoot);
    }

    Ok(walker.entries)
}

// Depth 1 is the root, 2 its children, 3 the children of an entry.
const ROOT: usize = 1;
const ENTRY: usize = 2;
const ENTRY_CHILD: usize = 3;

#[derive(Default)]
struct EntryWalker {
    depth: usize,
    seen_root: bool,
    current: Option<RemoteEntry>,
    in_id: bool,
    entries: Vec<RemoteEntry>,
}

impl EntryWalker {
    fn open(&mut self, e: &BytesStart<'_>, reader: &Reader<&[u8]>) {
        match self.depth {
            ROOT => self.seen_root = true,
            ENTRY if e.local_name().as_ref() == b"entry" => {
                self.current = Some(RemoteEntry::default());
            }
            ENTRY_CHILD => {
                let Some(entry) = self.current.as_mut() else {
                    return;
                };
                match e.local_name().as_ref() {
                    b"id" if entry.id.is_none() => {
                        entry.id = Some(String::new());
                        self.in_id = true;
                    }
                    b"category" => {
                        if let Some(label) = category_label(e, reader) {
                            entry.labels.push(label);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        match self.depth {
            ENTRY_CHILD => self.in_id = false,
            ENTRY => {
                if let Some(entry) = self.current.take() {
                    self.entries.push(entry);
                }
            }
            _ => {}
        }
    }

    fn push_id_text(&mut self, text: &str) {
        if let Some(id) = self.current.as_mut().and_then(|e| e.id.as_mut()) {
            id.push_str(text);
        }
    }
}

fn category_label(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Option<String> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed category attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() != b"label" {
            continue;
        }
        match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => return Some(value.into_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable category label");
                return None;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(id: Option<&str>, labels: &[&str]) -> RemoteEntry {
        RemoteEntry {
            id: id.map(str::to_string),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_parses_atom_entries_in_order() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <id>tag:google.com,2005:reader/feed/1</id>
  <entry>
    <id>tag:google.com,2005:reader/item/a</id>
    <category term="user/-/state/com.google/read" label="read"/>
    <category term="user/-/label/tech" label="tech"/>
    <title>A</title>
  </entry>
  <entry>
    <id>tag:google.com,2005:reader/item/b</id>
    <title>B</title>
  </entry>
</feed>"#;

        let entries = parse_entries(body).unwrap();
        assert_eq!(
            entries,
            vec![
                entry(Some("tag:google.com,2005:reader/item/a"), &["read", "tech"]),
                entry(Some("tag:google.com,2005:reader/item/b"), &[]),
            ]
        );
    }

    #[test]
    fn test_feed_level_id_is_not_an_entry() {
        let body = br#"<feed><id>feed-id</id><category label="read"/></feed>"#;
        assert!(parse_entries(body).unwrap().is_empty());
    }

    #[test]
    fn test_first_id_wins() {
        let body = br#"<feed><entry><id>first</id><id>second</id></entry></feed>"#;
        assert_eq!(parse_entries(body).unwrap(), vec![entry(Some("first"), &[])]);
    }

    #[test]
    fn test_nested_ids_are_ignored() {
        let body = br#"<feed><entry>
            <source><id>tag:source</id></source>
            <id>tag:item</id>
        </entry></feed>"#;
        assert_eq!(parse_entries(body).unwrap(), vec![entry(Some("tag:item"), &[])]);
    }

    #[test]
    fn test_entry_without_id() {
        let body = br#"<feed><entry><title>no id</title></entry><entry/></feed>"#;
        assert_eq!(
            parse_entries(body).unwrap(),
            vec![entry(None, &[]), entry(None, &[])]
        );
    }

    #[test]
    fn test_category_without_label() {
        let body = br#"<feed><entry><id>x</id><category term="read"/></entry></feed>"#;
        assert_eq!(parse_entries(body).unwrap(), vec![entry(Some("x"), &[])]);
    }

    #[test]
    fn test_prefixed_names_match_on_local_part() {
        let body = br#"<a:feed xmlns:a="http://www.w3.org/2005/Atom">
            <a:entry><a:id>x</a:id><a:category a:label="read"/></a:entry>
        </a:feed>"#;
        assert_eq!(parse_entries(body).unwrap(), vec![entry(Some("x"), &["read"])]);
    }

    #[test]
    fn test_id_text_is_unescaped() {
        let body = br#"<feed><entry><id>a&amp;b</id></entry></feed>"#;
        assert_eq!(parse_entries(body).unwrap(), vec![entry(Some("a&b"), &[])]);
    }

    #[test]
    fn test_malformed_xml_error() {
        assert!(matches!(
            parse_entries(b"<not valid xml"),
            Err(DocumentError::Xml(_))
        ));
    }

    #[test]
    fn test_mismatched_end_tag_error() {
        assert!(parse_entries(b"<feed><entry></feed></entry>").is_err());
    }

    #[test]
    fn test_truncated_document_error() {
        // Whether quick-xml or the depth check reports it, nothing is returned
        let body = br#"<feed><entry><id>x</id></entry><entry><id>y</id>"#;
        assert!(parse_entries(body).is_err());
    }

    #[test]
    fn test_empty_body_has_no_root() {
        assert_eq!(parse_entries(b""), Err(DocumentError::MissingRoot));
        assert_eq!(
            parse_entries(b"<?xml version=\"1.0\"?>"),
            Err(DocumentError::MissingRoot)
        );
    }

    #[test]
    fn test_custom_entity_not_expanded() {
        let body = br#"<?xml version="1.0"?>
<!DOCTYPE feed [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<feed><entry><id>&xxe;</id></entry></feed>"#;

        match parse_entries(body) {
            Ok(entries) => {
                for e in &entries {
                    assert!(!e.id.as_deref().unwrap_or("").contains("root:"));
                }
            }
            Err(_) => {
                // Rejection of the unknown entity is the expected behavior
            }
        }
    }
}
