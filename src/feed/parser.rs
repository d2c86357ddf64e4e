use anyhow::Result;
use feed_rs::parser;
use sha2::{Digest, Sha256};

use crate::storage::ParsedItem;

/// Channel-level data plus items of one parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub homepage: Option<String>,
    pub description: Option<String>,
    pub items: Vec<ParsedItem>,
}

pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)?;

    let homepage = feed
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .map(|l| l.href.clone());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let url = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            let source_id = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty());
            let guid = generate_guid(source_id.as_deref(), url.as_deref(), &title, published);

            ParsedItem {
                guid,
                source_id,
                title,
                url,
                published,
                summary,
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        homepage,
        description: feed.description.map(|d| d.content),
        items,
    })
}

fn generate_guid(
    existing: Option<&str>,
    url: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        return guid.to_string();
    }

    let input = format!(
        "{}|{}|{}",
        url.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
