// src/feed/atom.rs
use anyhow::{Context, Result};
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::feed::types::FeedEntry;

/// Which direct child of the current `<entry>` is being read.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Title,
    Id,
}

/// Parse a feed document into entries, matching elements by local name so
/// the JMA Atom namespace (or any prefixing) is irrelevant. For each
/// `entry`, `title` and `id` come from direct-child text and the detail URL
/// from the `href` attribute of a direct `link` child; anything missing
/// stays an empty string.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>> {
    let t0 = std::time::Instant::now();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    // Open-element depth below the current <entry>; 0 means its direct children.
    let mut depth = 0usize;
    let mut leaf: Option<Leaf> = None;

    loop {
        match reader.read_event().context("parsing feed xml")? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.local_name();
                if let Some(entry) = current.as_mut() {
                    if depth == 0 {
                        leaf = match name.as_ref() {
                            b"title" => Some(Leaf::Title),
                            b"id" => Some(Leaf::Id),
                            _ => None,
                        };
                        if name.as_ref() == b"link" && entry.link.is_empty() {
                            if let Some(href) = href_attr(&e) {
                                entry.link = href;
                            }
                        }
                    }
                    depth += 1;
                } else if name.as_ref() == b"entry" {
                    current = Some(FeedEntry::default());
                    depth = 0;
                    leaf = None;
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if depth == 0
                        && e.local_name().as_ref() == b"link"
                        && entry.link.is_empty()
                    {
                        if let Some(href) = href_attr(&e) {
                            entry.link = href;
                        }
                    }
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        // </entry>
                        entries.push(current.take().unwrap_or_default());
                        leaf = None;
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            leaf = None;
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(entry), Some(which)) = (current.as_mut(), leaf) {
                    if depth == 1 {
                        let text = t.unescape().context("unescaping feed text")?;
                        let field = match which {
                            Leaf::Title => &mut entry.title,
                            Leaf::Id => &mut entry.id,
                        };
                        field.push_str(text.trim());
                    }
                }
            }
            Event::CData(t) => {
                if let (Some(entry), Some(which)) = (current.as_mut(), leaf) {
                    if depth == 1 {
                        let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                        let field = match which {
                            Leaf::Title => &mut entry.title,
                            Leaf::Id => &mut entry.id,
                        };
                        field.push_str(text.trim());
                    }
                }
            }
            _ => {}
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_entries_total").increment(entries.len() as u64);
    Ok(entries)
}

fn href_attr(e: &BytesStart) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"href" {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_fields_are_extracted_regardless_of_namespace() {
        let xml = r#"<?xml version="1.0"?>
            <a:feed xmlns:a="http://www.w3.org/2005/Atom">
              <a:title>feed title</a:title>
              <a:entry>
                <a:title>緊急地震速報（警報）</a:title>
                <a:id>urn:jma:report:1</a:id>
                <a:link href="https://example.test/r1.xml"/>
              </a:entry>
            </a:feed>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "緊急地震速報（警報）");
        assert_eq!(entries[0].id, "urn:jma:report:1");
        assert_eq!(entries[0].link, "https://example.test/r1.xml");
    }

    #[test]
    fn missing_children_yield_empty_strings() {
        let xml = "<feed><entry><title>t</title></entry></feed>";
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].id.is_empty());
        assert!(entries[0].link.is_empty());
    }

    #[test]
    fn nested_elements_inside_entry_do_not_leak_into_fields() {
        let xml = r#"<feed><entry>
                <author><name>気象庁</name></author>
                <title>t</title>
                <id>i</id>
                <link href="https://example.test/x.xml"></link>
            </entry></feed>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries[0].title, "t");
        assert_eq!(entries[0].id, "i");
        assert_eq!(entries[0].link, "https://example.test/x.xml");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_entries("<feed><entry></mismatch>").is_err());
    }
}
