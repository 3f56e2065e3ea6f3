// src/report.rs
//! Report summarization: pulls the handful of fields worth relaying out of
//! a JMA report document and renders them as Telegram-flavored HTML lines.

use anyhow::{Context, Result};
use html_escape::encode_text;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::http::TextTransport;

/// Descendant paths looked up in the report document, in render order.
/// Each path matches by local name at any depth, multi-segment paths as an
/// ancestor chain (`Hypocenter` somewhere above a `Name`).
const FIELD_PATHS: &[&[&str]] = &[
    &["Title"],
    &["Serial"],
    &["InfoType"],
    &["ReportDateTime"],
    &["TargetDateTime"],
    &["Hypocenter", "Name"],
    &["Magnitude"],
    &["Intensity", "MaxInt"],
    &["Headline", "Text"],
];

const LABELS: &[&str] = &[
    "", // title renders bold, without a label
    "・報号: ",
    "・種別: ",
    "・発表: ",
    "・基点: ",
    "・震源: ",
    "・M: ",
    "・最大震度: ",
    "", // headline renders after a blank separator line
];

/// Fetch a detail document and summarize it. Network and parse failures are
/// the caller's to isolate; a well-formed document always yields text.
pub async fn summarize(transport: &dyn TextTransport, url: &str) -> Result<String> {
    let body = transport.get_text(url).await?;
    summarize_report(&body, url)
}

/// Render the extractable fields of `xml` as one labeled line each, in fixed
/// order, HTML-escaped. Falls back to a generic header plus the source URL
/// when nothing could be extracted, so delivery never sends an empty message.
pub fn summarize_report(xml: &str, url: &str) -> Result<String> {
    let fields = extract_first_texts(xml, FIELD_PATHS).context("parsing report xml")?;

    let mut lines: Vec<String> = Vec::new();
    for (i, value) in fields.iter().enumerate() {
        let Some(value) = value else { continue };
        let escaped = encode_text(value);
        let line = match i {
            0 => format!("<b>{escaped}</b>"),
            8 => format!("\n{escaped}"),
            _ => format!("{}{escaped}", LABELS[i]),
        };
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push("<b>緊急地震速報</b>".to_string());
        lines.push(encode_text(url).into_owned());
    }

    Ok(lines.join("\n"))
}

/// First non-empty text, in document order, of the first element matching
/// each path. One pass over the events; the open-element stack of local
/// names decides matches, so namespaces and nesting depth are irrelevant.
fn extract_first_texts(xml: &str, paths: &[&[&str]]) -> Result<Vec<Option<String>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results: Vec<Option<String>> = vec![None; paths.len()];
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event().context("reading report xml")? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().context("unescaping report text")?;
                record_text(&stack, text.trim(), paths, &mut results);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                record_text(&stack, text.trim(), paths, &mut results);
            }
            _ => {}
        }
    }

    Ok(results)
}

fn record_text(
    stack: &[String],
    text: &str,
    paths: &[&[&str]],
    results: &mut [Option<String>],
) {
    if text.is_empty() {
        return;
    }
    for (i, path) in paths.iter().enumerate() {
        if results[i].is_none() && stack_matches(stack, path) {
            results[i] = Some(text.to_string());
        }
    }
}

/// The innermost open element must be the path's last segment and the
/// earlier segments must appear, in order, among its ancestors.
fn stack_matches(stack: &[String], path: &[&str]) -> bool {
    let Some((last, ancestors)) = path.split_last() else {
        return false;
    };
    let Some((top, rest)) = stack.split_last() else {
        return false;
    };
    if top != last {
        return false;
    }
    let mut want = ancestors.iter();
    let mut next = want.next();
    for name in rest {
        match next {
            Some(n) if name == n => next = want.next(),
            _ => {}
        }
    }
    next.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_matching_allows_any_depth() {
        let stack: Vec<String> = ["Report", "Body", "Earthquake", "Hypocenter", "Area", "Name"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(stack_matches(&stack, &["Hypocenter", "Name"]));
        assert!(stack_matches(&stack, &["Name"]));
        assert!(!stack_matches(&stack, &["Intensity", "Name"]));
        assert!(!stack_matches(&stack, &["Hypocenter"]));
    }

    #[test]
    fn fallback_contains_the_source_url() {
        let out = summarize_report("<Report/>", "https://example.test/r.xml").unwrap();
        assert!(out.contains("https://example.test/r.xml"));
        assert!(!out.is_empty());
    }

    #[test]
    fn field_values_are_html_escaped() {
        let xml = r#"<Report><Head><Title>M&amp;A &lt;Quake&gt;</Title></Head></Report>"#;
        let out = summarize_report(xml, "https://example.test/r.xml").unwrap();
        assert!(out.contains("<b>M&amp;A &lt;Quake&gt;</b>"));
    }

    #[test]
    fn headline_is_separated_by_a_blank_line() {
        let xml = r#"<Report><Head>
            <Title>緊急地震速報（警報）</Title>
            <Headline><Text>強い揺れに警戒</Text></Headline>
        </Head></Report>"#;
        let out = summarize_report(xml, "u").unwrap();
        assert!(out.ends_with("\n\n強い揺れに警戒"));
    }
}
