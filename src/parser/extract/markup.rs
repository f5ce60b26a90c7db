use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use tracing::debug;

use super::extract_turns;
use crate::parser::turn::Turn;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Inline-assigned page state, checked in this order before `__NEXT_DATA__`.
static ASSIGNMENT_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ["__INITIAL_STATE__", "__data"]
        .into_iter()
        .map(|name| {
            let re = Regex::new(&format!(r"(?s)window\.{}\s*=\s*(\{{.*\}})", regex::escape(name)))
                .unwrap();
            (name, re)
        })
        .collect()
});

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static NEXT_DATA_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script#__NEXT_DATA__").unwrap());

/// Message container selectors, most specific first.
static CONTAINER_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [r#"div[class*="message" i]"#, r#"div[data-role="message"]"#, "article"]
        .into_iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript"];

#[derive(Debug, Clone)]
pub struct MarkupOptions<'a> {
    pub max_depth: usize,
    pub responder_name: &'a str,
    pub min_container_chars: usize,
    pub min_raw_text_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupExtraction {
    Turns(Vec<Turn>),
    /// Page text with no turn structure, to be segmented as plain text.
    RawText(String),
    Nothing,
}

/// Embedded data, then message containers, then the page's visible text.
pub fn extract(html: &str, opts: &MarkupOptions) -> MarkupExtraction {
    let document = Html::parse_document(html);

    for (source, doc) in embedded_documents(&document) {
        let turns = extract_turns(&doc, opts.max_depth, opts.responder_name);
        if !turns.is_empty() {
            debug!("Extracted {} turns from {}", turns.len(), source);
            return MarkupExtraction::Turns(turns);
        }
    }

    if let Some(turns) = container_turns(&document, opts.min_container_chars) {
        return MarkupExtraction::Turns(turns);
    }

    let text = visible_text(&document);
    if text.chars().count() > opts.min_raw_text_chars {
        debug!("Falling back to {} chars of page text", text.len());
        return MarkupExtraction::RawText(text);
    }

    MarkupExtraction::Nothing
}

/// Decoded page-state blobs in probe order. Blobs that fail to decode are skipped.
fn embedded_documents(document: &Html) -> Vec<(&'static str, Value)> {
    let scripts: Vec<String> = document
        .select(&SCRIPT_SEL)
        .map(|s| s.text().collect())
        .collect();

    let mut found = Vec::new();
    for (name, re) in ASSIGNMENT_RES.iter() {
        for script in &scripts {
            let Some(caps) = re.captures(script) else {
                continue;
            };
            if let Some(doc) = decode(name, &caps[1]) {
                found.push((*name, doc));
            }
        }
    }

    for script in document.select(&NEXT_DATA_SEL) {
        let body: String = script.text().collect();
        if let Some(doc) = decode("__NEXT_DATA__", &body) {
            found.push(("__NEXT_DATA__", doc));
        }
    }

    found
}

fn decode(source: &str, raw: &str) -> Option<Value> {
    let trimmed = raw.trim().trim_end_matches(';');
    match serde_json::from_str(trimmed) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("Skipping malformed {} data: {}", source, e);
            None
        }
    }
}

/// Outermost matches of the first selector that hits anything.
fn container_turns(document: &Html, min_chars: usize) -> Option<Vec<Turn>> {
    for sel in CONTAINER_SELS.iter() {
        let matched: Vec<ElementRef> = document.select(sel).collect();
        if matched.is_empty() {
            continue;
        }

        let ids: HashSet<_> = matched.iter().map(|el| el.id()).collect();
        let turns: Vec<Turn> = matched
            .iter()
            .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
            .map(|el| collapse(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|text| text.chars().count() > min_chars)
            .map(Turn::unlabeled)
            .collect();

        if !turns.is_empty() {
            debug!("Found {} message containers", turns.len());
            return Some(turns);
        }
    }
    None
}

fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
                .is_some_and(|name| SKIPPED_TEXT_PARENTS.contains(&name.as_str()));
            if hidden {
                None
            } else {
                Some(&**text)
            }
        })
        .collect();
    collapse(&parts.join(" "))
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}
