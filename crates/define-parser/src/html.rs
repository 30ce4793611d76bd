//! Lenient HTML tree built on top of `quick-xml`.
//!
//! Result pages are HTML, not XML: tags are left open, void elements have no
//! end tag, scripts contain stray `<`. The reader runs with end-name checks
//! off and the tree builder repairs nesting itself:
//!
//! - void elements never take children;
//! - `script` / `style` bodies are dropped before reading;
//! - an end tag closes the nearest open element with that name, or is
//!   ignored when no such element is open;
//! - elements still open at EOF are closed implicitly.
//!
//! Nodes live in an arena in document order, so comparing ids compares
//! document positions.

use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// The reader gave up on the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupError {
    pub position: u64,
    pub message: String,
}

pub type NodeId = usize;

#[derive(Debug)]
struct Element {
    name: String,
    id: Option<String>,
    classes: Vec<String>,
}

#[derive(Debug)]
enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Parsed document. Node 0 is a synthetic root element.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self, MarkupError> {
        let stripped = strip_raw_text(source);
        let source = escape_stray_lt(&stripped);
        let mut reader = Reader::from_str(&source);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.trim_text(false);

        let mut doc = Document {
            nodes: vec![Node {
                kind: NodeKind::Element(Element {
                    name: String::new(),
                    id: None,
                    classes: Vec::new(),
                }),
                children: Vec::new(),
            }],
        };
        // Open elements; the root is never popped.
        let mut open: Vec<NodeId> = vec![0];

        loop {
            let parent = open.last().copied().unwrap_or(0);
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let element = element_from(&start);
                    let is_void = VOID_ELEMENTS.contains(&element.name.as_str());
                    let id = doc.push(parent, NodeKind::Element(element));
                    if !is_void {
                        open.push(id);
                    }
                }
                Ok(Event::Empty(start)) => {
                    doc.push(parent, NodeKind::Element(element_from(&start)));
                }
                Ok(Event::End(end)) => {
                    let name = lowercase_name(end.name().as_ref());
                    let matching = open
                        .iter()
                        .rposition(|&id| id != 0 && doc.element_name(id) == Some(name.as_str()));
                    if let Some(pos) = matching {
                        open.truncate(pos);
                    }
                }
                Ok(Event::Text(text)) => {
                    let raw = String::from_utf8_lossy(&text);
                    doc.push_text(parent, decode_entities(&raw));
                }
                Ok(Event::CData(data)) => {
                    let raw = String::from_utf8_lossy(&data).into_owned();
                    doc.push_text(parent, raw);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(markup_error(&reader, e)),
            }
        }

        Ok(doc)
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { doc: self, id: 0 }
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn push_text(&mut self, parent: NodeId, text: String) {
        if !text.is_empty() {
            self.push(parent, NodeKind::Text(text));
        }
    }

    fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element(e) => Some(e.name.as_str()),
            NodeKind::Text(_) => None,
        }
    }
}

/// Empty the bodies of `script` / `style` elements. Their content is not
/// markup and a stray `<` in it would derail the reader.
fn strip_raw_text(source: &str) -> Cow<'_, str> {
    // ASCII lowercasing keeps byte offsets aligned with `source`.
    let lower = source.to_ascii_lowercase();
    let mut out = String::new();
    let mut copied = 0;
    let mut cursor = 0;

    while let Some((open_at, name)) = next_raw_text_open(&lower, cursor) {
        let Some(gt) = lower[open_at..].find('>') else {
            break;
        };
        let body_start = open_at + gt + 1;
        let body_end = lower[body_start..]
            .find(&format!("</{}", name))
            .map(|p| body_start + p)
            .unwrap_or(lower.len());
        out.push_str(&source[copied..body_start]);
        copied = body_end;
        cursor = body_end;
    }

    if copied == 0 {
        Cow::Borrowed(source)
    } else {
        out.push_str(&source[copied..]);
        Cow::Owned(out)
    }
}

/// Escape every `<` that cannot open a tag, comment or declaration so the
/// reader keeps it as text.
fn escape_stray_lt(source: &str) -> Cow<'_, str> {
    let opens_markup = |c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?');
    let is_stray = |at: usize| !source[at + 1..].chars().next().is_some_and(opens_markup);

    if !source.match_indices('<').any(|(at, _)| is_stray(at)) {
        return Cow::Borrowed(source);
    }
    let mut out = String::with_capacity(source.len() + 16);
    let mut copied = 0;
    for (at, _) in source.match_indices('<') {
        if is_stray(at) {
            out.push_str(&source[copied..at]);
            out.push_str("&lt;");
            copied = at + 1;
        }
    }
    out.push_str(&source[copied..]);
    Cow::Owned(out)
}

/// Earliest `<script` / `<style` opening tag at or after `from`.
fn next_raw_text_open(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    RAW_TEXT_ELEMENTS
        .iter()
        .filter_map(|&name| {
            let pattern = format!("<{}", name);
            let mut search = from;
            while let Some(p) = lower[search..].find(&pattern) {
                let at = search + p;
                let after = lower[at + pattern.len()..].chars().next();
                if matches!(after, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
                    return Some((at, name));
                }
                search = at + pattern.len();
            }
            None
        })
        .min_by_key(|&(at, _)| at)
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let mut id = None;
    let mut classes = Vec::new();
    let mut attributes = start.html_attributes();
    attributes.with_checks(false);
    for attr in attributes.flatten() {
        let key = attr.key.as_ref();
        if key.eq_ignore_ascii_case(b"id") {
            id = Some(String::from_utf8_lossy(&attr.value).trim().to_string());
        } else if key.eq_ignore_ascii_case(b"class") {
            classes = String::from_utf8_lossy(&attr.value)
                .split_whitespace()
                .map(str::to_string)
                .collect();
        }
    }
    Element {
        name: lowercase_name(start.name().as_ref()),
        id,
        classes,
    }
}

fn lowercase_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn markup_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> MarkupError {
    MarkupError {
        position: reader.buffer_position() as u64,
        message: error.to_string(),
    }
}

/// Resolve HTML5 named and numeric character references one at a time;
/// unknown or broken references are left as written.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let resolved = tail
            .find(';')
            .filter(|&semi| semi > 1 && semi <= 32)
            .and_then(|semi| resolve_reference(&tail[1..semi]).map(|text| (text, semi)));
        match resolved {
            Some((text, semi)) => {
                out.push_str(&text);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_html5_entity(name).map(str::to_string)
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Node access ─────────────────────────────────────────────────

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.id]
    }

    fn element(&self) -> Option<&'a Element> {
        match &self.node().kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    /// Tag name (lowercase) for elements, `None` for text.
    pub fn name(&self) -> Option<&'a str> {
        self.element().map(|e| e.name.as_str())
    }

    pub fn is_tag(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.element().and_then(|e| e.id.as_deref()) == Some(id)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.element()
            .map(|e| e.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Raw text of a text node.
    pub fn as_text(&self) -> Option<&'a str> {
        match &self.node().kind {
            NodeKind::Text(t) => Some(t.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { doc, id })
    }

    /// All nodes below this one, in document order.
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<NodeId> = self.node().children.clone();
        stack.reverse();
        Descendants {
            doc: self.doc,
            stack,
        }
    }

    pub fn find<P>(&self, predicate: P) -> Option<NodeRef<'a>>
    where
        P: Fn(&NodeRef<'a>) -> bool,
    {
        self.descendants().find(|n| predicate(n))
    }

    pub fn find_all<P>(&self, predicate: P) -> Vec<NodeRef<'a>>
    where
        P: Fn(&NodeRef<'a>) -> bool,
    {
        self.descendants().filter(|n| predicate(n)).collect()
    }

    /// Concatenated text of this node and everything below it.
    pub fn text(&self) -> String {
        if let Some(t) = self.as_text() {
            return t.to_string();
        }
        self.descendants().filter_map(|n| n.as_text()).collect()
    }

    /// `text()` with whitespace collapsed and trimmed.
    pub fn clean_text(&self) -> String {
        collapse_whitespace(&self.text())
    }
}

/// Pre-order walk driven by an explicit stack, so deep nesting cannot
/// overflow the call stack.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.nodes[id].children.iter().rev().copied());
        Some(NodeRef { doc: self.doc, id })
    }
}
