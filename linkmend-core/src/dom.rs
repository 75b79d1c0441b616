//! Owned, typed document tree.
//!
//! Documents are parsed with `scraper` and converted into plain [`Node`]
//! values so transforms can be written and tested as functions over data.
//! Positions in the tree are addressed by [`NodePath`], the child indices
//! from the top level down.

use crate::error::{CoreError, Result};
use linkmend_scanner::decode_document;
use scraper::{ElementRef, Html};
use std::path::Path;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes", "noscript"];

pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(Doctype),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doctype {
    pub name: String,
    pub public_id: String,
    pub system_id: String,
}

impl Doctype {
    pub fn html5() -> Self {
        Self {
            name: "html".to_string(),
            ..Self::default()
        }
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Concatenated descendant text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    /// Parse markup. Complete documents go through the document parser; bare
    /// fragments are parsed as body content so no wrapper elements are added.
    pub fn parse(html: &str) -> Self {
        if looks_like_full_document(html) {
            let parsed = Html::parse_document(html);
            let children = parsed
                .tree
                .root()
                .children()
                .filter_map(|child| match child.value() {
                    scraper::Node::Doctype(d) => Some(Node::Doctype(Doctype {
                        name: d.name().to_string(),
                        public_id: d.public_id().to_string(),
                        system_id: d.system_id().to_string(),
                    })),
                    scraper::Node::Comment(c) => Some(Node::Comment(String::from(&**c))),
                    scraper::Node::Text(t) => Some(Node::Text(String::from(&**t))),
                    scraper::Node::Element(_) => ElementRef::wrap(child).map(|e| Node::Element(convert(e))),
                    _ => None,
                })
                .collect();
            Self { children }
        } else {
            let parsed = Html::parse_fragment(html);
            let root = convert(parsed.root_element());
            Self { children: root.children }
        }
    }

    /// Decode raw bytes and parse them. Undecodable input is a parse failure.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self> {
        let text = decode_document(bytes, path).map_err(CoreError::from)?;
        Ok(Self::parse(&text))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, false, &mut out);
        }
        out
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for idx in rest {
            node = node.as_element()?.children.get(*idx)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for idx in rest {
            node = node.as_element_mut()?.children.get_mut(*idx)?;
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.get(path)?.as_element()
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.get_mut(path)?.as_element_mut()
    }

    /// First element in document order satisfying `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<NodePath>
    where
        F: Fn(&Element) -> bool,
    {
        self.find_all(predicate).into_iter().next()
    }

    pub fn find_tag(&self, tag: &str) -> Option<NodePath> {
        self.find(|e| e.is(tag))
    }

    /// Every element satisfying `predicate`, in document order.
    pub fn find_all<F>(&self, predicate: F) -> Vec<NodePath>
    where
        F: Fn(&Element) -> bool,
    {
        let mut found = Vec::new();
        let mut path = Vec::new();
        walk(&self.children, &mut path, &predicate, &mut found);
        found
    }

    /// Insert `node` as the sibling immediately before `path`.
    pub fn insert_before(&mut self, path: &[usize], node: Node) -> bool {
        let Some((idx, siblings)) = self.siblings_mut(path) else {
            return false;
        };
        siblings.insert(idx, node);
        true
    }

    /// Insert `node` as the sibling immediately after `path`.
    pub fn insert_after(&mut self, path: &[usize], node: Node) -> bool {
        let Some((idx, siblings)) = self.siblings_mut(path) else {
            return false;
        };
        siblings.insert(idx + 1, node);
        true
    }

    /// Detach the node at `path`. Later siblings shift down by one.
    pub fn remove(&mut self, path: &[usize]) -> Option<Node> {
        let (idx, siblings) = self.siblings_mut(path)?;
        Some(siblings.remove(idx))
    }

    pub fn append_child(&mut self, path: &[usize], node: Node) -> bool {
        match self.element_mut(path) {
            Some(element) => {
                element.children.push(node);
                true
            }
            None => false,
        }
    }

    pub fn prepend_child(&mut self, path: &[usize], node: Node) -> bool {
        match self.element_mut(path) {
            Some(element) => {
                element.children.insert(0, node);
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every element, in document order. Returns how many calls
    /// reported a change.
    pub fn update_elements<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&mut Element) -> bool,
    {
        let mut changed = 0;
        update(&mut self.children, &mut f, &mut changed);
        changed
    }

    fn siblings_mut(&mut self, path: &[usize]) -> Option<(usize, &mut Vec<Node>)> {
        let (last, parent) = path.split_last()?;
        let siblings = if parent.is_empty() {
            &mut self.children
        } else {
            &mut self.element_mut(parent)?.children
        };
        if *last >= siblings.len() {
            return None;
        }
        Some((*last, siblings))
    }
}

fn looks_like_full_document(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    ["<!doctype", "<html", "<head", "<body"].iter().any(|m| lower.contains(m))
}

fn convert(element: ElementRef) -> Element {
    let value = element.value();
    let mut out = Element {
        tag: value.name().to_string(),
        attributes: value
            .attrs
            .iter()
            // `prefix:local` for namespaced attributes such as `xlink:href`
            .map(|(name, v)| match &name.prefix {
                Some(prefix) => (format!("{}:{}", prefix, name.local), v.to_string()),
                None => (name.local.to_string(), v.to_string()),
            })
            .collect(),
        children: Vec::new(),
    };
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(t) => out.children.push(Node::Text(String::from(&**t))),
            scraper::Node::Comment(c) => out.children.push(Node::Comment(String::from(&**c))),
            scraper::Node::Element(_) => {
                if let Some(e) = ElementRef::wrap(child) {
                    out.children.push(Node::Element(convert(e)));
                }
            }
            _ => {}
        }
    }
    out
}

fn walk<F>(nodes: &[Node], path: &mut NodePath, predicate: &F, found: &mut Vec<NodePath>)
where
    F: Fn(&Element) -> bool,
{
    for (i, node) in nodes.iter().enumerate() {
        if let Node::Element(element) = node {
            path.push(i);
            if predicate(element) {
                found.push(path.clone());
            }
            walk(&element.children, path, predicate, found);
            path.pop();
        }
    }
}

fn update<F>(nodes: &mut [Node], f: &mut F, changed: &mut usize)
where
    F: FnMut(&mut Element) -> bool,
{
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            if f(element) {
                *changed += 1;
            }
            update(&mut element.children, f, changed);
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
            _ => {}
        }
    }
}

fn write_node(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(&doctype.name);
            if !doctype.public_id.is_empty() {
                out.push_str(" PUBLIC \"");
                out.push_str(&doctype.public_id);
                out.push('"');
                if !doctype.system_id.is_empty() {
                    out.push_str(" \"");
                    out.push_str(&doctype.system_id);
                    out.push('"');
                }
            } else if !doctype.system_id.is_empty() {
                out.push_str(" SYSTEM \"");
                out.push_str(&doctype.system_id);
                out.push('"');
            }
            out.push('>');
        }
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::Text(text) if raw => out.push_str(text),
        Node::Text(text) => escape_into(text, false, out),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }

            let raw_children = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
            for child in &element.children {
                write_node(child, raw_children, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}
