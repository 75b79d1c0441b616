//! Tree transformations applied through the mutation engine.
//!
//! Each transform carries a marker check so that applying it twice is a
//! no-op.

use crate::category::{Category, HubSection, SectionClassifier};
use crate::dom::{Document, Element, Node};
use linkmend_scanner::normalize::{basename, is_non_navigational, strip_query_and_fragment};
use std::collections::BTreeMap;

pub const ORPHAN_MENU_CLASS: &str = "linkmend-orphan-menu";
const ORPHAN_CATEGORY_CLASS: &str = "linkmend-orphan-category";
const ORPHAN_STYLE_ID: &str = "linkmend-orphan-style";
const LABEL_LIMIT: usize = 20;

const ORPHAN_MENU_CSS: &str = "
.linkmend-orphan-menu { background: #f8fafc; border: 1px solid #e2e8f0; border-radius: 10px; padding: 15px; margin: 20px 0; font-size: 0.9rem; }
.linkmend-orphan-menu h3 { margin: 0 0 10px 0; color: #374151; font-size: 1rem; }
.linkmend-orphan-category { margin-bottom: 10px; }
.linkmend-orphan-category strong { color: #1f2937; display: block; margin-bottom: 5px; }
.linkmend-orphan-category a { display: inline-block; margin: 2px 5px 2px 0; padding: 4px 8px; background: #e5e7eb; color: #374151; text-decoration: none; border-radius: 4px; font-size: 0.8rem; }
.linkmend-orphan-category a:hover { background: #d1d5db; }
";

pub const HUB_DIGEST_CLASS: &str = "linkmend-hub-digest";
const HUB_GROUP_CLASS: &str = "linkmend-hub-group";
const HUB_LINKS_CLASS: &str = "linkmend-hub-links";
const HUB_MORE_CLASS: &str = "linkmend-hub-more";
const HUB_STYLE_ID: &str = "linkmend-hub-style";
const HUB_TEXT_LIMIT: usize = 30;

const HUB_DIGEST_CSS: &str = "
.linkmend-hub-digest { background: #f8fafc; border: 1px solid #e2e8f0; border-radius: 10px; padding: 15px; margin: 20px 0; }
.linkmend-hub-digest h3 { margin: 0 0 12px 0; color: #1f2937; font-size: 1.1rem; }
.linkmend-hub-group { margin-bottom: 12px; }
.linkmend-hub-group h4 { margin: 0 0 6px 0; color: #374151; font-size: 0.95rem; }
.linkmend-hub-links a { color: #2563eb; text-decoration: none; font-size: 0.85rem; }
.linkmend-hub-links a:hover { text-decoration: underline; }
.linkmend-hub-more { color: #6b7280; font-style: italic; font-size: 0.8rem; }
";

const QUICK_ACCESS_STYLE: &str =
    "margin: 15px 0; padding: 10px; background: rgba(16, 185, 129, 0.1); border-radius: 8px; border-left: 3px solid #10b981;";

pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// True when the document already carries this transform's marker.
    fn is_applied(&self, document: &Document) -> bool;

    /// Mutate the tree, returning the number of elements altered or inserted.
    fn apply(&self, document: &mut Document) -> usize;
}

/// Replace anchor hrefs by exact match.
#[derive(Debug, Clone)]
pub struct RewriteLinks {
    rewrites: BTreeMap<String, String>,
}

impl RewriteLinks {
    pub fn new(rewrites: BTreeMap<String, String>) -> Self {
        Self { rewrites }
    }

    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }
}

impl Transform for RewriteLinks {
    fn name(&self) -> &str {
        "rewrite-links"
    }

    /// Applied once no anchor still carries an href that would be rewritten.
    fn is_applied(&self, document: &Document) -> bool {
        document
            .find(|e| e.is("a") && e.attr("href").is_some_and(|h| self.rewrites.contains_key(h)))
            .is_none()
    }

    fn apply(&self, document: &mut Document) -> usize {
        document.update_elements(|element| {
            if !element.is("a") {
                return false;
            }
            let Some(replacement) = element.attr("href").and_then(|h| self.rewrites.get(h)).cloned() else {
                return false;
            };
            element.set_attr("href", replacement);
            true
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetEntry {
    pub href: String,
    pub label: String,
}

impl WidgetEntry {
    /// Entry linking to a corpus document by its site-rooted path.
    pub fn for_document(path: &str) -> Self {
        Self {
            href: format!("/{}", path.trim_start_matches('/')),
            label: friendly_label(basename(path)),
        }
    }
}

/// Categorised "additional pages" block listing orphaned documents.
#[derive(Debug, Clone)]
pub struct OrphanWidget {
    groups: BTreeMap<Category, Vec<WidgetEntry>>,
    max_per_category: usize,
    heading: String,
}

impl OrphanWidget {
    pub fn new(groups: BTreeMap<Category, Vec<WidgetEntry>>, max_per_category: usize) -> Self {
        Self {
            groups,
            max_per_category,
            heading: "Additional Pages".to_string(),
        }
    }

    pub fn with_heading(mut self, heading: &str) -> Self {
        self.heading = heading.to_string();
        self
    }

    /// Build the widget node, or `None` when every group is empty.
    pub fn render(&self) -> Option<Element> {
        let mut menu = Element::new("div")
            .with_attr("class", ORPHAN_MENU_CLASS)
            .with_child(Element::new("h3").with_text(self.heading.clone()));

        let mut any = false;
        for (category, entries) in &self.groups {
            if entries.is_empty() {
                continue;
            }
            any = true;
            let mut group = Element::new("div")
                .with_attr("class", ORPHAN_CATEGORY_CLASS)
                .with_child(Element::new("strong").with_text(category.label()));
            for entry in entries.iter().take(self.max_per_category) {
                group = group.with_child(
                    Element::new("a")
                        .with_attr("href", entry.href.clone())
                        .with_text(entry.label.clone()),
                );
            }
            if entries.len() > self.max_per_category {
                group = group.with_child(
                    Element::new("span")
                        .with_attr("style", "color: #6b7280; font-style: italic;")
                        .with_text(format!(" (+{} more)", entries.len() - self.max_per_category)),
                );
            }
            menu = menu.with_child(group);
        }

        any.then_some(menu)
    }
}

impl Transform for OrphanWidget {
    fn name(&self) -> &str {
        "orphan-widget"
    }

    fn is_applied(&self, document: &Document) -> bool {
        document.find(|e| e.has_class(ORPHAN_MENU_CLASS)).is_some()
    }

    fn apply(&self, document: &mut Document) -> usize {
        let Some(menu) = self.render() else {
            return 0;
        };
        let mut altered = 0;

        if document.find(|e| e.attr("id") == Some(ORPHAN_STYLE_ID)).is_none()
            && let Some(head) = document.find_tag("head")
        {
            let style = Element::new("style")
                .with_attr("id", ORPHAN_STYLE_ID)
                .with_text(ORPHAN_MENU_CSS);
            if document.append_child(&head, style.into()) {
                altered += 1;
            }
        }

        let inserted = if let Some(nav) = document.find_tag("nav") {
            document.insert_after(&nav, menu.into())
        } else if let Some(body) = document.find_tag("body") {
            document.prepend_child(&body, menu.into())
        } else {
            document.children.push(menu.into());
            true
        };

        if inserted {
            altered += 1;
        }
        altered
    }
}

/// Regroups an overloaded hub. Navigational anchors past `limit` are
/// removed and every such link is listed once in a sectioned digest.
#[derive(Debug, Clone)]
pub struct HubDigest {
    limit: usize,
    classifier: SectionClassifier,
}

impl HubDigest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            classifier: SectionClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: SectionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Navigational anchors with their link entries, in document order.
    fn links(document: &Document) -> Vec<(Vec<usize>, WidgetEntry)> {
        document
            .find_all(|e| e.is("a") && e.attr("href").is_some_and(|h| !is_non_navigational(h)))
            .into_iter()
            .filter_map(|path| {
                let anchor = document.element(&path)?;
                let href = anchor.attr("href")?.trim().to_string();
                let text: String = anchor.text().trim().chars().take(HUB_TEXT_LIMIT).collect();
                let label = if text.is_empty() { href.clone() } else { text };
                Some((path, WidgetEntry { href, label }))
            })
            .collect()
    }

    /// Build the digest for `entries`, one group per non-empty section.
    pub fn render(&self, entries: &[WidgetEntry]) -> Element {
        let mut sections: BTreeMap<HubSection, Vec<&WidgetEntry>> = BTreeMap::new();
        for entry in entries {
            let section = self.classifier.classify(&entry.href, &entry.label);
            sections.entry(section).or_default().push(entry);
        }

        let mut digest = Element::new("div")
            .with_attr("class", HUB_DIGEST_CLASS)
            .with_child(Element::new("h3").with_text(format!("Organized Hub ({} links)", entries.len())));

        for section in HubSection::ALL {
            let Some(members) = sections.get(&section) else {
                continue;
            };
            let mut links = Element::new("div").with_attr("class", HUB_LINKS_CLASS);
            for (i, entry) in members.iter().take(section.cap()).enumerate() {
                if i > 0 {
                    links.children.push(Node::text(" | "));
                }
                links = links.with_child(
                    Element::new("a")
                        .with_attr("href", entry.href.clone())
                        .with_text(entry.label.clone()),
                );
            }
            if members.len() > section.cap() {
                links = links.with_child(
                    Element::new("span")
                        .with_attr("class", HUB_MORE_CLASS)
                        .with_text(format!(" (+{} more)", members.len() - section.cap())),
                );
            }
            digest = digest.with_child(
                Element::new("div")
                    .with_attr("class", HUB_GROUP_CLASS)
                    .with_child(Element::new("h4").with_text(section.label()))
                    .with_child(links),
            );
        }
        digest
    }
}

impl Transform for HubDigest {
    fn name(&self) -> &str {
        "hub-digest"
    }

    fn is_applied(&self, document: &Document) -> bool {
        document.find(|e| e.has_class(HUB_DIGEST_CLASS)).is_some()
    }

    fn apply(&self, document: &mut Document) -> usize {
        let links = Self::links(document);
        if links.len() <= self.limit {
            return 0;
        }

        // Reverse document order keeps the remaining paths valid.
        let mut altered = 0;
        for (path, _) in links[self.limit..].iter().rev() {
            if document.remove(path).is_some() {
                altered += 1;
            }
        }

        let entries: Vec<WidgetEntry> = links.into_iter().map(|(_, entry)| entry).collect();
        let digest = self.render(&entries);

        if document.find(|e| e.attr("id") == Some(HUB_STYLE_ID)).is_none()
            && let Some(head) = document.find_tag("head")
        {
            let style = Element::new("style")
                .with_attr("id", HUB_STYLE_ID)
                .with_text(HUB_DIGEST_CSS);
            if document.append_child(&head, style.into()) {
                altered += 1;
            }
        }

        let inserted = if let Some(nav) = document.find_tag("nav") {
            document.insert_after(&nav, digest.into())
        } else if let Some(body) = document.find_tag("body") {
            document.prepend_child(&body, digest.into())
        } else {
            document.children.push(digest.into());
            true
        };
        altered + usize::from(inserted)
    }
}

/// Adds one navigation link to a page.
#[derive(Debug, Clone)]
pub struct NavLink {
    href: String,
    label: String,
    block_title: String,
}

impl NavLink {
    pub fn new(href: &str, label: &str) -> Self {
        Self {
            href: href.to_string(),
            label: label.to_string(),
            block_title: "Quick Access".to_string(),
        }
    }

    pub fn with_block_title(mut self, title: &str) -> Self {
        self.block_title = title.to_string();
        self
    }

    /// Substring that identifies an existing link to the target.
    pub fn marker(&self) -> &str {
        basename(strip_query_and_fragment(&self.href))
    }
}

impl Transform for NavLink {
    fn name(&self) -> &str {
        "nav-link"
    }

    fn is_applied(&self, document: &Document) -> bool {
        let marker = self.marker();
        !marker.is_empty()
            && document
                .find(|e| e.is("a") && e.attr("href").is_some_and(|h| h.contains(marker)))
                .is_some()
    }

    fn apply(&self, document: &mut Document) -> usize {
        let mut link = Element::new("a").with_attr("href", self.href.clone());

        if let Some(nav) = document.find_tag("nav") {
            let class = document
                .element(&nav)
                .and_then(|nav| first_anchor_class(&nav.children));
            if let Some(class) = class {
                link.set_attr("class", class);
            }
            link = link.with_text(self.label.clone());
            return usize::from(document.append_child(&nav, link.into()));
        }

        let block = Element::new("div")
            .with_attr("style", QUICK_ACCESS_STYLE)
            .with_child(
                Element::new("strong")
                    .with_attr("style", "color: #10b981; display: block; margin-bottom: 5px;")
                    .with_text(self.block_title.clone()),
            )
            .with_child(
                link.with_attr("style", "color: #10b981; text-decoration: none; font-weight: 600;")
                    .with_text(self.label.clone()),
            );

        match document.find_tag("body") {
            Some(body) => usize::from(document.prepend_child(&body, block.into())),
            None => {
                document.children.insert(0, Node::Element(block));
                1
            }
        }
    }
}

fn first_anchor_class(nodes: &[Node]) -> Option<String> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.is("a") {
                return element.attr("class").map(str::to_string);
            }
            if let Some(class) = first_anchor_class(&element.children) {
                return Some(class);
            }
        }
    }
    None
}

/// Human label for a document basename: extension dropped, dashes and
/// underscores as spaces, title case, at most 20 characters plus `...`.
pub fn friendly_label(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };
    let spaced = stem.replace(['-', '_'], " ");
    let titled: String = spaced
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");

    let mut label: String = titled.chars().take(LABEL_LIMIT).collect();
    if label.chars().count() < stem.chars().count() {
        label.push_str("...");
    }
    label
}
