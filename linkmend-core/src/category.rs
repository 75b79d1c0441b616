//! Ordered keyword rules that bucket pages into a fixed set of categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Assessments,
    Dashboards,
    Consultations,
    Administration,
    TestDemo,
    BackupArchive,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Assessments,
        Category::Dashboards,
        Category::Consultations,
        Category::Administration,
        Category::TestDemo,
        Category::BackupArchive,
        Category::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Assessments => "assessments",
            Category::Dashboards => "dashboards",
            Category::Consultations => "consultations",
            Category::Administration => "administration",
            Category::TestDemo => "test-demo",
            Category::BackupArchive => "backup-archive",
            Category::Miscellaneous => "miscellaneous",
        }
    }

    /// Heading used in generated navigation.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Assessments => "Assessments",
            Category::Dashboards => "Alternative Dashboards",
            Category::Consultations => "Consultations",
            Category::Administration => "Administration",
            Category::TestDemo => "Test Pages",
            Category::BackupArchive => "Backup Files",
            Category::Miscellaneous => "Other Pages",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over a lowercased name.
#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(&'static str),
    StartsWith(&'static str),
    EndsWith(&'static str),
}

impl Matcher {
    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Contains(needle) => name.contains(needle),
            Matcher::StartsWith(prefix) => name.starts_with(prefix),
            Matcher::EndsWith(suffix) => name.ends_with(suffix),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: Category,
    pub matchers: Vec<Matcher>,
}

impl CategoryRule {
    pub fn new(category: Category, matchers: Vec<Matcher>) -> Self {
        Self { category, matchers }
    }

    pub fn keywords(category: Category, keywords: &[&'static str]) -> Self {
        Self::new(category, keywords.iter().map(|k| Matcher::Contains(*k)).collect())
    }

    fn matches(&self, name: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(name))
    }
}

/// Evaluates rules top-down; the first match wins.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
}

impl CategoryClassifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn classify(&self, name: &str) -> Category {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&name))
            .map(|rule| rule.category)
            .unwrap_or(Category::Miscellaneous)
    }

    /// Group names by category. Every category is present, each list keeps
    /// the input order.
    pub fn group<'a, I>(&self, names: I) -> BTreeMap<Category, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut groups: BTreeMap<Category, Vec<String>> =
            Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for name in names {
            groups.entry(self.classify(name)).or_default().push(name.to_string());
        }
        groups
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::keywords(
                Category::Assessments,
                &["gad", "phq", "mdq", "asrs", "pss", "ansiedade", "depressao", "bipolar"],
            ),
            CategoryRule::keywords(Category::Dashboards, &["dashboard", "painel"]),
            CategoryRule::keywords(Category::Consultations, &["consulta", "atendimento", "videoconsulta"]),
            CategoryRule::keywords(Category::Administration, &["admin", "gestao", "configuracao"]),
            CategoryRule::keywords(Category::TestDemo, &["teste", "test", "demo"]),
            CategoryRule::new(
                Category::BackupArchive,
                vec![
                    Matcher::Contains("backup"),
                    Matcher::EndsWith("-old.html"),
                    Matcher::Contains("copy"),
                ],
            ),
        ])
    }
}

/// Group of an existing hub link when an overloaded hub is regrouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HubSection {
    Navigation,
    Features,
    Assessments,
    External,
    Other,
}

impl HubSection {
    pub const ALL: [HubSection; 5] = [
        HubSection::Navigation,
        HubSection::Features,
        HubSection::Assessments,
        HubSection::External,
        HubSection::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HubSection::Navigation => "Main Navigation",
            HubSection::Features => "Features",
            HubSection::Assessments => "Assessments",
            HubSection::External => "External Links",
            HubSection::Other => "Other Pages",
        }
    }

    /// Links shown before the "(+N more)" tail.
    pub fn cap(&self) -> usize {
        match self {
            HubSection::Navigation => 6,
            _ => 4,
        }
    }
}

/// Which part of a link a [`SectionRule`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    Href,
    HrefOrText,
}

#[derive(Debug, Clone)]
pub struct SectionRule {
    pub section: HubSection,
    pub field: LinkField,
    pub matchers: Vec<Matcher>,
}

impl SectionRule {
    fn new(section: HubSection, field: LinkField, matchers: Vec<Matcher>) -> Self {
        Self {
            section,
            field,
            matchers,
        }
    }

    fn matches(&self, href: &str, text: &str) -> bool {
        self.matchers.iter().any(|m| {
            m.matches(href) || (self.field == LinkField::HrefOrText && m.matches(text))
        })
    }
}

/// Ordered rules over `(href, text)`; the first match wins, else `Other`.
#[derive(Debug, Clone)]
pub struct SectionClassifier {
    rules: Vec<SectionRule>,
}

impl SectionClassifier {
    pub fn new(rules: Vec<SectionRule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, href: &str, text: &str) -> HubSection {
        let href = href.to_lowercase();
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&href, &text))
            .map(|rule| rule.section)
            .unwrap_or(HubSection::Other)
    }
}

impl Default for SectionClassifier {
    fn default() -> Self {
        fn contains(keywords: &[&'static str]) -> Vec<Matcher> {
            keywords.iter().map(|k| Matcher::Contains(*k)).collect()
        }
        Self::new(vec![
            SectionRule::new(
                HubSection::Navigation,
                LinkField::Href,
                contains(&["/agenda", "/consulta", "/dashboard", "/lp"]),
            ),
            SectionRule::new(
                HubSection::Assessments,
                LinkField::HrefOrText,
                contains(&["gad", "phq", "mdq", "asrs", "pss", "ansiedade"]),
            ),
            SectionRule::new(HubSection::External, LinkField::Href, vec![Matcher::StartsWith("http")]),
            SectionRule::new(
                HubSection::Features,
                LinkField::HrefOrText,
                contains(&["consulta", "paciente", "receita", "dr-ai"]),
            ),
        ])
    }
}
