use crate::index::DocumentIndex;
use crate::normalize::{LinkKind, NormalizedTarget, SiteProfile};

/// Decide whether a normalized link points somewhere that exists.
///
/// Only internal targets naming a document are checked: they are valid when
/// a document with the same basename was traversed, or when the literal path
/// exists. Everything else is trivially valid; external links are never
/// fetched.
pub fn validate(target: &NormalizedTarget, site: &SiteProfile, index: &DocumentIndex) -> bool {
    if target.kind != LinkKind::Internal || !site.is_document(&target.value) {
        return true;
    }
    index.has_basename(target.basename()) || index.exists(&target.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn index() -> DocumentIndex {
        let mut index = DocumentIndex::new();
        index.insert("pages/a.html");
        index.insert("b.html");
        index
    }

    #[test]
    fn test_internal_document_validated_by_basename() {
        let site = SiteProfile::default();
        let target = normalize("/elsewhere/b.html", "pages/a.html", &site).unwrap();
        assert!(validate(&target, &site, &index()));
    }

    #[test]
    fn test_missing_document_is_broken() {
        let site = SiteProfile::default();
        let target = normalize("gone.html", "pages/a.html", &site).unwrap();
        assert!(!validate(&target, &site, &index()));
    }

    #[test]
    fn test_external_and_non_document_links_are_valid() {
        let site = SiteProfile::default();
        let external = normalize("https://x.org/gone.html", "b.html", &site).unwrap();
        let route = normalize("/dashboard", "b.html", &site).unwrap();
        assert!(validate(&external, &site, &DocumentIndex::new()));
        assert!(validate(&route, &site, &DocumentIndex::new()));
    }
}
