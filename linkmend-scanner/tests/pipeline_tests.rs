// Traversal, extraction and validation over a real directory

use linkmend_scanner::{CorpusOptions, DocumentIndex, LinkKind, Scanner, SiteProfile, discover, normalize};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn corpus(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, content) in files {
        let full = temp.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    temp
}

#[test]
fn test_scenario_c_relative_link_joins_source_dir() {
    let target = normalize::normalize("sub/x.html", "pages/a.html", &SiteProfile::default()).unwrap();
    assert_eq!(target.kind, LinkKind::Internal);
    assert_eq!(target.value, "pages/sub/x.html");
}

#[tokio::test]
async fn test_nested_relative_links_validate_against_corpus() {
    let temp = corpus(&[
        ("pages/a.html", r#"<a href="sub/x.html">x</a><a href="../missing.html">m</a><a href="/assets/site.css">css</a>"#),
        ("pages/sub/x.html", r#"<a href="../a.html">back</a>"#),
        ("assets/site.css", "body {}"),
        ("node_modules/lib/a.html", r#"<a href="nowhere.html">n</a>"#),
    ]);

    let sources = discover(temp.path(), &CorpusOptions::default()).unwrap();
    assert_eq!(sources.len(), 2);

    let index = Arc::new(DocumentIndex::from_sources(&sources).with_root(temp.path()));
    let scans = Scanner::new().scan(sources, index, 4).await.unwrap();

    let a = &scans[0];
    assert_eq!(a.document.path, "pages/a.html");
    assert_eq!(a.internal_count(), 3);
    assert_eq!(a.broken_count(), 1);
    assert!(a.links[0].valid);
    assert!(!a.links[1].valid);
    assert!(a.links[2].valid);

    let x = &scans[1];
    assert_eq!(x.links[0].target.as_ref().unwrap().value, "pages/a.html");
    assert!(x.links[0].valid);
}
