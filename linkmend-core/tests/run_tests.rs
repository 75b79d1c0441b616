// End-to-end runs over on-disk corpora

use linkmend_core::mutation::{BackupStore, MutationEngine};
use linkmend_core::report::{generate_json_report, load_graph_report, save_report};
use linkmend_core::run::{HUBS_PURPOSE, LINKS_PURPOSE, ORPHANS_PURPOSE};
use linkmend_core::transform::{HUB_DIGEST_CLASS, ORPHAN_MENU_CLASS, RewriteLinks};
use linkmend_core::{
    Category, Config, CoreError, ErrorKind, Ranked, ResolutionStatus, RunContext, connect_orphans,
    execute_analysis, fix_links, link_page, optimize_hubs,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
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

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

// ============================================================================
// Analysis
// ============================================================================

#[tokio::test]
async fn test_scenario_a_three_documents() {
    let temp = corpus(&[
        (
            "A.html",
            r#"<html><body><a href="B.html">B</a><a href="C.html">C</a><a href="https://example.org">x</a></body></html>"#,
        ),
        ("B.html", "<html><body><p>no links</p></body></html>"),
        ("C.html", r#"<html><body><a href="A.html">A</a></body></html>"#),
    ]);
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 3, None).await.unwrap();

    assert_eq!(run.analysis.top_hubs[0], Ranked("A.html".to_string(), 3));
    assert!(run.analysis.most_referenced.contains(&Ranked("A.html".to_string(), 1)));
    assert!(run.analysis.most_referenced.contains(&Ranked("C.html".to_string(), 1)));
    assert!(run.analysis.orphan_pages.is_empty());
    assert_eq!(run.analysis.totals.valid_links, 3);
    assert_eq!(run.analysis.totals.broken_links, 0);
    assert_eq!(run.analysis.totals.external_links, 1);
}

#[tokio::test]
async fn test_orphans_and_referenced_partition_documents() {
    let temp = corpus(&[
        ("index.html", r#"<a href="pages/a.html">a</a><a href="/pages/b.html">b</a>"#),
        ("pages/a.html", r##"<a href="b.html">b</a><a href="#top">top</a>"##),
        ("pages/b.html", "<p>b</p>"),
        ("pages/lonely.html", "<p>lonely</p>"),
    ]);
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    let referenced: Vec<&str> = run.analysis.most_referenced.iter().map(|r| r.name()).collect();
    for orphan in &run.analysis.orphan_pages {
        assert!(!referenced.contains(&orphan.as_str()));
    }
    assert_eq!(referenced.len() + run.analysis.orphan_pages.len(), 4);
    assert_eq!(run.analysis.orphan_pages, vec!["index.html", "lonely.html"]);
    assert_eq!(run.analysis.most_referenced[0], Ranked("b.html".to_string(), 2));
}

#[tokio::test]
async fn test_out_degree_counts_every_navigational_link() {
    let temp = corpus(&[(
        "a.html",
        r#"<a href="a.html">self</a><a href="a.html">again</a><a href="mailto:x@y.z">mail</a><a href="/api/data">api</a>"#,
    )]);
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 1, None).await.unwrap();

    let stats = run.graph.page("a.html").unwrap();
    assert_eq!(stats.out_degree(), 3);
    assert_eq!(run.graph.edge_count(), 2);
    assert_eq!(run.graph.in_degree("a.html"), 2);
}

#[tokio::test]
async fn test_basename_collision_is_recorded() {
    let temp = corpus(&[("p/x.html", "<p>1</p>"), ("q/x.html", "<p>2</p>")]);
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    assert_eq!(run.graph.document_count(), 1);
    assert_eq!(run.report.failures.len(), 1);
    assert_eq!(run.report.failures[0].kind, ErrorKind::KeyCollision);
    assert_eq!(run.report.failures[0].document, "q/x.html");
}

#[tokio::test]
async fn test_bad_document_does_not_abort_the_run() {
    let temp = corpus(&[("good.html", r#"<a href="bad.html">bad</a>"#)]);
    fs::write(temp.path().join("bad.html"), [0x3c, 0x61, 0xff, 0xfe]).unwrap();
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    assert_eq!(run.graph.document_count(), 2);
    assert_eq!(run.report.failures[0].kind, ErrorKind::ParseFailure);
    assert_eq!(run.graph.in_degree("bad.html"), 1);
}

#[tokio::test]
async fn test_graph_report_round_trips_through_disk() {
    let temp = corpus(&[("a.html", r#"<a href="b.html">b</a>"#), ("b.html", "")]);
    let ctx = RunContext::new(temp.path(), Config::default());
    let run = execute_analysis(&ctx, 1, None).await.unwrap();

    let path = temp.path().join("reports/graph.json");
    save_report(&generate_json_report(&run.report).unwrap(), &path).unwrap();
    let loaded = load_graph_report(&path).unwrap();
    assert_eq!(loaded.metadata.run_id, ctx.run_id);
    assert_eq!(loaded.analysis.cap, 10);
    assert_eq!(loaded, run.report);

    let err = load_graph_report(&temp.path().join("reports/none.json")).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

// ============================================================================
// Corrections
// ============================================================================

#[test]
fn test_scenario_b_correction_then_no_op() {
    let temp = corpus(&[(
        "a.html",
        r#"<html><head><title>A</title></head><body><a href="/old.html">Old</a></body></html>"#,
    )]);
    let mut config = Config::default();
    config.corrections.insert("/old.html".to_string(), "/new".to_string());
    config.canonical_routes.push("/new".to_string());

    let first = fix_links(&RunContext::new(temp.path(), config.clone()), &[]).unwrap();
    let mutation = first.details_by_document["a.html"].mutation.as_ref().unwrap();
    assert!(mutation.changed);
    assert_eq!(first.total_corrections, 1);
    assert!(read(temp.path(), "a.html").contains(r#"href="/new""#));

    let second = fix_links(&RunContext::new(temp.path(), config), &[]).unwrap();
    assert_eq!(second.total_corrections, 0);
    assert!(second.details_by_document["a.html"].mutation.is_none());
    assert_eq!(second.details_by_document["a.html"].details[0].resolution.status, ResolutionStatus::Valid);
}

#[test]
fn test_rewrite_applied_twice_is_unchanged() {
    let temp = corpus(&[("a.html", r#"<a href="/old.html">Old</a>"#)]);
    let path = temp.path().join("a.html");
    let backups = Arc::new(BackupStore::new(&temp.path().join("backups"), LINKS_PURPOSE, "run"));
    let engine = MutationEngine::new(backups);
    let rewrite = RewriteLinks::new(BTreeMap::from([("/old.html".to_string(), "/new".to_string())]));

    assert!(engine.apply(&path, &rewrite).changed);
    let after_first = fs::read(&path).unwrap();
    let second = engine.apply(&path, &rewrite);
    assert!(!second.changed);
    assert_eq!(fs::read(&path).unwrap(), after_first);
}

#[test]
fn test_scenario_d_shared_basename_is_ambiguous() {
    let original = r#"<p><a href="x.html">X</a></p>"#;
    let temp = corpus(&[("a.html", original), ("p/x.html", "<p>1</p>"), ("q/x.html", "<p>2</p>")]);
    let report = fix_links(&RunContext::new(temp.path(), Config::default()), &["a.html".to_string()]).unwrap();

    assert_eq!(report.ambiguous.len(), 1);
    assert_eq!(report.ambiguous[0].href, "x.html");
    assert_eq!(report.ambiguous[0].candidates, vec!["p/x.html", "q/x.html"]);
    assert_eq!(report.total_corrections, 0);
    assert_eq!(read(temp.path(), "a.html"), original);
}

#[test]
fn test_relocated_document_is_rewritten_relative() {
    let temp = corpus(&[
        ("pages/a.html", r#"<a href="moved.html?tab=2">Moved</a>"#),
        ("archive/2023/moved.html", "<p>here</p>"),
    ]);
    let report = fix_links(&RunContext::new(temp.path(), Config::default()), &["a.html".to_string()]).unwrap();

    assert_eq!(report.total_corrections, 1);
    assert!(read(temp.path(), "pages/a.html").contains(r#"href="../archive/2023/moved.html?tab=2""#));
}

#[test]
fn test_backup_holds_original_bytes() {
    let original = r#"<a href="/old.html">Old</a> <a href="/old.html">Again</a>"#;
    let temp = corpus(&[("a.html", original)]);
    let mut config = Config::default();
    config.corrections.insert("/old.html".to_string(), "/new".to_string());
    fix_links(&RunContext::new(temp.path(), config), &[]).unwrap();

    assert_ne!(read(temp.path(), "a.html"), original);
    let records = BackupStore::load_manifest(&temp.path().join("backups").join(LINKS_PURPOSE)).unwrap();
    assert_eq!(records.len(), 1);
    let backup = records[0].backup_file.as_ref().unwrap();
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
}

#[tokio::test]
async fn test_custom_backup_root_stays_out_of_the_corpus() {
    let temp = corpus(&[
        ("index.html", r#"<a href="/old.html">Old</a> <a href="z/x.html">x</a>"#),
        ("z/x.html", r#"<a href="/old.html">Old</a>"#),
    ]);
    let mut config = Config::default();
    config.backup_root = "archive".into();
    config.corrections.insert("/old.html".to_string(), "/new".to_string());

    let report = fix_links(&RunContext::new(temp.path(), config.clone()), &[]).unwrap();
    assert_eq!(report.total_documents, 2);
    assert!(temp.path().join("archive").join(LINKS_PURPOSE).join("x.html").exists());

    let ctx = RunContext::new(temp.path(), config);
    let run = execute_analysis(&ctx, 2, None).await.unwrap();
    assert!(run.report.failures.is_empty());
    assert_eq!(run.graph.document_count(), 2);
    assert_eq!(run.report.pages["x.html"].path, "z/x.html");
    assert_eq!(run.report.pages["index.html"].path, "index.html");
}

#[test]
fn test_missing_corpus_aborts_fix_links() {
    let temp = TempDir::new().unwrap();
    let err = fix_links(&RunContext::new(&temp.path().join("gone"), Config::default()), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Orphans and page integration
// ============================================================================

fn hub_corpus() -> TempDir {
    corpus(&[
        (
            "index.html",
            r#"<html><head><title>Home</title></head><body><nav><a class="nav-item" href="about.html">About</a></nav></body></html>"#,
        ),
        ("about.html", "<html><body><p>about</p></body></html>"),
        ("dashboard-main.html", "<html><body><p>d</p></body></html>"),
        ("test-page.html", "<html><body><p>t</p></body></html>"),
    ])
}

#[tokio::test]
async fn test_connect_orphans_inserts_widget_once() {
    let temp = hub_corpus();
    let mut config = Config::default();
    config.hubs = vec!["index.html".to_string()];
    let ctx = RunContext::new(temp.path(), config.clone());
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    let report = connect_orphans(&ctx, &run);
    assert_eq!(report.total_orphans, 2);
    assert_eq!(report.hubs_touched, 1);
    assert_eq!(report.per_category_counts[&Category::Dashboards], 1);
    assert_eq!(report.per_category_counts[&Category::TestDemo], 1);
    let hub = &report.details_by_document["index.html"];
    assert!(hub.changed && hub.written);
    assert_eq!(report.details_by_document.len(), 1);

    let html = read(temp.path(), "index.html");
    assert!(html.contains(ORPHAN_MENU_CLASS));
    assert!(html.contains(r#"href="/dashboard-main.html""#));
    let menu = format!(r#"class="{}""#, ORPHAN_MENU_CLASS);
    assert!(html.find("</nav>").unwrap() < html.find(&menu).unwrap());
    assert!(temp.path().join("backups").join(ORPHANS_PURPOSE).join("manifest.json").exists());

    let ctx = RunContext::new(temp.path(), config);
    let run = execute_analysis(&ctx, 2, None).await.unwrap();
    let again = connect_orphans(&ctx, &run);
    assert_eq!(again.hubs_touched, 0);
    assert_eq!(read(temp.path(), "index.html"), html);
}

#[tokio::test]
async fn test_missing_hub_is_recorded_not_fatal() {
    let temp = hub_corpus();
    let mut config = Config::default();
    config.hubs = vec!["nowhere.html".to_string(), "index.html".to_string()];
    let ctx = RunContext::new(temp.path(), config);
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    let report = connect_orphans(&ctx, &run);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, ErrorKind::NotFound);
    assert_eq!(report.hubs_touched, 1);
    assert!(!report.details_by_document.contains_key("nowhere.html"));
}

#[tokio::test]
async fn test_link_page_appends_to_nav() {
    let temp = hub_corpus();
    let mut config = Config::default();
    config.hubs = vec!["index.html".to_string()];
    let ctx = RunContext::new(temp.path(), config);
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    let report = link_page(&ctx, &run, "dashboard-main.html", None).unwrap();
    assert_eq!(report.hubs_touched, 1);
    let html = read(temp.path(), "index.html");
    assert!(html.contains(r#"<a href="/dashboard-main.html" class="nav-item">Dashboard Main</a></nav>"#));

    let again = link_page(&ctx, &run, "dashboard-main.html", None).unwrap();
    assert_eq!(again.hubs_touched, 0);

    let err = link_page(&ctx, &run, "ghost.html", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_optimize_hubs_regroups_overloaded_hub_once() {
    let mut hub = String::from("<html><head></head><body><nav><a href=\"/agenda.html\">Agenda</a></nav>");
    let mut files = vec![("agenda.html".to_string(), "<p>agenda</p>".to_string())];
    for i in 0..30 {
        hub.push_str(&format!("<a href=\"p{}.html\">Page {}</a>", i, i));
        files.push((format!("p{}.html", i), "<p>leaf</p>".to_string()));
    }
    hub.push_str("</body></html>");
    files.push(("index.html".to_string(), hub));
    files.push(("small.html".to_string(), r#"<a href="p1.html">one</a>"#.to_string()));
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let temp = corpus(&refs);

    let mut config = Config::default();
    config.hubs = vec!["index.html".to_string(), "small.html".to_string()];
    let ctx = RunContext::new(temp.path(), config.clone());
    let run = execute_analysis(&ctx, 2, None).await.unwrap();

    let report = optimize_hubs(&ctx, &run);
    assert_eq!(report.link_limit, 25);
    assert_eq!(report.hubs_analyzed, 1);
    assert_eq!(report.hubs_touched, 1);
    assert!(report.failures.is_empty());
    assert!(!report.details_by_document.contains_key("small.html"));

    let html = read(temp.path(), "index.html");
    assert!(html.contains(HUB_DIGEST_CLASS));
    assert!(html.contains("Organized Hub (31 links)"));
    // Links past the limit are dropped and the Other group shows only its first four.
    assert!(html.contains(r#"href="p23.html""#));
    assert!(!html.contains("p29.html"));
    assert!(html.contains("(+26 more)"));
    assert!(temp.path().join("backups").join(HUBS_PURPOSE).join("manifest.json").exists());

    let ctx = RunContext::new(temp.path(), config);
    let run = execute_analysis(&ctx, 2, None).await.unwrap();
    let again = optimize_hubs(&ctx, &run);
    assert_eq!(again.hubs_touched, 0);
    assert_eq!(read(temp.path(), "index.html"), html);
}
