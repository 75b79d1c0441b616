pub mod analysis;
pub mod category;
pub mod config;
pub mod correction;
pub mod dom;
pub mod error;
pub mod graph;
pub mod mutation;
pub mod report;
pub mod run;
pub mod theme;
pub mod transform;

pub use analysis::{AnalysisResult, Analyzer, Ranked, Totals};
pub use category::{Category, CategoryClassifier, CategoryRule, HubSection, Matcher, SectionClassifier};
pub use config::{CONFIG_FILE_NAME, Config, GoalsConfig};
pub use correction::{CorrectionResolver, Resolution, ResolutionStatus};
pub use dom::{Doctype, Document, Element, Node};
pub use error::{CoreError, ErrorKind, FailureRecord, Result, WriteStage};
pub use graph::{GraphBuilder, LinkGraph, PageStats};
pub use mutation::{BackupRecord, BackupStore, DocumentStore, FsStore, MutationEngine, MutationResult};
pub use report::{
    CorrectionReport, GoalCheck, GraphReport, HubReport, LinkPageReport, OrphanReport, ReportFormat, goal_check,
};
pub use run::{AnalysisRun, RunContext, connect_orphans, execute_analysis, fix_links, link_page, optimize_hubs};
pub use theme::{ThemeInjector, theme_enabled};
pub use transform::{HubDigest, NavLink, OrphanWidget, RewriteLinks, Transform};
