// Handlers live in their own file so integration tests can reach them
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{GlobalOptions, expand_path, parse_only, render_graph_report};
