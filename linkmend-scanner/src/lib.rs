pub mod corpus;
pub mod error;
pub mod extract;
pub mod index;
pub mod normalize;
pub mod result;
pub mod scanner;
pub mod validate;

pub use corpus::{CorpusOptions, DocumentSource, discover};
pub use error::ScanError;
pub use extract::{Anchor, decode_document, extract_anchors};
pub use index::DocumentIndex;
pub use normalize::{LinkKind, Normalize, NormalizedTarget, SiteProfile};
pub use result::{DocumentScan, Link, ScanFailure, ScanFailureKind};
pub use scanner::Scanner;
pub use validate::validate;
