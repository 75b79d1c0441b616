use crate::corpus::DocumentSource;
use crate::error::{Result, ScanError};
use crate::extract::{DEFAULT_TEXT_LIMIT, extract_document};
use crate::index::DocumentIndex;
use crate::normalize::SiteProfile;
use crate::result::{DocumentScan, Link};
use futures::future::try_join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

type WorkerQueues = Arc<Vec<Mutex<VecDeque<DocumentSource>>>>;

/// Reads documents concurrently and turns each into a [`DocumentScan`].
///
/// Per-document failures are recorded on the scan instead of aborting the
/// run.
pub struct Scanner {
    site: SiteProfile,
    text_limit: usize,
    results: Arc<Mutex<Vec<DocumentScan>>>,
    progress_callback: Option<ProgressCallback>,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            site: SiteProfile::default(),
            text_limit: DEFAULT_TEXT_LIMIT,
            results: Arc::new(Mutex::new(Vec::new())),
            progress_callback: None,
        }
    }

    pub fn with_site(mut self, site: SiteProfile) -> Self {
        self.site = site;
        self
    }

    pub fn with_text_limit(mut self, limit: usize) -> Self {
        self.text_limit = limit;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Scan every source using `workers` tasks. Results are sorted by
    /// document path regardless of completion order.
    pub async fn scan(
        &self,
        sources: Vec<DocumentSource>,
        index: Arc<DocumentIndex>,
        workers: usize,
    ) -> Result<Vec<DocumentScan>> {
        let workers = workers.max(1);
        info!("Scanning {} documents with {} workers", sources.len(), workers);

        // Round-robin the sources across worker-owned queues
        let worker_queues: WorkerQueues =
            Arc::new((0..workers).map(|_| Mutex::new(VecDeque::new())).collect());
        for (i, source) in sources.into_iter().enumerate() {
            worker_queues[i % workers].lock().await.push_back(source);
        }

        let mut worker_handles = Vec::new();

        for worker_id in 0..workers {
            let site = self.site.clone();
            let text_limit = self.text_limit;
            let index = index.clone();
            let progress_cb = self.progress_callback.clone();
            let results = self.results.clone();
            let queues = worker_queues.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                while let Some(source) = Self::next_work(&queues, worker_id).await {
                    if let Some(ref callback) = progress_cb {
                        callback(worker_id, source.path.clone());
                    }

                    let scan = Self::scan_document(source, &site, &index, text_limit).await;
                    results.lock().await.push(scan);
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        try_join_all(worker_handles).await?;

        let mut results = std::mem::take(&mut *self.results.lock().await);
        results.sort_by(|a, b| a.document.path.cmp(&b.document.path));
        info!("Scan complete. {} documents processed", results.len());
        Ok(results)
    }

    /// Pop from the worker's own queue, stealing from the back of another
    /// queue once it runs dry.
    async fn next_work(queues: &WorkerQueues, worker_id: usize) -> Option<DocumentSource> {
        if let Some(item) = queues[worker_id].lock().await.pop_front() {
            return Some(item);
        }
        for offset in 1..queues.len() {
            let victim = (worker_id + offset) % queues.len();
            if let Some(item) = queues[victim].lock().await.pop_back() {
                debug!("Worker {} stole work from worker {}", worker_id, victim);
                return Some(item);
            }
        }
        None
    }

    async fn scan_document(
        source: DocumentSource,
        site: &SiteProfile,
        index: &DocumentIndex,
        text_limit: usize,
    ) -> DocumentScan {
        let bytes = match tokio::fs::read(&source.absolute).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = if e.kind() == std::io::ErrorKind::NotFound {
                    ScanError::NotFound(source.absolute.clone())
                } else {
                    ScanError::IoError(e)
                };
                warn!("Cannot read {}: {}", source.path, error);
                return DocumentScan::with_error(source, &error);
            }
        };

        match extract_document(&bytes, &source.absolute, text_limit) {
            Ok(anchors) => {
                let links: Vec<Link> = anchors
                    .iter()
                    .map(|anchor| Link::build(&source.path, anchor, site, index))
                    .collect();
                debug!("{}: {} links", source.path, links.len());
                DocumentScan::new(source, links)
            }
            Err(e) => {
                warn!("Skipping {}: {}", source.path, e);
                DocumentScan::with_error(source, &e)
            }
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}
